//! Corpus ingestion and persisted train/test tables.
//!
//! The raw corpus is the tab-separated SMS Spam Collection: one
//! `label<TAB>message` line per message, no header, no quoting. After
//! normalization the split is persisted as two CSV tables so that every
//! model is trained and evaluated on exactly the same messages.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use log::{info, warn};

use crate::analysis::normalize;
use crate::config::AppConfig;
use crate::dataset::{DatasetSplit, LabeledMessage, class_counts, split};
use crate::error::{Result, SpamError};
use crate::util::fs::write_atomic;

pub const TRAIN_FILE_NAME: &str = "train_data.csv";
pub const TEST_FILE_NAME: &str = "test_data.csv";

/// Read the raw tab-separated corpus.
///
/// Lines whose label is neither `ham` nor `spam` are skipped with a warning.
pub fn load_raw_dataset<P: AsRef<Path>>(path: P) -> Result<Vec<LabeledMessage>> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| SpamError::data(format!("cannot open {}: {e}", path.display())))?;

    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quoting(false)
        .flexible(true)
        .from_reader(file);

    let mut messages = Vec::new();
    let mut skipped = 0usize;

    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let (Some(label), Some(text)) = (record.get(0), record.get(1)) else {
            skipped += 1;
            continue;
        };

        match label.parse() {
            Ok(label) => messages.push(LabeledMessage::new(text, label)),
            Err(e) => {
                warn!("Skipping line {}: {e}", line + 1);
                skipped += 1;
            }
        }
    }

    info!(
        "Loaded {} raw messages from {} ({skipped} skipped)",
        messages.len(),
        path.display()
    );
    Ok(messages)
}

/// Normalize every message and drop those that are empty afterwards.
pub fn preprocess(raw: Vec<LabeledMessage>) -> Result<Vec<LabeledMessage>> {
    let total = raw.len();
    let cleaned: Vec<LabeledMessage> = raw
        .into_iter()
        .map(|message| LabeledMessage::new(normalize(&message.text), message.label))
        .filter(|message| !message.text.is_empty())
        .collect();

    if cleaned.is_empty() {
        return Err(SpamError::data(format!(
            "all {total} messages are empty after cleaning"
        )));
    }

    let [ham, spam] = class_counts(&cleaned);
    info!(
        "Preprocessed {} messages ({} dropped as empty): ham={ham}, spam={spam}",
        cleaned.len(),
        total - cleaned.len()
    );
    Ok(cleaned)
}

/// Persist both sides of a split as CSV tables under `data_dir`.
pub fn save_split<P: AsRef<Path>>(split: &DatasetSplit, data_dir: P) -> Result<()> {
    let data_dir = data_dir.as_ref();
    write_table(&data_dir.join(TRAIN_FILE_NAME), &split.train)?;
    write_table(&data_dir.join(TEST_FILE_NAME), &split.test)?;
    info!(
        "Saved split to {} (train={}, test={})",
        data_dir.display(),
        split.train.len(),
        split.test.len()
    );
    Ok(())
}

/// Load a split previously written by [`save_split`].
pub fn load_split<P: AsRef<Path>>(data_dir: P) -> Result<DatasetSplit> {
    let data_dir = data_dir.as_ref();
    Ok(DatasetSplit {
        train: read_table(&data_dir.join(TRAIN_FILE_NAME))?,
        test: read_table(&data_dir.join(TEST_FILE_NAME))?,
    })
}

/// Load a single persisted table (for example only the test set).
pub fn load_table<P: AsRef<Path>>(path: P) -> Result<Vec<LabeledMessage>> {
    read_table(path.as_ref())
}

/// Path of the persisted test table for a configuration.
pub fn test_table_path(config: &AppConfig) -> PathBuf {
    config.paths.data_dir.join(TEST_FILE_NAME)
}

/// Return the persisted split, building and saving it from the raw corpus
/// when it does not exist yet.
pub fn prepare_split(config: &AppConfig) -> Result<DatasetSplit> {
    let data_dir = &config.paths.data_dir;
    if data_dir.join(TRAIN_FILE_NAME).exists() && data_dir.join(TEST_FILE_NAME).exists() {
        info!("Using persisted split in {}", data_dir.display());
        return load_split(data_dir);
    }

    build_split(config)
}

/// Build the split from the raw corpus and persist it, replacing any
/// existing tables.
pub fn build_split(config: &AppConfig) -> Result<DatasetSplit> {
    let data_path = &config.data.data_path;
    if !data_path.exists() {
        return Err(SpamError::data(format!(
            "raw dataset not found at {} (download it from {})",
            data_path.display(),
            config.data.dataset_url
        )));
    }

    let messages = preprocess(load_raw_dataset(data_path)?)?;
    let split = split(&messages, config.data.test_size, config.data.random_state)?;
    save_split(&split, &config.paths.data_dir)?;
    Ok(split)
}

fn write_table(path: &Path, messages: &[LabeledMessage]) -> Result<()> {
    write_atomic(path, |writer| {
        let mut csv_writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Necessary)
            .from_writer(writer);
        for message in messages {
            csv_writer.serialize(message)?;
        }
        csv_writer.flush()?;
        Ok(())
    })
}

fn read_table(path: &Path) -> Result<Vec<LabeledMessage>> {
    let file = File::open(path)
        .map_err(|e| SpamError::data(format!("cannot open {}: {e}", path.display())))?;
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);

    let mut messages = Vec::new();
    for record in reader.deserialize() {
        let message: LabeledMessage = record
            .map_err(|e| SpamError::data(format!("malformed row in {}: {e}", path.display())))?;
        messages.push(message);
    }
    Ok(messages)
}
