//! Labeled SMS messages, corpus loading and the stratified train/test split.

pub mod loader;
pub mod split;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpamError};

pub use loader::{load_raw_dataset, load_split, prepare_split, preprocess, save_split};
pub use split::split;

/// Binary message label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Ham = 0,
    Spam = 1,
}

impl Label {
    /// Both labels, in index order.
    pub const ALL: [Label; 2] = [Label::Ham, Label::Spam];

    /// Index of this label in confusion matrices and probability pairs.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Ham => "ham",
            Label::Spam => "spam",
        }
    }

    pub fn is_spam(self) -> bool {
        self == Label::Spam
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = SpamError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ham" | "0" => Ok(Label::Ham),
            "spam" | "1" => Ok(Label::Spam),
            other => Err(SpamError::data(format!("unknown label '{other}'"))),
        }
    }
}

impl TryFrom<u8> for Label {
    type Error = SpamError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Label::Ham),
            1 => Ok(Label::Spam),
            other => Err(SpamError::data(format!("label index {other} is not 0 or 1"))),
        }
    }
}

impl From<Label> for u8 {
    fn from(label: Label) -> Self {
        label as u8
    }
}

/// A message together with its ground-truth label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledMessage {
    pub label: Label,
    #[serde(rename = "message")]
    pub text: String,
}

impl LabeledMessage {
    pub fn new<S: Into<String>>(text: S, label: Label) -> Self {
        LabeledMessage {
            text: text.into(),
            label,
        }
    }
}

/// Disjoint train and test partitions of a labeled corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSplit {
    pub train: Vec<LabeledMessage>,
    pub test: Vec<LabeledMessage>,
}

impl DatasetSplit {
    pub fn len(&self) -> usize {
        self.train.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.train.is_empty() && self.test.is_empty()
    }
}

/// Count messages per label, as `[ham, spam]`.
pub fn class_counts(messages: &[LabeledMessage]) -> [usize; 2] {
    let mut counts = [0; 2];
    for message in messages {
        counts[message.label.index()] += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_parsing() {
        assert_eq!("ham".parse::<Label>().unwrap(), Label::Ham);
        assert_eq!(" SPAM ".parse::<Label>().unwrap(), Label::Spam);
        assert_eq!("1".parse::<Label>().unwrap(), Label::Spam);
        assert!("maybe".parse::<Label>().is_err());
    }

    #[test]
    fn test_label_indices() {
        assert_eq!(Label::Ham.index(), 0);
        assert_eq!(Label::Spam.index(), 1);
        assert_eq!(Label::try_from(1u8).unwrap(), Label::Spam);
        assert!(Label::try_from(2u8).is_err());
        assert_eq!(u8::from(Label::Spam), 1);
    }

    #[test]
    fn test_label_serde() {
        assert_eq!(serde_json::to_string(&Label::Spam).unwrap(), "\"spam\"");
        let label: Label = serde_json::from_str("\"ham\"").unwrap();
        assert_eq!(label, Label::Ham);
    }

    #[test]
    fn test_class_counts() {
        let messages = vec![
            LabeledMessage::new("a", Label::Ham),
            LabeledMessage::new("b", Label::Spam),
            LabeledMessage::new("c", Label::Ham),
        ];
        assert_eq!(class_counts(&messages), [2, 1]);
    }
}
