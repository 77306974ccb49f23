//! Filesystem helpers.
//!
//! Every artifact the crate persists (models, split tables, result documents,
//! tracking files) goes through [`write_atomic`], so a reader never observes a
//! half-written file.

use std::io::Write;
use std::path::Path;

use log::debug;
use tempfile::NamedTempFile;

use crate::error::Result;

/// Write a file by filling a temp file in the destination directory and
/// renaming it over `path`.
///
/// Parent directories are created when missing.
pub fn write_atomic<P, F>(path: P, write: F) -> Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = std::io::BufWriter::new(temp.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    debug!("Wrote {}", path.display());
    Ok(())
}

/// Atomically write a value as pretty-printed JSON.
pub fn write_json_atomic<P, T>(path: P, value: &T) -> Result<()>
where
    P: AsRef<Path>,
    T: serde::Serialize + ?Sized,
{
    write_atomic(path, |writer| {
        serde_json::to_writer_pretty(&mut *writer, value)?;
        writer.write_all(b"\n")?;
        Ok(())
    })
}
