//! Export and import through files.

use chrono::{NaiveDate, Utc};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{BlockError, Result};
use crate::outcome::Outcome;
use crate::slot::SlotBackend;
use crate::store::BlockStore;

/// `block-grid-YYYY-MM-DD.json`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("block-grid-{}.json", date.format("%Y-%m-%d"))
}

/// Writes the export document to `path`, or to today's dated file name in `dir`.
pub fn export_to_file<B: SlotBackend>(
    store: &BlockStore<B>,
    path: Option<&Path>,
    dir: &Path,
    pretty: bool,
) -> Result<PathBuf> {
    let target = match path {
        Some(p) => p.to_path_buf(),
        None => dir.join(export_file_name(Utc::now().date_naive())),
    };
    let text = store.export().to_json(pretty)?;
    fs::write(&target, text).map_err(BlockError::Io)?;
    tracing::debug!(path = %target.display(), blocks = store.len(), "exported");
    Ok(target)
}

/// Replaces the collection from the document at `path`. Text that is not UTF-8
/// is a malformed document, not an I/O failure.
pub fn import_from_file<B: SlotBackend>(store: &mut BlockStore<B>, path: &Path) -> Result<Outcome> {
    let bytes = fs::read(path).map_err(BlockError::Io)?;
    let text = String::from_utf8(bytes)
        .map_err(|e| BlockError::Format(format!("not UTF-8 ({})", e)))?;
    store.import(&text)
}
