use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::document::{ConfigDocument, DocumentError};

/// Errors that can occur while writing a [`ConfigDocument`].
#[derive(Debug, Error)]
pub enum WriteError {
    /// Failed to build the document JSON.
    #[error(transparent)]
    Document(#[from] DocumentError),
    /// Failed to serialize JSON bytes.
    #[error("failed to write Kea JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Failed to write output file.
    #[error("failed to write Kea config file: {0}")]
    Io(#[from] std::io::Error),
}

/// Serialize a document as a pretty-printed Kea configuration file.
pub fn write(doc: &ConfigDocument) -> Result<Vec<u8>, WriteError> {
    let mut bytes = serde_json::to_vec_pretty(&doc.to_arguments()?)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Serialize a document and write it to `path`.
pub fn write_file(doc: &ConfigDocument, path: &Path) -> Result<(), WriteError> {
    let bytes = write(doc)?;
    fs::write(path, bytes)?;
    Ok(())
}
