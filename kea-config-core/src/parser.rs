use serde_json::Value;
use thiserror::Error;

use crate::document::{ConfigDocument, DocumentError};
use crate::family::DhcpFamily;

/// Errors that can occur while parsing a Kea configuration file.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Input was not valid JSON.
    #[error("failed to parse Kea JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Input bytes were not valid UTF-8.
    #[error("invalid UTF-8 in Kea config: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    /// Neither a `Dhcp4` nor a `Dhcp6` section was present.
    #[error("no Dhcp4 or Dhcp6 section found")]
    UnknownFamily,
    /// The daemon section did not have the expected shape.
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// Parse Kea configuration bytes into a [`ConfigDocument`].
///
/// Accepts anything [`crate::write`] produces as well as saved `config-get`
/// arguments. The family comes from whichever daemon section is present.
pub fn parse(input: &[u8]) -> Result<ConfigDocument, ParseError> {
    let text = std::str::from_utf8(input)?;
    let value: Value = serde_json::from_str(text)?;

    let family = DhcpFamily::ALL
        .into_iter()
        .find(|family| value.get(family.root_key()).is_some())
        .ok_or(ParseError::UnknownFamily)?;

    Ok(ConfigDocument::from_arguments(family, &value)?)
}
