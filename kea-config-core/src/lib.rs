//! Kea DHCP configuration documents and a structural JSON differ used by higher-level tools.

pub mod diff;
pub mod document;
pub mod family;
pub mod format;
pub mod parser;
pub mod writer;

pub use diff::{diff, diff_with_options, DiffEntry, DiffOptions};
pub use document::{
    kea_key_fields, ConfigDocument, DocumentError, InterfacesConfig, OptionData, Pool, Subnet,
};
pub use family::DhcpFamily;
pub use format::format_text;
pub use parser::{parse, ParseError};
pub use writer::{write, write_file, WriteError};
