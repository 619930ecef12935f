//! Logical value model for the chainsift entity store.
//!
//! This crate defines the storage-agnostic types shared by the schema model
//! and the entity store:
//! - [`Value`] — the tagged logical value (string, int, float, bool, bytes, list)
//! - [`ScalarType`] — the type tag that drives column typing and read-side rehydration
//! - [`Record`] — a field-name → value map, the unit every store operation works on
//!
//! Raw storage cells are always rehydrated into [`Value`] so consumers (for
//! example a query-serving front end) can tell numeric, boolean, and bytes
//! values apart from plain strings.

mod record;
mod value;

pub use record::Record;
pub use value::{ScalarType, Value};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when parsing or converting logical values.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid integer: {0}")]
    InvalidInt(#[from] std::num::ParseIntError),

    #[error("invalid float: {0}")]
    InvalidFloat(#[from] std::num::ParseFloatError),

    #[error("invalid boolean: {0:?}")]
    InvalidBool(String),

    #[error("invalid hex in bytes value: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("bytes value missing 0x prefix: {0:?}")]
    MissingHexPrefix(String),
}
