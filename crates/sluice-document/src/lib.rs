//! Sluice Document
//!
//! This crate contains the value model that flows between workflow nodes.
//!
//! - [`Document`]: an arbitrarily nested value (strings, exact numbers,
//!   booleans, binary, lists, sets and ordered maps)
//! - [`Number`]: an exact base-10 decimal kept as text
//! - [`DocumentPath`]: a `$.a.b[0]` style selector used to read and write
//!   sub-documents
//!
//! Documents convert to and from `serde_json::Value`. Binary values become
//! base64 strings and sets become arrays on the way out.

mod document;
mod number;
mod path;

pub use document::Document;
pub use number::{Number, NumberError};
pub use path::{DocumentPath, PathError, Segment};
