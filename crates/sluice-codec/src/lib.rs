//! Sluice Codec
//!
//! Converts [`Document`](sluice_document::Document) values into typed,
//! storage-ready [`AttributeValue`]s and back.
//!
//! The codec is lossless: for every document `d` that has an attribute
//! representation, `decode(&encode(&d)?) == d`. Numbers stay exact decimal
//! strings, binary passes through untouched, and sets are deduplicated
//! string sets.
//!
//! Attribute values also have a tagged JSON wire form (`{"S": "x"}`,
//! `{"N": "3"}`, `{"M": {...}}`) that external task collaborators use to
//! return storage-shaped fragments.

mod attribute;
mod coerce;
mod codec;
mod error;

pub use attribute::AttributeValue;
pub use codec::{decode, decode_fragment, encode};
pub use coerce::{AttributeKind, coerce};
pub use error::CodecError;
