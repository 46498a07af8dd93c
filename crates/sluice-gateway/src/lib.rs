//! Sluice Gateway
//!
//! This crate is the synchronous front door of a sluice workflow. A
//! [`Gateway`] takes a raw request body, checks it against an
//! [`InputSchema`] before anything downstream runs, invokes the runtime and
//! turns the outcome into a [`GatewayResponse`] with a stable error code.

mod gateway;
mod response;
mod schema;

pub use gateway::Gateway;
pub use response::{ErrorCode, GatewayResponse, ResponseConfig};
pub use schema::{FieldType, InputSchema, RequiredField, ValidationError};
