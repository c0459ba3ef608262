//! Template field schema compiler.
//!
//! [`compile`] turns an ordered list of [`FieldSpec`]s into a
//! [`CompiledSchema`] that checks entry values positionally. Compilation is
//! pure and deterministic, so compiled schemas are cached per template in
//! a [`SchemaCache`].
//!
//! [`FieldSpec`]: vaultline_types::FieldSpec

mod cache;
mod compile;
mod error;

pub use cache::SchemaCache;
pub use compile::{CompiledSchema, compile};
pub use error::{SchemaError, SchemaResult, SchemaViolation, ViolationReason};
