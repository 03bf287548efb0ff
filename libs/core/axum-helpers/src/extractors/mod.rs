//! Custom extractors for Axum handlers.
//!
//! Every extractor here rejects with [`AppError`](crate::errors::AppError) so
//! malformed paths and bodies share the standard error body.

pub mod path;
pub mod validated_json;

pub use path::{IdPath, UuidPath};
pub use validated_json::ValidatedJson;
