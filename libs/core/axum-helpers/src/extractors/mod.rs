//! Custom extractors for Axum handlers.
//!
//! Every rejection is mapped onto [`AppError`](crate::errors::AppError) so
//! clients see one error envelope regardless of which extractor failed.

pub mod uuid_path;
pub mod validated_json;
pub mod validated_query;

pub use uuid_path::UuidPath;
pub use validated_json::ValidatedJson;
pub use validated_query::ValidatedQuery;
