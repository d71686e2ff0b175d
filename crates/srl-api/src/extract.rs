//! Custom [extractors].
//!
//! These wrap axum's extractors so that rejections are reported as problem details.
//!
//! [extractors]: axum::extract

pub mod path;
pub use path::Path;

pub mod query;
pub use query::Query;

pub mod json;
pub use json::Json;
