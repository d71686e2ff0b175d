//! Custom [responses].
//!
//! [responses]: axum::response

use axum::response::{IntoResponse, Response};

use crate::extract::Json;

mod error;
pub use error::ErrorResponse;

/// A `202 Accepted` response; the requested work happens in the background.
#[derive(Debug)]
pub struct Accepted<T>(pub T)
where
    Json<T>: IntoResponse;

impl<T> IntoResponse for Accepted<T>
where
    Json<T>: IntoResponse,
{
    fn into_response(self) -> Response {
        (http::StatusCode::ACCEPTED, Json(self.0)).into_response()
    }
}
