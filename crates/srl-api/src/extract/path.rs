use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use axum::extract::path::ErrorKind;
use axum::extract::FromRequestParts;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::response::ErrorResponse;
use crate::runtime;

/// An [extractor] for URI path parameters.
///
/// [extractor]: axum::extract
#[derive(Debug)]
pub struct Path<T>(pub T);

impl<S, T> FromRequestParts<S> for Path<T>
where
    S: Send + Sync,
    T: for<'de> Deserialize<'de> + Send,
{
    type Rejection = PathRejection<T>;

    #[tracing::instrument(level = "trace", skip_all, err(level = "debug"))]
    async fn from_request_parts(
        request: &mut http::request::Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        <axum::extract::Path<T> as FromRequestParts<S>>::from_request_parts(request, state)
            .await
            .map(|axum::extract::Path(value)| Self(value))
            .map_err(|source| PathRejection { source, _marker: PhantomData })
    }
}

#[derive(Error)]
pub struct PathRejection<T> {
    source: axum::extract::rejection::PathRejection,
    _marker: PhantomData<T>,
}

impl<T> fmt::Debug for PathRejection<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_tuple("PathRejection")
            .field(&self.source)
            .finish()
    }
}

impl<T> fmt::Display for PathRejection<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "failed to deserialize path parameter(s)")?;

        if !runtime::environment().is_production() {
            write!(fmt, " of type `{}`", type_name::<T>())?;
        }

        write!(fmt, ": {}", self.source)
    }
}

impl<T> IntoResponse for PathRejection<T> {
    fn into_response(self) -> Response {
        let error = match self.source {
            axum::extract::rejection::PathRejection::FailedToDeserializePathParams(error) => error,
            error => return ErrorResponse::internal_server_error(error).into_response(),
        };

        // the handler asked for something that cannot come from a path
        if matches!(error.kind(), ErrorKind::UnsupportedType { .. }) {
            return ErrorResponse::internal_server_error(error).into_response();
        }

        let detail = match *error.kind() {
            ErrorKind::WrongNumberOfParameters { got, expected } => {
                format!("received wrong number of parameters (expected {expected} but got {got})")
            },
            ErrorKind::ParseErrorAtKey { ref key, ref value, expected_type } => {
                format!("failed to parse `{key}`: `{value}` is not a valid `{expected_type}`")
            },
            ErrorKind::ParseError { ref value, expected_type } => {
                format!("failed to parse `{value}` as a `{expected_type}`")
            },
            ErrorKind::InvalidUtf8InPathParam { ref key } => {
                format!("value of parameter `{key}` is not valid UTF-8")
            },
            _ => error.body_text(),
        };

        ErrorResponse::invalid_path_params(|details| details.set_detail(detail)).into_response()
    }
}
