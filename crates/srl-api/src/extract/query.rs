use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use axum::extract::FromRequestParts;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::response::ErrorResponse;
use crate::runtime;

/// An [extractor] for URI query parameters.
///
/// [extractor]: axum::extract
#[derive(Debug)]
pub struct Query<T>(pub T);

impl<S, T> FromRequestParts<S> for Query<T>
where
    S: Send + Sync,
    T: for<'de> Deserialize<'de>,
{
    type Rejection = QueryRejection<T>;

    #[tracing::instrument(level = "trace", skip_all, err(level = "debug"))]
    async fn from_request_parts(
        request: &mut http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let query = request.uri.query().unwrap_or_default();

        serde_html_form::from_str(query)
            .map(Self)
            .map_err(|source| QueryRejection { source, _marker: PhantomData })
    }
}

#[derive(Error)]
pub struct QueryRejection<T> {
    source: serde_html_form::de::Error,
    _marker: PhantomData<T>,
}

impl<T> fmt::Debug for QueryRejection<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_tuple("QueryRejection")
            .field(&self.source)
            .finish()
    }
}

impl<T> fmt::Display for QueryRejection<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "failed to deserialize query string")?;

        if !runtime::environment().is_production() {
            write!(fmt, " of type `{}`", type_name::<T>())?;
        }

        write!(fmt, ": {}", self.source)
    }
}

impl<T> IntoResponse for QueryRejection<T> {
    fn into_response(self) -> Response {
        ErrorResponse::invalid_query_string(|details| details.set_detail(self.source.to_string()))
            .into_response()
    }
}
