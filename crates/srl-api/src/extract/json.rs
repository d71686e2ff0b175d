use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use axum::extract::rejection::BytesRejection;
use axum::extract::{FromRequest, OptionalFromRequest, Request};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use mime::Mime;
use serde::{Deserialize, Serialize};

use crate::response::ErrorResponse;
use crate::runtime;

/// A JSON request/response body.
///
/// This type implements [`FromRequest`] and [`IntoResponse`], so it can be used as an [extractor]
/// and return value from [handlers]. As an `Option<Json<T>>`, requests without a
/// `Content-Type` header are accepted and produce `None`.
///
/// [extractor]: axum::extract
/// [handlers]: axum::handler
#[derive(Debug)]
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    S: Send + Sync,
    T: for<'de> Deserialize<'de>,
{
    type Rejection = JsonRejection<T>;

    #[tracing::instrument(level = "trace", skip_all, err(level = "debug"))]
    async fn from_request(request: Request, _state: &S) -> Result<Self, Self::Rejection> {
        if !has_json_content_type(request.headers()) {
            return Err(JsonRejection::new(Reason::MissingContentType));
        }

        let bytes = Bytes::from_request(request, &())
            .await
            .map_err(|rejection| JsonRejection::new(Reason::BufferBody(rejection)))?;

        serde_json::from_slice(&bytes[..])
            .map(Self)
            .map_err(|error| JsonRejection::new(Reason::Deserialize(error)))
    }
}

impl<S, T> OptionalFromRequest<S> for Json<T>
where
    S: Send + Sync,
    T: for<'de> Deserialize<'de>,
{
    type Rejection = JsonRejection<T>;

    async fn from_request(request: Request, state: &S) -> Result<Option<Self>, Self::Rejection> {
        if !request.headers().contains_key(http::header::CONTENT_TYPE) {
            return Ok(None);
        }

        <Self as FromRequest<S>>::from_request(request, state)
            .await
            .map(Some)
    }
}

impl<T> IntoResponse for Json<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(bytes) => {
                let mut response = Bytes::from(bytes).into_response();
                response.headers_mut().insert(
                    http::header::CONTENT_TYPE,
                    http::HeaderValue::from_static(mime::APPLICATION_JSON.as_ref()),
                );
                response
            },
            Err(error) => ErrorResponse::internal_server_error(error).into_response(),
        }
    }
}

fn has_json_content_type(headers: &http::HeaderMap) -> bool {
    let Some(content_type) = headers.get(http::header::CONTENT_TYPE) else {
        debug!("request headers do not contain a `Content-Type` header");
        return false;
    };

    let Ok(content_type) = content_type.to_str() else {
        debug!("request headers contain a `Content-Type` header, but it's not UTF-8");
        return false;
    };

    let Ok(mime) = content_type.parse::<Mime>() else {
        debug!("request headers contain a `Content-Type` header, but it's not a valid mime type");
        return false;
    };

    mime.type_() == mime::APPLICATION
        && (mime.subtype() == mime::JSON || mime.suffix() == Some(mime::JSON))
}

#[derive(Error)]
pub struct JsonRejection<T> {
    #[error(source)]
    reason: Reason,
    _marker: PhantomData<T>,
}

#[derive(Debug, Display, Error)]
enum Reason {
    #[display("missing `Content-Type: application/json` header")]
    MissingContentType,

    #[display("request body too large")]
    BufferBody(BytesRejection),

    #[display("{_0}")]
    Deserialize(serde_json::Error),
}

impl<T> JsonRejection<T> {
    fn new(reason: Reason) -> Self {
        Self { reason, _marker: PhantomData }
    }
}

impl<T> fmt::Debug for JsonRejection<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("JsonRejection")
            .field("reason", &self.reason)
            .finish()
    }
}

impl<T> fmt::Display for JsonRejection<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "failed to deserialize request body")?;

        if !runtime::environment().is_production() {
            write!(fmt, " of type `{}`", type_name::<T>())?;
        }

        write!(fmt, ": {}", self.reason)
    }
}

impl<T> IntoResponse for JsonRejection<T> {
    fn into_response(self) -> Response {
        #[derive(serde::Serialize)]
        struct JsonError {
            #[serde(rename = "type")]
            kind: &'static str,
            line: usize,
            column: usize,
            detail: String,
        }

        match self.reason {
            Reason::MissingContentType => ErrorResponse::invalid_request_body(|details| {
                details.set_detail("missing `Content-Type: application/json` header");
            }),
            Reason::BufferBody(_) => ErrorResponse::failed_to_buffer_body(),
            Reason::Deserialize(error) => ErrorResponse::invalid_request_body(|details| {
                details.add_extension("json_error", &JsonError {
                    kind: match error.classify() {
                        serde_json::error::Category::Io | serde_json::error::Category::Eof => "eof",
                        serde_json::error::Category::Syntax => "syntax",
                        serde_json::error::Category::Data => "data",
                    },
                    line: error.line(),
                    column: error.column(),
                    detail: error.to_string(),
                });
            }),
        }
        .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(content_type: &'static str) -> http::HeaderMap {
        let mut headers = http::HeaderMap::new();
        headers.insert(http::header::CONTENT_TYPE, http::HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn json_content_types() {
        assert!(has_json_content_type(&headers("application/json")));
        assert!(has_json_content_type(&headers("application/json; charset=utf-8")));
        assert!(has_json_content_type(&headers("application/problem+json")));
        assert!(!has_json_content_type(&headers("text/plain")));
        assert!(!has_json_content_type(&http::HeaderMap::new()));
    }
}
