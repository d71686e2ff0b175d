//! [RFC 9457][rfc] problem details for error responses.
//!
//! [rfc]: https://www.rfc-editor.org/rfc/rfc9457.html

use std::any::type_name;
use std::borrow::Cow;

use axum::response::{IntoResponse, Response};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// The `Content-Type` of problem details responses.
pub const CONTENT_TYPE: &str = "application/problem+json";

type ExtensionMembers = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemType {
    InvalidPathParameters,
    InvalidQueryString,
    InvalidRequestBody,
    UnknownRun,
}

impl ProblemType {
    /// The URI in the response's ["type"] member.
    ///
    /// ["type"]: https://www.rfc-editor.org/rfc/rfc9457.html#section-3.1.1
    pub fn uri(&self) -> &'static str {
        match self {
            Self::InvalidPathParameters => "https://docs.thps.run/api/problems#invalid-path-parameters",
            Self::InvalidQueryString => "https://docs.thps.run/api/problems#invalid-query-string",
            Self::InvalidRequestBody => "https://docs.thps.run/api/problems#invalid-request-body",
            Self::UnknownRun => "https://docs.thps.run/api/problems#unknown-run",
        }
    }

    pub fn status(&self) -> http::StatusCode {
        match self {
            Self::InvalidPathParameters | Self::InvalidQueryString => http::StatusCode::BAD_REQUEST,
            Self::InvalidRequestBody => http::StatusCode::UNPROCESSABLE_ENTITY,
            Self::UnknownRun => http::StatusCode::NOT_FOUND,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::InvalidPathParameters => "failed to parse path parameter(s)",
            Self::InvalidQueryString => "failed to parse query string",
            Self::InvalidRequestBody => "failed to parse request body",
            Self::UnknownRun => "run does not exist and no leaderboard was given",
        }
    }
}

/// An [RFC 9457][rfc] compliant response body.
///
/// [rfc]: https://www.rfc-editor.org/rfc/rfc9457.html
#[derive(Debug, Clone, PartialEq)]
pub struct ProblemDetails {
    problem_type: ProblemType,
    detail: Option<Cow<'static, str>>,
    extension_members: ExtensionMembers,
}

impl ProblemDetails {
    pub fn new(problem_type: ProblemType) -> Self {
        Self { problem_type, detail: None, extension_members: ExtensionMembers::new() }
    }

    pub fn problem_type(&self) -> ProblemType {
        self.problem_type
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Populates the ["detail"] field.
    ///
    /// ["detail"]: https://www.rfc-editor.org/rfc/rfc9457.html#section-3.1.4
    pub fn set_detail(&mut self, detail: impl Into<Cow<'static, str>>) {
        self.detail = Some(detail.into());
    }

    /// Adds an [extension member] field.
    ///
    /// Values that cannot be represented as JSON are logged and left out.
    ///
    /// [extension member]: https://www.rfc-editor.org/rfc/rfc9457.html#section-3.2
    pub fn add_extension<V>(&mut self, key: impl Into<String>, value: &V)
    where
        V: Serialize + ?Sized,
    {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.extension_members.insert(key.into(), value);
            },
            Err(error) => {
                error!(%error, value_type = type_name::<V>(), "failed to serialize extension member");
            },
        }
    }
}

impl Serialize for ProblemDetails {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let field_count = 3 // type + status + title
            + usize::from(self.detail.is_some())
            + self.extension_members.len();

        let mut serializer = serializer.serialize_map(Some(field_count))?;

        serializer.serialize_entry("type", self.problem_type.uri())?;
        serializer.serialize_entry("status", &self.problem_type.status().as_u16())?;
        serializer.serialize_entry("title", self.problem_type.title())?;

        if let Some(detail) = self.detail() {
            serializer.serialize_entry("detail", detail)?;
        }

        for (key, value) in &self.extension_members {
            serializer.serialize_entry(key, value)?;
        }

        serializer.end()
    }
}

impl IntoResponse for ProblemDetails {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self) {
            Ok(body) => (
                self.problem_type.status(),
                [(http::header::CONTENT_TYPE, CONTENT_TYPE)],
                body,
            )
                .into_response(),
            Err(error) => {
                error!(%error, "failed to serialize problem details");
                http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use serde_json::json;

    use super::*;

    #[test]
    fn serializes_standard_and_extension_members() {
        let mut details = ProblemDetails::new(ProblemType::InvalidQueryString);
        details.set_detail("missing field `game`");
        details.add_extension("field", "game");

        assert!(serde_json::to_string(&details).unwrap().starts_with(r#"{"type":"#));
        assert_eq!(
            serde_json::to_value(&details).unwrap(),
            json!({
                "type": "https://docs.thps.run/api/problems#invalid-query-string",
                "status": 400,
                "title": "failed to parse query string",
                "detail": "missing field `game`",
                "field": "game",
            }),
        );
    }

    #[tokio::test]
    async fn response_uses_problem_json() {
        let response = ProblemDetails::new(ProblemType::UnknownRun).into_response();

        assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[http::header::CONTENT_TYPE], CONTENT_TYPE);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice::<serde_json::Value>(&body).unwrap();

        assert_eq!(body["status"], 404);
        assert_eq!(body["title"], ProblemType::UnknownRun.title());
        assert!(body.get("detail").is_none());
    }
}
