use std::panic::Location;

use axum::response::{IntoResponse, Response};

use crate::problem_details::{ProblemDetails, ProblemType};

/// The standard error response returned by handlers.
#[derive(Debug)]
pub struct ErrorResponse(ErrorKind);

#[derive(Debug)]
enum ErrorKind {
    NotFound,
    FailedToBufferBody,
    InternalServerError,
    ServiceUnavailable,

    #[debug("{:?}", _0.problem_type())]
    Detailed(ProblemDetails),
}

impl ErrorResponse {
    pub(crate) fn detailed(details: ProblemDetails) -> Self {
        Self(ErrorKind::Detailed(details))
    }

    pub(crate) fn not_found() -> Self {
        Self(ErrorKind::NotFound)
    }

    pub(crate) fn failed_to_buffer_body() -> Self {
        Self(ErrorKind::FailedToBufferBody)
    }

    #[track_caller]
    pub(crate) fn internal_server_error<E>(error: E) -> Self
    where
        E: std::error::Error + 'static,
    {
        error!(
            error = &error as &dyn std::error::Error,
            loc = %Location::caller(),
            "internal server error",
        );

        Self(ErrorKind::InternalServerError)
    }

    /// The database could not be reached.
    #[track_caller]
    pub(crate) fn service_unavailable<E>(error: E) -> Self
    where
        E: std::error::Error + 'static,
    {
        warn!(
            error = &error as &dyn std::error::Error,
            loc = %Location::caller(),
            "run repository is unavailable",
        );

        Self(ErrorKind::ServiceUnavailable)
    }

    pub(crate) fn invalid_path_params(modify: impl FnOnce(&mut ProblemDetails)) -> Self {
        Self::detailed(problem_details(ProblemType::InvalidPathParameters, modify))
    }

    pub(crate) fn invalid_query_string(modify: impl FnOnce(&mut ProblemDetails)) -> Self {
        Self::detailed(problem_details(ProblemType::InvalidQueryString, modify))
    }

    pub(crate) fn invalid_request_body(modify: impl FnOnce(&mut ProblemDetails)) -> Self {
        Self::detailed(problem_details(ProblemType::InvalidRequestBody, modify))
    }

    pub(crate) fn unknown_run(run_id: &srl::runs::RunId) -> Self {
        Self::detailed(problem_details(ProblemType::UnknownRun, |details| {
            details.add_extension("run_id", run_id);
        }))
    }
}

fn problem_details(
    problem_type: ProblemType,
    modify: impl FnOnce(&mut ProblemDetails),
) -> ProblemDetails {
    let mut problem_details = ProblemDetails::new(problem_type);
    modify(&mut problem_details);
    problem_details
}

impl From<srl::runs::RepositoryError> for ErrorResponse {
    #[track_caller]
    fn from(error: srl::runs::RepositoryError) -> Self {
        match error {
            srl::runs::RepositoryError::Unavailable => Self::service_unavailable(error),
            srl::runs::RepositoryError::Database(_) => Self::internal_server_error(error),
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        match self.0 {
            ErrorKind::NotFound => http::StatusCode::NOT_FOUND.into_response(),
            ErrorKind::FailedToBufferBody => http::StatusCode::PAYLOAD_TOO_LARGE.into_response(),
            ErrorKind::InternalServerError => {
                http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
            },
            ErrorKind::ServiceUnavailable => http::StatusCode::SERVICE_UNAVAILABLE.into_response(),
            ErrorKind::Detailed(details) => details.into_response(),
        }
    }
}
