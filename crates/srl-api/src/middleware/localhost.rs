use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::response::ErrorResponse;
use crate::runtime::{self, Environment};

/// Middleware to check if a given request is coming from localhost.
///
/// Change notifications are only accepted from services running next to the API. Outside of
/// local deployments the API sits behind nginx, which sets `X-Real-Ip`; requests carrying that
/// header came from the outside and are answered with 404.
#[tracing::instrument(skip_all, err(Debug, level = "debug"))]
pub async fn client_is_localhost(request: Request, next: Next) -> Result<Response, ErrorResponse> {
    match runtime::environment() {
        Environment::Local => Ok(next.run(request).await),
        Environment::Staging | Environment::Production => {
            if request.headers().contains_key("X-Real-Ip") {
                Err(ErrorResponse::not_found())
            } else {
                Ok(next.run(request).await)
            }
        },
    }
}
