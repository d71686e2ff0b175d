use tower_http::request_id::{MakeRequestId, RequestId};
use ulid::Ulid;

/// Returns an implementation of [`MakeRequestId`] that tags every request with a fresh ULID.
///
/// The ID is echoed back in the `x-request-id` response header and recorded on the request's
/// tracing span, so a client-reported failure can be matched to its log lines.
pub fn make_request_id() -> impl MakeRequestId + Clone {
    MakeUlidRequestId
}

#[derive(Debug, Clone, Copy)]
struct MakeUlidRequestId;

impl MakeRequestId for MakeUlidRequestId {
    fn make_request_id<B>(&mut self, _: &http::Request<B>) -> Option<RequestId> {
        Ulid::new()
            .array_to_str(&mut [0; 26])
            .parse::<http::HeaderValue>()
            .map(RequestId::from)
            .ok()
    }
}
