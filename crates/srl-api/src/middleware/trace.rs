use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use axum::body::HttpBody;
use axum::extract::ConnectInfo;
use bytes::Buf;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::request_id::RequestId;
use tower_http::trace::{
    HttpMakeClassifier,
    MakeSpan,
    OnBodyChunk,
    OnEos,
    OnFailure,
    OnRequest,
    OnResponse,
    TraceLayer,
};

/// Returns a [`tower::Layer`] for emitting [`tracing`] events as requests are processed.
pub fn layer<RequestBody, ResponseBody>() -> TraceLayer<
    HttpMakeClassifier,
    impl MakeSpan<RequestBody> + Clone,
    impl OnRequest<RequestBody> + Clone,
    impl OnResponse<ResponseBody> + Clone,
    impl OnBodyChunk<ResponseBody::Data> + Clone,
    impl OnEos + Clone,
    impl OnFailure<ServerErrorsFailureClass> + Clone,
>
where
    RequestBody: HttpBody,
    ResponseBody: HttpBody<Error: fmt::Display + 'static>,
{
    TraceLayer::new_for_http()
        .make_span_with(make_span::<RequestBody>)
        .on_request(on_request::<RequestBody>)
        .on_response(on_response::<ResponseBody>)
        .on_body_chunk(on_body_chunk::<ResponseBody>)
        .on_eos(on_eos)
        .on_failure(on_failure)
}

/// Called at the start of each request cycle. This function generates the [`tracing::Span`] that
/// is passed to the other functions later on.
fn make_span<B>(request: &http::Request<B>) -> tracing::Span {
    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|&ConnectInfo(addr)| addr.ip())
        .or_else(|| real_ip(request.headers()));

    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|request_id| request_id.header_value());

    info_span! {
        target: "srl_api::http",
        "request",
        client_addr = ?client_addr,
        request.id = ?request_id,
        request.method = tracing::field::Empty,
        request.uri = tracing::field::Empty,
        request.version = tracing::field::Empty,
        response.status = tracing::field::Empty,
    }
}

/// Address of the client as reported by nginx.
fn real_ip(headers: &http::HeaderMap) -> Option<IpAddr> {
    headers
        .get("X-Real-Ip")?
        .to_str()
        .inspect_err(|err| trace!(%err, "`X-Real-Ip` header was not UTF-8"))
        .ok()?
        .parse::<IpAddr>()
        .inspect_err(|err| trace!(%err, "`X-Real-Ip` header is not an IP address"))
        .ok()
}

/// Called right after [`make_span`] to signal that the request is now being processed.
fn on_request<B>(request: &http::Request<B>, span: &tracing::Span) {
    span.record("request.method", tracing::field::debug(request.method()));
    span.record("request.uri", tracing::field::debug(request.uri()));
    span.record("request.version", tracing::field::debug(request.version()));

    info!(target: "srl_api::http::request", "starting to process request");
}

/// Called after the inner service has produced a response.
fn on_response<B>(response: &http::Response<B>, latency: Duration, span: &tracing::Span) {
    span.record("response.status", response.status().as_u16());

    info!(target: "srl_api::http::response", ?latency, "finished processing request");
}

fn on_body_chunk<B: HttpBody>(chunk: &B::Data, latency: Duration, _span: &tracing::Span) {
    trace!(target: "srl_api::http::response::body::chunk", size = chunk.remaining(), ?latency);
}

fn on_eos(trailers: Option<&http::HeaderMap>, stream_duration: Duration, _span: &tracing::Span) {
    debug!(target: "srl_api::http::response", ?trailers, ?stream_duration);
}

/// Called for every response that was classified to be a failure.
fn on_failure(failure_class: ServerErrorsFailureClass, latency: Duration, span: &tracing::Span) {
    match failure_class {
        ServerErrorsFailureClass::StatusCode(status) => {
            span.record("response.status", status.as_u16());
            error!(
                target: "srl_api::http",
                status = status.as_u16(),
                ?latency,
                "failed to handle request",
            );
        },
        ServerErrorsFailureClass::Error(error) => {
            error!(target: "srl_api::http", %error, "failed to handle request");
        },
    }
}
