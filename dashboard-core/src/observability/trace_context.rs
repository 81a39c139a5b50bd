//! W3C Trace Context propagation for calls to the payout API.
//!
//! See: https://www.w3.org/TR/trace-context/

use opentelemetry::trace::TraceContextExt;
use reqwest::header::HeaderMap;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Header name for W3C traceparent
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Header name for W3C tracestate
pub const TRACESTATE_HEADER: &str = "tracestate";

/// Write the current span's context as `traceparent`/`tracestate` headers.
///
/// Leaves `headers` untouched when the current span has no valid context,
/// which is the case when no OTLP exporter is installed.
pub fn inject_trace_context(headers: &mut HeaderMap) {
    let context = Span::current().context();
    let otel_span = context.span();
    let span_context = otel_span.span_context();

    if !span_context.is_valid() {
        return;
    }

    // version-trace_id-span_id-trace_flags
    let traceparent = format!(
        "00-{}-{}-{:02x}",
        span_context.trace_id(),
        span_context.span_id(),
        span_context.trace_flags().to_u8()
    );
    if let Ok(value) = traceparent.parse() {
        headers.insert(TRACEPARENT_HEADER, value);
    }

    let tracestate = span_context.trace_state().header();
    if !tracestate.is_empty()
        && let Ok(value) = tracestate.parse()
    {
        headers.insert(TRACESTATE_HEADER, value);
    }
}

/// A `reqwest::RequestBuilder` that injects trace headers when sent.
pub struct TracedRequest {
    request: reqwest::RequestBuilder,
}

impl TracedRequest {
    pub fn new(request: reqwest::RequestBuilder) -> Self {
        Self { request }
    }

    pub fn json<T: serde::Serialize + ?Sized>(self, json: &T) -> Self {
        Self {
            request: self.request.json(json),
        }
    }

    pub fn query<T: serde::Serialize + ?Sized>(self, query: &T) -> Self {
        Self {
            request: self.request.query(query),
        }
    }

    pub fn bearer_auth<T: std::fmt::Display>(self, token: T) -> Self {
        Self {
            request: self.request.bearer_auth(token),
        }
    }

    pub async fn send(self) -> Result<reqwest::Response, reqwest::Error> {
        let mut headers = HeaderMap::new();
        inject_trace_context(&mut headers);

        self.request.headers(headers).send().await
    }
}

/// Extension trait for reqwest::Client to create traced requests.
pub trait TracedClientExt {
    fn traced_get(&self, url: &str) -> TracedRequest;
    fn traced_post(&self, url: &str) -> TracedRequest;
    fn traced_put(&self, url: &str) -> TracedRequest;
    fn traced_delete(&self, url: &str) -> TracedRequest;
}

impl TracedClientExt for reqwest::Client {
    fn traced_get(&self, url: &str) -> TracedRequest {
        TracedRequest::new(self.get(url))
    }

    fn traced_post(&self, url: &str) -> TracedRequest {
        TracedRequest::new(self.post(url))
    }

    fn traced_put(&self, url: &str) -> TracedRequest {
        TracedRequest::new(self.put(url))
    }

    fn traced_delete(&self, url: &str) -> TracedRequest {
        TracedRequest::new(self.delete(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_headers_without_active_span() {
        let mut headers = HeaderMap::new();
        inject_trace_context(&mut headers);
        assert!(headers.get(TRACEPARENT_HEADER).is_none());
        assert!(headers.get(TRACESTATE_HEADER).is_none());
    }

    #[test]
    fn traced_request_keeps_query_and_auth() {
        let client = reqwest::Client::new();
        let request = client
            .traced_get("http://localhost:4000/payouts")
            .query(&[("status", "Draft")])
            .bearer_auth("tok")
            .request
            .build()
            .unwrap();

        assert_eq!(request.url().query(), Some("status=Draft"));
        assert_eq!(
            request.headers().get("authorization").unwrap(),
            "Bearer tok"
        );
    }
}
