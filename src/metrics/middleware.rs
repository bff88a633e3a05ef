//! Request instrumentation middleware.
//!
//! # Responsibilities
//! - Time every request passing through the wrapped router
//! - Derive `method`, `uri`, `status` and `outcome` labels
//! - Record one `http.server.requests` timer sample per request
//!
//! # Design Decisions
//! - The handler runs inline; the middleware never alters the response
//! - `uri` prefers the matched route template (`/items/{id}`) so embedded
//!   identifiers do not explode label cardinality; without a match it falls
//!   back to the raw request URI, which is unbounded
//! - Static default labels never override request-derived labels

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::{self, Next},
    response::Response,
    Router,
};

use super::labels::LabelSet;
use super::registry::MetricsRegistry;

/// Timer every instrumented request is recorded under.
pub const HTTP_SERVER_REQUESTS: &str = "http.server.requests";

/// Coarse response class derived from the status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Informational,
    Success,
    Redirection,
    ClientError,
    ServerError,
    Unknown,
}

impl Outcome {
    /// Bucket a status code. Anything outside 100..=599 is [`Outcome::Unknown`].
    pub fn from_status(code: u16) -> Self {
        match code {
            100..=199 => Outcome::Informational,
            200..=299 => Outcome::Success,
            300..=399 => Outcome::Redirection,
            400..=499 => Outcome::ClientError,
            500..=599 => Outcome::ServerError,
            _ => Outcome::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Informational => "INFORMATIONAL",
            Outcome::Success => "SUCCESS",
            Outcome::Redirection => "REDIRECTION",
            Outcome::ClientError => "CLIENT_ERROR",
            Outcome::ServerError => "SERVER_ERROR",
            Outcome::Unknown => "UNKNOWN_STATUS",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a request to the value of its `uri` label.
pub trait UriMapper: Send + Sync + fmt::Debug {
    fn map_uri(&self, req: &Request) -> String;
}

/// The raw request URI: path plus query.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawUri;

impl UriMapper for RawUri {
    fn map_uri(&self, req: &Request) -> String {
        req.uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.uri().path().to_string())
    }
}

/// The matched axum route template, falling back to [`RawUri`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchedRouteUri;

impl UriMapper for MatchedRouteUri {
    fn map_uri(&self, req: &Request) -> String {
        match req.extensions().get::<MatchedPath>() {
            Some(path) => path.as_str().to_string(),
            None => RawUri.map_uri(req),
        }
    }
}

/// State for [`track_requests`].
#[derive(Clone, Debug)]
pub struct RequestMetrics {
    registry: MetricsRegistry,
    uri_mapper: Arc<dyn UriMapper>,
    default_labels: LabelSet,
}

impl RequestMetrics {
    /// Instrumentation with raw URIs and no default labels.
    pub fn new(registry: MetricsRegistry) -> Self {
        Self {
            registry,
            uri_mapper: Arc::new(RawUri),
            default_labels: LabelSet::new(),
        }
    }

    pub fn with_uri_mapper(mut self, mapper: impl UriMapper + 'static) -> Self {
        self.uri_mapper = Arc::new(mapper);
        self
    }

    pub fn with_default_labels(mut self, labels: LabelSet) -> Self {
        self.default_labels = labels;
        self
    }

    /// Labels for one completed request.
    pub fn labels_for(&self, method: &str, uri: String, status: u16) -> LabelSet {
        let mut labels = LabelSet::new()
            .with("method", method)
            .with("uri", uri)
            .with("status", status.to_string())
            .with("outcome", Outcome::from_status(status).as_str());
        labels.extend_missing(&self.default_labels);
        labels
    }

    /// Wrap every route of `router` with [`track_requests`].
    pub fn instrument<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(middleware::from_fn_with_state(self, track_requests))
    }
}

/// Middleware: delegate, measure, label, record.
pub async fn track_requests(
    State(metrics): State<RequestMetrics>,
    request: Request,
    next: Next,
) -> Response {
    // Route context has to be read before the request moves into the handler.
    let method = request.method().to_string();
    let uri = metrics.uri_mapper.map_uri(&request);

    let start = Instant::now();
    let response = next.run(request).await;
    let elapsed = start.elapsed();

    let labels = metrics.labels_for(&method, uri, response.status().as_u16());
    metrics
        .registry
        .record_duration(HTTP_SERVER_REQUESTS, &labels, elapsed);

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http;

    #[test]
    fn test_outcome_buckets() {
        let cases = [
            (0, "UNKNOWN_STATUS"),
            (99, "UNKNOWN_STATUS"),
            (100, "INFORMATIONAL"),
            (199, "INFORMATIONAL"),
            (200, "SUCCESS"),
            (299, "SUCCESS"),
            (302, "REDIRECTION"),
            (404, "CLIENT_ERROR"),
            (499, "CLIENT_ERROR"),
            (500, "SERVER_ERROR"),
            (599, "SERVER_ERROR"),
            (600, "UNKNOWN_STATUS"),
            (u16::MAX, "UNKNOWN_STATUS"),
        ];
        for (code, expected) in cases {
            assert_eq!(Outcome::from_status(code).as_str(), expected, "code {code}");
        }
    }

    #[test]
    fn test_outcome_is_total_over_valid_range() {
        for code in 100..=599u16 {
            assert_ne!(Outcome::from_status(code), Outcome::Unknown, "code {code}");
        }
    }

    #[test]
    fn test_raw_uri_keeps_query() {
        let req = http::Request::builder()
            .uri("http://example.com/items/42?verbose=1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(RawUri.map_uri(&req), "/items/42?verbose=1");
        // No route matched: template mapper falls back to the raw URI.
        assert_eq!(MatchedRouteUri.map_uri(&req), "/items/42?verbose=1");
    }

    #[test]
    fn test_default_labels_do_not_override() {
        let metrics = RequestMetrics::new(MetricsRegistry::new()).with_default_labels(
            LabelSet::new().with("appName", "canals").with("status", "bogus"),
        );

        let labels = metrics.labels_for("POST", "/canals".into(), 201);
        assert_eq!(labels.get("status"), Some("201"));
        assert_eq!(labels.get("outcome"), Some("SUCCESS"));
        assert_eq!(labels.get("appName"), Some("canals"));
        assert_eq!(labels.len(), 5);
    }
}
