//! Inbound request handler contract.
//!
//! Handlers are user flow logic: the listener resolves a route, builds
//! an [`InboundRequest`] with extracted parameters, and hands it to the
//! bound handler. Whatever the handler returns becomes the HTTP response.

use std::sync::Arc;

use axum::http::{HeaderMap, Method, StatusCode};
use bytes::Bytes;
use futures_util::future::BoxFuture;

use crate::routing::{PathParams, QueryParams};

/// One inbound HTTP request, after route resolution.
#[derive(Debug)]
pub struct InboundRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    /// Path variables bound by the matched template, declaration order.
    pub path_params: PathParams,
    /// Parsed query string, repeated keys preserved.
    pub query_params: QueryParams,
    pub body: Bytes,
}

/// The response a handler produces.
#[derive(Debug)]
pub struct InboundResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl InboundResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// 200 with the given body.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: axum::http::HeaderName, value: axum::http::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// User-supplied processing logic bound to a route.
pub trait RouteHandler: Send + Sync + 'static {
    fn handle(&self, request: InboundRequest) -> BoxFuture<'static, InboundResponse>;
}

/// Shared handler reference stored in the route table.
pub type DynRouteHandler = Arc<dyn RouteHandler>;

struct FnHandler<F>(F);

impl<F, Fut> RouteHandler for FnHandler<F>
where
    F: Fn(InboundRequest) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = InboundResponse> + Send + 'static,
{
    fn handle(&self, request: InboundRequest) -> BoxFuture<'static, InboundResponse> {
        Box::pin((self.0)(request))
    }
}

/// Wrap an async closure as a route handler.
pub fn handler_fn<F, Fut>(f: F) -> DynRouteHandler
where
    F: Fn(InboundRequest) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = InboundResponse> + Send + 'static,
{
    Arc::new(FnHandler(f))
}
