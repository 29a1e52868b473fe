//! HTTP listener: one socket, one route table.
//!
//! # Responsibilities
//! - Own the route table for one listening socket
//! - Register/deregister endpoint bindings as flows start and stop
//! - Dispatch every inbound request through the table exactly once
//! - Answer unmatched requests with 404, multipart misuse with 500
//!
//! # Design Decisions
//! - A single axum catch-all route feeds the conduit's own route table;
//!   precedence lives in the table, not in the framework router
//! - Multipart bodies are accepted only for POST over HTTP/1.1; anything
//!   else is a dedicated error, never silently dropped

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, Method, Request, StatusCode, Version},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ListenerConfig;
use crate::observability::metrics;
use crate::routing::{QueryParams, RouteError, RouteTable};
use crate::server::handler::{DynRouteHandler, InboundRequest};

/// Route table specialized to inbound handlers.
pub type ListenerRoutes = RouteTable<DynRouteHandler>;

/// One inbound HTTP endpoint (host:port) hosting multiple bindings.
pub struct HttpListener {
    config: ListenerConfig,
    routes: Arc<ListenerRoutes>,
}

#[derive(Clone)]
struct ListenerState {
    routes: Arc<ListenerRoutes>,
    max_request_size: usize,
}

impl HttpListener {
    pub fn new(config: ListenerConfig) -> Self {
        Self {
            config,
            routes: Arc::new(RouteTable::new()),
        }
    }

    /// The route table owned by this listener. Endpoints registered here
    /// are visible to in-flight dispatching immediately.
    pub fn routes(&self) -> &Arc<ListenerRoutes> {
        &self.routes
    }

    /// Bind a (method, path template, handler) triple.
    pub fn register(
        &self,
        method: Method,
        path: &str,
        handler: DynRouteHandler,
    ) -> Result<(), RouteError> {
        self.routes.add(method, path, handler)
    }

    /// Remove a binding; absent bindings are tolerated so endpoint
    /// shutdown stays idempotent.
    pub fn deregister(&self, method: &Method, path: &str) {
        self.routes.remove(method, path);
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// Serve requests on the given socket until shutdown.
    pub async fn serve(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "http listener starting");

        let app = self.router();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!(address = %addr, "http listener stopped");
        Ok(())
    }

    /// Build the axum router: a catch-all feeding the route table.
    fn router(&self) -> Router {
        let state = ListenerState {
            routes: self.routes.clone(),
            max_request_size: self.config.max_request_size,
        };
        Router::new()
            .route("/{*path}", any(dispatch))
            .route("/", any(dispatch))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.config.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http())
    }
}

/// Resolve the request against the route table and run the bound handler.
async fn dispatch(State(state): State<ListenerState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let version = request.version();
    let path = request.uri().path().to_string();
    let raw_query = request.uri().query().unwrap_or("").to_string();

    let matched = match state.routes.resolve(&method, &path) {
        Some(m) => m,
        None => {
            // Absence of a match is a normal outcome, not a server error.
            tracing::debug!(method = %method, path = %path, "no route matched");
            metrics::record_inbound(method.as_str(), 404, start);
            return (StatusCode::NOT_FOUND, "Not Found").into_response();
        }
    };

    // Multipart bodies are only supported for POST over HTTP/1.1.
    if is_multipart(&request) && !(method == Method::POST && version == Version::HTTP_11) {
        tracing::warn!(method = %method, path = %path, "multipart body on unsupported method");
        metrics::record_inbound(method.as_str(), 500, start);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "multipart content is only supported for POST requests over HTTP/1.1",
        )
            .into_response();
    }

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_request_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(method = %method, path = %path, error = %e, "failed to read request body");
            metrics::record_inbound(method.as_str(), 413, start);
            return (StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large").into_response();
        }
    };

    let inbound = InboundRequest {
        method: method.clone(),
        path,
        headers: parts.headers,
        path_params: matched.path_params,
        query_params: QueryParams::parse(&raw_query),
        body,
    };

    let response = matched.binding.handler.handle(inbound).await;
    metrics::record_inbound(method.as_str(), response.status.as_u16(), start);

    let mut builder = Response::builder().status(response.status);
    if let Some(headers) = builder.headers_mut() {
        for (name, value) in response.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }
    }
    builder
        .body(Body::from(response.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn is_multipart(request: &Request<Body>) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.to_ascii_lowercase().starts_with("multipart/"))
        .unwrap_or(false)
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
