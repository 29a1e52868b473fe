//! Route table: method + path-template bindings for one listener socket.
//!
//! # Responsibilities
//! - Register and remove bindings as endpoints start and stop
//! - Resolve an inbound request to exactly one binding, or none
//! - Apply precedence: exact match beats template match; overlapping
//!   template matches fall back to registration order
//!
//! # Design Decisions
//! - Copy-on-write binding list (arc-swap): `resolve` loads a snapshot
//!   and never blocks the I/O threads, mutations swap a new list in
//! - Duplicate literal `(method, path)` registrations are rejected at
//!   `add` time, so at most one exact match can exist at resolve time
//! - First-registered-wins for overlapping templates is intentional,
//!   observable behavior; changing it would silently re-route traffic

use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use axum::http::Method;
use thiserror::Error;

use crate::routing::params::PathParams;
use crate::routing::template::{CompiledTemplate, MatcherResult, TemplateError};

/// Error raised while registering a route.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("a route for {method} '{path}' is already registered")]
    DuplicateRoute { method: Method, path: String },

    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// One (method, template, handler) binding.
#[derive(Debug)]
pub struct RouteBinding<H> {
    pub method: Method,
    pub template: CompiledTemplate,
    pub handler: H,
}

/// A resolved route: the binding plus extracted path parameters.
#[derive(Debug)]
pub struct RouteMatch<H> {
    pub binding: Arc<RouteBinding<H>>,
    pub path_params: PathParams,
}

/// The set of active bindings for one listener socket.
pub struct RouteTable<H> {
    bindings: ArcSwap<Vec<Arc<RouteBinding<H>>>>,
    // Serializes add/remove; resolve reads lock-free snapshots.
    write: Mutex<()>,
}

impl<H> Default for RouteTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> RouteTable<H> {
    pub fn new() -> Self {
        Self {
            bindings: ArcSwap::from_pointee(Vec::new()),
            write: Mutex::new(()),
        }
    }

    /// Register a binding. The new route is visible to concurrent
    /// `resolve` calls as soon as this returns.
    pub fn add(&self, method: Method, path: &str, handler: H) -> Result<(), RouteError> {
        let template = CompiledTemplate::compile(path)?;

        let _guard = self.write.lock().expect("route table lock poisoned");
        let current = self.bindings.load();

        if template.is_literal() {
            let duplicate = current.iter().any(|b| {
                b.method == method
                    && b.template.is_literal()
                    && literal_equal(b.template.raw(), template.raw())
            });
            if duplicate {
                return Err(RouteError::DuplicateRoute {
                    method,
                    path: path.to_string(),
                });
            }
        }

        let mut next: Vec<Arc<RouteBinding<H>>> = current.iter().cloned().collect();
        next.push(Arc::new(RouteBinding {
            method: method.clone(),
            template,
            handler,
        }));
        self.bindings.store(Arc::new(next));

        tracing::debug!(method = %method, path = %path, "route registered");
        Ok(())
    }

    /// Remove the binding for `(method, path)`. Removing an absent
    /// binding is a no-op so shutdown stays idempotent.
    pub fn remove(&self, method: &Method, path: &str) {
        let _guard = self.write.lock().expect("route table lock poisoned");
        let current = self.bindings.load();

        let next: Vec<Arc<RouteBinding<H>>> = current
            .iter()
            .filter(|b| !(b.method == *method && b.template.raw() == path))
            .cloned()
            .collect();

        if next.len() != current.len() {
            tracing::debug!(method = %method, path = %path, "route removed");
            self.bindings.store(Arc::new(next));
        }
    }

    /// Resolve a request to a binding. An exact match wins over any
    /// template match; among template matches the first registered wins.
    /// No match is a normal outcome, not an error.
    pub fn resolve(&self, method: &Method, path: &str) -> Option<RouteMatch<H>> {
        let snapshot = self.bindings.load();
        let mut first_template: Option<RouteMatch<H>> = None;

        for binding in snapshot.iter() {
            if binding.method != *method {
                continue;
            }
            match binding.template.match_path(path) {
                MatcherResult::ExactMatch => {
                    return Some(RouteMatch {
                        binding: binding.clone(),
                        path_params: PathParams::default(),
                    });
                }
                MatcherResult::TemplateMatch(params) => {
                    if first_template.is_none() {
                        first_template = Some(RouteMatch {
                            binding: binding.clone(),
                            path_params: PathParams::new(params),
                        });
                    }
                }
                MatcherResult::NoMatch => {}
            }
        }

        first_template
    }

    /// Number of active bindings.
    pub fn len(&self) -> usize {
        self.bindings.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn literal_equal(a: &str, b: &str) -> bool {
    let strip = |s: &str| -> String {
        if s.len() > 1 {
            s.strip_suffix('/').unwrap_or(s).to_string()
        } else if s == "/" {
            String::new()
        } else {
            s.to_string()
        }
    };
    strip(a) == strip(b)
}
