//! Dynamic value evaluation seam.
//!
//! The runtime computes bodies, headers and parameter values through a
//! scripting engine the conduit does not own. This module defines the
//! collaborator trait and the value types exchanged with it; the conduit
//! never interprets script content itself, and an evaluation failure is
//! treated as a processing error by the caller.

use std::collections::HashMap;

use bytes::Bytes;
use thiserror::Error;

/// A value that is either a literal or a script expression resolved by
/// the evaluator at request time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DynamicValue {
    Literal(String),
    Script(String),
}

impl DynamicValue {
    pub fn literal(value: impl Into<String>) -> Self {
        DynamicValue::Literal(value.into())
    }

    pub fn script(expression: impl Into<String>) -> Self {
        DynamicValue::Script(expression.into())
    }
}

/// The message flowing through the integration flow, as seen by the
/// evaluator: a payload plus named attributes.
#[derive(Debug, Clone, Default)]
pub struct Message {
    pub payload: Bytes,
    pub attributes: HashMap<String, String>,
}

impl Message {
    pub fn with_payload(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            attributes: HashMap::new(),
        }
    }
}

/// Evaluation failure reported by the collaborator.
#[derive(Debug, Clone, Error)]
#[error("evaluation failed: {0}")]
pub struct EvalError(pub String);

/// The scripting collaborator. Implementations live outside this crate;
/// [`LiteralEvaluator`] covers flows with no dynamic values.
pub trait Evaluator: Send + Sync {
    /// Resolve a single value against the current message.
    fn evaluate(&self, value: &DynamicValue, message: &Message) -> Result<String, EvalError>;

    /// Resolve a whole map, e.g. header or parameter maps.
    fn evaluate_map(
        &self,
        values: &HashMap<String, DynamicValue>,
        message: &Message,
    ) -> Result<HashMap<String, String>, EvalError> {
        let mut resolved = HashMap::with_capacity(values.len());
        for (name, value) in values {
            resolved.insert(name.clone(), self.evaluate(value, message)?);
        }
        Ok(resolved)
    }
}

/// Pass-through evaluator: literals resolve to themselves, scripts are
/// rejected because no engine is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralEvaluator;

impl Evaluator for LiteralEvaluator {
    fn evaluate(&self, value: &DynamicValue, _message: &Message) -> Result<String, EvalError> {
        match value {
            DynamicValue::Literal(v) => Ok(v.clone()),
            DynamicValue::Script(expr) => Err(EvalError(format!(
                "no script engine attached, cannot evaluate '{}'",
                expr
            ))),
        }
    }
}
