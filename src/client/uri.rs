//! Outbound request URI construction.
//!
//! Expands a base URL plus a path template with dynamic path and query
//! parameters resolved through the evaluator collaborator. When both
//! parameter maps are empty there is nothing to evaluate and the URI is
//! built directly.

use std::collections::HashMap;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::Url;
use thiserror::Error;

use crate::eval::{DynamicValue, EvalError, Evaluator, Message};

/// Error raised while resolving a request URI.
#[derive(Debug, Error)]
pub enum UriError {
    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("invalid request url '{url}': {source}")]
    Invalid {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("path parameter '{0}' has no configured value")]
    MissingPathParameter(String),
}

/// Builds request URIs for one outbound endpoint.
#[derive(Debug, Default)]
pub struct UriEvaluator {
    base_url: String,
    path: String,
    path_parameters: HashMap<String, DynamicValue>,
    query_parameters: HashMap<String, DynamicValue>,
}

impl UriEvaluator {
    pub fn new(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            path: path.into(),
            path_parameters: HashMap::new(),
            query_parameters: HashMap::new(),
        }
    }

    pub fn with_path_parameters(mut self, params: HashMap<String, DynamicValue>) -> Self {
        self.path_parameters = params;
        self
    }

    pub fn with_query_parameters(mut self, params: HashMap<String, DynamicValue>) -> Self {
        self.query_parameters = params;
        self
    }

    /// Resolve the request URI for the given message.
    pub fn resolve(&self, evaluator: &dyn Evaluator, message: &Message) -> Result<Url, UriError> {
        // Nothing to evaluate when both maps are empty.
        let expanded = if self.path_parameters.is_empty() && self.query_parameters.is_empty() {
            self.path.clone()
        } else {
            let path_values = evaluator.evaluate_map(&self.path_parameters, message)?;
            let query_values = evaluator.evaluate_map(&self.query_parameters, message)?;
            self.expand(&path_values, &query_values)?
        };

        let full = format!("{}{}", self.base_url, expanded);
        Url::parse(&full).map_err(|source| UriError::Invalid { url: full, source })
    }

    fn expand(
        &self,
        path_values: &HashMap<String, String>,
        query_values: &HashMap<String, String>,
    ) -> Result<String, UriError> {
        let mut path = String::new();
        let mut rest = self.path.as_str();

        while let Some(open) = rest.find('{') {
            path.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) => {
                    let name = &after[..close];
                    let value = path_values
                        .get(name)
                        .ok_or_else(|| UriError::MissingPathParameter(name.to_string()))?;
                    path.push_str(&utf8_percent_encode(value, NON_ALPHANUMERIC).to_string());
                    rest = &after[close + 1..];
                }
                None => {
                    path.push_str(rest);
                    rest = "";
                }
            }
        }
        path.push_str(rest);

        if !query_values.is_empty() {
            let mut serializer = url::form_urlencoded::Serializer::new(String::new());
            let mut names: Vec<&String> = query_values.keys().collect();
            names.sort();
            for name in names {
                serializer.append_pair(name, &query_values[name]);
            }
            path.push('?');
            path.push_str(&serializer.finish());
        }

        Ok(path)
    }
}
