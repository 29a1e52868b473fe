//! Path template compilation and matching.
//!
//! # Responsibilities
//! - Parse path templates into literal / variable / regex segments
//! - Classify a request path as exact match, template match or no match
//! - Extract path variables in declaration order
//!
//! # Design Decisions
//! - Templates compile once at registration; malformed templates fail
//!   there, never at request time
//! - `{name}` binds exactly one segment, URL-decoded
//! - `{name:regex}` matches the remainder of the path and must be the
//!   last segment of the template
//! - A single trailing `/` is tolerated on both template and path

use percent_encoding::percent_decode_str;
use regex::Regex;
use thiserror::Error;

/// Error raised while compiling a path template.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("path template '{0}' must start with '/'")]
    MissingLeadingSlash(String),

    #[error("unbalanced '{{' or '}}' in path template '{0}'")]
    UnbalancedBrace(String),

    #[error("empty variable name in path template '{0}'")]
    EmptyVariable(String),

    #[error("invalid regex for variable '{name}': {source}")]
    InvalidRegex {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("regex variable '{0}' must be the last segment of the template")]
    RegexNotTerminal(String),
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Variable(String),
    /// Regex-qualified variable; matches the whole remainder of the path.
    Pattern { name: String, regex: Regex },
}

/// A path template compiled into an ordered segment sequence. Immutable
/// after compilation.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    raw: String,
    segments: Vec<Segment>,
    variable_names: Vec<String>,
}

/// Outcome of matching one request path against one template.
#[derive(Debug, Clone, PartialEq)]
pub enum MatcherResult {
    NoMatch,
    /// Matched through variable segments; carries `(name, value)` pairs
    /// in declaration order.
    TemplateMatch(Vec<(String, String)>),
    ExactMatch,
}

impl CompiledTemplate {
    /// Compile a raw template. Empty string denotes the root path.
    pub fn compile(raw: &str) -> Result<Self, TemplateError> {
        if raw.is_empty() {
            return Ok(Self {
                raw: String::new(),
                segments: Vec::new(),
                variable_names: Vec::new(),
            });
        }
        if !raw.starts_with('/') {
            return Err(TemplateError::MissingLeadingSlash(raw.to_string()));
        }

        let trimmed = raw.strip_suffix('/').unwrap_or(raw);
        let mut segments = Vec::new();
        let mut variable_names = Vec::new();

        let parts: Vec<&str> = trimmed.split('/').skip(1).collect();
        let last = parts.len().saturating_sub(1);
        for (i, part) in parts.iter().enumerate() {
            if part.starts_with('{') {
                let inner = part
                    .strip_prefix('{')
                    .and_then(|p| p.strip_suffix('}'))
                    .ok_or_else(|| TemplateError::UnbalancedBrace(raw.to_string()))?;
                match inner.split_once(':') {
                    None => {
                        if inner.is_empty() {
                            return Err(TemplateError::EmptyVariable(raw.to_string()));
                        }
                        variable_names.push(inner.to_string());
                        segments.push(Segment::Variable(inner.to_string()));
                    }
                    Some((name, pattern)) => {
                        if name.is_empty() {
                            return Err(TemplateError::EmptyVariable(raw.to_string()));
                        }
                        if i != last {
                            return Err(TemplateError::RegexNotTerminal(name.to_string()));
                        }
                        let anchored = format!("^(?:{})$", pattern);
                        let regex =
                            Regex::new(&anchored).map_err(|source| TemplateError::InvalidRegex {
                                name: name.to_string(),
                                source,
                            })?;
                        variable_names.push(name.to_string());
                        segments.push(Segment::Pattern {
                            name: name.to_string(),
                            regex,
                        });
                    }
                }
            } else if part.contains('{') || part.contains('}') {
                return Err(TemplateError::UnbalancedBrace(raw.to_string()));
            } else {
                segments.push(Segment::Literal((*part).to_string()));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
            variable_names,
        })
    }

    /// The template string as registered.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Declared variable names, in declaration order.
    pub fn variable_names(&self) -> &[String] {
        &self.variable_names
    }

    /// Whether the template consists of literal segments only.
    pub fn is_literal(&self) -> bool {
        self.variable_names.is_empty()
    }

    /// Match a request path (without query string) against this template.
    pub fn match_path(&self, path: &str) -> MatcherResult {
        if self.is_literal() {
            return if literal_paths_equal(&self.raw, path) {
                MatcherResult::ExactMatch
            } else {
                MatcherResult::NoMatch
            };
        }

        let trimmed = strip_trailing_slash(path);
        let path_segments: Vec<&str> = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.split('/').skip(1).collect()
        };

        let mut params = Vec::with_capacity(self.variable_names.len());
        let mut cursor = 0usize;

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(expected) => {
                    match path_segments.get(cursor) {
                        Some(actual) if *actual == expected.as_str() => cursor += 1,
                        _ => return MatcherResult::NoMatch,
                    }
                }
                Segment::Variable(name) => match path_segments.get(cursor) {
                    Some(actual) if !actual.is_empty() => {
                        params.push((name.clone(), decode_segment(actual)));
                        cursor += 1;
                    }
                    _ => return MatcherResult::NoMatch,
                },
                Segment::Pattern { name, regex } => {
                    // Terminal by construction; consumes the remainder.
                    debug_assert_eq!(i, self.segments.len() - 1);
                    if cursor >= path_segments.len() {
                        return MatcherResult::NoMatch;
                    }
                    let remainder = path_segments[cursor..].join("/");
                    if !regex.is_match(&remainder) {
                        return MatcherResult::NoMatch;
                    }
                    params.push((name.clone(), decode_segment(&remainder)));
                    cursor = path_segments.len();
                }
            }
        }

        if cursor != path_segments.len() {
            return MatcherResult::NoMatch;
        }
        MatcherResult::TemplateMatch(params)
    }
}

/// Literal comparison tolerating a single optional trailing `/` and
/// treating the empty template as the root path.
fn literal_paths_equal(template: &str, path: &str) -> bool {
    let t = strip_trailing_slash(template);
    let p = strip_trailing_slash(path);
    t == p
}

fn strip_trailing_slash(path: &str) -> &str {
    if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else if path == "/" {
        ""
    } else {
        path
    }
}

fn decode_segment(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}
