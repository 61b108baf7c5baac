//! Rule pattern compilation and matching
//!
//! A rule string is compiled once, at registration, into a sequence of
//! literal segments and variable slots. Four variable spellings are
//! recognized: `:name` (required), `[:name]` (optional), `<name>` (required)
//! and `<name?>` (optional). The `<name>` form may also sit inside literal
//! text (`item-<id>`).
//!
//! Matching is literal-segment equality interleaved with variable capture;
//! it returns `None` on mismatch so the caller can try the next sibling.

use crate::error::RouteError;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

/// Whether a variable slot must be present in the matched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Required,
    Optional,
}

/// One compiled element of a rule string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal path segment.
    Literal(String),
    /// Whole-segment variable slot.
    Var { name: String, kind: VarKind },
    /// `<name>` slot embedded between literal text, e.g. `item-<id>`.
    Embedded {
        prefix: String,
        name: String,
        suffix: String,
        kind: VarKind,
    },
}

impl Segment {
    fn var(&self) -> Option<(&str, VarKind)> {
        match self {
            Segment::Literal(_) => None,
            Segment::Var { name, kind } | Segment::Embedded { name, kind, .. } => {
                Some((name.as_str(), *kind))
            }
        }
    }
}

/// Per-variable constraint rules, compiled and anchored.
pub(crate) type ConstraintMap = HashMap<String, Arc<Regex>>;

/// Compile a variable constraint, anchoring it to the full capture.
pub(crate) fn compile_constraint(name: &str, rule: &str) -> Result<Arc<Regex>, RouteError> {
    Regex::new(&format!("^(?:{rule})$"))
        .map(Arc::new)
        .map_err(|e| RouteError::InvalidPattern {
            rule: name.to_string(),
            detail: e.to_string(),
        })
}

/// A compiled rule pattern.
#[derive(Debug, Clone, Default)]
pub struct Pattern {
    rule: String,
    segments: Vec<Segment>,
    vars: Vec<(String, VarKind)>,
}

impl Pattern {
    /// Compile a rule string.
    ///
    /// # Examples
    /// ```
    /// use junction_router::pattern::{Pattern, VarKind};
    ///
    /// let pattern = Pattern::compile("blog/:id/[:page]").unwrap();
    /// assert_eq!(
    ///     pattern.vars(),
    ///     &[
    ///         ("id".to_string(), VarKind::Required),
    ///         ("page".to_string(), VarKind::Optional),
    ///     ]
    /// );
    /// ```
    pub fn compile(rule: &str) -> Result<Self, RouteError> {
        let rule = rule.trim_matches('/');
        let mut segments = Vec::new();
        let mut vars: Vec<(String, VarKind)> = Vec::new();

        if !rule.is_empty() {
            for raw in rule.split('/') {
                let segment = classify_segment(raw);
                if let Some((name, kind)) = segment.var() {
                    if name.is_empty() {
                        return Err(RouteError::InvalidPattern {
                            rule: rule.to_string(),
                            detail: "empty variable name".to_string(),
                        });
                    }
                    if vars.iter().any(|(n, _)| n == name) {
                        return Err(RouteError::InvalidPattern {
                            rule: rule.to_string(),
                            detail: format!("duplicate variable :{name}"),
                        });
                    }
                    vars.push((name.to_string(), kind));
                }
                segments.push(segment);
            }
        }

        Ok(Self {
            rule: rule.to_string(),
            segments,
            vars,
        })
    }

    /// The normalized rule string this pattern was compiled from.
    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// Variable slots in evaluation order.
    pub fn vars(&self) -> &[(String, VarKind)] {
        &self.vars
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Match against path segments.
    ///
    /// Returns captured variables (in slot order) and the number of consumed
    /// segments. `complete` requires the whole path to be consumed. An empty
    /// pattern matches only the empty residual path.
    pub(crate) fn match_segments(
        &self,
        path: &[&str],
        complete: bool,
        constraints: &ConstraintMap,
    ) -> Option<(Vec<(String, String)>, usize)> {
        if self.segments.is_empty() {
            return if path.is_empty() {
                Some((Vec::new(), 0))
            } else {
                None
            };
        }

        let mut captured = Vec::new();
        let mut consumed = 0usize;

        for segment in &self.segments {
            match segment {
                Segment::Literal(lit) => {
                    if path.get(consumed).copied() != Some(lit.as_str()) {
                        return None;
                    }
                    consumed += 1;
                }
                Segment::Var { name, kind } => match path.get(consumed) {
                    Some(value) => {
                        if !constraint_ok(constraints, name, value) {
                            return None;
                        }
                        captured.push((name.clone(), value.to_string()));
                        consumed += 1;
                    }
                    None if *kind == VarKind::Optional => {}
                    None => return None,
                },
                Segment::Embedded {
                    prefix,
                    name,
                    suffix,
                    kind,
                } => match path.get(consumed) {
                    Some(raw) => {
                        let value = raw
                            .strip_prefix(prefix.as_str())
                            .and_then(|v| v.strip_suffix(suffix.as_str()))?;
                        if !constraint_ok(constraints, name, value) {
                            return None;
                        }
                        captured.push((name.clone(), value.to_string()));
                        consumed += 1;
                    }
                    None if *kind == VarKind::Optional => {}
                    None => return None,
                },
            }
        }

        if complete && consumed < path.len() {
            return None;
        }

        Some((captured, consumed))
    }
}

fn constraint_ok(constraints: &ConstraintMap, name: &str, value: &str) -> bool {
    constraints.get(name).map_or(true, |re| re.is_match(value))
}

/// Classify one raw segment of a rule string.
pub(crate) fn classify_segment(raw: &str) -> Segment {
    if let Some(name) = raw.strip_prefix("[:").and_then(|s| s.strip_suffix(']')) {
        return Segment::Var {
            name: name.to_string(),
            kind: VarKind::Optional,
        };
    }

    if let Some(name) = raw.strip_prefix(':') {
        return Segment::Var {
            name: name.to_string(),
            kind: VarKind::Required,
        };
    }

    if let Some(inner) = raw.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
        if !inner.contains('<') && !inner.contains('>') {
            let (name, kind) = match inner.strip_suffix('?') {
                Some(name) => (name, VarKind::Optional),
                None => (inner, VarKind::Required),
            };
            return Segment::Var {
                name: name.to_string(),
                kind,
            };
        }
    }

    // Embedded <name> between literal text.
    if let (Some(start), Some(end)) = (raw.find('<'), raw.find('>')) {
        if start < end {
            let inner = &raw[start + 1..end];
            let (name, kind) = match inner.strip_suffix('?') {
                Some(name) => (name, VarKind::Optional),
                None => (inner, VarKind::Required),
            };
            if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Segment::Embedded {
                    prefix: raw[..start].to_string(),
                    name: name.to_string(),
                    suffix: raw[end + 1..].to_string(),
                    kind,
                };
            }
        }
    }

    Segment::Literal(raw.to_string())
}

/// Scan a rule string for variable tokens, in order. Used by the name
/// registry, which needs the variable list without a full compile.
pub fn parse_vars(rule: &str) -> Vec<(String, VarKind)> {
    let mut vars = Vec::new();
    for raw in rule.trim_matches('/').split('/') {
        if let Some((name, kind)) = classify_segment(raw).var() {
            if !vars.iter().any(|(n, _): &(String, VarKind)| n == name) {
                vars.push((name.to_string(), kind));
            }
        }
    }
    vars
}
