//! Name registry and reverse URL generation
//!
//! Every named rule is indexed at registration time — never by re-walking
//! the rule tree. Multiple rules may share a name; candidates are tried in
//! registration order (insert-first supported), and the first whose required
//! variables are all supplied wins.
//!
//! The registry is DashMap-backed: lazy group expansion may append entries
//! while lookups are in flight.

use crate::error::RouteError;
use crate::pattern::{classify_segment, Segment, VarKind};
use dashmap::DashMap;
use junction_dispatch::Params;
use tracing::trace;

/// One reverse-lookup candidate, captured at registration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameEntry {
    /// Full rule string, including group prefixes.
    pub rule: String,
    /// Variable slots of the rule, in order.
    pub vars: Vec<(String, VarKind)>,
    /// Domain the rule was registered under.
    pub domain: String,
    /// URL suffix to append to generated paths.
    pub suffix: Option<String>,
}

/// Lowercased rule name → ordered candidate list.
#[derive(Debug, Default)]
pub struct NameRegistry {
    names: DashMap<String, Vec<NameEntry>>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self {
            names: DashMap::new(),
        }
    }

    /// Register a candidate under a name. `first` inserts it ahead of
    /// already-registered candidates instead of after them.
    pub fn register(&self, name: &str, entry: NameEntry, first: bool) {
        let name = name.to_lowercase();
        trace!(%name, rule = %entry.rule, "registered rule name");
        let mut entries = self.names.entry(name).or_default();
        if first {
            entries.insert(0, entry);
        } else {
            entries.push(entry);
        }
    }

    /// All candidates registered under a name.
    pub fn get(&self, name: &str) -> Option<Vec<NameEntry>> {
        self.names
            .get(&name.to_lowercase())
            .map(|entries| entries.value().clone())
    }

    /// Select the first candidate whose required variables are all present
    /// in `vars`.
    pub fn lookup(&self, name: &str, vars: &Params) -> Result<NameEntry, RouteError> {
        let entries = self
            .names
            .get(&name.to_lowercase())
            .ok_or_else(|| RouteError::NameNotFound {
                name: name.to_string(),
            })?;

        entries
            .iter()
            .find(|entry| {
                entry
                    .vars
                    .iter()
                    .filter(|(_, kind)| *kind == VarKind::Required)
                    .all(|(var, _)| vars.contains(var))
            })
            .cloned()
            .ok_or_else(|| RouteError::UnsatisfiedVariables {
                name: name.to_string(),
            })
    }

    /// Substitute variables into a candidate rule. Optional variables absent
    /// from `vars` are omitted from the generated path.
    pub fn build(entry: &NameEntry, vars: &Params) -> String {
        let mut segments: Vec<String> = Vec::new();
        for raw in entry.rule.trim_matches('/').split('/') {
            if raw.is_empty() {
                continue;
            }
            match classify_segment(raw) {
                Segment::Literal(literal) => segments.push(literal),
                Segment::Var { name, .. } => {
                    if let Some(value) = vars.get(&name) {
                        segments.push(value.to_string());
                    }
                }
                Segment::Embedded {
                    prefix,
                    name,
                    suffix,
                    ..
                } => {
                    if let Some(value) = vars.get(&name) {
                        segments.push(format!("{prefix}{value}{suffix}"));
                    }
                }
            }
        }

        let mut path = segments.join("/");
        if let Some(suffix) = &entry.suffix {
            if let Some(first) = suffix.split('|').next() {
                if !path.is_empty() && !first.is_empty() {
                    path = format!("{path}.{first}");
                }
            }
        }
        path
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
