//! Rule group: ordered container of rules and nested groups
//!
//! A group owns its children exclusively and cascades its options and
//! variable constraints to them at match time. Groups registered with a
//! closure (or as a REST resource) carry a deferred payload expanded at most
//! once, on the first match attempt, under a per-group guard.

use crate::error::RouteError;
use crate::options::RuleOptions;
use crate::pattern::{compile_constraint, ConstraintMap, Pattern};
use crate::resource::ResourceSpec;
use crate::router::{Registrar, Shared};
use crate::rule::RuleItem;
use junction_dispatch::{Dispatch, DispatchDecision, Params, UrlDispatch};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock, Weak};
use tracing::debug;

/// Shared context threaded through a match walk.
pub(crate) struct CheckCtx<'a> {
    pub(crate) shared: &'a Arc<Shared>,
    /// Lowercased request method.
    pub(crate) method: &'a str,
}

/// One child of a rule group.
#[derive(Debug, Clone)]
pub enum RouteEntry {
    Rule(RuleItem),
    Group(RuleGroup),
}

/// Registration work deferred until the group's first match attempt.
pub(crate) enum Deferred {
    Rules(Box<dyn FnOnce(&mut Registrar) + Send>),
    Resource(ResourceSpec),
}

pub(crate) struct GroupInner {
    name: String,
    full_name: String,
    pattern: Pattern,
    options: RwLock<RuleOptions>,
    patterns: RwLock<ConstraintMap>,
    children: RwLock<Vec<RouteEntry>>,
    /// method → child indices, for O(1) bucketing; groups index under `*`.
    index: RwLock<HashMap<String, Vec<usize>>>,
    deferred: Mutex<Option<Deferred>>,
    miss: RwLock<Option<RuleItem>>,
    auto: RwLock<Option<RuleItem>>,
    domain: String,
    shared: Weak<Shared>,
}

/// A composite routing node. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct RuleGroup {
    inner: Arc<GroupInner>,
}

impl fmt::Debug for RuleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleGroup")
            .field("full_name", &self.inner.full_name)
            .field("children", &self.rule_count())
            .finish()
    }
}

impl RuleGroup {
    pub(crate) fn new(
        name: &str,
        parent_full: &str,
        shared: Weak<Shared>,
        domain: String,
    ) -> Result<Self, RouteError> {
        let pattern = Pattern::compile(name)?;
        let full_name = join_rule(parent_full, pattern.rule());
        Ok(Self {
            inner: Arc::new(GroupInner {
                name: pattern.rule().to_string(),
                full_name,
                pattern,
                options: RwLock::new(RuleOptions::default()),
                patterns: RwLock::new(ConstraintMap::new()),
                children: RwLock::new(Vec::new()),
                index: RwLock::new(HashMap::new()),
                deferred: Mutex::new(None),
                miss: RwLock::new(None),
                auto: RwLock::new(None),
                domain,
                shared,
            }),
        })
    }

    /// Root group of a domain: no name pattern of its own.
    pub(crate) fn root(shared: Weak<Shared>, domain: String) -> Self {
        Self {
            inner: Arc::new(GroupInner {
                name: String::new(),
                full_name: String::new(),
                pattern: Pattern::default(),
                options: RwLock::new(RuleOptions::default()),
                patterns: RwLock::new(ConstraintMap::new()),
                children: RwLock::new(Vec::new()),
                index: RwLock::new(HashMap::new()),
                deferred: Mutex::new(None),
                miss: RwLock::new(None),
                auto: RwLock::new(None),
                domain,
                shared,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Group name including every ancestor prefix.
    pub fn full_name(&self) -> &str {
        &self.inner.full_name
    }

    pub fn domain(&self) -> &str {
        &self.inner.domain
    }

    /// Number of direct children currently installed. Deferred payloads do
    /// not count until expanded.
    pub fn rule_count(&self) -> usize {
        self.inner.children.read().unwrap().len()
    }

    pub fn options(&self) -> RuleOptions {
        self.inner.options.read().unwrap().clone()
    }

    pub(crate) fn options_ext(&self) -> Option<String> {
        self.inner.options.read().unwrap().ext.clone()
    }

    pub(crate) fn add_rule(&self, rule: RuleItem, method: &str) {
        let mut children = self.inner.children.write().unwrap();
        let position = children.len();
        children.push(RouteEntry::Rule(rule));
        drop(children);
        self.inner
            .index
            .write()
            .unwrap()
            .entry(method.to_lowercase())
            .or_default()
            .push(position);
    }

    pub(crate) fn add_group(&self, group: RuleGroup) {
        let mut children = self.inner.children.write().unwrap();
        let position = children.len();
        children.push(RouteEntry::Group(group));
        drop(children);
        self.inner
            .index
            .write()
            .unwrap()
            .entry("*".to_string())
            .or_default()
            .push(position);
    }

    pub(crate) fn set_deferred(&self, deferred: Deferred) {
        *self.inner.deferred.lock().unwrap() = Some(deferred);
    }

    pub(crate) fn set_miss(&self, rule: RuleItem) {
        *self.inner.miss.write().unwrap() = Some(rule);
    }

    pub(crate) fn set_auto(&self, rule: RuleItem) {
        *self.inner.auto.write().unwrap() = Some(rule);
    }

    // Fluent option setters, cascading to children at match time.

    pub fn ext(&self, ext: &str) -> &Self {
        self.inner.options.write().unwrap().ext = Some(ext.to_string());
        self
    }

    pub fn merge_slashes(&self, on: bool) -> &Self {
        self.inner.options.write().unwrap().merge_slashes = Some(on);
        self
    }

    pub fn convert(&self, on: bool) -> &Self {
        self.inner.options.write().unwrap().convert = Some(on);
        self
    }

    pub fn complete_match(&self, on: bool) -> &Self {
        self.inner.options.write().unwrap().complete_match = Some(on);
        self
    }

    pub fn route_params_first(&self, on: bool) -> &Self {
        self.inner.options.write().unwrap().route_params_first = Some(on);
        self
    }

    /// Append default parameters for every rule in the subtree.
    pub fn append(&self, vars: &[(&str, &str)]) -> &Self {
        let mut options = self.inner.options.write().unwrap();
        for (name, value) in vars {
            options.append.insert(name.to_string(), value.to_string());
        }
        drop(options);
        self
    }

    pub fn merge_options(&self, patch: RuleOptions) -> &Self {
        let mut options = self.inner.options.write().unwrap();
        let merged = patch.merged_over(&options);
        *options = merged;
        drop(options);
        self
    }

    /// Add a variable constraint cascading to the subtree.
    pub fn pattern(&self, name: &str, rule: &str) -> Result<&Self, RouteError> {
        let compiled = compile_constraint(name, rule)?;
        self.inner
            .patterns
            .write()
            .unwrap()
            .insert(name.to_string(), compiled);
        Ok(self)
    }

    /// Also match this whole group regardless of the resolved domain.
    pub fn cross_domain(&self, on: bool) -> &Self {
        self.inner.options.write().unwrap().cross_domain = Some(on);
        if on {
            if let Some(shared) = self.inner.shared.upgrade() {
                shared.add_cross(RouteEntry::Group(self.clone()), "*");
            }
        }
        self
    }

    /// Restrict a pending REST resource to the listed actions.
    pub fn only(&self, actions: &[&str]) -> &Self {
        if let Some(Deferred::Resource(spec)) = self.inner.deferred.lock().unwrap().as_mut() {
            spec.only = Some(actions.iter().map(|a| a.to_string()).collect());
        }
        self
    }

    /// Exclude the listed actions from a pending REST resource.
    pub fn except(&self, actions: &[&str]) -> &Self {
        if let Some(Deferred::Resource(spec)) = self.inner.deferred.lock().unwrap().as_mut() {
            spec.except = Some(actions.iter().map(|a| a.to_string()).collect());
        }
        self
    }

    /// Expand the deferred payload, exactly once. Concurrent callers block
    /// on the guard until the first expansion finished installing children.
    pub(crate) fn expand(&self, ctx: &CheckCtx<'_>) {
        let mut guard = self.inner.deferred.lock().unwrap();
        if let Some(payload) = guard.take() {
            debug!(group = %self.inner.full_name, "expanding deferred rules");
            let mut registrar = Registrar::scoped(
                ctx.shared.clone(),
                self.clone(),
                self.inner.domain.clone(),
            );
            match payload {
                Deferred::Rules(rules) => rules(&mut registrar),
                Deferred::Resource(spec) => spec.install(&mut registrar),
            }
        }
    }

    /// Depth-first match through this subtree. Returns `None` when nothing
    /// matched so the parent can try the next sibling.
    pub(crate) fn check(
        &self,
        ctx: &CheckCtx<'_>,
        path: &[&str],
        inherited: &RuleOptions,
        inherited_constraints: &ConstraintMap,
        complete_default: bool,
        carried: &Params,
    ) -> Option<Dispatch> {
        // Match the group's own name pattern as a prefix, capturing its
        // variables. No backtracking past this point.
        let mut prefix_params = carried.clone();
        let consumed = if self.inner.pattern.is_empty() {
            0
        } else {
            let constraints = self.merged_constraints(inherited_constraints);
            let (captured, consumed) =
                self.inner
                    .pattern
                    .match_segments(path, false, &constraints)?;
            for (name, value) in captured {
                prefix_params.insert(name, value);
            }
            consumed
        };
        let rest = &path[consumed..];

        self.expand(ctx);

        let options = self.inner.options.read().unwrap().merged_over(inherited);
        let constraints = self.merged_constraints(inherited_constraints);

        let children = self.inner.children.read().unwrap();
        for position in self.bucket_indices(ctx.method) {
            let result = match &children[position] {
                RouteEntry::Rule(rule) => rule.check(
                    ctx,
                    rest,
                    &options,
                    &constraints,
                    complete_default,
                    &prefix_params,
                ),
                RouteEntry::Group(group) => group.check(
                    ctx,
                    rest,
                    &options,
                    &constraints,
                    complete_default,
                    &prefix_params,
                ),
            };
            if result.is_some() {
                return result;
            }
        }
        drop(children);

        // Auto rule: hand the remainder to the URL convention, prefixed
        // with the rule's target.
        if let Some(auto) = self.inner.auto.read().unwrap().clone() {
            if let Some(prefix) = auto.target().handler_str() {
                let mut path_out = prefix.trim_matches('/').to_string();
                if !rest.is_empty() {
                    if path_out.is_empty() {
                        path_out = rest.join("/");
                    } else {
                        path_out = format!("{}/{}", path_out, rest.join("/"));
                    }
                }
                let mut dispatch = Dispatch::new(
                    DispatchDecision::Url(UrlDispatch {
                        path: path_out,
                        separator: ctx.shared.config.separator.clone(),
                        auto_search: false,
                        bind: None,
                    }),
                    prefix_params,
                );
                dispatch.options = options.dispatch_options();
                return Some(dispatch);
            }
        }

        // Miss rule: selected only when nothing in the group matched.
        if let Some(miss) = self.inner.miss.read().unwrap().clone() {
            if let Some(dispatch) = miss.check(ctx, &[], &options, &constraints, true, &prefix_params)
            {
                return Some(dispatch);
            }
        }

        None
    }

    fn merged_constraints(&self, inherited: &ConstraintMap) -> ConstraintMap {
        let own = self.inner.patterns.read().unwrap();
        if own.is_empty() {
            return inherited.clone();
        }
        let mut merged = inherited.clone();
        merged.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    /// Child indices for a method bucket, merged with the `*` bucket and
    /// restored to registration order.
    fn bucket_indices(&self, method: &str) -> Vec<usize> {
        let index = self.inner.index.read().unwrap();
        let mut positions: Vec<usize> = Vec::new();
        if let Some(bucket) = index.get(method) {
            positions.extend(bucket);
        }
        if method != "*" {
            if let Some(bucket) = index.get("*") {
                positions.extend(bucket);
            }
        }
        positions.sort_unstable();
        positions
    }
}

/// Join a group prefix and a relative rule, both already `/`-trimmed.
pub(crate) fn join_rule(prefix: &str, rule: &str) -> String {
    match (prefix.is_empty(), rule.is_empty()) {
        (true, _) => rule.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}/{rule}"),
    }
}
