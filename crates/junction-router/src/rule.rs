//! Rule node: one registered pattern + method filter + dispatch target
//!
//! The target is a closed union decided at registration. Pattern and target
//! are immutable afterwards; options may still be appended fluently before
//! the first match attempt.

use crate::error::RouteError;
use crate::group::{CheckCtx, RouteEntry};
use crate::options::RuleOptions;
use crate::pattern::{compile_constraint, parse_vars, ConstraintMap, Pattern};
use crate::router::Shared;
use junction_dispatch::{
    CallbackDispatch, ControllerDispatch, Dispatch, DispatchDecision, HandlerFn, Params,
    RedirectDispatch, Response, ViewDispatch,
};
use std::fmt;
use std::sync::{Arc, RwLock, Weak};
use tracing::{trace, warn};

/// Dispatch target of a rule, decided once at registration.
#[derive(Clone)]
pub enum Target {
    /// Handler string `Controller/action`, may contain `:name`/`<name>`
    /// placeholders substituted from captured variables.
    Handler(String),
    /// Closure executed directly, without controller resolution.
    Callback(HandlerFn),
    /// Static response returned as-is.
    Respond(Response),
    /// Redirect destination with its status code.
    Redirect { target: String, status: u16 },
    /// Template reference; rendering is external.
    View { template: String, vars: Params },
}

impl Target {
    pub fn callback(handler: impl Fn(&Params) -> Response + Send + Sync + 'static) -> Self {
        Target::Callback(Arc::new(handler))
    }

    /// Handler string, when the target is one.
    pub fn handler_str(&self) -> Option<&str> {
        match self {
            Target::Handler(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Target {
    fn from(route: &str) -> Self {
        Target::Handler(route.to_string())
    }
}

impl From<String> for Target {
    fn from(route: String) -> Self {
        Target::Handler(route)
    }
}

impl From<Response> for Target {
    fn from(response: Response) -> Self {
        Target::Respond(response)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Handler(s) => f.debug_tuple("Handler").field(s).finish(),
            Target::Callback(_) => f.write_str("Callback(..)"),
            Target::Respond(r) => f.debug_tuple("Respond").field(r).finish(),
            Target::Redirect { target, status } => f
                .debug_struct("Redirect")
                .field("target", target)
                .field("status", status)
                .finish(),
            Target::View { template, .. } => {
                f.debug_struct("View").field("template", template).finish()
            }
        }
    }
}

pub(crate) struct RuleInner {
    rule: String,
    full_rule: String,
    pattern: Pattern,
    method: String,
    target: Target,
    // Arc'd so a cross-domain pool entry shares live option updates.
    options: Arc<RwLock<RuleOptions>>,
    patterns: Arc<RwLock<ConstraintMap>>,
    is_miss: bool,
    is_auto: bool,
    domain: String,
    shared: Weak<Shared>,
}

/// A single routable rule. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct RuleItem {
    inner: Arc<RuleInner>,
}

impl fmt::Debug for RuleItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleItem")
            .field("rule", &self.inner.full_rule)
            .field("method", &self.inner.method)
            .field("target", &self.inner.target)
            .finish()
    }
}

impl RuleItem {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        rule: &str,
        target: Target,
        method: &str,
        full_rule: String,
        domain: String,
        shared: Weak<Shared>,
        is_miss: bool,
        is_auto: bool,
    ) -> Result<Self, RouteError> {
        let pattern = Pattern::compile(rule)?;
        Ok(Self {
            inner: Arc::new(RuleInner {
                rule: pattern.rule().to_string(),
                full_rule,
                pattern,
                method: method.to_lowercase(),
                target,
                options: Arc::new(RwLock::new(RuleOptions::default())),
                patterns: Arc::new(RwLock::new(ConstraintMap::new())),
                is_miss,
                is_auto,
                domain,
                shared,
            }),
        })
    }

    /// A pool twin of this rule whose pattern covers the full rule string,
    /// since the cross-domain pool matches against the whole path. Options
    /// and constraints stay shared with the original.
    pub(crate) fn to_pool_item(&self) -> Result<RuleItem, RouteError> {
        let pattern = Pattern::compile(&self.inner.full_rule)?;
        Ok(RuleItem {
            inner: Arc::new(RuleInner {
                rule: pattern.rule().to_string(),
                full_rule: self.inner.full_rule.clone(),
                pattern,
                method: self.inner.method.clone(),
                target: self.inner.target.clone(),
                options: self.inner.options.clone(),
                patterns: self.inner.patterns.clone(),
                is_miss: self.inner.is_miss,
                is_auto: self.inner.is_auto,
                domain: self.inner.domain.clone(),
                shared: self.inner.shared.clone(),
            }),
        })
    }

    pub fn rule(&self) -> &str {
        &self.inner.rule
    }

    /// Rule string including every ancestor group prefix.
    pub fn full_rule(&self) -> &str {
        &self.inner.full_rule
    }

    pub fn method(&self) -> &str {
        &self.inner.method
    }

    pub fn target(&self) -> &Target {
        &self.inner.target
    }

    pub fn domain(&self) -> &str {
        &self.inner.domain
    }

    pub fn is_miss(&self) -> bool {
        self.inner.is_miss
    }

    pub fn is_auto(&self) -> bool {
        self.inner.is_auto
    }

    pub fn options(&self) -> RuleOptions {
        self.inner.options.read().unwrap().clone()
    }

    pub(crate) fn options_ext(&self) -> Option<String> {
        self.inner.options.read().unwrap().ext.clone()
    }

    // Fluent option setters, usable right after registration.

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

    /// Append default parameters, never overriding captured variables.
    pub fn append(&self, vars: &[(&str, &str)]) -> &Self {
        let mut options = self.inner.options.write().unwrap();
        for (name, value) in vars {
            options.append.insert(name.to_string(), value.to_string());
        }
        drop(options);
        self
    }

    pub(crate) fn append_pairs(&self, vars: &[(String, String)]) {
        let mut options = self.inner.options.write().unwrap();
        for (name, value) in vars {
            options.append.insert(name.clone(), value.clone());
        }
    }

    /// Merge a whole option patch over the current options.
    pub fn merge_options(&self, patch: RuleOptions) -> &Self {
        let mut options = self.inner.options.write().unwrap();
        let merged = patch.merged_over(&options);
        *options = merged;
        drop(options);
        self
    }

    /// Add a variable constraint for this rule only.
    pub fn pattern(&self, name: &str, rule: &str) -> Result<&Self, RouteError> {
        let compiled = compile_constraint(name, rule)?;
        self.inner
            .patterns
            .write()
            .unwrap()
            .insert(name.to_string(), compiled);
        Ok(self)
    }

    /// Also match this rule regardless of the resolved domain.
    pub fn cross_domain(&self, on: bool) -> &Self {
        self.inner.options.write().unwrap().cross_domain = Some(on);
        if on {
            if let Some(shared) = self.inner.shared.upgrade() {
                match self.to_pool_item() {
                    Ok(item) => shared.add_cross(RouteEntry::Rule(item), &self.inner.method),
                    Err(error) => {
                        warn!(rule = %self.inner.full_rule, %error, "cannot pool cross-domain rule")
                    }
                }
            }
        }
        self
    }

    /// Register (an additional) name for reverse URL generation, capturing
    /// the current suffix option.
    pub fn name(&self, name: &str) -> &Self {
        if let Some(shared) = self.inner.shared.upgrade() {
            shared.names.register(
                name,
                crate::names::NameEntry {
                    rule: self.inner.full_rule.clone(),
                    vars: parse_vars(&self.inner.full_rule),
                    domain: self.inner.domain.clone(),
                    suffix: self.options_ext(),
                },
                false,
            );
        }
        self
    }

    /// Try this rule against the remaining path.
    pub(crate) fn check(
        &self,
        ctx: &CheckCtx<'_>,
        path: &[&str],
        inherited: &RuleOptions,
        constraints: &ConstraintMap,
        complete_default: bool,
        carried: &Params,
    ) -> Option<Dispatch> {
        if self.inner.method != "*" && self.inner.method != ctx.method {
            return None;
        }

        let options = self.inner.options.read().unwrap().merged_over(inherited);

        let mut segments: Vec<&str> = path.to_vec();
        if options.merge_slashes == Some(true) {
            segments.retain(|s| !s.is_empty());
        }

        // A suffix option means the final segment must carry one of the
        // configured extensions; it is stripped before matching.
        if let Some(ext) = &options.ext {
            let last: &str = *segments.last()?;
            let base = ext
                .split('|')
                .find_map(|e| last.strip_suffix(&format!(".{e}")))?;
            *segments.last_mut()? = base;
        }

        let merged_constraints = self.merged_constraints(constraints);
        let complete = options.complete_match.unwrap_or(complete_default);
        let (captured, consumed) =
            self.inner
                .pattern
                .match_segments(&segments, complete, &merged_constraints)?;

        let mut params = carried.clone();
        for (name, value) in captured {
            params.insert(name, value);
        }

        // Surplus segments bind pairwise when prefix matching is allowed.
        for pair in segments[consumed..].chunks(2) {
            params.insert_default(pair[0], pair.get(1).copied().unwrap_or(""));
        }

        for (name, value) in &options.append {
            params.insert_default(name.clone(), value.clone());
        }

        let decision = self.resolve(ctx, &mut params, &options);
        trace!(rule = %self.inner.full_rule, "rule matched");

        let mut dispatch = Dispatch::new(decision, params);
        dispatch.options = options.dispatch_options();
        dispatch.from_miss = self.inner.is_miss;
        Some(dispatch)
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

    fn resolve(
        &self,
        ctx: &CheckCtx<'_>,
        params: &mut Params,
        options: &RuleOptions,
    ) -> DispatchDecision {
        let config = &ctx.shared.config;
        match &self.inner.target {
            Target::Handler(route) => {
                let route = substitute_placeholders(route, params);
                let convert = options.convert.unwrap_or(config.convert);
                let dispatch = ControllerDispatch::parse(
                    &route,
                    &config.default_controller,
                    &config.default_action,
                    convert,
                );
                for (name, value) in dispatch.extra.iter() {
                    params.insert_default(name, value);
                }
                DispatchDecision::Controller(dispatch)
            }
            Target::Callback(handler) => DispatchDecision::Callback(CallbackDispatch {
                handler: handler.clone(),
            }),
            Target::Respond(response) => DispatchDecision::Respond(response.clone()),
            Target::Redirect { target, status } => DispatchDecision::Redirect(RedirectDispatch {
                target: substitute_placeholders(target, params),
                status: *status,
            }),
            Target::View { template, vars } => DispatchDecision::View(ViewDispatch {
                template: template.clone(),
                vars: vars.clone(),
            }),
        }
    }
}

/// Replace `:name` and `<name>` tokens in a handler string with captured
/// values. Longer names substitute first so `:id` cannot clobber `:idx`.
fn substitute_placeholders(target: &str, params: &Params) -> String {
    let mut out = target.to_string();
    let mut entries: Vec<(&str, &str)> = params.iter().collect();
    entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    for (name, value) in entries {
        out = out.replace(&format!("<{name}>"), value);
        out = out.replace(&format!(":{name}"), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_placeholders() {
        let params: Params = [("action", "profile"), ("id", "7")].into_iter().collect();
        assert_eq!(
            substitute_placeholders("User/get:action/:id", &params),
            "User/getprofile/7"
        );
        assert_eq!(substitute_placeholders("Blog/<id>", &params), "Blog/7");
    }

    #[test]
    fn test_substitute_longest_name_first() {
        let params: Params = [("id", "1"), ("idx", "2")].into_iter().collect();
        assert_eq!(substitute_placeholders("X/:idx/:id", &params), "X/2/1");
    }

    #[test]
    fn test_target_from_str() {
        let target: Target = "Blog/read".into();
        assert_eq!(target.handler_str(), Some("Blog/read"));
    }
}
