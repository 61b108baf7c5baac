//! Router facade and registration context
//!
//! The [`Router`] owns the domain map and the state shared across the rule
//! tree: the name registry, the cross-domain pool, domain binds, alias
//! routes, the REST table, and the method-prefix table.
//!
//! All registration flows through a [`Registrar`] scoped to one group and
//! its owning domain — group and domain closures receive one, and the
//! router's own verbs delegate to one targeting the default domain's root.
//! There is no ambient "current group" cursor.

use crate::config::RouterConfig;
use crate::domain::{complete_domain_name, resolve, Domain, DomainEntry};
use crate::error::RouteError;
use crate::group::{join_rule, CheckCtx, Deferred, RouteEntry, RuleGroup};
use crate::names::{NameEntry, NameRegistry};
use crate::options::RuleOptions;
use crate::pattern::{parse_vars, ConstraintMap};
use crate::resource::{default_rest_table, ResourceSpec, RestAction, RestTable};
use crate::rule::{RuleItem, Target};
use crate::RouteRequest;
use junction_dispatch::{Dispatch, DispatchDecision, Params, UrlDispatch};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, trace};

/// State shared across the rule tree, the registrars, and fluent handles.
pub(crate) struct Shared {
    pub(crate) config: RouterConfig,
    pub(crate) names: NameRegistry,
    /// Rules matched regardless of the resolved domain. Lazily created.
    pub(crate) cross: Mutex<Option<RuleGroup>>,
    /// Domain → bound URL prefix.
    pub(crate) binds: RwLock<HashMap<String, String>>,
    /// Alias routes: first path segment → route prefix.
    pub(crate) aliases: RwLock<HashMap<String, String>>,
    pub(crate) rest: RwLock<RestTable>,
    /// Ordered method → action-prefix table for the `controller` verb.
    pub(crate) method_prefix: RwLock<Vec<(String, String)>>,
}

impl Shared {
    fn new(config: RouterConfig) -> Self {
        Self {
            config,
            names: NameRegistry::new(),
            cross: Mutex::new(None),
            binds: RwLock::new(HashMap::new()),
            aliases: RwLock::new(HashMap::new()),
            rest: RwLock::new(default_rest_table()),
            method_prefix: RwLock::new(
                ["get", "post", "put", "delete", "patch"]
                    .iter()
                    .map(|m| (m.to_string(), m.to_string()))
                    .collect(),
            ),
        }
    }

    /// Append an entry to the cross-domain pool, creating it on first use.
    pub(crate) fn add_cross(&self, entry: RouteEntry, method: &str) {
        let mut guard = self.cross.lock().unwrap();
        let group = match guard.as_ref() {
            Some(group) => group.clone(),
            None => {
                // The pool group only ever checks children, so a dangling
                // back-reference is acceptable here; entries keep their own.
                let group = RuleGroup::root(std::sync::Weak::new(), "*".to_string());
                *guard = Some(group.clone());
                group
            }
        };
        drop(guard);
        match entry {
            RouteEntry::Rule(rule) => group.add_rule(rule, method),
            RouteEntry::Group(subgroup) => group.add_group(subgroup),
        }
    }
}

/// Registration context: every verb writes into one target group under one
/// owning domain. Group and domain closures receive one.
pub struct Registrar {
    shared: Arc<Shared>,
    group: RuleGroup,
    domain: String,
    pending_name: Option<String>,
}

impl Registrar {
    pub(crate) fn scoped(shared: Arc<Shared>, group: RuleGroup, domain: String) -> Self {
        Self {
            shared,
            group,
            domain,
            pending_name: None,
        }
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    /// The group this registrar writes into.
    pub fn group_ref(&self) -> &RuleGroup {
        &self.group
    }

    /// Name the next registered rule, overriding its default name.
    pub fn name(&mut self, name: &str) -> &mut Self {
        self.pending_name = Some(name.to_string());
        self
    }

    /// Register a rule for a method (`"*"` matches every method).
    pub fn rule(
        &mut self,
        rule: &str,
        route: impl Into<Target>,
        method: &str,
    ) -> Result<RuleItem, RouteError> {
        self.add_rule(rule, route.into(), method, false, false)
    }

    pub fn any(&mut self, rule: &str, route: impl Into<Target>) -> Result<RuleItem, RouteError> {
        self.rule(rule, route, "*")
    }

    pub fn get(&mut self, rule: &str, route: impl Into<Target>) -> Result<RuleItem, RouteError> {
        self.rule(rule, route, "get")
    }

    pub fn post(&mut self, rule: &str, route: impl Into<Target>) -> Result<RuleItem, RouteError> {
        self.rule(rule, route, "post")
    }

    pub fn put(&mut self, rule: &str, route: impl Into<Target>) -> Result<RuleItem, RouteError> {
        self.rule(rule, route, "put")
    }

    pub fn delete(&mut self, rule: &str, route: impl Into<Target>) -> Result<RuleItem, RouteError> {
        self.rule(rule, route, "delete")
    }

    pub fn patch(&mut self, rule: &str, route: impl Into<Target>) -> Result<RuleItem, RouteError> {
        self.rule(rule, route, "patch")
    }

    /// Bulk-register `(rule, route)` pairs for one method.
    pub fn rules(&mut self, rules: &[(&str, &str)], method: &str) -> Result<(), RouteError> {
        for &(rule, route) in rules {
            self.rule(rule, route, method)?;
        }
        Ok(())
    }

    /// Register a nested group. The closure runs immediately, or on the
    /// group's first match attempt when `lazy_route` is configured.
    pub fn group(
        &mut self,
        name: &str,
        rules: impl FnOnce(&mut Registrar) + Send + 'static,
    ) -> Result<RuleGroup, RouteError> {
        let group = RuleGroup::new(
            name,
            self.group.full_name(),
            Arc::downgrade(&self.shared),
            self.domain.clone(),
        )?;
        if self.shared.config.lazy_route {
            group.set_deferred(Deferred::Rules(Box::new(rules)));
        } else {
            let mut registrar =
                Registrar::scoped(self.shared.clone(), group.clone(), self.domain.clone());
            rules(&mut registrar);
        }
        self.group.add_group(group.clone());
        debug!(group = %group.full_name(), "registered group");
        Ok(group)
    }

    /// Register a REST resource; its rules are synthesized from the REST
    /// table on first match. Restrict with `.only()` / `.except()` on the
    /// returned group.
    pub fn resource(&mut self, name: &str, route: &str) -> Result<RuleGroup, RouteError> {
        let group = RuleGroup::new(
            "",
            self.group.full_name(),
            Arc::downgrade(&self.shared),
            self.domain.clone(),
        )?;
        group.set_deferred(Deferred::Resource(ResourceSpec {
            name: name.to_string(),
            route: route.to_string(),
            only: None,
            except: None,
        }));
        self.group.add_group(group.clone());
        debug!(resource = %name, %route, "registered resource");
        Ok(group)
    }

    /// Register one `:action` rule per configured method prefix, so
    /// `GET user/profile` dispatches to `User/getprofile`.
    pub fn controller(&mut self, rule: &str, route: &str) -> Result<RuleGroup, RouteError> {
        let group = RuleGroup::new(
            rule,
            self.group.full_name(),
            Arc::downgrade(&self.shared),
            self.domain.clone(),
        )?;
        let prefixes = self.shared.method_prefix.read().unwrap().clone();
        let mut registrar =
            Registrar::scoped(self.shared.clone(), group.clone(), self.domain.clone());
        for (method, prefix) in prefixes {
            registrar.rule(":action", format!("{route}/{prefix}:action"), &method)?;
        }
        self.group.add_group(group.clone());
        Ok(group)
    }

    /// Register a GET rule resolved by the external template renderer.
    pub fn view(
        &mut self,
        rule: &str,
        template: &str,
        vars: &[(&str, &str)],
    ) -> Result<RuleItem, RouteError> {
        let vars: Params = vars.iter().map(|(k, v)| (*k, *v)).collect();
        self.add_rule(
            rule,
            Target::View {
                template: template.to_string(),
                vars,
            },
            "get",
            false,
            false,
        )
    }

    /// Register a redirect rule with the default 301 status.
    pub fn redirect(&mut self, rule: &str, target: &str) -> Result<RuleItem, RouteError> {
        self.redirect_with_status(rule, target, 301)
    }

    pub fn redirect_with_status(
        &mut self,
        rule: &str,
        target: &str,
        status: u16,
    ) -> Result<RuleItem, RouteError> {
        self.add_rule(
            rule,
            Target::Redirect {
                target: target.to_string(),
                status,
            },
            "*",
            false,
            false,
        )
    }

    /// Register the handler selected when nothing else in this group
    /// matched the method.
    pub fn miss(
        &mut self,
        route: impl Into<Target>,
        method: &str,
    ) -> Result<RuleItem, RouteError> {
        self.add_rule("", route.into(), method, true, false)
    }

    /// Register an auto rule: unmatched remainders dispatch through the URL
    /// convention under the given prefix.
    pub fn auto(&mut self, route: &str) -> Result<RuleItem, RouteError> {
        self.add_rule("", Target::Handler(route.to_string()), "*", false, true)
    }

    /// Bind the owning domain to a URL prefix; a bound domain dispatches
    /// directly through the prefix, ahead of its rule tree.
    pub fn bind(&mut self, bind: &str) -> &mut Self {
        self.shared
            .binds
            .write()
            .unwrap()
            .insert(self.domain.clone(), bind.to_string());
        debug!(domain = %self.domain, %bind, "bound domain");
        self
    }

    /// Register an alias route: `name/...` dispatches as `route/...`.
    pub fn alias(&mut self, name: &str, route: &str) -> &mut Self {
        self.shared
            .aliases
            .write()
            .unwrap()
            .insert(name.to_string(), route.to_string());
        self
    }

    /// Add a variable constraint on the target group.
    pub fn pattern(&mut self, name: &str, rule: &str) -> Result<&mut Self, RouteError> {
        self.group.pattern(name, rule)?;
        Ok(self)
    }

    /// Merge options onto the target group.
    pub fn option(&mut self, patch: RuleOptions) -> &mut Self {
        self.group.merge_options(patch);
        self
    }

    /// Append default parameters on the target group.
    pub fn append(&mut self, vars: &[(&str, &str)]) -> &mut Self {
        self.group.append(vars);
        self
    }

    fn add_rule(
        &mut self,
        rule: &str,
        target: Target,
        method: &str,
        is_miss: bool,
        is_auto: bool,
    ) -> Result<RuleItem, RouteError> {
        let method = method.to_lowercase();
        let (rule_str, defaults) = split_query(rule);
        let full_rule = join_rule(self.group.full_name(), rule_str.trim_matches('/'));

        let item = RuleItem::new(
            &rule_str,
            target,
            &method,
            full_rule.clone(),
            self.domain.clone(),
            Arc::downgrade(&self.shared),
            is_miss,
            is_auto,
        )?;
        if !defaults.is_empty() {
            item.append_pairs(&defaults);
        }

        // Auto-name string handlers for reverse lookup; a pending name()
        // overrides the default.
        let name = self
            .pending_name
            .take()
            .or_else(|| item.target().handler_str().map(str::to_string));
        if let (Some(name), false) = (name, is_miss || is_auto) {
            if !name.is_empty() {
                let suffix = item.options_ext().or_else(|| self.group.options_ext());
                self.shared.names.register(
                    &name,
                    NameEntry {
                        rule: full_rule.clone(),
                        vars: parse_vars(&full_rule),
                        domain: self.domain.clone(),
                        suffix,
                    },
                    false,
                );
            }
        }

        if is_miss {
            self.group.set_miss(item.clone());
        } else if is_auto {
            self.group.set_auto(item.clone());
        } else {
            self.group.add_rule(item.clone(), &method);
        }
        debug!(rule = %full_rule, %method, "registered rule");
        Ok(item)
    }
}

/// The routing facade: registration verbs, the top-level check, and reverse
/// URL generation.
pub struct Router {
    pub(crate) shared: Arc<Shared>,
    pub(crate) domains: HashMap<String, DomainEntry>,
    host: String,
    default: Domain,
    pending_name: Option<String>,
}

impl Router {
    /// Create a router whose default domain is `host`.
    pub fn new(host: &str, config: RouterConfig) -> Self {
        let shared = Arc::new(Shared::new(config));
        let default = Domain::new(host.to_string(), &shared);
        let mut domains = HashMap::new();
        domains.insert(host.to_string(), DomainEntry::Rules(default.clone()));
        Self {
            shared,
            domains,
            host: host.to_string(),
            default,
            pending_name: None,
        }
    }

    pub fn with_host(host: &str) -> Self {
        Self::new(host, RouterConfig::default())
    }

    pub fn config(&self) -> &RouterConfig {
        &self.shared.config
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn names(&self) -> &NameRegistry {
        &self.shared.names
    }

    pub(crate) fn registrar(&mut self) -> Registrar {
        let mut registrar = Registrar::scoped(
            self.shared.clone(),
            self.default.group().clone(),
            self.host.clone(),
        );
        registrar.pending_name = self.pending_name.take();
        registrar
    }

    // Registration verbs, delegating to a registrar on the default domain.

    pub fn name(&mut self, name: &str) -> &mut Self {
        self.pending_name = Some(name.to_string());
        self
    }

    pub fn rule(
        &mut self,
        rule: &str,
        route: impl Into<Target>,
        method: &str,
    ) -> Result<RuleItem, RouteError> {
        self.registrar().rule(rule, route, method)
    }

    pub fn any(&mut self, rule: &str, route: impl Into<Target>) -> Result<RuleItem, RouteError> {
        self.registrar().any(rule, route)
    }

    pub fn get(&mut self, rule: &str, route: impl Into<Target>) -> Result<RuleItem, RouteError> {
        self.registrar().get(rule, route)
    }

    pub fn post(&mut self, rule: &str, route: impl Into<Target>) -> Result<RuleItem, RouteError> {
        self.registrar().post(rule, route)
    }

    pub fn put(&mut self, rule: &str, route: impl Into<Target>) -> Result<RuleItem, RouteError> {
        self.registrar().put(rule, route)
    }

    pub fn delete(&mut self, rule: &str, route: impl Into<Target>) -> Result<RuleItem, RouteError> {
        self.registrar().delete(rule, route)
    }

    pub fn patch(&mut self, rule: &str, route: impl Into<Target>) -> Result<RuleItem, RouteError> {
        self.registrar().patch(rule, route)
    }

    pub fn rules(&mut self, rules: &[(&str, &str)], method: &str) -> Result<(), RouteError> {
        self.registrar().rules(rules, method)
    }

    pub fn group(
        &mut self,
        name: &str,
        rules: impl FnOnce(&mut Registrar) + Send + 'static,
    ) -> Result<RuleGroup, RouteError> {
        self.registrar().group(name, rules)
    }

    pub fn resource(&mut self, name: &str, route: &str) -> Result<RuleGroup, RouteError> {
        self.registrar().resource(name, route)
    }

    pub fn controller(&mut self, rule: &str, route: &str) -> Result<RuleGroup, RouteError> {
        self.registrar().controller(rule, route)
    }

    pub fn view(
        &mut self,
        rule: &str,
        template: &str,
        vars: &[(&str, &str)],
    ) -> Result<RuleItem, RouteError> {
        self.registrar().view(rule, template, vars)
    }

    pub fn redirect(&mut self, rule: &str, target: &str) -> Result<RuleItem, RouteError> {
        self.registrar().redirect(rule, target)
    }

    pub fn redirect_with_status(
        &mut self,
        rule: &str,
        target: &str,
        status: u16,
    ) -> Result<RuleItem, RouteError> {
        self.registrar().redirect_with_status(rule, target, status)
    }

    pub fn miss(
        &mut self,
        route: impl Into<Target>,
        method: &str,
    ) -> Result<RuleItem, RouteError> {
        self.registrar().miss(route, method)
    }

    pub fn auto(&mut self, route: &str) -> Result<RuleItem, RouteError> {
        self.registrar().auto(route)
    }

    pub fn bind(&mut self, bind: &str) -> &mut Self {
        self.registrar().bind(bind);
        self
    }

    pub fn alias(&mut self, name: &str, route: &str) -> &mut Self {
        self.registrar().alias(name, route);
        self
    }

    pub fn pattern(&mut self, name: &str, rule: &str) -> Result<&mut Self, RouteError> {
        self.registrar().pattern(name, rule)?;
        Ok(self)
    }

    pub fn option(&mut self, patch: RuleOptions) -> &mut Self {
        self.registrar().option(patch);
        self
    }

    pub fn append(&mut self, vars: &[(&str, &str)]) -> &mut Self {
        self.registrar().append(vars);
        self
    }

    /// Register a domain and its rules. Bare names complete with the root
    /// domain; wildcard names (`*`, `*.suffix`) register as-is.
    pub fn domain(
        &mut self,
        name: &str,
        rules: impl FnOnce(&mut Registrar) + Send + 'static,
    ) -> Result<Domain, RouteError> {
        let completed = complete_domain_name(name, &self.host, self.shared.config.domain_root.as_deref());
        let domain = Domain::new(completed.clone(), &self.shared);
        if self.shared.config.lazy_route {
            domain.group().set_deferred(Deferred::Rules(Box::new(rules)));
        } else {
            let mut registrar = Registrar::scoped(
                self.shared.clone(),
                domain.group().clone(),
                completed.clone(),
            );
            rules(&mut registrar);
        }
        debug!(domain = %completed, "registered domain");
        self.domains
            .insert(completed, DomainEntry::Rules(domain.clone()));
        Ok(domain)
    }

    /// Register a domain that shares another registered domain's rules.
    pub fn domain_alias(&mut self, alias: &str, target: &str) -> &mut Self {
        let root = self.shared.config.domain_root.as_deref();
        let alias = complete_domain_name(alias, &self.host, root);
        let target = complete_domain_name(target, &self.host, root);
        self.domains.insert(alias, DomainEntry::Alias(target));
        self
    }

    /// Redefine (or add) one REST action; `resource` registrations expanded
    /// afterwards pick it up.
    pub fn rest(&mut self, name: &str, action: RestAction) -> &mut Self {
        let mut table = self.shared.rest.write().unwrap();
        match table.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = action,
            None => table.push((name.to_string(), action)),
        }
        drop(table);
        self
    }

    /// Replace the whole REST table.
    pub fn rest_table(&mut self, table: RestTable) -> &mut Self {
        *self.shared.rest.write().unwrap() = table;
        self
    }

    /// Change the action prefix used by the `controller` verb for a method.
    pub fn set_method_prefix(&mut self, method: &str, prefix: &str) -> &mut Self {
        let method = method.to_lowercase();
        let mut table = self.shared.method_prefix.write().unwrap();
        match table.iter_mut().find(|(key, _)| *key == method) {
            Some(slot) => slot.1 = prefix.to_string(),
            None => table.push((method, prefix.to_string())),
        }
        drop(table);
        self
    }

    /// Bulk-register from a declarative table. See the crate docs for the
    /// reserved keys.
    pub fn import(&mut self, table: &serde_json::Value, method: &str) -> Result<(), RouteError> {
        crate::import::import_table(self, table, method)
    }

    /// Generate a path for a named rule. Optional variables absent from
    /// `vars` are omitted from the result.
    pub fn url(&self, name: &str, vars: &[(&str, &str)]) -> Result<String, RouteError> {
        let params: Params = vars.iter().map(|(k, v)| (*k, *v)).collect();
        let entry = self.shared.names.lookup(name, &params)?;
        Ok(NameRegistry::build(&entry, &params))
    }

    /// Check a request path using the configured defaults for
    /// complete-match and must-match.
    pub fn check(&self, request: &RouteRequest, path: &str) -> Result<Dispatch, RouteError> {
        self.check_with(
            request,
            path,
            self.shared.config.complete_match,
            self.shared.config.route_must,
        )
    }

    /// Check a request path: resolve the domain, try its tree, then the
    /// cross-domain pool, then alias routes, then fall back to the URL
    /// convention (or fail when `must`).
    pub fn check_with(
        &self,
        request: &RouteRequest,
        path: &str,
        complete_match: bool,
        must: bool,
    ) -> Result<Dispatch, RouteError> {
        let config = &self.shared.config;
        let url = normalize_path(path, &config.separator);
        let segments: Vec<&str> = if url.is_empty() {
            Vec::new()
        } else {
            url.split('/').collect()
        };

        let (domain, pan_domain) = resolve(
            &self.domains,
            &self.host,
            &request.host,
            &request.subdomain,
        )
        .unwrap_or((&self.default, None));

        let method = request.method.to_lowercase();
        let ctx = CheckCtx {
            shared: &self.shared,
            method: &method,
        };

        // A bound domain dispatches through its prefix, ahead of the tree.
        if let Some(bind) = self.lookup_bind(domain.name(), &request.subdomain) {
            trace!(domain = %domain.name(), %bind, "dispatching through domain bind");
            let mut dispatch = Dispatch::new(
                DispatchDecision::Url(UrlDispatch {
                    path: url,
                    separator: config.separator.clone(),
                    auto_search: config.auto_search,
                    bind: Some(bind),
                }),
                Params::new(),
            );
            dispatch.pan_domain = pan_domain;
            return Ok(dispatch);
        }

        let defaults = RuleOptions::default();
        let constraints = ConstraintMap::new();
        let carried = Params::new();

        let mut result = domain.group().check(
            &ctx,
            &segments,
            &defaults,
            &constraints,
            complete_match,
            &carried,
        );

        if result.is_none() {
            let cross = self.shared.cross.lock().unwrap().clone();
            if let Some(pool) = cross {
                trace!("trying cross-domain pool");
                result = pool.check(
                    &ctx,
                    &segments,
                    &defaults,
                    &constraints,
                    complete_match,
                    &carried,
                );
            }
        }

        if result.is_none() {
            result = self.check_alias(&segments);
        }

        match result {
            Some(mut dispatch) => {
                dispatch.pan_domain = pan_domain;
                Ok(dispatch)
            }
            None if must => Err(RouteError::RouteNotFound { path: url }),
            None => {
                trace!(path = %url, "no rule matched, deferring to url convention");
                let mut dispatch = Dispatch::new(
                    DispatchDecision::Url(UrlDispatch {
                        path: url,
                        separator: config.separator.clone(),
                        auto_search: config.auto_search,
                        bind: None,
                    }),
                    Params::new(),
                );
                dispatch.pan_domain = pan_domain;
                Ok(dispatch)
            }
        }
    }

    fn lookup_bind(&self, domain: &str, subdomain: &str) -> Option<String> {
        let binds = self.shared.binds.read().unwrap();
        if let Some(bind) = binds.get(domain) {
            return Some(bind.clone());
        }
        if let Some(dot) = subdomain.find('.') {
            if let Some(bind) = binds.get(&format!("*{}", &subdomain[dot..])) {
                return Some(bind.clone());
            }
        }
        binds.get("*").cloned()
    }

    fn check_alias(&self, segments: &[&str]) -> Option<Dispatch> {
        let first = segments.first()?;
        let route = self.shared.aliases.read().unwrap().get(*first)?.clone();

        let rest = &segments[1..];
        let mut path = route.trim_matches('/').to_string();
        if !rest.is_empty() {
            path = format!("{}/{}", path, rest.join("/"));
        }
        trace!(alias = %first, %path, "alias route matched");
        Some(Dispatch::new(
            DispatchDecision::Url(UrlDispatch {
                path,
                separator: self.shared.config.separator.clone(),
                auto_search: false,
                bind: None,
            }),
            Params::new(),
        ))
    }
}

/// Replace the configured separator with the internal `/` delimiter and
/// trim the ends.
fn normalize_path(path: &str, separator: &str) -> String {
    let replaced = if separator == "/" {
        path.to_string()
    } else {
        path.replace(separator, "/")
    };
    replaced.trim_matches('/').to_string()
}

/// Split a registered literal query string (`path?k=v`) into the rule and
/// its default parameters.
fn split_query(rule: &str) -> (String, Vec<(String, String)>) {
    match rule.split_once('?') {
        Some((path, query)) => {
            let defaults = query
                .split('&')
                .filter(|pair| !pair.is_empty())
                .map(|pair| match pair.split_once('=') {
                    Some((k, v)) => (k.to_string(), v.to_string()),
                    None => (pair.to_string(), String::new()),
                })
                .collect();
            (path.to_string(), defaults)
        }
        None => (rule.to_string(), Vec::new()),
    }
}
