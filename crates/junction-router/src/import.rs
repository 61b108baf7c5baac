//! Declarative route table import
//!
//! Bulk registration from a JSON-shaped table. Reserved top-level keys:
//! `__domain__`, `__pattern__`, `__alias__`, `__rest__`. Keys wrapped in
//! brackets (`"[admin]"`) open a group; every other key is a rule mapping
//! to `"target"` or `["target", {options}]`.

use crate::error::RouteError;
use crate::options::RuleOptions;
use crate::router::{Registrar, Router};
use serde_json::Value;

fn err(detail: impl Into<String>) -> RouteError {
    RouteError::ImportError(detail.into())
}

pub(crate) fn import_table(
    router: &mut Router,
    table: &Value,
    method: &str,
) -> Result<(), RouteError> {
    let entries = table
        .as_object()
        .ok_or_else(|| err("route table must be an object"))?;

    if let Some(domains) = entries.get("__domain__") {
        let domains = domains
            .as_object()
            .ok_or_else(|| err("__domain__ must be an object"))?;
        for (name, rules) in domains {
            let domain = router.domain(name, |_| {})?;
            let mut registrar = Registrar::scoped(
                router.shared.clone(),
                domain.group().clone(),
                domain.name().to_string(),
            );
            import_rules(&mut registrar, rules, "*")?;
        }
    }

    if let Some(patterns) = entries.get("__pattern__") {
        let patterns = patterns
            .as_object()
            .ok_or_else(|| err("__pattern__ must be an object"))?;
        for (name, rule) in patterns {
            let rule = rule
                .as_str()
                .ok_or_else(|| err(format!("pattern {name} must be a string")))?;
            router.pattern(name, rule)?;
        }
    }

    if let Some(aliases) = entries.get("__alias__") {
        let aliases = aliases
            .as_object()
            .ok_or_else(|| err("__alias__ must be an object"))?;
        for (name, route) in aliases {
            let route = route
                .as_str()
                .ok_or_else(|| err(format!("alias {name} must be a string")))?;
            router.alias(name, route);
        }
    }

    if let Some(rest) = entries.get("__rest__") {
        let rest = rest
            .as_object()
            .ok_or_else(|| err("__rest__ must be an object"))?;
        for (name, route) in rest {
            let route = route
                .as_str()
                .ok_or_else(|| err(format!("resource {name} must be a string")))?;
            router.resource(name, route)?;
        }
    }

    let mut registrar = router.registrar();
    for (key, value) in entries {
        if matches!(
            key.as_str(),
            "__domain__" | "__pattern__" | "__alias__" | "__rest__"
        ) {
            continue;
        }
        import_entry(&mut registrar, key, value, method)?;
    }
    Ok(())
}

fn import_rules(registrar: &mut Registrar, table: &Value, method: &str) -> Result<(), RouteError> {
    let entries = table
        .as_object()
        .ok_or_else(|| err("rule table must be an object"))?;
    for (key, value) in entries {
        import_entry(registrar, key, value, method)?;
    }
    Ok(())
}

fn import_entry(
    registrar: &mut Registrar,
    key: &str,
    value: &Value,
    method: &str,
) -> Result<(), RouteError> {
    if let Some(name) = key.strip_prefix('[').and_then(|k| k.strip_suffix(']')) {
        let group = registrar.group(name, |_| {})?;
        let mut inner = Registrar::scoped(
            registrar.shared().clone(),
            group.clone(),
            group.domain().to_string(),
        );
        return import_rules(&mut inner, value, method);
    }

    match value {
        Value::String(route) => {
            registrar.rule(key, route.as_str(), method)?;
        }
        Value::Array(parts) => {
            let route = parts
                .first()
                .and_then(|v| v.as_str())
                .ok_or_else(|| err(format!("rule {key} must start with a route string")))?;
            let item = registrar.rule(key, route, method)?;
            if let Some(options) = parts.get(1) {
                let options: RuleOptions = serde_json::from_value(options.clone())
                    .map_err(|e| err(format!("rule {key}: {e}")))?;
                let cross = options.cross_domain == Some(true);
                item.merge_options(options);
                if cross {
                    item.cross_domain(true);
                }
            }
        }
        _ => {
            return Err(err(format!(
                "rule {key} must map to a string or [route, options]"
            )))
        }
    }
    Ok(())
}
