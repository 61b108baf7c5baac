//! REST resource expansion
//!
//! A resource registration synthesizes one rule per REST action. Expansion
//! itself is a pure function over the action table so the generated rules
//! can be inspected and tested directly; installation into a group happens
//! through the deferred-group machinery.

use crate::router::Registrar;
use crate::rule::Target;
use tracing::warn;

/// One REST action: HTTP method, path suffix appended to the resource
/// pattern, and the action name appended to the route target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestAction {
    pub method: String,
    pub suffix: String,
    pub action: String,
}

impl RestAction {
    pub fn new(method: &str, suffix: &str, action: &str) -> Self {
        Self {
            method: method.to_string(),
            suffix: suffix.to_string(),
            action: action.to_string(),
        }
    }
}

/// Ordered REST action table; registration order of the synthesized rules
/// follows the table's declaration order.
pub type RestTable = Vec<(String, RestAction)>;

/// The default REST verb table.
pub fn default_rest_table() -> RestTable {
    vec![
        ("index".to_string(), RestAction::new("get", "", "index")),
        ("create".to_string(), RestAction::new("get", "/create", "create")),
        ("edit".to_string(), RestAction::new("get", "/:id/edit", "edit")),
        ("read".to_string(), RestAction::new("get", "/:id", "read")),
        ("save".to_string(), RestAction::new("post", "", "save")),
        ("update".to_string(), RestAction::new("put", "/:id", "update")),
        ("delete".to_string(), RestAction::new("delete", "/:id", "delete")),
    ]
}

/// One synthesized resource rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestRule {
    pub rule: String,
    pub method: String,
    pub route: String,
}

/// Expand a resource name into its REST rules.
///
/// Dotted names nest: each parent contributes `parent/:parent_id`, renaming
/// the parent's id variable so it cannot collide with the child's `:id`.
///
/// # Examples
/// ```
/// use junction_router::resource::{build_rest_rules, default_rest_table};
///
/// let rules = build_rest_rules("post", "Post", &default_rest_table(), None, None);
/// assert_eq!(rules.len(), 7);
/// assert_eq!(rules[3].rule, "post/:id");
/// assert_eq!(rules[3].route, "Post/read");
/// ```
pub fn build_rest_rules(
    name: &str,
    route: &str,
    rest: &RestTable,
    only: Option<&[String]>,
    except: Option<&[String]>,
) -> Vec<RestRule> {
    let parts: Vec<&str> = name.split('.').collect();
    let mut base = String::new();
    for parent in &parts[..parts.len().saturating_sub(1)] {
        base.push_str(&format!("{parent}/:{parent}_id/"));
    }
    base.push_str(parts.last().copied().unwrap_or(name));

    let mut rules = Vec::new();
    for (action, spec) in rest {
        if let Some(only) = only {
            if !only.iter().any(|a| a == action) {
                continue;
            }
        }
        if let Some(except) = except {
            if except.iter().any(|a| a == action) {
                continue;
            }
        }
        rules.push(RestRule {
            rule: format!("{}{}", base, spec.suffix),
            method: spec.method.clone(),
            route: format!("{}/{}", route, spec.action),
        });
    }
    rules
}

/// A resource registration waiting for first-match expansion.
#[derive(Debug, Clone)]
pub(crate) struct ResourceSpec {
    pub(crate) name: String,
    pub(crate) route: String,
    pub(crate) only: Option<Vec<String>>,
    pub(crate) except: Option<Vec<String>>,
}

impl ResourceSpec {
    pub(crate) fn install(self, registrar: &mut Registrar) {
        let rest = registrar.shared().rest.read().unwrap().clone();
        let rules = build_rest_rules(
            &self.name,
            &self.route,
            &rest,
            self.only.as_deref(),
            self.except.as_deref(),
        );
        for rest_rule in rules {
            if let Err(error) = registrar.rule(
                &rest_rule.rule,
                Target::Handler(rest_rule.route.clone()),
                &rest_rule.method,
            ) {
                warn!(rule = %rest_rule.rule, %error, "skipping invalid resource rule");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_produces_seven_rules() {
        let rules = build_rest_rules("post", "Post", &default_rest_table(), None, None);

        let signatures: Vec<(String, String)> = rules
            .iter()
            .map(|r| (r.method.clone(), r.rule.clone()))
            .collect();
        assert_eq!(
            signatures,
            vec![
                ("get".to_string(), "post".to_string()),
                ("get".to_string(), "post/create".to_string()),
                ("get".to_string(), "post/:id/edit".to_string()),
                ("get".to_string(), "post/:id".to_string()),
                ("post".to_string(), "post".to_string()),
                ("put".to_string(), "post/:id".to_string()),
                ("delete".to_string(), "post/:id".to_string()),
            ]
        );
        assert_eq!(rules[0].route, "Post/index");
        assert_eq!(rules[6].route, "Post/delete");
    }

    #[test]
    fn test_only_filter() {
        let only = vec!["index".to_string(), "read".to_string()];
        let rules = build_rest_rules("post", "Post", &default_rest_table(), Some(&only), None);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].route, "Post/index");
        assert_eq!(rules[1].route, "Post/read");
    }

    #[test]
    fn test_except_filter() {
        let except = vec!["delete".to_string()];
        let rules = build_rest_rules("post", "Post", &default_rest_table(), None, Some(&except));
        assert_eq!(rules.len(), 6);
        assert!(rules.iter().all(|r| r.route != "Post/delete"));
    }

    #[test]
    fn test_nested_resource_renames_parent_id() {
        let rules = build_rest_rules("blog.comment", "Comment", &default_rest_table(), None, None);
        assert_eq!(rules[3].rule, "blog/:blog_id/comment/:id");
        assert_eq!(rules[3].route, "Comment/read");
    }
}
