//! Cascading rule options
//!
//! Options set on a group cascade to its children at match time; a child
//! value overrides the parent's. Unset fields stay `None` so the merge can
//! tell "not set" from "set to false".

use junction_dispatch::DispatchOptions;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuleOptions {
    /// Required URL suffix on the final path segment, `|`-separated
    /// alternatives (e.g. `"html|htm"`). Stripped before matching.
    pub ext: Option<String>,
    /// Drop empty segments produced by duplicated delimiters.
    pub merge_slashes: Option<bool>,
    /// Case-fold controller/action names for this rule.
    pub convert: Option<bool>,
    /// Require the rule to consume the entire remaining path.
    pub complete_match: Option<bool>,
    /// Also register the rule in the cross-domain pool.
    pub cross_domain: Option<bool>,
    /// Captured route variables take precedence during argument binding.
    pub route_params_first: Option<bool>,
    /// Default parameters appended to every match (never overriding
    /// captured variables).
    pub append: BTreeMap<String, String>,
}

impl RuleOptions {
    /// Merge `self` over `parent`: set fields win, `append` maps union with
    /// `self` winning on key collisions.
    pub fn merged_over(&self, parent: &RuleOptions) -> RuleOptions {
        let mut append = parent.append.clone();
        append.extend(self.append.clone());

        RuleOptions {
            ext: self.ext.clone().or_else(|| parent.ext.clone()),
            merge_slashes: self.merge_slashes.or(parent.merge_slashes),
            convert: self.convert.or(parent.convert),
            complete_match: self.complete_match.or(parent.complete_match),
            cross_domain: self.cross_domain.or(parent.cross_domain),
            route_params_first: self.route_params_first.or(parent.route_params_first),
            append,
        }
    }

    /// The subset the invocation collaborator must honor.
    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            suffix: self.ext.clone(),
            convert: self.convert,
            route_params_first: self.route_params_first,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_overrides_parent() {
        let parent = RuleOptions {
            ext: Some("html".to_string()),
            convert: Some(true),
            ..Default::default()
        };
        let child = RuleOptions {
            convert: Some(false),
            ..Default::default()
        };

        let merged = child.merged_over(&parent);
        assert_eq!(merged.ext.as_deref(), Some("html"));
        assert_eq!(merged.convert, Some(false));
    }

    #[test]
    fn test_append_union_child_wins() {
        let mut parent = RuleOptions::default();
        parent.append.insert("lang".to_string(), "en".to_string());
        parent.append.insert("page".to_string(), "1".to_string());

        let mut child = RuleOptions::default();
        child.append.insert("lang".to_string(), "zh".to_string());

        let merged = child.merged_over(&parent);
        assert_eq!(merged.append.get("lang").map(String::as_str), Some("zh"));
        assert_eq!(merged.append.get("page").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_deserialize_partial() {
        let options: RuleOptions =
            serde_json::from_str(r#"{"ext": "html", "cross_domain": true}"#).unwrap();
        assert_eq!(options.ext.as_deref(), Some("html"));
        assert_eq!(options.cross_domain, Some(true));
        assert_eq!(options.merge_slashes, None);
    }
}
