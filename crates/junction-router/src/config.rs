//! Router configuration

use serde::Deserialize;

/// Behavior knobs for registration and matching. All fields have defaults so
/// a config file only needs to name what it changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Separator used by incoming raw paths, normalized to `/` internally.
    pub separator: String,
    /// Defer group/domain registration closures until first match.
    pub lazy_route: bool,
    /// An unmatched path is an error instead of falling back to the URL
    /// convention.
    pub route_must: bool,
    /// Default complete-match mode: the whole remaining path must be
    /// consumed by the matched rule.
    pub complete_match: bool,
    /// Case-fold controller/action names parsed from handler targets.
    pub convert: bool,
    /// Controller fallback for handler targets with a missing segment.
    pub default_controller: String,
    /// Action fallback for handler targets with a missing segment.
    pub default_action: String,
    /// Let the URL convention search nested controller namespaces.
    pub auto_search: bool,
    /// Root domain used to complete bare domain names; derived from the
    /// construction host when unset.
    pub domain_root: Option<String>,
    /// Captured route variables take precedence during argument binding.
    pub route_params_first: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            separator: "/".to_string(),
            lazy_route: false,
            route_must: false,
            complete_match: false,
            convert: true,
            default_controller: "Index".to_string(),
            default_action: "index".to_string(),
            auto_search: false,
            domain_root: None,
            route_params_first: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RouterConfig::default();
        assert_eq!(config.separator, "/");
        assert!(!config.lazy_route);
        assert!(config.convert);
        assert_eq!(config.default_controller, "Index");
        assert_eq!(config.default_action, "index");
    }

    #[test]
    fn test_partial_deserialize() {
        let config: RouterConfig =
            serde_json::from_str(r#"{"route_must": true, "separator": "-"}"#).unwrap();
        assert!(config.route_must);
        assert_eq!(config.separator, "-");
        assert_eq!(config.default_action, "index");
    }
}
