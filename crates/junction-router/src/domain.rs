//! Domain registry and pan-domain resolution
//!
//! Maps a host to the root rule group that should handle it. Exact entries
//! win over wildcards; wildcard keys come in three forms:
//! - `*.suffix` against the subdomain's trailing label (third-level form)
//! - `*.parent.tld` against a single-level subdomain of `parent.tld`
//! - bare `*`, which never captures the conventional `www` label
//!
//! Resolution may capture a pan-domain value — the wildcard label(s) — as a
//! side effect, reported on the final dispatch.

use crate::group::RuleGroup;
use crate::router::Shared;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// A host bound to its root rule group.
#[derive(Debug, Clone)]
pub struct Domain {
    name: String,
    group: RuleGroup,
}

impl Domain {
    pub(crate) fn new(name: String, shared: &Arc<Shared>) -> Self {
        let group = RuleGroup::root(Arc::downgrade(shared), name.clone());
        Self { name, group }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> &RuleGroup {
        &self.group
    }
}

/// One slot of the domain map: rules of its own, or an alias to another
/// registered domain's rules.
#[derive(Debug, Clone)]
pub(crate) enum DomainEntry {
    Rules(Domain),
    Alias(String),
}

/// Resolve the effective domain for a request.
///
/// Priority: exact subdomain key, exact host key, third-level wildcard,
/// host-form wildcard, bare `*` (excluding `www`), then the default entry.
/// Wildcards are only consulted when a subdomain is present and more than
/// one domain is registered.
pub(crate) fn resolve<'a>(
    domains: &'a HashMap<String, DomainEntry>,
    default_key: &str,
    host: &str,
    subdomain: &str,
) -> Option<(&'a Domain, Option<String>)> {
    let mut pan: Option<String> = None;
    let mut key: Option<String> = None;

    if !subdomain.is_empty() && domains.contains_key(subdomain) {
        key = Some(subdomain.to_string());
    } else if domains.contains_key(host) {
        key = Some(host.to_string());
    } else if !subdomain.is_empty() && domains.len() > 1 {
        let labels: Vec<&str> = subdomain.split('.').collect();
        let last = labels[labels.len() - 1];

        let third_level = format!("*.{last}");
        let host_form = host
            .split_once('.')
            .map(|(_, parent)| format!("*.{parent}"));

        if labels.len() >= 2 && domains.contains_key(&third_level) {
            // Third-level wildcard: capture the labels left of the suffix.
            key = Some(third_level);
            pan = Some(labels[..labels.len() - 1].join("."));
        } else if let Some(wildcard) = host_form.filter(|w| domains.contains_key(w.as_str())) {
            // Host-form wildcard (*.example.com) against a single-level
            // subdomain of the parent.
            if labels.len() == 1 {
                key = Some(wildcard);
                pan = Some(labels[0].to_string());
            }
        }

        if key.is_none() && last != "www" && domains.contains_key("*") {
            key = Some("*".to_string());
            pan = Some(last.to_string());
        }
    }

    let key = key.unwrap_or_else(|| default_key.to_string());
    let mut entry = domains.get(&key)?;

    // Alias entries share another domain's already-registered rules.
    if let DomainEntry::Alias(target) = entry {
        entry = domains.get(target)?;
    }

    match entry {
        DomainEntry::Rules(domain) => {
            trace!(host, domain = %domain.name(), pan = ?pan, "resolved domain");
            Some((domain, pan))
        }
        DomainEntry::Alias(_) => None,
    }
}

/// Complete a bare domain name with the root domain, the way registration
/// treats `blog` as `blog.<root>`.
pub(crate) fn complete_domain_name(name: &str, host: &str, root_override: Option<&str>) -> String {
    if name == "*" || name.starts_with("*.") || name.contains('.') {
        return name.to_string();
    }
    format!("{}.{}", name, root_domain(host, root_override))
}

/// The root domain: configured override, else the last two labels of the
/// construction host.
pub(crate) fn root_domain(host: &str, root_override: Option<&str>) -> String {
    if let Some(root) = root_override {
        return root.to_string();
    }
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() > 1 {
        labels[labels.len() - 2..].join(".")
    } else {
        host.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouterConfig;
    use crate::router::Router;

    fn router_with_domains(names: &[&str]) -> Router {
        let mut router = Router::new("www.example.com", RouterConfig::default());
        for name in names {
            router.domain(name, |_| {}).unwrap();
        }
        router
    }

    #[test]
    fn test_exact_beats_wildcards() {
        let router = router_with_domains(&["api.example.com", "*.example.com", "*"]);
        let (domain, pan) = resolve(
            &router.domains,
            "www.example.com",
            "api.example.com",
            "api",
        )
        .unwrap();
        assert_eq!(domain.name(), "api.example.com");
        assert_eq!(pan, None);
    }

    #[test]
    fn test_host_form_wildcard_captures_label() {
        let router = router_with_domains(&["*.example.com"]);
        let (domain, pan) = resolve(
            &router.domains,
            "www.example.com",
            "api.example.com",
            "api",
        )
        .unwrap();
        assert_eq!(domain.name(), "*.example.com");
        assert_eq!(pan.as_deref(), Some("api"));
    }

    #[test]
    fn test_third_level_wildcard() {
        let router = router_with_domains(&["*.blog"]);
        let (domain, pan) = resolve(
            &router.domains,
            "www.example.com",
            "s.blog.example.com",
            "s.blog",
        )
        .unwrap();
        assert_eq!(domain.name(), "*.blog");
        assert_eq!(pan.as_deref(), Some("s"));
    }

    #[test]
    fn test_bare_wildcard_excludes_www() {
        let router = router_with_domains(&["*"]);

        let (domain, pan) = resolve(
            &router.domains,
            "www.example.com",
            "api.example.com",
            "api",
        )
        .unwrap();
        assert_eq!(domain.name(), "*");
        assert_eq!(pan.as_deref(), Some("api"));

        // www is never a wildcard capture: falls through to the default.
        let (domain, pan) = resolve(
            &router.domains,
            "www.example.com",
            "www.other.com",
            "www",
        )
        .unwrap();
        assert_eq!(domain.name(), "www.example.com");
        assert_eq!(pan, None);
    }

    #[test]
    fn test_alias_follows_to_target() {
        let mut router = router_with_domains(&["blog.example.com"]);
        router.domain_alias("news", "blog");

        let (domain, _) = resolve(
            &router.domains,
            "www.example.com",
            "news.example.com",
            "news",
        )
        .unwrap();
        assert_eq!(domain.name(), "blog.example.com");
    }

    #[test]
    fn test_default_fallback() {
        let router = router_with_domains(&[]);
        let (domain, pan) = resolve(
            &router.domains,
            "www.example.com",
            "other.example.com",
            "other",
        )
        .unwrap();
        assert_eq!(domain.name(), "www.example.com");
        assert_eq!(pan, None);
    }

    #[test]
    fn test_complete_domain_name() {
        assert_eq!(
            complete_domain_name("blog", "www.example.com", None),
            "blog.example.com"
        );
        assert_eq!(
            complete_domain_name("blog.other.com", "www.example.com", None),
            "blog.other.com"
        );
        assert_eq!(complete_domain_name("*", "www.example.com", None), "*");
        assert_eq!(
            complete_domain_name("blog", "www.example.com", Some("site.org")),
            "blog.site.org"
        );
    }

    #[test]
    fn test_root_domain() {
        assert_eq!(root_domain("www.example.com", None), "example.com");
        assert_eq!(root_domain("localhost", None), "localhost");
    }
}
