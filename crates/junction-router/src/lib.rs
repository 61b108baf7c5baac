//! Host- and path-based URL routing core
//!
//! Registration verbs build a per-domain rule tree; `check()` resolves an
//! incoming `(host, path, method)` to a dispatch decision and extracts path
//! variables; the name registry supports the reverse operation, generating a
//! URL from a rule name plus variables.
//!
//! - Domains map exact hosts and wildcard forms (`*`, `*.suffix`) to root
//!   rule groups, with pan-domain capture
//! - Groups nest, cascade options/constraints, and may defer their rules to
//!   a closure expanded on first match
//! - Rules compile `:name` / `<name>` patterns once, filter by method, and
//!   carry a closed dispatch-target union
//! - Unmatched paths fall back to the cross-domain pool, alias routes, and
//!   finally the external URL convention
//!
//! # Example
//!
//! ```
//! use junction_router::{RouteRequest, Router};
//! use junction_dispatch::DispatchDecision;
//!
//! let mut router = Router::with_host("www.example.com");
//! router.get("blog/:id", "Blog/read").unwrap();
//!
//! let request = RouteRequest::new("www.example.com", "www", "GET");
//! let dispatch = router.check(&request, "blog/5").unwrap();
//!
//! assert_eq!(dispatch.params.get("id"), Some("5"));
//! match dispatch.decision {
//!     DispatchDecision::Controller(c) => assert_eq!(c.action, "read"),
//!     _ => panic!("expected controller dispatch"),
//! }
//!
//! // Reverse lookup round-trips.
//! assert_eq!(router.url("Blog/read", &[("id", "5")]).unwrap(), "blog/5");
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod group;
mod import;
pub mod names;
pub mod options;
pub mod pattern;
pub mod resource;
pub mod router;
pub mod rule;

pub use config::RouterConfig;
pub use domain::Domain;
pub use error::RouteError;
pub use group::{RouteEntry, RuleGroup};
pub use names::{NameEntry, NameRegistry};
pub use options::RuleOptions;
pub use pattern::{parse_vars, Pattern, Segment, VarKind};
pub use resource::{build_rest_rules, default_rest_table, RestAction, RestRule, RestTable};
pub use router::{Registrar, Router};
pub use rule::{RuleItem, Target};

/// Request facts supplied by the boundary. The core never parses hosts;
/// the subdomain arrives pre-split.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub host: String,
    pub subdomain: String,
    pub method: String,
}

impl RouteRequest {
    pub fn new(host: &str, subdomain: &str, method: &str) -> Self {
        Self {
            host: host.to_string(),
            subdomain: subdomain.to_string(),
            method: method.to_string(),
        }
    }
}
