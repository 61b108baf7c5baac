//! Dispatch decision values
//!
//! A route check resolves to a [`Dispatch`]: which target to invoke, the
//! captured variables, and the per-rule options the invocation collaborator
//! must honor. The decision variants form a closed union fixed at
//! registration time.

use crate::params::Params;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Per-rule option overrides carried to the invocation collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOptions {
    /// URL suffix the rule was matched with (e.g. `html`).
    pub suffix: Option<String>,
    /// Case-fold controller/action names.
    pub convert: Option<bool>,
    /// Captured route variables take precedence over other request
    /// parameters when the invoker binds arguments.
    pub route_params_first: Option<bool>,
}

/// Minimal response value for static-response targets and callback returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

impl Response {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: "text/html".to_string(),
            body: body.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

/// Callback target signature: captured variables in, response out.
pub type HandlerFn = Arc<dyn Fn(&Params) -> Response + Send + Sync>;

/// Controller dispatch: `Controller/action` plus extra pairs embedded in the
/// handler string (`Blog/read/year/2020`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerDispatch {
    pub controller: String,
    pub action: String,
    pub extra: Params,
}

impl ControllerDispatch {
    /// Parse a handler string. Missing controller/action segments fall back
    /// to the supplied defaults; `convert` lowercases both names. Segments
    /// past the action bind pairwise into `extra`.
    pub fn parse(target: &str, default_controller: &str, default_action: &str, convert: bool) -> Self {
        let mut parts = target.trim_matches('/').split('/');

        let controller = match parts.next() {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => default_controller.to_string(),
        };
        let action = match parts.next() {
            Some(a) if !a.is_empty() => a.to_string(),
            _ => default_action.to_string(),
        };

        let mut extra = Params::new();
        let rest: Vec<&str> = parts.collect();
        for pair in rest.chunks(2) {
            extra.insert(pair[0], pair.get(1).copied().unwrap_or(""));
        }

        if convert {
            Self {
                controller: controller.to_lowercase(),
                action: action.to_lowercase(),
                extra,
            }
        } else {
            Self {
                controller,
                action,
                extra,
            }
        }
    }
}

/// Closure target, executed directly without controller resolution.
#[derive(Clone)]
pub struct CallbackDispatch {
    pub handler: HandlerFn,
}

impl fmt::Debug for CallbackDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackDispatch").finish_non_exhaustive()
    }
}

/// Redirect target with its status code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectDispatch {
    pub target: String,
    pub status: u16,
}

/// View target: template reference plus template variables. Rendering is
/// external.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDispatch {
    pub template: String,
    pub vars: Params,
}

/// Default URL-convention dispatch: no rule matched (or an auto rule did),
/// and the path is resolved by the external controller convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlDispatch {
    /// Normalized path, internal `/` delimited.
    pub path: String,
    /// The separator the raw path used, carried forward for the convention.
    pub separator: String,
    /// Whether the convention may search nested controller namespaces.
    pub auto_search: bool,
    /// Domain bind prefix, when the owning domain is bound.
    pub bind: Option<String>,
}

/// The resolved outcome variants.
#[derive(Debug, Clone)]
pub enum DispatchDecision {
    Controller(ControllerDispatch),
    Callback(CallbackDispatch),
    Respond(Response),
    Redirect(RedirectDispatch),
    View(ViewDispatch),
    Url(UrlDispatch),
}

/// Full outcome of a route check.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub decision: DispatchDecision,
    /// Merged variables: group prefix captures, rule captures, surplus
    /// pairs, then appended defaults — in capture order.
    pub params: Params,
    pub options: DispatchOptions,
    /// Wildcard label(s) captured during domain resolution.
    pub pan_domain: Option<String>,
    /// The matched rule was registered as a miss handler.
    pub from_miss: bool,
}

impl Dispatch {
    pub fn new(decision: DispatchDecision, params: Params) -> Self {
        Self {
            decision,
            params,
            options: DispatchOptions::default(),
            pan_domain: None,
            from_miss: false,
        }
    }
}
