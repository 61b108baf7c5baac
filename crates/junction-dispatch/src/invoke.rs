//! Controller invocation boundary
//!
//! The router never instantiates controllers. A matched controller dispatch
//! is handed to a [`ControllerInvoker`] implementation, which owns class
//! resolution, argument binding, and the middleware pipeline.

use crate::decision::{ControllerDispatch, DispatchOptions, Response};
use crate::params::Params;
use thiserror::Error;

/// Middleware pipeline tag the invoker must dispatch controller calls under.
pub const CONTROLLER_MIDDLEWARE: &str = "controller";

/// Controller-resolution failures, surfaced to the HTTP boundary as 404.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("controller not exists: {class}")]
    ClassNotFound { class: String },

    #[error("method not exists: {class}->{action}()")]
    MethodNotExists { class: String, action: String },
}

impl DispatchError {
    /// The HTTP status the boundary reports for this failure.
    pub fn http_status(&self) -> u16 {
        404
    }
}

/// External collaborator that executes a controller dispatch.
///
/// Contract:
/// - Resolve the controller class from `dispatch.controller`; failure is
///   [`DispatchError::ClassNotFound`].
/// - Locate the action method; if absent, fall back to the configured
///   empty-action hook, else fail with [`DispatchError::MethodNotExists`].
/// - Merge `params` with other request-supplied parameters; when
///   `options.route_params_first` is set, captured route variables win.
/// - Invoke through the middleware pipeline tagged
///   [`CONTROLLER_MIDDLEWARE`] and wrap non-response return values into a
///   [`Response`] (auto-response).
#[cfg_attr(test, mockall::automock)]
pub trait ControllerInvoker {
    fn invoke(
        &self,
        dispatch: &ControllerDispatch,
        params: &Params,
        options: &DispatchOptions,
    ) -> Result<Response, DispatchError>;
}
