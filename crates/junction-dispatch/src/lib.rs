//! Dispatch boundary types for the junction router
//!
//! The routing core resolves an incoming request to a [`Dispatch`] value and
//! hands execution to external collaborators. This crate holds the shared
//! boundary types: the ordered parameter map, the dispatch decision variants,
//! and the controller-invocation seam.

pub mod decision;
pub mod invoke;
pub mod params;

pub use decision::{
    CallbackDispatch, ControllerDispatch, Dispatch, DispatchDecision, DispatchOptions, HandlerFn,
    RedirectDispatch, Response, UrlDispatch, ViewDispatch,
};
pub use invoke::{ControllerInvoker, DispatchError, CONTROLLER_MIDDLEWARE};
pub use params::Params;
