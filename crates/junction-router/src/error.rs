//! Route registration and lookup errors
//!
//! A rule that simply does not match is never an error — that is an ordinary
//! "try next" signal expressed as `None`. These variants are reserved for
//! terminal conditions.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    /// No rule matched and the check required one.
    #[error("route not found: {path}")]
    RouteNotFound { path: String },

    /// Reverse lookup of an unregistered rule name.
    #[error("route name not found: {name}")]
    NameNotFound { name: String },

    /// Every candidate under the name requires a variable the caller did
    /// not supply.
    #[error("no rule named {name} is satisfied by the supplied variables")]
    UnsatisfiedVariables { name: String },

    /// Malformed rule string or variable constraint.
    #[error("invalid pattern {rule}: {detail}")]
    InvalidPattern { rule: String, detail: String },

    /// Malformed declarative route table.
    #[error("invalid route table: {0}")]
    ImportError(String),
}
