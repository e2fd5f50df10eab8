//! Error taxonomy for the session engine.
//!
//! Fatal errors ([`EngineError`]) abort the current cycle before anything is
//! committed. Recoverable problems are collected as [`Diagnostic`]s on the
//! cycle report and never stop sibling elements from running.

use std::fmt;

use thiserror::Error;

use crate::core::scope::{ScopeLayer, ValueKind};

/// Violations of page-tree structure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("page '{0}' not found")]
    NotFound(String),
    #[error("page id must not be empty")]
    EmptyId,
    #[error("duplicate page id '{0}'")]
    DuplicateId(String),
    #[error("parent page '{parent}' of '{id}' not found")]
    MissingParent { id: String, parent: String },
    #[error("active page '{0}' is not present in the tree")]
    StaleActive(String),
    #[error("tree has no root page")]
    EmptyTree,
    #[error("invalid page tree: {0}")]
    Invalid(String),
}

/// Lifecycle hook of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Header,
    Footer,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hook::Header => f.write_str("header"),
            Hook::Footer => f.write_str("footer"),
        }
    }
}

/// Errors that abort a cycle without committing.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error("page '{page}' enables its {hook} but does not implement it")]
    AbstractMethod { page: String, hook: Hook },
    #[error("session store: {0:#}")]
    Store(#[from] anyhow::Error),
}

/// Error returned by a page hook.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    /// The page does not implement this hook.
    #[error("hook not implemented")]
    Unimplemented,
    #[error("{0}")]
    Failed(String),
}

/// Error returned by an element's `apply`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ElementError(pub String);

impl ElementError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Recoverable problem reported inline to the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    #[error("variable '{key}' is not defined for page '{page}'")]
    NotFound { page: String, key: String },
    #[error(
        "variable '{key}' for page '{page}' has type {found} in {layer} scope (expected {})",
        expected_list(.expected)
    )]
    TypeMismatch {
        page: String,
        key: String,
        layer: ScopeLayer,
        expected: Vec<ValueKind>,
        found: ValueKind,
    },
    #[error("cannot navigate to unknown page '{target}'")]
    TransitionRejected { target: String },
    #[error("element '{element}' on page '{page}' failed: {message}")]
    ElementFailed {
        page: String,
        element: String,
        message: String,
    },
    #[error("{hook} of page '{page}' failed: {message}")]
    HookFailed {
        page: String,
        hook: Hook,
        message: String,
    },
}

fn expected_list(kinds: &[ValueKind]) -> String {
    if kinds.is_empty() {
        return "a different type".to_string();
    }
    kinds
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" or ")
}
