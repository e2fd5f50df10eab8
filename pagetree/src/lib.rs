//! Rerun-driven page-tree session engine.
//!
//! A host program reruns from the top on every user interaction. This crate
//! keeps the illusion of a stateful multi-page app across those reruns: a tree
//! of pages, the active page, and per-page data survive in a [`io::store`]
//! between cycles, and each cycle runs exactly one page.
//!
//! - **[`core`]**: Pure logic (tree invariants, navigation, scope resolution).
//! - **[`io`]**: Session stores and configuration on disk.
//! - **[`cycle`]**: Orchestrates one rerun: restore, navigate, execute, commit.

pub mod app;
pub mod core;
pub mod cycle;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod page;
pub mod render;
pub mod snapshot;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tree;
