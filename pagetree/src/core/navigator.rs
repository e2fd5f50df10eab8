//! Navigation over the page tree: adjacency lists and transition requests.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Diagnostic, StructuralError};
use crate::tree::{PageNode, PageTree};

/// One selectable entry of the navigation surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavEntry {
    pub label: String,
    pub id: String,
}

impl NavEntry {
    pub fn from_node(node: &PageNode) -> Self {
        Self {
            label: node.tag.clone(),
            id: node.id.clone(),
        }
    }
}

/// Pages offered for navigation from `active_id`.
///
/// Order: the active page, then its children (or its siblings when it is a
/// leaf), then its ancestors up to the root. Each page appears once.
pub fn adjacent<'a>(tree: &'a PageTree, active_id: &str) -> Result<Vec<&'a PageNode>, StructuralError> {
    let active = tree.get(active_id)?;
    let mut neighbours = tree.children(active_id)?;
    if neighbours.is_empty() {
        neighbours = tree.siblings(active_id)?;
    }

    let mut seen = HashSet::new();
    let candidates = std::iter::once(active)
        .chain(neighbours)
        .chain(tree.ancestors(active_id)?);
    Ok(candidates
        .filter(|node| seen.insert(node.id.as_str()))
        .collect())
}

pub fn nav_entries<'a>(nodes: impl IntoIterator<Item = &'a PageNode>) -> Vec<NavEntry> {
    nodes.into_iter().map(NavEntry::from_node).collect()
}

/// Holds at most one pending transition until the next execution step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Navigator {
    pending: Option<String>,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `target_id` as the next active page if it exists in `tree`.
    ///
    /// An unknown target leaves any earlier pending request untouched.
    pub fn request_transition(&mut self, tree: &PageTree, target_id: &str) -> Result<(), Diagnostic> {
        if !tree.contains(target_id) {
            return Err(Diagnostic::TransitionRejected {
                target: target_id.to_string(),
            });
        }
        self.pending = Some(target_id.to_string());
        Ok(())
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }

    /// Move the pending transition into `active_id`. Returns true if it changed.
    pub fn apply(&mut self, active_id: &mut String) -> bool {
        match self.pending.take() {
            Some(target) if target != *active_id => {
                *active_id = target;
                true
            }
            _ => false,
        }
    }
}
