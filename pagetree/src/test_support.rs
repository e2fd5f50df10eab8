//! Test-only helpers for constructing page trees and apps.

use serde_json::Value;

use crate::app::{App, PageDef};
use crate::error::ElementError;
use crate::page::{FnElement, PageContext};
use crate::tree::{PageNode, PageTree};

/// Create a deterministic page node with empty data.
pub fn page(id: &str) -> PageNode {
    PageNode::new(id, format!("{} page", id))
}

/// Tree `A -> {B -> {D}, C}` inserted in order A, B, C, D.
pub fn abc_tree() -> PageTree {
    let mut tree = PageTree::with_root(page("A"));
    for (id, parent) in [("B", "A"), ("C", "A"), ("D", "B")] {
        tree.add_node(page(id), Some(parent))
            .expect("abc tree is well formed");
    }
    tree
}

/// App whose template matches [`abc_tree`], with no hooks or elements.
pub fn abc_app() -> App {
    App::builder()
        .start_page(PageDef::new("A", "A page"))
        .page(PageDef::new("B", "B page"))
        .page(PageDef::new("C", "C page"))
        .page(PageDef::new("D", "D page").under("B"))
        .build()
        .expect("abc app is well formed")
}

/// Element that always returns `value`.
pub fn const_element(
    name: &str,
    value: Value,
) -> FnElement<impl Fn(&mut PageContext<'_>) -> Result<Value, ElementError>> {
    FnElement::new(name, move |_ctx: &mut PageContext<'_>| Ok(value.clone()))
}
