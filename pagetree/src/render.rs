//! Plain-text rendering of the navigation surface and the debug view.

use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::navigator::NavEntry;
use crate::core::scope::Scope;
use crate::tree::{DataMap, PageNode, PageTree};

const NAVIGATION_TEMPLATE: &str = include_str!("templates/navigation.txt");
const DEBUG_TEMPLATE: &str = include_str!("templates/debug.txt");

fn environment() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template("navigation.txt", NAVIGATION_TEMPLATE)?;
    env.add_template("debug.txt", DEBUG_TEMPLATE)?;
    Ok(env)
}

/// Selector listing, one entry per line, the active entry marked with `*`.
pub fn render_navigation(entries: &[NavEntry], active_id: &str) -> Result<String, minijinja::Error> {
    let env = environment()?;
    env.get_template("navigation.txt")?
        .render(context! { entries => entries, active => active_id })
}

#[derive(Debug, Clone, Serialize)]
struct PageLine {
    id: String,
    tag: String,
    parent: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct VarLine {
    key: String,
    value: String,
}

/// Variable as a page sees it, tagged with the layer that supplied it.
#[derive(Debug, Clone, Serialize)]
struct ScopedVar {
    key: String,
    value: String,
    layer: String,
}

/// Inspection view of one cycle: flags, pages, and both variable scopes.
#[derive(Debug, Clone, Serialize)]
pub struct DebugView {
    first_run: bool,
    active: NavEntry,
    adjacent: Vec<NavEntry>,
    pages: Vec<PageLine>,
    locals: Vec<VarLine>,
    visible: Vec<ScopedVar>,
    globals: Vec<VarLine>,
}

impl DebugView {
    pub fn new(
        tree: &PageTree,
        active: &PageNode,
        adjacent: &[NavEntry],
        globals: &DataMap,
        first_run: bool,
    ) -> Self {
        let pages = tree
            .all_nodes()
            .map(|node| PageLine {
                id: node.id.clone(),
                tag: node.tag.clone(),
                parent: tree.parent_id(&node.id).ok().flatten().map(str::to_string),
            })
            .collect();
        let parent_data = tree.parent(&active.id).ok().flatten().map(|node| &node.data);
        let scope = Scope::for_page(&active.data, parent_data, globals);
        let mut visible: Vec<ScopedVar> = scope
            .flatten()
            .into_iter()
            .map(|(key, value)| {
                let layer = scope
                    .resolve(&key)
                    .map(|found| found.layer.to_string())
                    .unwrap_or_default();
                ScopedVar {
                    key,
                    value: value.to_string(),
                    layer,
                }
            })
            .collect();
        visible.sort_by(|a, b| a.key.cmp(&b.key));
        Self {
            first_run,
            active: NavEntry::from_node(active),
            adjacent: adjacent.to_vec(),
            pages,
            locals: var_lines(&active.data),
            visible,
            globals: var_lines(globals),
        }
    }

    pub fn render(&self) -> Result<String, minijinja::Error> {
        let env = environment()?;
        env.get_template("debug.txt")?.render(self)
    }
}

fn var_lines(data: &DataMap) -> Vec<VarLine> {
    let mut lines: Vec<VarLine> = data
        .iter()
        .map(|(key, value)| VarLine {
            key: key.clone(),
            value: value.to_string(),
        })
        .collect();
    lines.sort_by(|a, b| a.key.cmp(&b.key));
    lines
}
