//! Static app definition: declared pages, their bindings, and seed globals.
//!
//! The app is rebuilt identically on every run of the host program. It never
//! holds session state; it only knows how to bootstrap a fresh snapshot and
//! which behavior belongs to which page id.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::StructuralError;
use crate::page::{Element, HookConfig, Page, PlainPage, TextPage, WELCOME_LINES};
use crate::snapshot::SessionSnapshot;
use crate::tree::{DEFAULT_ROOT_ID, DEFAULT_ROOT_TAG, DataMap, PageNode, PageTree};

/// Behavior attached to one page id.
pub struct PageBinding {
    pub page: Box<dyn Page>,
    pub elements: Vec<Box<dyn Element>>,
    pub header: HookConfig,
    pub footer: HookConfig,
}

impl Default for PageBinding {
    fn default() -> Self {
        Self {
            page: Box::new(PlainPage),
            elements: Vec::new(),
            header: HookConfig::default(),
            footer: HookConfig::default(),
        }
    }
}

/// Declaration of one page: initial node contents plus its binding.
pub struct PageDef {
    node: PageNode,
    parent: Option<String>,
    binding: PageBinding,
}

impl PageDef {
    pub fn new(id: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            node: PageNode::new(id, tag),
            parent: None,
            binding: PageBinding::default(),
        }
    }

    /// Attach under `parent`. Pages without a parent attach to the root.
    pub fn under(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.node.data.insert(key.into(), value);
        self
    }

    pub fn page(mut self, page: impl Page + 'static) -> Self {
        self.binding.page = Box::new(page);
        self
    }

    pub fn element(mut self, element: impl Element + 'static) -> Self {
        self.binding.elements.push(Box::new(element));
        self
    }

    pub fn header(mut self, hook: HookConfig) -> Self {
        self.binding.header = hook;
        self
    }

    pub fn footer(mut self, hook: HookConfig) -> Self {
        self.binding.footer = hook;
        self
    }

    pub fn id(&self) -> &str {
        &self.node.id
    }
}

/// Start page used when the app does not declare one.
pub fn default_start_page() -> PageDef {
    PageDef::new(DEFAULT_ROOT_ID, DEFAULT_ROOT_TAG)
        .page(TextPage)
        .header(HookConfig::lines(WELCOME_LINES))
}

/// Validated app definition.
pub struct App {
    template: PageTree,
    bindings: HashMap<String, PageBinding>,
    globals: DataMap,
    debug: bool,
}

impl App {
    pub fn builder() -> AppBuilder {
        AppBuilder::default()
    }

    /// App with only the default start page.
    pub fn minimal() -> Self {
        let mut bindings = HashMap::new();
        let start = default_start_page();
        let template = PageTree::with_root(start.node);
        bindings.insert(DEFAULT_ROOT_ID.to_string(), start.binding);
        Self {
            template,
            bindings,
            globals: DataMap::new(),
            debug: false,
        }
    }

    /// Declared tree, before any session state is applied.
    pub fn template(&self) -> &PageTree {
        &self.template
    }

    pub fn globals(&self) -> &DataMap {
        &self.globals
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Binding for `id`, if the app declared one.
    pub fn binding(&self, id: &str) -> Option<&PageBinding> {
        self.bindings.get(id)
    }

    /// Snapshot for a session that has never been committed.
    pub fn bootstrap(&self) -> Result<SessionSnapshot, StructuralError> {
        SessionSnapshot::fresh(self.template.clone(), self.globals.clone())
    }
}

#[derive(Default)]
pub struct AppBuilder {
    start: Option<PageDef>,
    pages: Vec<PageDef>,
    globals: DataMap,
    debug: bool,
}

impl AppBuilder {
    /// Replace the default start page. Its id becomes the root id.
    pub fn start_page(mut self, page: PageDef) -> Self {
        self.start = Some(page);
        self
    }

    /// Declare a page. Parents must be declared before their children.
    pub fn page(mut self, page: PageDef) -> Self {
        self.pages.push(page);
        self
    }

    pub fn global(mut self, key: impl Into<String>, value: Value) -> Self {
        self.globals.insert(key.into(), value);
        self
    }

    pub fn globals(mut self, globals: DataMap) -> Self {
        self.globals.extend(globals);
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Assemble the page tree, failing on duplicate ids or unknown parents.
    pub fn build(self) -> Result<App, StructuralError> {
        let start = self.start.unwrap_or_else(default_start_page);
        let mut bindings = HashMap::new();
        let mut template = PageTree::new();
        template.add_node(start.node, None)?;
        let root_id = template.root()?.id.clone();
        bindings.insert(root_id, start.binding);

        for def in self.pages {
            let id = def.node.id.clone();
            template.add_node(def.node, def.parent.as_deref())?;
            bindings.insert(id, def.binding);
        }

        Ok(App {
            template,
            bindings,
            globals: self.globals,
            debug: self.debug,
        })
    }
}
