//! Page and element contracts consumed by the cycle executor.
//!
//! A page is a tree node plus a binding: the [`Page`] implementation that owns
//! its header and footer hooks, the ordered [`Element`]s attached to it, and
//! the hook configuration. Bindings are declared once in the app definition;
//! only node data is persisted between cycles.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::scope::{LookupError, Scope, ValueKind};
use crate::error::{Diagnostic, ElementError, HookError};
use crate::tree::{DataMap, PageNode};

/// Header and footer hooks of a page.
///
/// Both default to [`HookError::Unimplemented`]. Enabling a hook on a page
/// that keeps the default aborts the cycle.
pub trait Page {
    fn header(&self, _options: &DataMap, _ctx: &mut PageContext<'_>) -> Result<(), HookError> {
        Err(HookError::Unimplemented)
    }

    fn footer(&self, _options: &DataMap, _ctx: &mut PageContext<'_>) -> Result<(), HookError> {
        Err(HookError::Unimplemented)
    }
}

/// Unit of behavior attached to a page.
///
/// The returned value is stored under [`Element::name`] in the page's own
/// data, or in its parent's data when [`Element::pass_to_parent`] is true.
pub trait Element {
    fn name(&self) -> &str;

    fn pass_to_parent(&self) -> bool {
        false
    }

    fn apply(&self, ctx: &mut PageContext<'_>) -> Result<Value, ElementError>;
}

/// Page with no hooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainPage;

impl Page for PlainPage {}

/// Page whose header and footer emit the `lines` option verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextPage;

impl TextPage {
    fn emit_lines(options: &DataMap, ctx: &mut PageContext<'_>) -> Result<(), HookError> {
        let Some(lines) = options.get("lines") else {
            return Ok(());
        };
        let lines = lines
            .as_array()
            .ok_or_else(|| HookError::Failed("option 'lines' must be an array".to_string()))?;
        for line in lines {
            match line {
                Value::String(text) => ctx.emit(text.clone()),
                other => ctx.emit(other.to_string()),
            }
        }
        Ok(())
    }
}

impl Page for TextPage {
    fn header(&self, options: &DataMap, ctx: &mut PageContext<'_>) -> Result<(), HookError> {
        Self::emit_lines(options, ctx)
    }

    fn footer(&self, options: &DataMap, ctx: &mut PageContext<'_>) -> Result<(), HookError> {
        Self::emit_lines(options, ctx)
    }
}

/// Lines shown by the default start page.
pub const WELCOME_LINES: [&str; 4] = [
    "Welcome",
    "This is the default home page",
    "Use the navigation panel to move between pages",
    "In case of issues, use the reset action in the navigation panel",
];

/// Enable flag and pass-through options for one hook.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookConfig {
    pub enabled: bool,
    pub options: DataMap,
}

impl HookConfig {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            options: DataMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Enabled hook with a `lines` option, for use with [`TextPage`].
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines = lines
            .into_iter()
            .map(|line| Value::String(line.into()))
            .collect();
        Self::enabled().with_option("lines", Value::Array(lines))
    }
}

/// Element backed by a closure.
pub struct FnElement<F> {
    name: String,
    pass_to_parent: bool,
    apply: F,
}

impl<F> FnElement<F>
where
    F: Fn(&mut PageContext<'_>) -> Result<Value, ElementError>,
{
    pub fn new(name: impl Into<String>, apply: F) -> Self {
        Self {
            name: name.into(),
            pass_to_parent: false,
            apply,
        }
    }

    pub fn to_parent(mut self) -> Self {
        self.pass_to_parent = true;
        self
    }
}

impl<F> Element for FnElement<F>
where
    F: Fn(&mut PageContext<'_>) -> Result<Value, ElementError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn pass_to_parent(&self) -> bool {
        self.pass_to_parent
    }

    fn apply(&self, ctx: &mut PageContext<'_>) -> Result<Value, ElementError> {
        (self.apply)(ctx)
    }
}

/// Side effects requested by hooks and elements during one invocation.
#[derive(Debug, Default)]
pub struct Effects {
    pub output: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub global_updates: DataMap,
    pub parent_updates: DataMap,
}

/// What a hook or element sees while it runs.
pub struct PageContext<'a> {
    page: &'a PageNode,
    parent: Option<&'a PageNode>,
    scope: Scope<'a>,
    first_run: bool,
    effects: &'a mut Effects,
}

impl<'a> PageContext<'a> {
    pub fn new(
        page: &'a PageNode,
        parent: Option<&'a PageNode>,
        globals: &'a DataMap,
        first_run: bool,
        effects: &'a mut Effects,
    ) -> Self {
        let scope = Scope::for_page(&page.data, parent.map(|node| &node.data), globals);
        Self {
            page,
            parent,
            scope,
            first_run,
            effects,
        }
    }

    pub fn page(&self) -> &PageNode {
        self.page
    }

    pub fn parent(&self) -> Option<&PageNode> {
        self.parent
    }

    /// True on the first cycle after bootstrap or reset.
    pub fn first_run(&self) -> bool {
        self.first_run
    }

    pub fn scope(&self) -> &Scope<'a> {
        &self.scope
    }

    /// Look `key` up in local, parent, then global scope.
    ///
    /// A miss is reported as a diagnostic and yields `None`.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        let found = self.scope.get(key).cloned();
        self.report(key, found)
    }

    /// Like [`PageContext::get`], restricted to the `allowed` kinds.
    pub fn get_typed(&mut self, key: &str, allowed: &[ValueKind]) -> Option<Value> {
        let found = self.scope.get_typed(key, allowed).cloned();
        self.report(key, found)
    }

    /// Look `key` up and deserialize it into `T`.
    pub fn get_as<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let found = self.scope.get_as(key);
        self.report(key, found)
    }

    /// Append a line of output for the host to display.
    pub fn emit(&mut self, line: impl Into<String>) {
        self.effects.output.push(line.into());
    }

    /// Set a session-wide variable. Later elements see it; it is persisted on commit.
    pub fn update_globals(&mut self, key: impl Into<String>, value: Value) {
        self.effects.global_updates.insert(key.into(), value);
    }

    /// Write into the parent page's data (the page itself when it is the root).
    pub fn update_parent_data(&mut self, key: impl Into<String>, value: Value) {
        self.effects.parent_updates.insert(key.into(), value);
    }

    fn report<T>(&mut self, key: &str, found: Result<T, LookupError>) -> Option<T> {
        match found {
            Ok(value) => Some(value),
            Err(LookupError::NotFound) => {
                self.effects.diagnostics.push(Diagnostic::NotFound {
                    page: self.page.id.clone(),
                    key: key.to_string(),
                });
                None
            }
            Err(LookupError::TypeMismatch {
                layer,
                expected,
                found,
            }) => {
                self.effects.diagnostics.push(Diagnostic::TypeMismatch {
                    page: self.page.id.clone(),
                    key: key.to_string(),
                    layer,
                    expected,
                    found,
                });
                None
            }
        }
    }
}
