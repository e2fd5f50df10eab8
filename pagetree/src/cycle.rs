//! One rerun of the host program: restore, navigate, execute, commit.
//!
//! The executor works on an owned copy of the committed snapshot. Nothing is
//! written back until every step succeeded, so a fatal error leaves the last
//! committed snapshot untouched.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::app::{App, PageBinding};
use crate::core::navigator::{NavEntry, Navigator, adjacent, nav_entries};
use crate::error::{Diagnostic, EngineError, Hook, HookError};
use crate::io::store::SessionStore;
use crate::page::{Effects, HookConfig, PageContext};
use crate::render::DebugView;
use crate::snapshot::SessionSnapshot;
use crate::tree::{DataMap, PageNode};

/// User interaction delivered with the request that triggered a cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    /// Make `id` the active page.
    SelectPage(String),
    /// Clear all page data and return to the root.
    Reset,
    /// Merge values into the session's global scope.
    UpdateGlobals(DataMap),
}

/// Input of one cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleRequest {
    /// Applied in order before the active page executes.
    pub interactions: Vec<Interaction>,
    /// Global values for this cycle only. They shadow session globals and are
    /// never persisted.
    pub overrides: DataMap,
}

impl CycleRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, id: impl Into<String>) -> Self {
        self.interactions.push(Interaction::SelectPage(id.into()));
        self
    }

    pub fn reset(mut self) -> Self {
        self.interactions.push(Interaction::Reset);
        self
    }

    pub fn update_global(mut self, key: impl Into<String>, value: Value) -> Self {
        let mut globals = DataMap::new();
        globals.insert(key.into(), value);
        self.interactions.push(Interaction::UpdateGlobals(globals));
        self
    }

    pub fn override_global(mut self, key: impl Into<String>, value: Value) -> Self {
        self.overrides.insert(key.into(), value);
        self
    }
}

/// What the host needs to display after a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub session: String,
    /// True if this cycle created the session.
    pub bootstrapped: bool,
    /// `first_run` as seen by the page during this cycle.
    pub first_run: bool,
    pub active: NavEntry,
    /// Selector entries computed from the active page.
    pub navigation: Vec<NavEntry>,
    /// Lines emitted by hooks and elements, in order.
    pub output: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
    /// Rendered debug view, when the app runs in debug mode.
    pub debug: Option<String>,
}

/// Drives cycles of one app against an explicit store handle.
pub struct CycleExecutor<'a, S: SessionStore + ?Sized> {
    app: &'a App,
    store: &'a S,
}

impl<'a, S: SessionStore + ?Sized> CycleExecutor<'a, S> {
    pub fn new(app: &'a App, store: &'a S) -> Self {
        Self { app, store }
    }

    /// Run one full cycle for session `name`.
    pub fn run_cycle(&self, name: &str, request: CycleRequest) -> Result<CycleReport, EngineError> {
        let (mut working, bootstrapped) = self.restore(name)?;
        let mut diagnostics = Vec::new();

        // Navigate: every interaction lands before the page executes.
        let mut navigator = Navigator::new();
        for interaction in request.interactions {
            match interaction {
                Interaction::SelectPage(target) => {
                    if let Err(diag) = navigator.request_transition(&working.tree, &target) {
                        warn!(session = name, target = %target, "transition rejected");
                        diagnostics.push(diag);
                    }
                }
                Interaction::Reset => {
                    info!(session = name, "resetting session state");
                    if let Some(target) = navigator.pending() {
                        debug!(session = name, target, "reset discards pending transition");
                    }
                    navigator.clear();
                    working.reset()?;
                }
                Interaction::UpdateGlobals(values) => working.globals.extend(values),
            }
        }
        if navigator.apply(&mut working.active_id) {
            debug!(session = name, active = %working.active_id, "active page changed");
        }
        working.validate()?;
        let navigation = nav_entries(adjacent(&working.tree, &working.active_id)?);

        let mut effective = working.globals.clone();
        effective.extend(request.overrides.clone());

        let mut active = working.tree.get(&working.active_id)?.clone();
        let mut parent = working.tree.parent(&working.active_id)?.cloned();
        let binding = self.app.binding(&active.id);
        if binding.is_none() {
            debug!(page = %active.id, "page has no binding; running without hooks or elements");
        }

        let mut run = PageRun {
            active: &mut active,
            parent: &mut parent,
            effective: &mut effective,
            session_globals: &mut working.globals,
            overrides: &request.overrides,
            first_run: working.first_run,
            output: Vec::new(),
            diagnostics,
        };
        if let Some(binding) = binding {
            run.execute(binding)?;
        }
        let PageRun {
            output,
            diagnostics,
            ..
        } = run;

        // Commit: write page data back into the canonical tree, then persist.
        let first_run = working.first_run;
        if let Some(parent) = parent {
            working.tree.set_data(&parent.id, parent.data)?;
        }
        working.tree.set_data(&active.id, active.data)?;
        let active_node = working.tree.get(&working.active_id)?;
        let active_entry = NavEntry::from_node(active_node);
        let debug_view = if self.app.debug() {
            render_debug(DebugView::new(&working.tree, active_node, &navigation, &effective, first_run))
        } else {
            None
        };
        working.first_run = false;
        self.store.commit(name, &working)?;
        info!(
            session = name,
            active = %working.active_id,
            diagnostics = diagnostics.len(),
            "cycle committed"
        );

        Ok(CycleReport {
            session: name.to_string(),
            bootstrapped,
            first_run,
            active: active_entry,
            navigation,
            output,
            diagnostics,
            debug: debug_view,
        })
    }

    /// Clear every page's data, rewind to the root, and commit immediately.
    pub fn reset(&self, name: &str) -> Result<SessionSnapshot, EngineError> {
        let (mut working, _) = self.restore(name)?;
        working.reset()?;
        self.store.commit(name, &working)?;
        info!(session = name, "session reset");
        Ok(working)
    }

    /// Owned working copy of the session, bootstrapping it if absent.
    fn restore(&self, name: &str) -> Result<(SessionSnapshot, bool), EngineError> {
        if let Some(snapshot) = self.store.load(name)? {
            debug!(session = name, active = %snapshot.active_id, first_run = snapshot.first_run, "restored snapshot");
            return Ok((snapshot, false));
        }
        let snapshot = self.app.bootstrap()?;
        self.store.commit(name, &snapshot)?;
        info!(session = name, pages = snapshot.tree.len(), "bootstrapped session");
        Ok((snapshot, true))
    }
}

fn render_debug(view: DebugView) -> Option<String> {
    match view.render() {
        Ok(text) => Some(text),
        Err(err) => {
            warn!(error = %err, "debug view failed to render");
            None
        }
    }
}

/// Mutable state of one page invocation.
struct PageRun<'r> {
    active: &'r mut PageNode,
    parent: &'r mut Option<PageNode>,
    effective: &'r mut DataMap,
    session_globals: &'r mut DataMap,
    overrides: &'r DataMap,
    first_run: bool,
    output: Vec<String>,
    diagnostics: Vec<Diagnostic>,
}

impl PageRun<'_> {
    /// Header, then each element in declared order, then footer.
    fn execute(&mut self, binding: &PageBinding) -> Result<(), EngineError> {
        self.run_hook(binding, Hook::Header, &binding.header)?;

        for element in &binding.elements {
            let mut effects = Effects::default();
            let result = {
                let mut ctx = PageContext::new(
                    self.active,
                    self.parent.as_ref(),
                    self.effective,
                    self.first_run,
                    &mut effects,
                );
                element.apply(&mut ctx)
            };
            match result {
                Ok(value) if element.pass_to_parent() => {
                    self.write_parent(element.name(), value);
                }
                Ok(value) => {
                    self.active.data.insert(element.name().to_string(), value);
                }
                Err(err) => {
                    warn!(page = %self.active.id, element = element.name(), error = %err, "element failed");
                    self.diagnostics.push(Diagnostic::ElementFailed {
                        page: self.active.id.clone(),
                        element: element.name().to_string(),
                        message: err.to_string(),
                    });
                }
            }
            self.absorb(effects);
        }

        self.run_hook(binding, Hook::Footer, &binding.footer)
    }

    fn run_hook(&mut self, binding: &PageBinding, hook: Hook, config: &HookConfig) -> Result<(), EngineError> {
        if !config.enabled {
            return Ok(());
        }
        let mut effects = Effects::default();
        let result = {
            let mut ctx = PageContext::new(
                self.active,
                self.parent.as_ref(),
                self.effective,
                self.first_run,
                &mut effects,
            );
            match hook {
                Hook::Header => binding.page.header(&config.options, &mut ctx),
                Hook::Footer => binding.page.footer(&config.options, &mut ctx),
            }
        };
        match result {
            Ok(()) => {}
            Err(HookError::Unimplemented) => {
                return Err(EngineError::AbstractMethod {
                    page: self.active.id.clone(),
                    hook,
                });
            }
            Err(HookError::Failed(message)) => {
                warn!(page = %self.active.id, %hook, error = %message, "hook failed");
                self.diagnostics.push(Diagnostic::HookFailed {
                    page: self.active.id.clone(),
                    hook,
                    message,
                });
            }
        }
        self.absorb(effects);
        Ok(())
    }

    /// Store a value in the parent's data, or in the page's own data at the root.
    fn write_parent(&mut self, key: &str, value: Value) {
        match self.parent.as_mut() {
            Some(parent) => {
                parent.data.insert(key.to_string(), value);
            }
            None => {
                warn!(page = %self.active.id, key, "root page has no parent; keeping value locally");
                self.active.data.insert(key.to_string(), value);
            }
        }
    }

    fn absorb(&mut self, effects: Effects) {
        self.output.extend(effects.output);
        self.diagnostics.extend(effects.diagnostics);
        for (key, value) in effects.parent_updates {
            self.write_parent(&key, value);
        }
        for (key, value) in effects.global_updates {
            if !self.overrides.contains_key(&key) {
                self.effective.insert(key.clone(), value.clone());
            }
            self.session_globals.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::PageDef;
    use crate::error::{ElementError, StructuralError};
    use crate::io::store::MemoryStore;
    use crate::page::{FnElement, Page};
    use crate::test_support::{abc_app, const_element};
    use serde_json::json;

    fn ids(entries: &[NavEntry]) -> Vec<&str> {
        entries.iter().map(|entry| entry.id.as_str()).collect()
    }

    /// Absent session: bootstrap with a single default root, then first_run clears.
    #[test]
    fn first_cycle_bootstraps_and_second_sees_first_run_false() {
        let app = App::minimal();
        let store = MemoryStore::new();
        let executor = CycleExecutor::new(&app, &store);

        let first = executor.run_cycle("S", CycleRequest::new()).expect("first");
        assert!(first.bootstrapped);
        assert!(first.first_run);
        assert_eq!(first.active.id, "root");
        assert_eq!(ids(&first.navigation), vec!["root"]);
        assert_eq!(first.output[0], "Welcome");

        let second = executor.run_cycle("S", CycleRequest::new()).expect("second");
        assert!(!second.bootstrapped);
        assert!(!second.first_run);
        let stored = store.load("S").expect("load").expect("present");
        assert_eq!(stored.tree.len(), 1);
        assert!(!stored.first_run);
    }

    /// A -> {B, C}: B then C are reachable; adjacency from C lists B and A.
    #[test]
    fn transitions_between_siblings() {
        let app = abc_app();
        let store = MemoryStore::new();
        let executor = CycleExecutor::new(&app, &store);

        let at_b = executor.run_cycle("S", CycleRequest::new().select("B")).expect("B");
        assert_eq!(at_b.active.id, "B");

        let at_c = executor.run_cycle("S", CycleRequest::new().select("C")).expect("C");
        assert_eq!(at_c.active.id, "C");
        assert!(at_c.diagnostics.is_empty());
        assert_eq!(ids(&at_c.navigation), vec!["C", "B", "A"]);
        assert_eq!(store.load("S").expect("load").expect("present").active_id, "C");
    }

    #[test]
    fn unknown_target_is_reported_and_active_unchanged() {
        let app = abc_app();
        let store = MemoryStore::new();
        let executor = CycleExecutor::new(&app, &store);
        executor.run_cycle("S", CycleRequest::new().select("B")).expect("B");

        let report = executor.run_cycle("S", CycleRequest::new().select("ghost")).expect("cycle");
        assert_eq!(report.active.id, "B");
        assert_eq!(
            report.diagnostics,
            vec![Diagnostic::TransitionRejected {
                target: "ghost".to_string()
            }]
        );
    }

    /// pass_to_parent writes into the parent's data, not the page's own.
    #[test]
    fn pass_to_parent_element_writes_parent_data() {
        let app = App::builder()
            .start_page(PageDef::new("A", "A"))
            .page(PageDef::new("X", "X").element(const_element("result", json!(42)).to_parent()))
            .build()
            .expect("app");
        let store = MemoryStore::new();
        let executor = CycleExecutor::new(&app, &store);

        executor.run_cycle("S", CycleRequest::new().select("X")).expect("cycle");

        let stored = store.load("S").expect("load").expect("present");
        assert_eq!(stored.tree.get("A").expect("A").data.get("result"), Some(&json!(42)));
        assert!(!stored.tree.get("X").expect("X").data.contains_key("result"));
    }

    #[test]
    fn missing_variable_does_not_stop_later_elements() {
        let app = App::builder()
            .page(
                PageDef::new("X", "X")
                    .element(FnElement::new("lookup", |ctx: &mut PageContext<'_>| {
                        Ok(ctx.get("missing_key").unwrap_or(Value::Null))
                    }))
                    .element(const_element("after", json!("ran"))),
            )
            .build()
            .expect("app");
        let store = MemoryStore::new();
        let executor = CycleExecutor::new(&app, &store);

        let report = executor.run_cycle("S", CycleRequest::new().select("X")).expect("cycle");
        assert!(matches!(
            report.diagnostics.as_slice(),
            [Diagnostic::NotFound { key, .. }] if key == "missing_key"
        ));
        let stored = store.load("S").expect("load").expect("present");
        let data = &stored.tree.get("X").expect("X").data;
        assert_eq!(data.get("lookup"), Some(&Value::Null));
        assert_eq!(data.get("after"), Some(&json!("ran")));
    }

    #[test]
    fn failing_element_is_recoverable() {
        let app = App::builder()
            .page(
                PageDef::new("X", "X")
                    .element(FnElement::new("boom", |_ctx: &mut PageContext<'_>| {
                        Err(ElementError::new("dataset unavailable"))
                    }))
                    .element(const_element("after", json!(1))),
            )
            .build()
            .expect("app");
        let store = MemoryStore::new();
        let executor = CycleExecutor::new(&app, &store);

        let report = executor.run_cycle("S", CycleRequest::new().select("X")).expect("cycle");
        assert!(matches!(report.diagnostics[0], Diagnostic::ElementFailed { .. }));
        let stored = store.load("S").expect("load").expect("present");
        let data = &stored.tree.get("X").expect("X").data;
        assert!(!data.contains_key("boom"));
        assert_eq!(data.get("after"), Some(&json!(1)));
    }

    struct NoHooks;

    impl Page for NoHooks {}

    /// Enabling a hook the page does not implement aborts without committing.
    #[test]
    fn unimplemented_enabled_hook_is_fatal_and_commits_nothing() {
        let app = App::builder()
            .page(
                PageDef::new("X", "X")
                    .page(NoHooks)
                    .element(const_element("written", json!(true)))
                    .footer(HookConfig::enabled()),
            )
            .build()
            .expect("app");
        let store = MemoryStore::new();
        let executor = CycleExecutor::new(&app, &store);
        executor.run_cycle("S", CycleRequest::new()).expect("bootstrap");
        let before = store.load("S").expect("load");

        let err = executor
            .run_cycle("S", CycleRequest::new().select("X"))
            .expect_err("abstract footer");
        assert!(matches!(
            err,
            EngineError::AbstractMethod { ref page, hook: Hook::Footer } if page == "X"
        ));
        assert_eq!(store.load("S").expect("load"), before);
    }

    #[test]
    fn stale_active_id_is_fatal_and_commits_nothing() {
        let app = abc_app();
        let store = MemoryStore::new();
        let executor = CycleExecutor::new(&app, &store);
        executor.run_cycle("S", CycleRequest::new()).expect("bootstrap");

        let mut corrupted = store.load("S").expect("load").expect("present");
        corrupted.active_id = "gone".to_string();
        store.commit("S", &corrupted).expect("commit");

        let err = executor.run_cycle("S", CycleRequest::new()).expect_err("stale");
        assert!(matches!(
            err,
            EngineError::Structural(StructuralError::StaleActive(_))
        ));
        assert_eq!(store.load("S").expect("load"), Some(corrupted));
    }

    /// Reset inside a cycle: data cleared, root active, page sees first_run.
    #[test]
    fn reset_interaction_applies_before_execution() {
        let app = abc_app();
        let store = MemoryStore::new();
        let executor = CycleExecutor::new(&app, &store);
        executor.run_cycle("S", CycleRequest::new().select("B")).expect("B");
        executor.run_cycle("S", CycleRequest::new().select("C")).expect("C");

        let report = executor
            .run_cycle("S", CycleRequest::new().select("B").reset())
            .expect("reset");
        assert_eq!(report.active.id, "A");
        assert!(report.first_run);

        let stored = store.load("S").expect("load").expect("present");
        assert!(!stored.first_run);
        assert!(stored.tree.get("B").expect("B").data.is_empty());
        assert!(stored.tree.get("C").expect("C").data.is_empty());
    }

    #[test]
    fn reset_operation_commits_cleared_state() {
        let app = abc_app();
        let store = MemoryStore::new();
        let executor = CycleExecutor::new(&app, &store);
        executor.run_cycle("S", CycleRequest::new().select("C")).expect("C");

        let snapshot = executor.reset("S").expect("reset");
        assert_eq!(snapshot.active_id, "A");
        assert!(snapshot.first_run);
        assert_eq!(store.load("S").expect("load"), Some(snapshot));
    }

    /// Local data shadows globals; overrides shadow session globals but are not stored.
    #[test]
    fn scope_precedence_and_transient_overrides() {
        let app = App::builder()
            .page(
                PageDef::new("X", "X")
                    .data("n", json!("local"))
                    .element(FnElement::new("seen_n", |ctx: &mut PageContext<'_>| {
                        Ok(ctx.get("n").unwrap_or(Value::Null))
                    }))
                    .element(FnElement::new("seen_mode", |ctx: &mut PageContext<'_>| {
                        Ok(ctx.get("mode").unwrap_or(Value::Null))
                    })),
            )
            .global("n", json!("global"))
            .global("mode", json!("session"))
            .build()
            .expect("app");
        let store = MemoryStore::new();
        let executor = CycleExecutor::new(&app, &store);

        executor
            .run_cycle(
                "S",
                CycleRequest::new().select("X").override_global("mode", json!("override")),
            )
            .expect("cycle");

        let stored = store.load("S").expect("load").expect("present");
        let data = &stored.tree.get("X").expect("X").data;
        assert_eq!(data.get("seen_n"), Some(&json!("local")));
        assert_eq!(data.get("seen_mode"), Some(&json!("override")));
        assert_eq!(stored.globals.get("mode"), Some(&json!("session")));
    }

    #[test]
    fn element_requests_update_globals_and_parent() {
        let app = App::builder()
            .start_page(PageDef::new("A", "A"))
            .page(
                PageDef::new("X", "X")
                    .element(FnElement::new("writer", |ctx: &mut PageContext<'_>| {
                        ctx.update_globals("favorite_cat", json!("Thor"));
                        ctx.update_parent_data("favorite_dog", json!("Rufus"));
                        Ok(json!(true))
                    }))
                    .element(FnElement::new("reader", |ctx: &mut PageContext<'_>| {
                        Ok(ctx.get("favorite_cat").unwrap_or(Value::Null))
                    })),
            )
            .build()
            .expect("app");
        let store = MemoryStore::new();
        let executor = CycleExecutor::new(&app, &store);

        executor.run_cycle("S", CycleRequest::new().select("X")).expect("cycle");

        let stored = store.load("S").expect("load").expect("present");
        assert_eq!(stored.globals.get("favorite_cat"), Some(&json!("Thor")));
        assert_eq!(
            stored.tree.get("A").expect("A").data.get("favorite_dog"),
            Some(&json!("Rufus"))
        );
        assert_eq!(
            stored.tree.get("X").expect("X").data.get("reader"),
            Some(&json!("Thor"))
        );
    }

    #[test]
    fn update_globals_interaction_is_persisted() {
        let app = abc_app();
        let store = MemoryStore::new();
        let executor = CycleExecutor::new(&app, &store);

        executor
            .run_cycle("S", CycleRequest::new().update_global("ticker", json!("SPY")))
            .expect("cycle");
        let stored = store.load("S").expect("load").expect("present");
        assert_eq!(stored.globals.get("ticker"), Some(&json!("SPY")));
    }

    #[test]
    fn debug_mode_attaches_rendered_view() {
        let app = App::builder().debug(true).build().expect("app");
        let store = MemoryStore::new();
        let executor = CycleExecutor::new(&app, &store);

        let report = executor.run_cycle("S", CycleRequest::new()).expect("cycle");
        let text = report.debug.expect("debug view");
        assert!(text.contains("First run: true"));
        assert!(text.contains("Active page: Home Page [root]"));
    }

    #[test]
    fn sessions_do_not_interfere() {
        let app = abc_app();
        let store = MemoryStore::new();
        let executor = CycleExecutor::new(&app, &store);

        executor.run_cycle("one", CycleRequest::new().select("B")).expect("one");
        executor.run_cycle("two", CycleRequest::new().select("C")).expect("two");

        assert_eq!(store.load("one").expect("load").expect("one").active_id, "B");
        assert_eq!(store.load("two").expect("load").expect("two").active_id, "C");
    }
}
