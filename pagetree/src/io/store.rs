//! Session store contract and the in-process implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::{Result, anyhow};
use tracing::debug;

use crate::snapshot::SessionSnapshot;

/// Name-keyed slots holding the last committed snapshot of each session.
///
/// `load` returns an owned copy; `commit` replaces the whole slot at once, so
/// a reader sees either the previous snapshot or the new one.
pub trait SessionStore {
    fn load(&self, name: &str) -> Result<Option<SessionSnapshot>>;

    fn commit(&self, name: &str, snapshot: &SessionSnapshot) -> Result<()>;
}

impl<S: SessionStore + ?Sized> SessionStore for &S {
    fn load(&self, name: &str) -> Result<Option<SessionSnapshot>> {
        (**self).load(name)
    }

    fn commit(&self, name: &str, snapshot: &SessionSnapshot) -> Result<()> {
        (**self).commit(name, snapshot)
    }
}

/// Process-wide store. Each commit swaps in a new `Arc`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: RwLock<HashMap<String, Arc<SessionSnapshot>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all committed sessions, sorted.
    pub fn sessions(&self) -> Result<Vec<String>> {
        let slots = self
            .slots
            .read()
            .map_err(|_| anyhow!("session store lock poisoned"))?;
        let mut names: Vec<String> = slots.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

impl SessionStore for MemoryStore {
    fn load(&self, name: &str) -> Result<Option<SessionSnapshot>> {
        let slots = self
            .slots
            .read()
            .map_err(|_| anyhow!("session store lock poisoned"))?;
        Ok(slots.get(name).map(|snapshot| SessionSnapshot::clone(snapshot)))
    }

    fn commit(&self, name: &str, snapshot: &SessionSnapshot) -> Result<()> {
        let replacement = Arc::new(snapshot.clone());
        let mut slots = self
            .slots
            .write()
            .map_err(|_| anyhow!("session store lock poisoned"))?;
        slots.insert(name.to_string(), replacement);
        debug!(session = name, active = %snapshot.active_id, "snapshot committed");
        Ok(())
    }
}
