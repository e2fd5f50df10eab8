//! Committed session state.

use serde::{Deserialize, Serialize};

use crate::error::StructuralError;
use crate::tree::{DataMap, PageTree};

/// Everything a session persists between cycles.
///
/// Snapshots are plain values: loading one from a store yields an owned copy,
/// so a working copy never aliases the committed one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub tree: PageTree,
    pub active_id: String,
    pub first_run: bool,
    #[serde(default)]
    pub globals: DataMap,
}

impl SessionSnapshot {
    /// First snapshot of a session: active page is the root, `first_run` set.
    pub fn fresh(tree: PageTree, globals: DataMap) -> Result<Self, StructuralError> {
        let active_id = tree.root()?.id.clone();
        Ok(Self {
            tree,
            active_id,
            first_run: true,
            globals,
        })
    }

    /// Fails if `active_id` does not name a page in the tree.
    pub fn validate(&self) -> Result<(), StructuralError> {
        if self.tree.contains(&self.active_id) {
            return Ok(());
        }
        Err(StructuralError::StaleActive(self.active_id.clone()))
    }

    /// Clear all page data and rewind to the root, keeping tree shape and ids.
    pub fn reset(&mut self) -> Result<(), StructuralError> {
        let root = self.tree.root()?.id.clone();
        self.tree.clear_data();
        self.active_id = root;
        self.first_run = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::abc_tree;
    use serde_json::json;

    fn populated() -> SessionSnapshot {
        let mut snapshot = SessionSnapshot::fresh(abc_tree(), DataMap::new()).expect("fresh");
        for id in ["A", "B", "C", "D"] {
            snapshot
                .tree
                .get_mut(id)
                .expect("node")
                .data
                .insert("k".into(), json!(id));
        }
        snapshot.active_id = "D".to_string();
        snapshot.first_run = false;
        snapshot.globals.insert("g".into(), json!(true));
        snapshot
    }

    #[test]
    fn reset_clears_data_and_rewinds_to_root() {
        let mut snapshot = populated();
        let shape_before = snapshot
            .tree
            .records()
            .into_iter()
            .map(|r| (r.id, r.parent_id))
            .collect::<Vec<_>>();

        snapshot.reset().expect("reset");

        assert_eq!(snapshot.active_id, "A");
        assert!(snapshot.first_run);
        assert!(snapshot.tree.all_nodes().all(|node| node.data.is_empty()));
        let shape_after = snapshot
            .tree
            .records()
            .into_iter()
            .map(|r| (r.id, r.parent_id))
            .collect::<Vec<_>>();
        assert_eq!(shape_before, shape_after);
        assert_eq!(snapshot.globals.get("g"), Some(&json!(true)));
    }

    #[test]
    fn validate_rejects_stale_active_id() {
        let mut snapshot = populated();
        assert!(snapshot.validate().is_ok());
        snapshot.active_id = "gone".to_string();
        assert_eq!(
            snapshot.validate(),
            Err(StructuralError::StaleActive("gone".to_string()))
        );
    }

    /// Layout: `{tree: [{id, parent_id, tag, data}], active_id, first_run, globals}`.
    #[test]
    fn serializes_to_documented_layout() {
        let snapshot = populated();
        let value = serde_json::to_value(&snapshot).expect("serialize");

        assert_eq!(value["active_id"], json!("D"));
        assert_eq!(value["first_run"], json!(false));
        assert_eq!(value["globals"], json!({"g": true}));
        assert_eq!(
            value["tree"][1],
            json!({"id": "B", "parent_id": "A", "tag": "B page", "data": {"k": "B"}})
        );

        let decoded: SessionSnapshot = serde_json::from_value(value).expect("deserialize");
        assert_eq!(decoded, snapshot);
    }
}
