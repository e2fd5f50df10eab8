//! Page tree stored as an arena keyed by page id.
//!
//! Parent and child links are ids, never references, so a tree can be cloned
//! and persisted as a flat list of [`NodeRecord`]s.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::invariants::validate_records;
use crate::error::StructuralError;

/// Local state of a page.
pub type DataMap = Map<String, Value>;

pub const DEFAULT_ROOT_ID: &str = "root";
pub const DEFAULT_ROOT_TAG: &str = "Home Page";

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PageNode {
    pub id: String,
    pub tag: String,
    #[serde(default)]
    pub data: DataMap,
}

impl PageNode {
    pub fn new(id: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag: tag.into(),
            data: DataMap::new(),
        }
    }
}

/// Persisted form of one node (`{id, parent_id, tag, data}`).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NodeRecord {
    pub id: String,
    pub parent_id: Option<String>,
    pub tag: String,
    #[serde(default)]
    pub data: DataMap,
}

/// Rooted tree of pages.
///
/// Nodes can only be attached to a parent that is already present, which
/// rules out cycles. Iteration follows insertion order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<NodeRecord>", into = "Vec<NodeRecord>")]
pub struct PageTree {
    root: Option<String>,
    nodes: HashMap<String, PageNode>,
    parents: HashMap<String, String>,
    children: HashMap<String, Vec<String>>,
    order: Vec<String>,
}

impl PageTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tree holding a single root page. The caller guarantees a non-blank id.
    pub(crate) fn with_root(root: PageNode) -> Self {
        let mut tree = Self::new();
        let id = root.id.clone();
        tree.order.push(id.clone());
        tree.children.insert(id.clone(), Vec::new());
        tree.nodes.insert(id.clone(), root);
        tree.root = Some(id);
        tree
    }

    /// Attach `node` under `parent_id`.
    ///
    /// The first node becomes the root. Afterwards a `None` parent means the
    /// root. Blank ids are rejected, matching what a persisted tree accepts.
    pub fn add_node(&mut self, node: PageNode, parent_id: Option<&str>) -> Result<(), StructuralError> {
        if node.id.trim().is_empty() {
            return Err(StructuralError::EmptyId);
        }
        if self.nodes.contains_key(&node.id) {
            return Err(StructuralError::DuplicateId(node.id));
        }
        let Some(root) = self.root.as_deref() else {
            if let Some(parent) = parent_id {
                return Err(StructuralError::MissingParent {
                    id: node.id,
                    parent: parent.to_string(),
                });
            }
            *self = Self::with_root(node);
            return Ok(());
        };
        let parent = parent_id.unwrap_or(root).to_string();
        if !self.nodes.contains_key(&parent) {
            return Err(StructuralError::MissingParent { id: node.id, parent });
        }

        let id = node.id.clone();
        self.children.entry(parent.clone()).or_default().push(id.clone());
        self.children.insert(id.clone(), Vec::new());
        self.parents.insert(id.clone(), parent);
        self.order.push(id.clone());
        self.nodes.insert(id, node);
        Ok(())
    }

    pub fn root_id(&self) -> Option<&str> {
        self.root.as_deref()
    }

    pub fn root(&self) -> Result<&PageNode, StructuralError> {
        let id = self.root.as_deref().ok_or(StructuralError::EmptyTree)?;
        self.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &str) -> Result<&PageNode, StructuralError> {
        self.nodes
            .get(id)
            .ok_or_else(|| StructuralError::NotFound(id.to_string()))
    }

    pub fn get_mut(&mut self, id: &str) -> Result<&mut PageNode, StructuralError> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| StructuralError::NotFound(id.to_string()))
    }

    /// Direct children of `id`, in insertion order.
    pub fn children(&self, id: &str) -> Result<Vec<&PageNode>, StructuralError> {
        let ids = self
            .children
            .get(id)
            .ok_or_else(|| StructuralError::NotFound(id.to_string()))?;
        ids.iter().map(|child| self.get(child)).collect()
    }

    /// Other children of `id`'s parent. Empty for the root.
    pub fn siblings(&self, id: &str) -> Result<Vec<&PageNode>, StructuralError> {
        match self.parent_id(id)? {
            None => Ok(Vec::new()),
            Some(parent) => Ok(self
                .children(parent)?
                .into_iter()
                .filter(|node| node.id != id)
                .collect()),
        }
    }

    pub fn parent(&self, id: &str) -> Result<Option<&PageNode>, StructuralError> {
        match self.parent_id(id)? {
            None => Ok(None),
            Some(parent) => self.get(parent).map(Some),
        }
    }

    pub fn parent_id(&self, id: &str) -> Result<Option<&str>, StructuralError> {
        if !self.nodes.contains_key(id) {
            return Err(StructuralError::NotFound(id.to_string()));
        }
        Ok(self.parents.get(id).map(String::as_str))
    }

    /// Ancestors of `id`, nearest first, ending with the root.
    pub fn ancestors(&self, id: &str) -> Result<Vec<&PageNode>, StructuralError> {
        let mut chain = Vec::new();
        let mut current = self.parent_id(id)?;
        while let Some(parent) = current {
            chain.push(self.get(parent)?);
            current = self.parents.get(parent).map(String::as_str);
        }
        Ok(chain)
    }

    /// Every node in insertion order. Parents precede their children.
    pub fn all_nodes(&self) -> impl Iterator<Item = &PageNode> + Clone + '_ {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn set_data(&mut self, id: &str, data: DataMap) -> Result<(), StructuralError> {
        self.get_mut(id)?.data = data;
        Ok(())
    }

    /// Empty every node's data, keeping structure and ids.
    pub fn clear_data(&mut self) {
        for node in self.nodes.values_mut() {
            node.data.clear();
        }
    }

    pub fn records(&self) -> Vec<NodeRecord> {
        self.all_nodes()
            .map(|node| NodeRecord {
                id: node.id.clone(),
                parent_id: self.parents.get(&node.id).cloned(),
                tag: node.tag.clone(),
                data: node.data.clone(),
            })
            .collect()
    }
}

impl TryFrom<Vec<NodeRecord>> for PageTree {
    type Error = StructuralError;

    fn try_from(records: Vec<NodeRecord>) -> Result<Self, Self::Error> {
        let errors = validate_records(&records);
        if !errors.is_empty() {
            return Err(StructuralError::Invalid(errors.join("; ")));
        }
        let mut tree = PageTree::new();
        for record in records {
            let node = PageNode {
                id: record.id,
                tag: record.tag,
                data: record.data,
            };
            tree.add_node(node, record.parent_id.as_deref())?;
        }
        Ok(tree)
    }
}

impl From<PageTree> for Vec<NodeRecord> {
    fn from(tree: PageTree) -> Self {
        tree.records()
    }
}

/// Fresh tree holding only the default start page.
pub fn default_tree() -> PageTree {
    PageTree::with_root(PageNode::new(DEFAULT_ROOT_ID, DEFAULT_ROOT_TAG))
}
