use std::collections::BTreeMap;

use serde::Serialize;

use crate::kinds::Kind;

/// Extras key holding a node's resolution status.
pub const STATUS_KEY: &str = "status";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeStatus {
    /// The object was found and looks healthy.
    Ok,
    /// The object was found but is unhappy, e.g. a pod with unready
    /// containers.
    Toast,
    /// The object ran to completion.
    Completed,
    /// A required reference could not be resolved.
    MissingRef,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Ok => "ok",
            NodeStatus::Toast => "toast",
            NodeStatus::Completed => "completed",
            NodeStatus::MissingRef => "noref",
        }
    }
}

/// A node of a relationship tree.
///
/// Children are exclusively owned; the tree is rebuilt from scratch on every
/// refresh so there is no removal and nothing but `extras` changes once a
/// node has been attached.  `add` does not check identity, callers are
/// expected to `find` first.
#[derive(Clone, Debug, Serialize)]
pub struct TreeNode {
    pub kind: Kind,
    pub id: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn new(kind: Kind, id: impl Into<String>) -> Self {
        TreeNode {
            kind,
            id: id.into(),
            extras: BTreeMap::new(),
            children: vec![],
        }
    }

    pub fn add(&mut self, child: TreeNode) {
        self.children.push(child);
    }

    /// Look for a direct child with this identity.  Grandchildren are not
    /// searched.
    pub fn find(&self, kind: Kind, id: &str) -> Option<&TreeNode> {
        self.children.iter().find(|c| c.kind == kind && c.id == id)
    }

    pub fn find_mut(&mut self, kind: Kind, id: &str) -> Option<&mut TreeNode> {
        self.children
            .iter_mut()
            .find(|c| c.kind == kind && c.id == id)
    }

    pub fn status(&self) -> Option<&str> {
        self.extras.get(STATUS_KEY).map(String::as_str)
    }

    pub fn set_status(&mut self, status: NodeStatus) {
        self.extras
            .insert(STATUS_KEY.to_string(), status.as_str().to_string());
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of nodes of the given kind in this subtree, self included.
    pub fn count(&self, kind: Kind) -> usize {
        let own = usize::from(self.kind == kind);
        own + self.children.iter().map(|c| c.count(kind)).sum::<usize>()
    }

    /// Depth of the deepest node below this one; a leaf has depth 0.
    pub fn max_depth(&self) -> usize {
        self.children
            .iter()
            .map(|c| c.max_depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Order children by kind then id, recursively, so dumps are stable.
    pub fn sort(&mut self) {
        self.children
            .sort_by(|a, b| (a.kind.as_str(), &a.id).cmp(&(b.kind.as_str(), &b.id)));
        for child in self.children.iter_mut() {
            child.sort();
        }
    }
}
