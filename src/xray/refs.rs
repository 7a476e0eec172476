//! Reference resolution shared by every renderer.
//!
//! A reference that cannot be resolved is a fact about the cluster, not a
//! failure of the tree builder, so nothing here returns an error.  The outcome
//! is recorded on the node: `ok` when found, `noref` when a required target is
//! missing, and no status at all for a missing optional target.

use crate::abstract_factory::{Factory, LabelSelector};
use crate::kinds::Kind;

use super::tree_node::{NodeStatus, TreeNode};

/// Attach a resolved node for `(kind, id)` under `parent` unless `parent`
/// already has one.
pub async fn add_ref(
    factory: &(dyn Factory + Send + Sync),
    parent: &mut TreeNode,
    kind: Kind,
    id: String,
    optional: Option<bool>,
) {
    if parent.find(kind, &id).is_some() {
        return;
    }

    let mut node = TreeNode::new(kind, id);
    validate(factory, &mut node, optional).await;
    parent.add(node);
}

/// Look the node up in live state, bypassing any cache, and record the
/// result in its extras.
pub async fn validate(
    factory: &(dyn Factory + Send + Sync),
    node: &mut TreeNode,
    optional: Option<bool>,
) {
    match factory
        .get(node.kind, &node.id, true, &LabelSelector::Everything)
        .await
    {
        Ok(Some(_)) => node.set_status(NodeStatus::Ok),
        Ok(None) => missing(node, optional, None),
        Err(err) => missing(node, optional, Some(err.to_string())),
    }
}

fn missing(node: &mut TreeNode, optional: Option<bool>, err: Option<String>) {
    if optional.unwrap_or(false) {
        return;
    }
    warn!(kind = %node.kind, id = %node.id, err = ?err, "Missing ref");
    node.set_status(NodeStatus::MissingRef);
}
