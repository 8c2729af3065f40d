//! The feature forest: an arena of tree nodes, each wrapping one feature.
//!
//! Nodes are addressed by [`NodeId`] handles rather than references, so
//! detaching or promoting a subtree only rewrites indices. Handles are never
//! reused; a handle to a removed node resolves to nothing.
//!
//! Every node sits in exactly one place: its parent's child list, or the root
//! sequence when it has no parent. The forest also keeps the reverse index
//! from feature to node, which is how a feature finds its place in the tree.
//! Mutations check all preconditions before touching any link, so a failed
//! call leaves the forest unchanged.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::error::{ModelError, Result};
use crate::identifier::Identifier;

/// Handle to a node in a [`FeatureTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One position in the feature hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    feature: Identifier,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl TreeNode {
    pub fn feature(&self) -> &Identifier {
        &self.feature
    }

    /// `None` for roots.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// An ordered forest of feature tree nodes.
#[derive(Debug, Clone, Default)]
pub struct FeatureTree {
    nodes: HashMap<NodeId, TreeNode>,
    roots: Vec<NodeId>,
    membership: HashMap<Identifier, NodeId>,
    next_node: u64,
}

impl FeatureTree {
    pub fn new() -> Self {
        Self::default()
    }

    // ============================================================
    // Queries
    // ============================================================

    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(&id)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// The node currently representing `feature`, if it is in the tree.
    pub fn node_of(&self, feature: &Identifier) -> Option<NodeId> {
        self.membership.get(feature).copied()
    }

    pub fn contains_feature(&self, feature: &Identifier) -> bool {
        self.membership.contains_key(feature)
    }

    pub fn feature(&self, id: NodeId) -> Option<&Identifier> {
        self.nodes.get(&id).map(TreeNode::feature)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(TreeNode::parent)
    }

    /// Children of `id` in order; empty for leaves and unknown nodes.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(&id).map(TreeNode::children).unwrap_or(&[])
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.children(id).is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `ancestor` lies strictly above `id`.
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Number of edges between `id` and its root.
    pub fn depth(&self, id: NodeId) -> Option<usize> {
        self.nodes.get(&id)?;
        let mut depth = 0;
        let mut current = self.parent(id);
        while let Some(node) = current {
            depth += 1;
            current = self.parent(node);
        }
        Some(depth)
    }

    /// Index of `id` among its siblings (or among the roots).
    pub fn position(&self, id: NodeId) -> Option<usize> {
        let node = self.nodes.get(&id)?;
        self.siblings(node.parent)
            .ok()?
            .iter()
            .position(|&sibling| sibling == id)
    }

    /// `id` followed by all of its descendants, in pre-order.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.nodes.contains_key(&id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// All descendants of `id`, in pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut subtree = self.subtree(id);
        if !subtree.is_empty() {
            subtree.remove(0);
        }
        subtree
    }

    // ============================================================
    // Mutations
    // ============================================================

    /// Attach an unattached feature as a new last root.
    pub fn add_root(&mut self, feature: Identifier) -> Result<NodeId> {
        self.ensure_unattached(&feature)?;
        let id = self.allocate(feature, None);
        self.roots.push(id);
        tracing::debug!("Attached feature {} as root node {}", self.nodes[&id].feature, id);
        self.debug_validate();
        Ok(id)
    }

    /// Attach an unattached feature as the last child of `parent`.
    pub fn add_below(&mut self, parent: NodeId, feature: Identifier) -> Result<NodeId> {
        let index = self.node_or_err(parent)?.children.len();
        self.add_below_at(parent, index, feature)
    }

    /// Attach an unattached feature as child number `index` of `parent`.
    pub fn add_below_at(&mut self, parent: NodeId, index: usize, feature: Identifier) -> Result<NodeId> {
        let len = self.node_or_err(parent)?.children.len();
        self.ensure_unattached(&feature)?;
        if index > len {
            return Err(ModelError::InvalidPosition { index, len });
        }

        let id = self.allocate(feature, Some(parent));
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.insert(index, id);
        }
        tracing::debug!(
            "Attached feature {} as node {} below {}",
            self.nodes[&id].feature,
            id,
            parent
        );
        self.debug_validate();
        Ok(id)
    }

    /// Detach `id` and discard its whole subtree.
    ///
    /// Returns the features that lost their tree membership, in pre-order.
    pub fn remove(&mut self, id: NodeId) -> Result<Vec<Identifier>> {
        let parent = self.node_or_err(id)?.parent;
        self.detach(id, parent)?;

        let mut released = Vec::new();
        for node_id in self.subtree(id) {
            if let Some(node) = self.nodes.remove(&node_id) {
                self.membership.remove(&node.feature);
                released.push(node.feature);
            }
        }

        tracing::debug!("Removed node {} with {} feature(s) from the tree", id, released.len());
        self.debug_validate();
        Ok(released)
    }

    /// Move `id` with its subtree to the end of `new_parent`'s children, or to
    /// the end of the roots when `new_parent` is `None`.
    pub fn move_below(&mut self, id: NodeId, new_parent: Option<NodeId>) -> Result<()> {
        let node = self.node_or_err(id)?;
        let mut index = self.siblings(new_parent)?.len();
        if node.parent == new_parent {
            index -= 1;
        }
        self.move_below_at(id, new_parent, index)
    }

    /// Move `id` with its subtree so it becomes sibling number `index` under
    /// `new_parent`. The index counts siblings after `id` left its old place.
    pub fn move_below_at(&mut self, id: NodeId, new_parent: Option<NodeId>, index: usize) -> Result<()> {
        let old_parent = self.node_or_err(id)?.parent;
        if let Some(target) = new_parent {
            self.node_or_err(target)?;
            if target == id || self.is_ancestor(id, target) {
                return Err(ModelError::CyclicMove { node: id, target });
            }
        }

        let mut len = self.siblings(new_parent)?.len();
        if old_parent == new_parent {
            len -= 1;
        }
        if index > len {
            return Err(ModelError::InvalidPosition { index, len });
        }

        self.detach(id, old_parent)?;
        self.siblings_mut(new_parent)?.insert(index, id);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = new_parent;
        }

        match new_parent {
            Some(target) => tracing::debug!("Moved node {} below {} at {}", id, target, index),
            None => tracing::debug!("Moved node {} to roots at {}", id, index),
        }
        self.debug_validate();
        Ok(())
    }

    /// Remove `id` alone, splicing its children into the place it occupied.
    ///
    /// The children keep their order and their own subtrees. Returns the
    /// feature of the removed node.
    pub fn remove_and_promote(&mut self, id: NodeId) -> Result<Identifier> {
        let (parent, children) = {
            let node = self.node_or_err(id)?;
            (node.parent, node.children.clone())
        };
        let index = self
            .siblings(parent)?
            .iter()
            .position(|&sibling| sibling == id)
            .ok_or_else(|| ModelError::InvalidTree(format!("node {} missing from its siblings", id)))?;

        self.siblings_mut(parent)?
            .splice(index..=index, children.iter().copied());
        for child in &children {
            if let Some(node) = self.nodes.get_mut(child) {
                node.parent = parent;
            }
        }
        let removed = self
            .nodes
            .remove(&id)
            .ok_or(ModelError::UnknownNode(id))?;
        self.membership.remove(&removed.feature);

        tracing::debug!(
            "Removed node {} and promoted {} child node(s) to its position",
            id,
            children.len()
        );
        self.debug_validate();
        Ok(removed.feature)
    }

    // ============================================================
    // Validity
    // ============================================================

    /// Check the structural invariants of the forest.
    ///
    /// Every node is placed exactly once (in the roots iff it has no parent),
    /// parent and child links agree, every node is reachable from a root
    /// without cycles, and the feature index points back at the right node.
    pub fn validate(&self) -> Result<()> {
        let mut placements: HashMap<NodeId, usize> = HashMap::new();

        for &root in &self.roots {
            let node = self
                .nodes
                .get(&root)
                .ok_or_else(|| ModelError::InvalidTree(format!("root {} does not exist", root)))?;
            if node.parent.is_some() {
                return Err(ModelError::InvalidTree(format!("root {} has a parent", root)));
            }
            *placements.entry(root).or_default() += 1;
        }

        for (&id, node) in &self.nodes {
            for &child in &node.children {
                let child_node = self.nodes.get(&child).ok_or_else(|| {
                    ModelError::InvalidTree(format!("child {} of {} does not exist", child, id))
                })?;
                if child_node.parent != Some(id) {
                    return Err(ModelError::InvalidTree(format!(
                        "child {} of {} points to another parent",
                        child, id
                    )));
                }
                *placements.entry(child).or_default() += 1;
            }

            if self.membership.get(&node.feature) != Some(&id) {
                return Err(ModelError::InvalidTree(format!(
                    "feature {} is not indexed at node {}",
                    node.feature, id
                )));
            }
        }

        for &id in self.nodes.keys() {
            match placements.get(&id).copied().unwrap_or(0) {
                1 => {}
                n => {
                    return Err(ModelError::InvalidTree(format!(
                        "node {} is placed {} times",
                        id, n
                    )))
                }
            }
        }

        if self.membership.len() != self.nodes.len() {
            return Err(ModelError::InvalidTree(
                "feature index and nodes disagree".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut stack: Vec<NodeId> = self.roots.clone();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                return Err(ModelError::InvalidTree(format!("node {} is reachable twice", id)));
            }
            stack.extend(self.children(id).iter().copied());
        }
        if seen.len() != self.nodes.len() {
            return Err(ModelError::InvalidTree(
                "some nodes are not reachable from a root".to_string(),
            ));
        }

        Ok(())
    }

    /// Full validation after each mutation, only under the unit tests.
    #[cfg(test)]
    fn debug_validate(&self) {
        if let Err(e) = self.validate() {
            panic!("feature tree invariant violated: {}", e);
        }
    }

    #[cfg(not(test))]
    fn debug_validate(&self) {}

    // ============================================================
    // Internals
    // ============================================================

    fn node_or_err(&self, id: NodeId) -> Result<&TreeNode> {
        self.nodes.get(&id).ok_or(ModelError::UnknownNode(id))
    }

    fn ensure_unattached(&self, feature: &Identifier) -> Result<()> {
        if self.membership.contains_key(feature) {
            return Err(ModelError::FeatureAlreadyInTree(feature.clone()));
        }
        Ok(())
    }

    fn allocate(&mut self, feature: Identifier, parent: Option<NodeId>) -> NodeId {
        self.next_node += 1;
        let id = NodeId(self.next_node);
        self.membership.insert(feature.clone(), id);
        self.nodes.insert(
            id,
            TreeNode {
                feature,
                parent,
                children: Vec::new(),
            },
        );
        id
    }

    fn siblings(&self, parent: Option<NodeId>) -> Result<&Vec<NodeId>> {
        match parent {
            None => Ok(&self.roots),
            Some(id) => Ok(&self.node_or_err(id)?.children),
        }
    }

    fn siblings_mut(&mut self, parent: Option<NodeId>) -> Result<&mut Vec<NodeId>> {
        match parent {
            None => Ok(&mut self.roots),
            Some(id) => self
                .nodes
                .get_mut(&id)
                .map(|node| &mut node.children)
                .ok_or(ModelError::UnknownNode(id)),
        }
    }

    fn detach(&mut self, id: NodeId, parent: Option<NodeId>) -> Result<()> {
        self.siblings_mut(parent)?.retain(|&sibling| sibling != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::IdentifierFactory;

    struct Fixture {
        tree: FeatureTree,
        ids: IdentifierFactory,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                tree: FeatureTree::new(),
                ids: IdentifierFactory::counter(),
            }
        }

        fn root(&mut self) -> NodeId {
            let feature = self.ids.new_identifier();
            self.tree.add_root(feature).unwrap()
        }

        fn child(&mut self, parent: NodeId) -> NodeId {
            let feature = self.ids.new_identifier();
            self.tree.add_below(parent, feature).unwrap()
        }
    }

    #[test]
    fn test_add_root_and_child() {
        let mut f = Fixture::new();
        let root = f.root();
        let child = f.child(root);

        assert_eq!(f.tree.roots(), &[root]);
        assert_eq!(f.tree.children(root), &[child]);
        assert_eq!(f.tree.parent(child), Some(root));
        assert_eq!(f.tree.depth(child), Some(1));
        assert!(f.tree.validate().is_ok());
    }

    #[test]
    fn test_feature_cannot_be_attached_twice() {
        let mut f = Fixture::new();
        let feature = f.ids.new_identifier();
        let root = f.tree.add_root(feature.clone()).unwrap();

        let err = f.tree.add_below(root, feature.clone()).unwrap_err();
        assert!(matches!(err, ModelError::FeatureAlreadyInTree(ref id) if *id == feature));
        let err = f.tree.add_root(feature).unwrap_err();
        assert!(matches!(err, ModelError::FeatureAlreadyInTree(_)));
        assert_eq!(f.tree.len(), 1);
    }

    #[test]
    fn test_add_below_at_inserts_in_order() {
        let mut f = Fixture::new();
        let root = f.root();
        let a = f.child(root);
        let b = f.child(root);
        let feature = f.ids.new_identifier();
        let middle = f.tree.add_below_at(root, 1, feature).unwrap();

        assert_eq!(f.tree.children(root), &[a, middle, b]);
        assert_eq!(f.tree.position(middle), Some(1));

        let feature = f.ids.new_identifier();
        let err = f.tree.add_below_at(root, 5, feature).unwrap_err();
        assert!(matches!(err, ModelError::InvalidPosition { index: 5, len: 3 }));
    }

    #[test]
    fn test_remove_discards_subtree() {
        let mut f = Fixture::new();
        let root = f.root();
        let child = f.child(root);
        let grandchild = f.child(child);
        let child_feature = f.tree.feature(child).cloned().unwrap();

        let released = f.tree.remove(child).unwrap();

        assert_eq!(released.len(), 2);
        assert_eq!(released[0], child_feature);
        assert!(f.tree.children(root).is_empty());
        assert!(f.tree.node(grandchild).is_none());
        assert!(!f.tree.contains_feature(&child_feature));
        assert!(matches!(f.tree.remove(child), Err(ModelError::UnknownNode(_))));
    }

    #[test]
    fn test_remove_root() {
        let mut f = Fixture::new();
        let first = f.root();
        let second = f.root();
        f.tree.remove(first).unwrap();
        assert_eq!(f.tree.roots(), &[second]);
    }

    #[test]
    fn test_move_below_rejects_cycles() {
        let mut f = Fixture::new();
        let root = f.root();
        let child = f.child(root);
        let grandchild = f.child(child);

        let err = f.tree.move_below(child, Some(child)).unwrap_err();
        assert!(matches!(err, ModelError::CyclicMove { .. }));
        let err = f.tree.move_below(root, Some(grandchild)).unwrap_err();
        assert!(matches!(err, ModelError::CyclicMove { .. }));

        assert_eq!(f.tree.children(root), &[child]);
        assert_eq!(f.tree.children(child), &[grandchild]);
    }

    #[test]
    fn test_move_below_keeps_subtree() {
        let mut f = Fixture::new();
        let root = f.root();
        let a = f.child(root);
        let b = f.child(root);
        let leaf = f.child(a);

        f.tree.move_below(a, Some(b)).unwrap();

        assert_eq!(f.tree.children(root), &[b]);
        assert_eq!(f.tree.children(b), &[a]);
        assert_eq!(f.tree.children(a), &[leaf]);
        assert_eq!(f.tree.depth(leaf), Some(3));
    }

    #[test]
    fn test_move_to_roots() {
        let mut f = Fixture::new();
        let root = f.root();
        let child = f.child(root);

        f.tree.move_below(child, None).unwrap();

        assert_eq!(f.tree.roots(), &[root, child]);
        assert_eq!(f.tree.parent(child), None);
    }

    #[test]
    fn test_move_within_same_parent() {
        let mut f = Fixture::new();
        let root = f.root();
        let a = f.child(root);
        let b = f.child(root);
        let c = f.child(root);

        f.tree.move_below(a, Some(root)).unwrap();
        assert_eq!(f.tree.children(root), &[b, c, a]);

        f.tree.move_below_at(a, Some(root), 0).unwrap();
        assert_eq!(f.tree.children(root), &[a, b, c]);

        let err = f.tree.move_below_at(a, Some(root), 3).unwrap_err();
        assert!(matches!(err, ModelError::InvalidPosition { index: 3, len: 2 }));
    }

    #[test]
    fn test_promote_children_of_inner_node() {
        let mut f = Fixture::new();
        let root = f.root();
        let first = f.child(root);
        let middle = f.child(root);
        let last = f.child(root);
        let x = f.child(middle);
        let y = f.child(middle);
        let deep = f.child(y);

        f.tree.remove_and_promote(middle).unwrap();

        assert_eq!(f.tree.children(root), &[first, x, y, last]);
        assert_eq!(f.tree.parent(x), Some(root));
        assert_eq!(f.tree.children(y), &[deep]);
        assert!(f.tree.node(middle).is_none());
    }

    #[test]
    fn test_promote_children_of_root() {
        let mut f = Fixture::new();
        let before = f.root();
        let root = f.root();
        let after = f.root();
        let a = f.child(root);
        let b = f.child(root);

        f.tree.remove_and_promote(root).unwrap();

        assert_eq!(f.tree.roots(), &[before, a, b, after]);
        assert!(f.tree.node(a).unwrap().is_root());
    }

    #[test]
    fn test_promote_leaf() {
        let mut f = Fixture::new();
        let root = f.root();
        let leaf = f.child(root);

        f.tree.remove_and_promote(leaf).unwrap();

        assert!(f.tree.is_leaf(root));
        assert_eq!(f.tree.len(), 1);
    }

    #[test]
    fn test_subtree_is_pre_order() {
        let mut f = Fixture::new();
        let root = f.root();
        let a = f.child(root);
        let a1 = f.child(a);
        let b = f.child(root);

        assert_eq!(f.tree.subtree(root), vec![root, a, a1, b]);
        assert_eq!(f.tree.descendants(root), vec![a, a1, b]);
        assert!(f.tree.is_ancestor(root, a1));
        assert!(!f.tree.is_ancestor(a1, root));
    }

    #[test]
    fn test_deep_chain_stays_valid() {
        let mut f = Fixture::new();
        let root = f.root();
        let mut last = root;
        for _ in 0..500 {
            last = f.child(last);
        }

        assert_eq!(f.tree.depth(last), Some(500));
        f.tree.move_below(last, None).unwrap();
        f.tree.remove_and_promote(root).unwrap();
        assert_eq!(f.tree.roots().len(), 2);
        assert!(f.tree.validate().is_ok());
    }
}
