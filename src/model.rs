//! The feature model aggregate.
//!
//! A [`FeatureModel`] owns its features, the forest arranging them, and its
//! constraints. All changes go through its methods so the feature index and
//! the tree stay in step.

use std::collections::HashMap;
use std::fmt;

use crate::attribute::{self, Attributable, AttributeStore};
use crate::config::ModelConfig;
use crate::error::{ModelError, Result};
use crate::identifier::Identifier;
use crate::models::{Constraint, Feature, FeatureTreeNode};
use crate::tree::{FeatureTree, NodeId};

/// Decides whether `delete_feature_and_promote_children` may remove a feature.
pub type DeletePolicy = Box<dyn Fn(&Feature) -> bool + Send + Sync>;

/// Entities keyed by identifier, iterated in insertion order.
#[derive(Debug, Clone)]
struct Index<T> {
    entries: HashMap<Identifier, T>,
    order: Vec<Identifier>,
}

impl<T> Default for Index<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<T> Index<T> {
    fn insert(&mut self, id: Identifier, value: T) {
        if self.entries.insert(id.clone(), value).is_none() {
            self.order.push(id);
        }
    }

    fn get(&self, id: &Identifier) -> Option<&T> {
        self.entries.get(id)
    }

    fn get_mut(&mut self, id: &Identifier) -> Option<&mut T> {
        self.entries.get_mut(id)
    }

    fn contains(&self, id: &Identifier) -> bool {
        self.entries.contains_key(id)
    }

    fn remove(&mut self, id: &Identifier) -> Option<T> {
        let value = self.entries.remove(id)?;
        self.order.retain(|entry| entry != id);
        Some(value)
    }

    fn iter(&self) -> impl Iterator<Item = &T> {
        self.order.iter().filter_map(move |id| self.entries.get(id))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A feature model: features, their hierarchy, and constraints over them.
///
/// Every identifier inside the model is minted from the factory of the
/// model's own identifier, so all of them are pairwise distinct.
///
/// # Example
///
/// ```
/// use featmodel::{FeatureModel, Identifier};
///
/// let mut model: FeatureModel<&str> = FeatureModel::new(Identifier::new_counter());
/// let root = model.add_feature("root");
/// let child = model.add_feature("child");
/// let root_node = model.add_feature_tree_root(&root)?;
/// model.add_feature_below(root_node, &child)?;
///
/// model.delete_feature_and_promote_children(&root)?;
/// assert_eq!(model.root_features().next().map(|f| f.name()), Some("child".to_string()));
/// # Ok::<(), featmodel::ModelError>(())
/// ```
pub struct FeatureModel<E> {
    id: Identifier,
    attributes: AttributeStore,
    features: Index<Feature>,
    tree: FeatureTree,
    constraints: Index<Constraint<E>>,
    delete_policy: DeletePolicy,
}

impl<E> FeatureModel<E> {
    pub fn new(id: Identifier) -> Self {
        Self {
            id,
            attributes: AttributeStore::new(),
            features: Index::default(),
            tree: FeatureTree::new(),
            constraints: Index::default(),
            delete_policy: Box::new(|_: &Feature| true),
        }
    }

    /// A model whose identifier comes from a fresh factory of the configured scheme.
    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(config.identifier_factory().new_identifier())
    }

    /// Replace the delete policy. The default policy always allows deletion.
    pub fn with_delete_policy(mut self, policy: impl Fn(&Feature) -> bool + Send + Sync + 'static) -> Self {
        self.set_delete_policy(policy);
        self
    }

    pub fn set_delete_policy(&mut self, policy: impl Fn(&Feature) -> bool + Send + Sync + 'static) {
        self.delete_policy = Box::new(policy);
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

    // ============================================================
    // Common attributes
    // ============================================================

    /// The stored name, or `@<identifier>` if none was set.
    pub fn name(&self) -> String {
        self.get_attribute_or_default(&attribute::NAME)
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.set_attribute(attribute::NAME.attribute(), name.into());
    }

    pub fn description(&self) -> Option<String> {
        self.get_attribute(&attribute::DESCRIPTION)
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.set_attribute(&attribute::DESCRIPTION, description.into());
    }

    // ============================================================
    // Features
    // ============================================================

    /// Create an unattached feature named `name` and return its identifier.
    pub fn add_feature(&mut self, name: impl Into<String>) -> Identifier {
        let id = self.id.new_identifier();
        let feature = Feature::new(id.clone(), name);
        tracing::debug!("Added feature {} ({})", feature.name(), id);
        self.features.insert(id.clone(), feature);
        id
    }

    pub fn get_feature(&self, id: &Identifier) -> Option<&Feature> {
        self.features.get(id)
    }

    /// Mutable access to a feature's metadata. Its tree placement is only
    /// changed through the model.
    pub fn feature_mut(&mut self, id: &Identifier) -> Option<&mut Feature> {
        self.features.get_mut(id)
    }

    pub fn has_feature(&self, id: &Identifier) -> bool {
        self.features.contains(id)
    }

    /// The first feature, in insertion order, whose name is `name`.
    pub fn feature_by_name(&self, name: &str) -> Option<&Feature> {
        self.features.iter().find(|feature| feature.name() == name)
    }

    /// All features in insertion order, attached or not.
    pub fn features(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    pub fn number_of_features(&self) -> usize {
        self.features.len()
    }

    /// Remove a feature from the model.
    ///
    /// If the feature is in the tree, its node and whole subtree are detached
    /// first; the descendants' features stay in the model, unattached.
    pub fn remove_feature(&mut self, id: &Identifier) -> Result<Feature> {
        if !self.features.contains(id) {
            return Err(ModelError::UnknownFeature(id.clone()));
        }
        if let Some(node) = self.tree.node_of(id) {
            self.tree.remove(node)?;
        }
        let feature = self
            .features
            .remove(id)
            .ok_or_else(|| ModelError::UnknownFeature(id.clone()))?;
        tracing::debug!("Removed feature {} ({})", feature.name(), id);
        Ok(feature)
    }

    /// Delete a feature, moving its children into the place it occupied.
    ///
    /// The delete policy is consulted once. If it declines, nothing changes
    /// and `Ok(false)` is returned. Otherwise the feature's children (with
    /// their subtrees) take its position in order, the feature leaves the
    /// model, and `Ok(true)` is returned.
    pub fn delete_feature_and_promote_children(&mut self, id: &Identifier) -> Result<bool> {
        let feature = self
            .features
            .get(id)
            .ok_or_else(|| ModelError::UnknownFeature(id.clone()))?;

        if !self.should_delete_root_feature(feature) {
            tracing::info!("Delete policy kept feature {} ({})", feature.name(), id);
            return Ok(false);
        }

        if let Some(node) = self.tree.node_of(id) {
            self.tree.remove_and_promote(node)?;
        }
        if let Some(feature) = self.features.remove(id) {
            tracing::debug!(
                "Deleted feature {} ({}) and promoted its children",
                feature.name(),
                id
            );
        }
        Ok(true)
    }

    fn should_delete_root_feature(&self, feature: &Feature) -> bool {
        (self.delete_policy)(feature)
    }

    // ============================================================
    // Feature tree
    // ============================================================

    /// The forest arranging the features, for structural queries.
    pub fn tree(&self) -> &FeatureTree {
        &self.tree
    }

    pub fn roots(&self) -> &[NodeId] {
        self.tree.roots()
    }

    /// Features of the root nodes, in root order.
    pub fn root_features(&self) -> impl Iterator<Item = &Feature> {
        self.tree
            .roots()
            .iter()
            .filter_map(move |&node| self.node_feature(node))
    }

    /// The node currently representing the feature, if it is attached.
    pub fn feature_node(&self, id: &Identifier) -> Option<NodeId> {
        self.tree.node_of(id)
    }

    pub fn node_feature(&self, node: NodeId) -> Option<&Feature> {
        self.tree.feature(node).and_then(|id| self.features.get(id))
    }

    /// Features of the children of `node`, in order.
    pub fn child_features(&self, node: NodeId) -> Vec<&Feature> {
        self.tree
            .children(node)
            .iter()
            .filter_map(|&child| self.node_feature(child))
            .collect()
    }

    pub fn add_feature_tree_root(&mut self, feature: &Identifier) -> Result<NodeId> {
        self.ensure_feature(feature)?;
        self.tree.add_root(feature.clone())
    }

    pub fn add_feature_below(&mut self, parent: NodeId, feature: &Identifier) -> Result<NodeId> {
        self.ensure_feature(feature)?;
        self.tree.add_below(parent, feature.clone())
    }

    pub fn add_feature_below_at(
        &mut self,
        parent: NodeId,
        index: usize,
        feature: &Identifier,
    ) -> Result<NodeId> {
        self.ensure_feature(feature)?;
        self.tree.add_below_at(parent, index, feature.clone())
    }

    /// Detach `node` and its subtree from the tree. The features stay in the
    /// model, unattached; their identifiers are returned in pre-order.
    pub fn remove_from_tree(&mut self, node: NodeId) -> Result<Vec<Identifier>> {
        self.tree.remove(node)
    }

    /// Move `node` with its subtree below `new_parent`, or to the roots.
    pub fn move_feature_below(&mut self, node: NodeId, new_parent: Option<NodeId>) -> Result<()> {
        self.tree.move_below(node, new_parent)
    }

    /// A snapshot of the whole forest.
    pub fn snapshot(&self) -> Vec<FeatureTreeNode> {
        self.tree
            .roots()
            .iter()
            .filter_map(|&node| self.snapshot_node(node))
            .collect()
    }

    /// A snapshot of the subtree rooted at `node`.
    pub fn snapshot_node(&self, node: NodeId) -> Option<FeatureTreeNode> {
        let feature = self.node_feature(node)?.clone();
        let children = self
            .tree
            .children(node)
            .iter()
            .filter_map(|&child| self.snapshot_node(child))
            .collect();
        Some(FeatureTreeNode {
            node,
            feature,
            children,
        })
    }

    fn ensure_feature(&self, id: &Identifier) -> Result<()> {
        if !self.features.contains(id) {
            return Err(ModelError::UnknownFeature(id.clone()));
        }
        Ok(())
    }

    // ============================================================
    // Constraints
    // ============================================================

    pub fn add_constraint(&mut self, expression: E) -> Identifier {
        let id = self.id.new_identifier();
        tracing::debug!("Added constraint {}", id);
        self.constraints
            .insert(id.clone(), Constraint::new(id.clone(), expression));
        id
    }

    pub fn get_constraint(&self, id: &Identifier) -> Option<&Constraint<E>> {
        self.constraints.get(id)
    }

    pub fn constraint_mut(&mut self, id: &Identifier) -> Option<&mut Constraint<E>> {
        self.constraints.get_mut(id)
    }

    pub fn has_constraint(&self, id: &Identifier) -> bool {
        self.constraints.contains(id)
    }

    /// Remove a constraint. Unknown identifiers are ignored.
    pub fn remove_constraint(&mut self, id: &Identifier) -> Option<Constraint<E>> {
        let removed = self.constraints.remove(id);
        match &removed {
            Some(_) => tracing::debug!("Removed constraint {}", id),
            None => tracing::warn!("Constraint {} not found, nothing removed", id),
        }
        removed
    }

    pub fn constraints(&self) -> impl Iterator<Item = &Constraint<E>> {
        self.constraints.iter()
    }

    pub fn number_of_constraints(&self) -> usize {
        self.constraints.len()
    }
}

impl<E: PartialEq> FeatureModel<E> {
    /// Whether any constraint carries an expression equal to `expression`.
    pub fn has_constraint_expression(&self, expression: &E) -> bool {
        self.constraints
            .iter()
            .any(|constraint| constraint.expression() == expression)
    }
}

impl<E> Attributable for FeatureModel<E> {
    fn identifier(&self) -> &Identifier {
        &self.id
    }

    fn attributes(&self) -> &AttributeStore {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut AttributeStore {
        &mut self.attributes
    }
}

impl<E: fmt::Debug> fmt::Debug for FeatureModel<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureModel")
            .field("id", &self.id)
            .field("attributes", &self.attributes)
            .field("features", &self.features)
            .field("tree", &self.tree)
            .field("constraints", &self.constraints)
            .finish_non_exhaustive()
    }
}
