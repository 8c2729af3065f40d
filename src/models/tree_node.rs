use serde::Serialize;

use super::Feature;
use crate::tree::NodeId;

/// A read-only view of one node of the feature forest with its subtree.
///
/// The `feature` fields are flattened into the serialized form, with an
/// additional `children` array containing nested `FeatureTreeNode` objects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureTreeNode {
    pub node: NodeId,
    #[serde(flatten)]
    pub feature: Feature,
    pub children: Vec<FeatureTreeNode>,
}
