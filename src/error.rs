use thiserror::Error;

use crate::identifier::{Identifier, IdentifierScheme};
use crate::tree::NodeId;

/// Errors raised by feature model operations.
///
/// Lookups that simply find nothing return `None` instead of an error.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Malformed {scheme} identifier: {input:?}")]
    MalformedIdentifier {
        scheme: IdentifierScheme,
        input: String,
    },

    #[error("No {0} identifiers left to issue")]
    IdentifiersExhausted(IdentifierScheme),

    #[error("Unknown identifier scheme: {0:?}")]
    InvalidScheme(String),

    #[error("Feature {0} is already part of the feature tree")]
    FeatureAlreadyInTree(Identifier),

    #[error("Cannot move node {node} below itself or its descendant {target}")]
    CyclicMove { node: NodeId, target: NodeId },

    #[error("Feature not found: {0}")]
    UnknownFeature(Identifier),

    #[error("Tree node not found: {0}")]
    UnknownNode(NodeId),

    #[error("Position {index} is out of bounds for {len} siblings")]
    InvalidPosition { index: usize, len: usize },

    #[error("Feature tree is inconsistent: {0}")]
    InvalidTree(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
