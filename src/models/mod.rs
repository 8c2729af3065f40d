//! Entities owned by a feature model.
//!
//! - [`Feature`]: a named unit of variability with typed metadata.
//! - [`Constraint`]: an opaque logical expression restricting feature selection.
//! - [`FeatureTreeNode`]: a serializable snapshot of a subtree, for display and
//!   comparison. The live hierarchy is the arena in [`crate::tree`].

mod constraint;
mod feature;
mod tree_node;

pub use constraint::*;
pub use feature::*;
pub use tree_node::*;
