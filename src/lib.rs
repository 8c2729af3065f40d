//! Feature model engine.
//!
//! This crate provides the data model for feature models: identifiers,
//! typed attributes, the feature forest and its mutation algorithms, and the
//! [`FeatureModel`] aggregate tying them together. Constraint expressions are
//! stored as opaque values supplied by the caller.
//!
//! # Usage
//!
//! ```
//! use featmodel::{FeatureModel, Identifier};
//!
//! let mut model: FeatureModel<String> = FeatureModel::new(Identifier::new_counter());
//! let car = model.add_feature("Car");
//! let engine = model.add_feature("Engine");
//!
//! let root = model.add_feature_tree_root(&car)?;
//! model.add_feature_below(root, &engine)?;
//! model.add_constraint("Car => Engine".to_string());
//!
//! print!("{}", featmodel::render::render_tree(&model));
//! # Ok::<(), featmodel::ModelError>(())
//! ```

pub mod attribute;
pub mod config;
pub mod error;
pub mod identifier;
pub mod model;
pub mod models;
pub mod render;
pub mod tree;

// Re-export commonly used types at crate root
pub use attribute::{Attributable, Attribute, AttributeStore, AttributeValue, WithDefault};
pub use config::ModelConfig;
pub use error::{ModelError, Result};
pub use identifier::{Identifier, IdentifierFactory, IdentifierScheme};
pub use model::{DeletePolicy, FeatureModel};
pub use models::{Constraint, Feature, FeatureTreeNode};
pub use tree::{FeatureTree, NodeId, TreeNode};
