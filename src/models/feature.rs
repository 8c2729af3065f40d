use serde::Serialize;

use crate::attribute::{self, Attributable, AttributeStore};
use crate::identifier::Identifier;

/// A named unit of variability.
///
/// A feature only carries its identity and metadata. Its place in the
/// hierarchy is tracked by the model's feature tree, which maps each attached
/// feature to exactly one node (see `FeatureModel::feature_node`). Freshly
/// added features are unattached until they are placed in the tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    id: Identifier,
    attributes: AttributeStore,
}

impl Feature {
    pub(crate) fn new(id: Identifier, name: impl Into<String>) -> Self {
        let mut attributes = AttributeStore::new();
        attributes.set(attribute::NAME.attribute(), name.into());
        Self { id, attributes }
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

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

    /// Abstract features structure the tree but map to no implementation.
    pub fn is_abstract(&self) -> bool {
        self.get_attribute_or_default(&attribute::ABSTRACT)
    }

    pub fn set_abstract(&mut self, value: bool) {
        self.set_attribute(attribute::ABSTRACT.attribute(), value);
    }

    pub fn is_hidden(&self) -> bool {
        self.get_attribute_or_default(&attribute::HIDDEN)
    }

    pub fn set_hidden(&mut self, value: bool) {
        self.set_attribute(attribute::HIDDEN.attribute(), value);
    }
}

impl Attributable for Feature {
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
