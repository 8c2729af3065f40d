use serde::Serialize;

use crate::attribute::{Attributable, AttributeStore};
use crate::identifier::Identifier;

/// A logical restriction over feature selection.
///
/// The expression is owned by whatever logic component produced it; the model
/// stores it as-is and only ever compares it for equality.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constraint<E> {
    id: Identifier,
    expression: E,
    attributes: AttributeStore,
}

impl<E> Constraint<E> {
    pub(crate) fn new(id: Identifier, expression: E) -> Self {
        Self {
            id,
            expression,
            attributes: AttributeStore::new(),
        }
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

    pub fn expression(&self) -> &E {
        &self.expression
    }

    /// Replace the expression, returning the previous one.
    pub fn set_expression(&mut self, expression: E) -> E {
        std::mem::replace(&mut self.expression, expression)
    }
}

impl<E> Attributable for Constraint<E> {
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
