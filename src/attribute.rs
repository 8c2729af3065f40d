//! Typed, namespaced metadata for features, constraints and models.
//!
//! An [`Attribute`] is only a key: a `(namespace, name)` pair tagged with the
//! Rust type of the values it describes. Values live in an [`AttributeStore`]
//! owned by the entity they describe. Two attribute instances with the same
//! namespace and name address the same slot, whatever their origin.
//!
//! Reading never fails. A plain attribute yields `Option<T>`; a
//! [`WithDefault`] attribute falls back to its default, computed from the
//! owning entity, without writing it back to the store.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use serde::{Serialize, Serializer};

use crate::identifier::Identifier;

/// Namespace used by the built-in attributes.
pub const DEFAULT_NAMESPACE: &str = "featmodel";

/// A stored attribute value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Bool(bool),
    Integer(i64),
    Float(f64),
}

/// Conversion between a Rust type and [`AttributeValue`].
pub trait AttributeType: Sized {
    fn into_value(self) -> AttributeValue;

    /// Returns `None` if the stored value has a different type.
    fn from_value(value: &AttributeValue) -> Option<Self>;
}

impl AttributeType for String {
    fn into_value(self) -> AttributeValue {
        AttributeValue::String(self)
    }

    fn from_value(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl AttributeType for bool {
    fn into_value(self) -> AttributeValue {
        AttributeValue::Bool(self)
    }

    fn from_value(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl AttributeType for i64 {
    fn into_value(self) -> AttributeValue {
        AttributeValue::Integer(self)
    }

    fn from_value(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

impl AttributeType for f64 {
    fn into_value(self) -> AttributeValue {
        AttributeValue::Float(self)
    }

    fn from_value(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::Float(x) => Some(*x),
            _ => None,
        }
    }
}

/// The untyped lookup key of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeKey {
    pub namespace: Cow<'static, str>,
    pub name: Cow<'static, str>,
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

impl Serialize for AttributeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Describes metadata that can be attached to an entity, valued as `T`.
pub struct Attribute<T> {
    key: AttributeKey,
    _type: PhantomData<fn() -> T>,
}

impl<T> Attribute<T> {
    pub const fn new(namespace: &'static str, name: &'static str) -> Self {
        Self {
            key: AttributeKey {
                namespace: Cow::Borrowed(namespace),
                name: Cow::Borrowed(name),
            },
            _type: PhantomData,
        }
    }

    /// An attribute in [`DEFAULT_NAMESPACE`].
    pub const fn named(name: &'static str) -> Self {
        Self::new(DEFAULT_NAMESPACE, name)
    }

    /// An attribute whose namespace and name are only known at runtime.
    pub fn dynamic(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: AttributeKey {
                namespace: Cow::Owned(namespace.into()),
                name: Cow::Owned(name.into()),
            },
            _type: PhantomData,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.key.namespace
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn key(&self) -> &AttributeKey {
        &self.key
    }
}

impl<T> Clone for Attribute<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            _type: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Attribute<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("namespace", &self.key.namespace)
            .field("name", &self.key.name)
            .finish()
    }
}

impl<T> PartialEq for Attribute<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for Attribute<T> {}

impl<T> Hash for Attribute<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

/// How a [`WithDefault`] attribute produces its fallback value.
pub enum DefaultValue<T> {
    Constant(T),
    Computed(fn(&dyn Attributable) -> T),
}

/// An attribute that always has a value: stored, or derived from its owner.
pub struct WithDefault<T> {
    attribute: Attribute<T>,
    default: DefaultValue<T>,
}

impl<T> WithDefault<T> {
    pub const fn constant(attribute: Attribute<T>, value: T) -> Self {
        Self {
            attribute,
            default: DefaultValue::Constant(value),
        }
    }

    pub const fn computed(attribute: Attribute<T>, default: fn(&dyn Attributable) -> T) -> Self {
        Self {
            attribute,
            default: DefaultValue::Computed(default),
        }
    }

    pub fn attribute(&self) -> &Attribute<T> {
        &self.attribute
    }
}

impl<T: Clone> WithDefault<T> {
    pub fn default_value(&self, owner: &dyn Attributable) -> T {
        match &self.default {
            DefaultValue::Constant(value) => value.clone(),
            DefaultValue::Computed(default) => default(owner),
        }
    }
}

impl<T> fmt::Debug for WithDefault<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WithDefault")
            .field("attribute", &self.attribute)
            .finish_non_exhaustive()
    }
}

/// Attribute values owned by one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AttributeStore {
    values: BTreeMap<AttributeKey, AttributeValue>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: AttributeType>(&self, attribute: &Attribute<T>) -> Option<T> {
        self.values.get(attribute.key()).and_then(T::from_value)
    }

    /// The stored value, or the attribute's default for `owner`.
    pub fn get_or_default<T: AttributeType + Clone>(
        &self,
        attribute: &WithDefault<T>,
        owner: &dyn Attributable,
    ) -> T {
        self.get(attribute.attribute())
            .unwrap_or_else(|| attribute.default_value(owner))
    }

    /// Overwrite the value, returning the previous one.
    pub fn set<T: AttributeType>(&mut self, attribute: &Attribute<T>, value: T) -> Option<AttributeValue> {
        self.values.insert(attribute.key().clone(), value.into_value())
    }

    pub fn unset<T>(&mut self, attribute: &Attribute<T>) -> Option<AttributeValue> {
        self.values.remove(attribute.key())
    }

    pub fn contains<T>(&self, attribute: &Attribute<T>) -> bool {
        self.values.contains_key(attribute.key())
    }

    pub fn get_raw(&self, key: &AttributeKey) -> Option<&AttributeValue> {
        self.values.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AttributeKey, &AttributeValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// An entity that carries an identifier and an attribute store.
pub trait Attributable {
    fn identifier(&self) -> &Identifier;

    fn attributes(&self) -> &AttributeStore;

    fn attributes_mut(&mut self) -> &mut AttributeStore;

    fn get_attribute<T: AttributeType>(&self, attribute: &Attribute<T>) -> Option<T>
    where
        Self: Sized,
    {
        self.attributes().get(attribute)
    }

    fn get_attribute_or_default<T: AttributeType + Clone>(&self, attribute: &WithDefault<T>) -> T
    where
        Self: Sized,
    {
        self.attributes().get_or_default(attribute, self)
    }

    fn set_attribute<T: AttributeType>(&mut self, attribute: &Attribute<T>, value: T)
    where
        Self: Sized,
    {
        self.attributes_mut().set(attribute, value);
    }

    fn unset_attribute<T>(&mut self, attribute: &Attribute<T>)
    where
        Self: Sized,
    {
        self.attributes_mut().unset(attribute);
    }
}

fn identifier_name(owner: &dyn Attributable) -> String {
    format!("@{}", owner.identifier())
}

/// Human-readable name, defaulting to `@<identifier>`.
pub const NAME: WithDefault<String> = WithDefault::computed(Attribute::named("name"), identifier_name);

pub const DESCRIPTION: Attribute<String> = Attribute::named("description");

pub const ABSTRACT: WithDefault<bool> = WithDefault::constant(Attribute::named("abstract"), false);

pub const HIDDEN: WithDefault<bool> = WithDefault::constant(Attribute::named("hidden"), false);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::IdentifierFactory;

    struct Thing {
        id: Identifier,
        attributes: AttributeStore,
    }

    impl Thing {
        fn new() -> Self {
            let factory = IdentifierFactory::counter();
            factory.new_identifier();
            factory.new_identifier();
            Self {
                id: factory.new_identifier(),
                attributes: AttributeStore::new(),
            }
        }
    }

    impl Attributable for Thing {
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

    #[test]
    fn test_get_missing_is_none() {
        let store = AttributeStore::new();
        assert_eq!(store.get(&DESCRIPTION), None);
    }

    #[test]
    fn test_computed_default_uses_owner() {
        let thing = Thing::new();
        assert_eq!(thing.get_attribute_or_default(&NAME), "@3");
        assert!(!thing.attributes().contains(NAME.attribute()));
    }

    #[test]
    fn test_constant_default() {
        let thing = Thing::new();
        assert!(!thing.get_attribute_or_default(&ABSTRACT));
    }

    #[test]
    fn test_set_overwrites_and_unset_reverts() {
        let mut thing = Thing::new();
        thing.set_attribute(NAME.attribute(), "first".to_string());
        thing.set_attribute(NAME.attribute(), "second".to_string());
        assert_eq!(thing.get_attribute_or_default(&NAME), "second");

        thing.unset_attribute(NAME.attribute());
        assert_eq!(thing.get_attribute_or_default(&NAME), "@3");
    }

    #[test]
    fn test_equal_keys_are_interchangeable() {
        let mut store = AttributeStore::new();
        let declared: Attribute<i64> = Attribute::new("acme", "weight");
        let looked_up: Attribute<i64> = Attribute::dynamic("acme", "weight");
        store.set(&declared, 12);

        assert_eq!(declared, looked_up);
        assert_eq!(store.get(&looked_up), Some(12));
    }

    #[test]
    fn test_namespace_distinguishes_keys() {
        let mut store = AttributeStore::new();
        store.set(&Attribute::<bool>::new("a", "flag"), true);
        assert_eq!(store.get(&Attribute::<bool>::new("b", "flag")), None);
    }

    #[test]
    fn test_type_mismatch_reads_as_absent() {
        let mut store = AttributeStore::new();
        store.set(&Attribute::<String>::named("hidden"), "yes".to_string());
        assert_eq!(store.get(HIDDEN.attribute()), None);
    }

    #[test]
    fn test_serializes_with_qualified_keys() {
        let mut store = AttributeStore::new();
        store.set(&DESCRIPTION, "text".to_string());
        store.set(ABSTRACT.attribute(), true);
        let json = serde_json::to_value(&store).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "featmodel:abstract": true, "featmodel:description": "text" })
        );
    }
}
