//! Ordinary namespace object with insertion-ordered own properties.

use indexmap::IndexMap;

use super::descriptor::PropertyDescriptor;
use super::value::{FunctionValue, ObjectId, PropertyKey, Value};

/// Result of an ordinary assignment against a single object.
///
/// Setter invocation is left to the caller so that no borrow of the object is
/// held while user code runs.
#[must_use]
pub enum Assignment {
    Stored,
    Rejected,
    Setter(FunctionValue, Value),
}

impl Assignment {
    /// Complete the assignment, running a pending setter with `receiver` as `this`.
    pub fn finish(self, receiver: ObjectId) -> bool {
        match self {
            Self::Stored => true,
            Self::Rejected => false,
            Self::Setter(setter, value) => {
                setter.call(Some(receiver), &[value]);
                true
            }
        }
    }
}

/// A key-value object with descriptor semantics.
#[derive(Debug, Clone)]
pub struct Namespace {
    id: ObjectId,
    prototype_chain: Vec<ObjectId>,
    parent: Option<ObjectId>,
    extensible: bool,
    properties: IndexMap<PropertyKey, PropertyDescriptor>,
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

impl Namespace {
    /// Empty top-level namespace with no prototype.
    pub fn new() -> Self {
        Self::with_prototype_chain(Vec::new())
    }

    /// Empty namespace whose identity chain is `chain`, nearest prototype first.
    pub fn with_prototype_chain(chain: Vec<ObjectId>) -> Self {
        Self {
            id: ObjectId::next(),
            prototype_chain: chain,
            parent: None,
            extensible: true,
            properties: IndexMap::new(),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn prototype_chain(&self) -> &[ObjectId] {
        &self.prototype_chain
    }

    /// Enclosing namespace, if this one is nested inside another.
    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn set_parent(&mut self, parent: Option<ObjectId>) {
        self.parent = parent;
    }

    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_extensible(&self) -> bool {
        self.extensible
    }

    pub fn prevent_extensions(&mut self) {
        self.extensible = false;
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn get_own_property(&self, key: &PropertyKey) -> Option<&PropertyDescriptor> {
        self.properties.get(key)
    }

    pub fn has_own_property(&self, key: &PropertyKey) -> bool {
        self.properties.contains_key(key)
    }

    /// Define or redefine a property, honoring non-configurable invariants.
    pub fn define_own_property(&mut self, key: PropertyKey, descriptor: PropertyDescriptor) -> bool {
        match self.properties.get_mut(&key) {
            Some(current) => {
                if !descriptor.can_replace(current) {
                    return false;
                }
                *current = descriptor;
                true
            }
            None if self.extensible => {
                self.properties.insert(key, descriptor);
                true
            }
            None => false,
        }
    }

    /// Overwrite a property without validation. Only for internal mirrors.
    pub(crate) fn replace_own_property(&mut self, key: PropertyKey, descriptor: PropertyDescriptor) {
        self.properties.insert(key, descriptor);
    }

    /// Ordinary `[[Set]]` restricted to own properties.
    pub fn assign(&mut self, key: &PropertyKey, value: Value) -> Assignment {
        match self.properties.get_mut(key) {
            Some(PropertyDescriptor::Data {
                value: slot,
                writable: true,
                ..
            }) => {
                *slot = value;
                Assignment::Stored
            }
            Some(PropertyDescriptor::Data { .. }) => Assignment::Rejected,
            Some(PropertyDescriptor::Accessor { set: Some(setter), .. }) => {
                Assignment::Setter(setter.clone(), value)
            }
            Some(PropertyDescriptor::Accessor { set: None, .. }) => Assignment::Rejected,
            None if self.extensible => {
                self.properties
                    .insert(key.clone(), PropertyDescriptor::data(value));
                Assignment::Stored
            }
            None => Assignment::Rejected,
        }
    }

    /// Remove a property. Absent keys succeed; non-configurable ones fail.
    pub fn delete(&mut self, key: &PropertyKey) -> bool {
        match self.properties.get(key) {
            None => true,
            Some(descriptor) if !descriptor.is_configurable() => false,
            Some(_) => {
                self.properties.shift_remove(key);
                true
            }
        }
    }

    /// Own keys in host order: array indices ascending, then strings, then
    /// symbols, each in insertion order.
    pub fn own_keys(&self) -> Vec<PropertyKey> {
        let mut indices: Vec<(u32, &PropertyKey)> = self
            .properties
            .keys()
            .filter_map(|k| k.array_index().map(|i| (i, k)))
            .collect();
        indices.sort_by_key(|(i, _)| *i);

        let strings = self
            .properties
            .keys()
            .filter(|k| matches!(k, PropertyKey::String(_)) && k.array_index().is_none());
        let symbols = self
            .properties
            .keys()
            .filter(|k| matches!(k, PropertyKey::Symbol(_)));

        indices
            .into_iter()
            .map(|(_, k)| k)
            .chain(strings)
            .chain(symbols)
            .cloned()
            .collect()
    }

    /// Enumerable string keys, in own-key order.
    pub fn enumerable_keys(&self) -> Vec<PropertyKey> {
        self.own_keys()
            .into_iter()
            .filter(|k| matches!(k, PropertyKey::String(_)))
            .filter(|k| {
                self.properties
                    .get(k)
                    .map(PropertyDescriptor::is_enumerable)
                    .unwrap_or(false)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> PropertyKey {
        PropertyKey::from(s)
    }

    #[test]
    fn test_assign_creates_and_updates() {
        let mut ns = Namespace::new();
        assert!(ns.assign(&key("a"), Value::from(1)).finish(ns.id()));
        assert!(ns.assign(&key("a"), Value::from(2)).finish(ns.id()));
        assert_eq!(
            ns.get_own_property(&key("a")).and_then(|d| d.value().cloned()),
            Some(Value::from(2))
        );
    }

    #[test]
    fn test_assign_rejects_read_only() {
        let mut ns = Namespace::new();
        ns.define_own_property(key("NaN"), PropertyDescriptor::data_frozen(f64::NAN));
        assert!(!ns.assign(&key("NaN"), Value::from(1)).finish(ns.id()));

        ns.prevent_extensions();
        assert!(!ns.assign(&key("fresh"), Value::from(1)).finish(ns.id()));
    }

    #[test]
    fn test_delete_semantics() {
        let mut ns = Namespace::new();
        ns.define_own_property(key("fixed"), PropertyDescriptor::data_frozen(1));
        let _ = ns.assign(&key("loose"), Value::from(1));

        assert!(ns.delete(&key("missing")));
        assert!(!ns.delete(&key("fixed")));
        assert!(ns.delete(&key("loose")));
        assert!(!ns.has_own_property(&key("loose")));
    }

    #[test]
    fn test_own_key_order() {
        let mut ns = Namespace::new();
        for k in ["b", "2", "a", "1"] {
            let _ = ns.assign(&key(k), Value::Null);
        }
        let _ = ns.assign(&PropertyKey::Symbol(crate::namespace::value::SymbolId(9)), Value::Null);
        let _ = ns.assign(&key("c"), Value::Null);

        let keys: Vec<String> = ns.own_keys().iter().map(ToString::to_string).collect();
        assert_eq!(keys, ["1", "2", "b", "a", "c", "Symbol(9)"]);
    }

    #[test]
    fn test_enumerable_keys_skip_hidden() {
        let mut ns = Namespace::new();
        let _ = ns.assign(&key("shown"), Value::Null);
        ns.define_own_property(key("hidden"), PropertyDescriptor::data_frozen(1));
        assert_eq!(ns.enumerable_keys(), vec![key("shown")]);
    }
}
