//! The shared namespace and the capability set every view of it exposes.

mod descriptor;
mod object;
pub mod value;

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexSet;

pub use descriptor::PropertyDescriptor;
pub use object::{Assignment, Namespace};
pub use value::{
    FunctionId, FunctionKind, FunctionValue, ObjectId, PropertyKey, SymbolId, Value,
    WellKnownSymbol,
};

/// One method per namespace operation.
///
/// Implemented by the unmediated [`GlobalNamespace`] and by the interception
/// proxy, so module code cannot tell which one it was handed.
pub trait NamespaceOps {
    /// Read a property value.
    fn get(&self, key: &PropertyKey) -> Value;

    /// Assign a property. Returns whether the assignment was accepted.
    fn set(&self, key: &PropertyKey, value: Value) -> bool;

    /// The `in` check.
    fn has(&self, key: &PropertyKey) -> bool;

    fn delete(&self, key: &PropertyKey) -> bool;

    fn get_own_property_descriptor(&self, key: &PropertyKey) -> Option<PropertyDescriptor>;

    fn define_property(&self, key: &PropertyKey, descriptor: PropertyDescriptor) -> bool;

    /// Own keys, deduplicated, in host order.
    fn own_keys(&self) -> Vec<PropertyKey>;

    /// Identity chain used for type and instance checks, nearest first.
    fn prototype_chain(&self) -> Vec<ObjectId>;

    /// Identity of the object handed to module code.
    fn identity(&self) -> ObjectId;

    fn get_prototype_of(&self) -> Option<ObjectId> {
        self.prototype_chain().first().copied()
    }

    /// `value instanceof Ctor` where `Ctor.prototype` is `prototype`.
    fn instance_of(&self, prototype: ObjectId) -> bool {
        self.prototype_chain().contains(&prototype)
    }
}

/// Handle to the one process-wide namespace.
///
/// Cloning the handle shares the underlying namespace.
#[derive(Debug, Clone)]
pub struct GlobalNamespace {
    id: ObjectId,
    inner: Rc<RefCell<Namespace>>,
}

impl Default for GlobalNamespace {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalNamespace {
    pub fn new() -> Self {
        Self::from_namespace(Namespace::new())
    }

    pub fn from_namespace(namespace: Namespace) -> Self {
        Self {
            id: namespace.id(),
            inner: Rc::new(RefCell::new(namespace)),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Whether this namespace has no enclosing parent.
    pub fn is_top_level(&self) -> bool {
        self.inner.borrow().is_top_level()
    }

    /// Nest this namespace inside another (e.g. an embedded frame).
    pub fn set_parent(&self, parent: Option<ObjectId>) {
        self.inner.borrow_mut().set_parent(parent);
    }

    pub fn get_own_property(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        self.inner.borrow().get_own_property(key).cloned()
    }

    pub fn has_own_property(&self, key: &PropertyKey) -> bool {
        self.inner.borrow().has_own_property(key)
    }

    pub fn enumerable_keys(&self) -> Vec<PropertyKey> {
        self.inner.borrow().enumerable_keys()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    /// Convenience for seeding: plain assignment by string key.
    pub fn insert(&self, key: &str, value: impl Into<Value>) -> bool {
        self.set(&PropertyKey::from(key), value.into())
    }
}

impl NamespaceOps for GlobalNamespace {
    fn get(&self, key: &PropertyKey) -> Value {
        // Accessors run with no borrow of the namespace outstanding.
        match self.get_own_property(key) {
            Some(descriptor) => descriptor.read(self.id),
            None => Value::Undefined,
        }
    }

    fn set(&self, key: &PropertyKey, value: Value) -> bool {
        let assignment = self.inner.borrow_mut().assign(key, value);
        assignment.finish(self.id)
    }

    fn has(&self, key: &PropertyKey) -> bool {
        self.has_own_property(key)
    }

    fn delete(&self, key: &PropertyKey) -> bool {
        self.inner.borrow_mut().delete(key)
    }

    fn get_own_property_descriptor(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        self.get_own_property(key)
    }

    fn define_property(&self, key: &PropertyKey, descriptor: PropertyDescriptor) -> bool {
        self.inner
            .borrow_mut()
            .define_own_property(key.clone(), descriptor)
    }

    fn own_keys(&self) -> Vec<PropertyKey> {
        self.inner.borrow().own_keys()
    }

    fn prototype_chain(&self) -> Vec<ObjectId> {
        self.inner.borrow().prototype_chain().to_vec()
    }

    fn identity(&self) -> ObjectId {
        self.id()
    }
}

/// Order-preserving union of two key lists.
pub(crate) fn merge_keys(first: Vec<PropertyKey>, second: Vec<PropertyKey>) -> Vec<PropertyKey> {
    first
        .into_iter()
        .chain(second)
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}
