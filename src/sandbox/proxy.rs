//! Interception sandbox.
//!
//! Every namespace operation issued by module code goes through a
//! [`ProxyWindow`], which resolves it against a per-instance shadow namespace
//! in front of the real global namespace. Writes land in the shadow, so
//! sibling modules and the host never observe them, except for keys on the
//! escape whitelist which are mirrored to the global namespace as well.
//!
//! The shadow starts out holding a copy of every non-configurable global
//! property. Descriptor introspection must report such keys as
//! non-configurable, and that is only truthful if the exposed object
//! genuinely carries them.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexSet;
use tracing::{debug, info, warn};

use crate::config::types::SandboxKind;
use crate::namespace::{
    merge_keys, FunctionValue, GlobalNamespace, Namespace, NamespaceOps, ObjectId,
    PropertyDescriptor, PropertyKey, Value, WellKnownSymbol,
};
use crate::runtime::RunningApp;
use crate::sandbox::env::SandboxEnv;
use crate::sandbox::traits::Sandbox;

/// Identifiers that can never be overwritten; `has` answers them without a lookup.
const UNSCOPABLES: &[&str] = &[
    "undefined",
    "Array",
    "Object",
    "String",
    "Boolean",
    "Math",
    "Number",
    "Symbol",
    "parseFloat",
    "Float32Array",
];

/// Always resolve to the proxy itself.
const SELF_REFERENCES: &[&str] = &["window", "self", "globalThis"];

/// Resolve to the proxy unless the global namespace is nested in a parent.
const FRAME_REFERENCES: &[&str] = &["top", "parent"];

/// Frame references honored only under test allowances.
const TEST_FRAME_REFERENCES: &[&str] = &["mockTop", "mockSafariTop"];

/// Mirrored keys whose descriptors are loosened so reads through the proxy
/// may return the proxy instead of the original value.
const LOOSENED_MIRRORS: &[&str] = &["top", "parent", "self", "window"];

/// Where a key's descriptor was last reported from; definitions follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DescriptorTarget {
    Shadow,
    Global,
}

struct ProxyState {
    name: String,
    id: ObjectId,
    env: SandboxEnv,
    shadow: RefCell<Namespace>,
    running: Cell<bool>,
    updated_keys: RefCell<IndexSet<PropertyKey>>,
    latest_set_prop: RefCell<Option<PropertyKey>>,
    descriptor_targets: RefCell<HashMap<PropertyKey, DescriptorTarget>>,
    /// Non-configurable global keys copied into the shadow at construction.
    mirrored: HashSet<PropertyKey>,
    /// Mirrored keys backed by accessors; read from the global namespace directly.
    with_getter: HashSet<PropertyKey>,
    /// Answers `has` for protected identifiers and reads of `@@unscopables`.
    unscopables: Namespace,
    has_own_property: FunctionValue,
}

impl ProxyState {
    fn global(&self) -> &GlobalNamespace {
        self.env.global()
    }

    fn test_allowances(&self) -> bool {
        self.env.options().test_allowances
    }

    fn has_own(&self, key: &PropertyKey) -> bool {
        self.shadow.borrow().has_own_property(key) || self.global().has_own_property(key)
    }

    fn shadow_descriptor(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        self.shadow.borrow().get_own_property(key).cloned()
    }

    /// A mirrored key the module has not written still speaks for the global one.
    /// Loosened mirrors no longer match the global descriptor and stay local.
    fn mirrors_global(&self, key: &PropertyKey) -> bool {
        self.mirrored.contains(key)
            && !is_loosened(key, self.test_allowances())
            && !self.updated_keys.borrow().contains(key)
    }

    fn register_running_app(&self) {
        if self.running.get() {
            let app = RunningApp {
                name: self.name.clone(),
                proxy: self.id,
            };
            self.env.context().mark(app, self.env.tasks());
        }
    }

    /// Values that must not come from either namespace.
    fn reserved_value(&self, key: &PropertyKey) -> Option<Value> {
        if *key == WellKnownSymbol::Unscopables.key() {
            return Some(Value::Object(self.unscopables.id()));
        }
        let name = key.as_str()?;
        if SELF_REFERENCES.contains(&name) {
            return Some(Value::Object(self.id));
        }
        let is_frame = FRAME_REFERENCES.contains(&name)
            || (self.test_allowances() && TEST_FRAME_REFERENCES.contains(&name));
        if is_frame {
            // Inside an embedded frame the real parent chain is allowed through.
            if self.global().is_top_level() {
                return Some(Value::Object(self.id));
            }
            return Some(self.global().get(key));
        }
        if name == "hasOwnProperty" {
            return Some(Value::Function(self.has_own_property.clone()));
        }
        None
    }

    fn refresh_mirror(&self, key: &PropertyKey) {
        if let Some(descriptor) = self.global().get_own_property(key) {
            let descriptor = mirror_descriptor(key, descriptor, self.test_allowances());
            self.shadow
                .borrow_mut()
                .replace_own_property(key.clone(), descriptor);
        }
    }

    fn release_escape_keys(&self) {
        for key in self.env.whitelist().iter() {
            if self.has_own(key) {
                self.global().delete(key);
            }
        }
    }

    fn updated_key_names(&self) -> Vec<String> {
        self.updated_keys
            .borrow()
            .iter()
            .map(ToString::to_string)
            .collect()
    }
}

fn mirror_descriptor(
    key: &PropertyKey,
    mut descriptor: PropertyDescriptor,
    test_allowances: bool,
) -> PropertyDescriptor {
    if is_loosened(key, test_allowances) {
        descriptor.set_configurable(true);
        // Accessor descriptors stay accessors; only data ones gain writability.
        descriptor.set_writable(true);
    }
    descriptor
}

fn is_loosened(key: &PropertyKey, test_allowances: bool) -> bool {
    key.as_str().is_some_and(|name| {
        LOOSENED_MIRRORS.contains(&name)
            || (test_allowances && TEST_FRAME_REFERENCES.contains(&name))
    })
}

fn unscopables_object() -> Namespace {
    let mut object = Namespace::new();
    for name in UNSCOPABLES {
        object.define_own_property(PropertyKey::from(*name), PropertyDescriptor::data(true));
    }
    object
}

fn has_own_property_fn(state: Weak<ProxyState>) -> FunctionValue {
    FunctionValue::new("hasOwnProperty", move |_, args| {
        let Some(state) = state.upgrade() else {
            return Value::Bool(false);
        };
        let key = args
            .first()
            .map(Value::to_property_key)
            .unwrap_or_else(|| PropertyKey::from("undefined"));
        Value::Bool(state.has_own(&key))
    })
}

/// The namespace view handed to module code by a [`ProxySandbox`].
#[derive(Clone)]
pub struct ProxyWindow {
    state: Rc<ProxyState>,
}

impl fmt::Debug for ProxyWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyWindow")
            .field("name", &self.state.name)
            .field("id", &self.state.id)
            .field("running", &self.state.running.get())
            .finish_non_exhaustive()
    }
}

impl NamespaceOps for ProxyWindow {
    fn get(&self, key: &PropertyKey) -> Value {
        let state = &self.state;
        state.register_running_app();

        if let Some(value) = state.reserved_value(key) {
            return value;
        }

        let global = state.global();
        let value = if state.with_getter.contains(key) {
            global.get(key)
        } else {
            match state.shadow_descriptor(key) {
                Some(descriptor) => descriptor.read(state.id),
                None => global.get(key),
            }
        };
        state.env.rebinder().target_value(global.id(), value)
    }

    fn set(&self, key: &PropertyKey, value: Value) -> bool {
        let state = &self.state;
        if !state.running.get() {
            if state.env.options().development {
                warn!(
                    sandbox = %state.name,
                    key = %key,
                    "Set global property while sandbox is destroyed or inactive"
                );
            }
            // A suspended module's late write is dropped, never reported as failure.
            return true;
        }

        state.register_running_app();
        let global = state.global();
        let in_shadow = state.shadow.borrow().has_own_property(key);

        match global.get_own_property(key) {
            Some(existing) if !in_shadow => {
                // Keep the attributes the key already has in the global namespace.
                if let PropertyDescriptor::Data {
                    writable: true,
                    enumerable,
                    configurable,
                    ..
                } = existing
                {
                    state.shadow.borrow_mut().define_own_property(
                        key.clone(),
                        PropertyDescriptor::Data {
                            value: value.clone(),
                            writable: true,
                            enumerable,
                            configurable,
                        },
                    );
                }
            }
            _ => {
                let assignment = state.shadow.borrow_mut().assign(key, value.clone());
                assignment.finish(state.id);
            }
        }

        if state.env.whitelist().contains(key) {
            global.set(key, value);
        }

        state.updated_keys.borrow_mut().insert(key.clone());
        *state.latest_set_prop.borrow_mut() = Some(key.clone());
        true
    }

    fn has(&self, key: &PropertyKey) -> bool {
        self.state.unscopables.has_own_property(key) || self.state.has_own(key)
    }

    fn delete(&self, key: &PropertyKey) -> bool {
        let state = &self.state;
        state.register_running_app();

        // Mirrored non-configurable keys survive, and so does the record of
        // the module having written them; the delete still succeeds.
        let in_shadow = state.shadow.borrow().has_own_property(key);
        if in_shadow && state.shadow.borrow_mut().delete(key) {
            state.updated_keys.borrow_mut().shift_remove(key);
        }
        true
    }

    fn get_own_property_descriptor(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        let state = &self.state;

        if let Some(descriptor) = state.shadow_descriptor(key) {
            let target = if state.mirrors_global(key) {
                DescriptorTarget::Global
            } else {
                DescriptorTarget::Shadow
            };
            state
                .descriptor_targets
                .borrow_mut()
                .insert(key.clone(), target);
            return Some(descriptor);
        }

        let mut descriptor = state.global().get_own_property(key)?;
        state
            .descriptor_targets
            .borrow_mut()
            .insert(key.clone(), DescriptorTarget::Global);
        // The shadow lacks this key, so it cannot be reported as non-configurable.
        if !descriptor.is_configurable() {
            descriptor.set_configurable(true);
        }
        Some(descriptor)
    }

    fn define_property(&self, key: &PropertyKey, descriptor: PropertyDescriptor) -> bool {
        let state = &self.state;
        let recorded = state.descriptor_targets.borrow().get(key).copied();
        let target = recorded.unwrap_or_else(|| {
            if state.mirrors_global(key) {
                DescriptorTarget::Global
            } else {
                DescriptorTarget::Shadow
            }
        });

        match target {
            DescriptorTarget::Global => {
                let defined = state.global().define_property(key, descriptor);
                if defined && state.mirrored.contains(key) {
                    state.refresh_mirror(key);
                }
                defined
            }
            DescriptorTarget::Shadow => state
                .shadow
                .borrow_mut()
                .define_own_property(key.clone(), descriptor),
        }
    }

    fn own_keys(&self) -> Vec<PropertyKey> {
        let global_keys = self.state.global().own_keys();
        let shadow_keys = self.state.shadow.borrow().own_keys();
        merge_keys(global_keys, shadow_keys)
    }

    fn prototype_chain(&self) -> Vec<ObjectId> {
        self.state.global().prototype_chain()
    }

    fn identity(&self) -> ObjectId {
        self.state.id
    }
}

/// Sandbox backed by an interception proxy and a shadow namespace.
///
/// A fresh instance is already active and counted as such.
#[derive(Debug)]
pub struct ProxySandbox {
    proxy: ProxyWindow,
}

impl ProxySandbox {
    pub fn new(name: impl Into<String>, env: &SandboxEnv) -> Self {
        let name = name.into();
        let global = env.global();
        let test_allowances = env.options().test_allowances;

        let mut shadow = Namespace::new();
        let mut mirrored = HashSet::new();
        let mut with_getter = HashSet::new();
        for key in global.own_keys() {
            let Some(descriptor) = global.get_own_property(&key) else {
                continue;
            };
            if descriptor.is_configurable() {
                continue;
            }
            if descriptor.is_accessor() {
                with_getter.insert(key.clone());
            }
            let descriptor = mirror_descriptor(&key, descriptor, test_allowances);
            shadow.replace_own_property(key.clone(), descriptor);
            mirrored.insert(key);
        }

        let state = Rc::new_cyclic(|weak| ProxyState {
            name,
            id: ObjectId::next(),
            env: env.clone(),
            shadow: RefCell::new(shadow),
            running: Cell::new(true),
            updated_keys: RefCell::new(IndexSet::new()),
            latest_set_prop: RefCell::new(None),
            descriptor_targets: RefCell::new(HashMap::new()),
            mirrored,
            with_getter,
            unscopables: unscopables_object(),
            has_own_property: has_own_property_fn(weak.clone()),
        });

        let active = env.active_sandboxes().increment();
        debug!(
            sandbox = %state.name,
            mirrored = state.mirrored.len(),
            active,
            "Created proxy sandbox"
        );

        Self {
            proxy: ProxyWindow { state },
        }
    }

    /// The proxy as a concrete type.
    pub fn window(&self) -> &ProxyWindow {
        &self.proxy
    }

    /// The object returned for reads of `@@unscopables`.
    pub fn unscopables(&self) -> &Namespace {
        &self.proxy.state.unscopables
    }

    /// The most recently written key.
    pub fn latest_set_prop(&self) -> Option<PropertyKey> {
        self.proxy.state.latest_set_prop.borrow().clone()
    }
}

impl Sandbox for ProxySandbox {
    fn name(&self) -> &str {
        &self.proxy.state.name
    }

    fn kind(&self) -> SandboxKind {
        SandboxKind::Proxy
    }

    fn proxy(&self) -> &dyn NamespaceOps {
        &self.proxy
    }

    fn activate(&mut self) {
        let state = &self.proxy.state;
        if !state.running.get() {
            let active = state.env.active_sandboxes().increment();
            debug!(sandbox = %state.name, active, "Activated proxy sandbox");
        }
        state.running.set(true);
    }

    fn deactivate(&mut self) {
        let state = &self.proxy.state;
        if state.env.options().development {
            info!(
                sandbox = %state.name,
                keys = ?state.updated_key_names(),
                "Modified global properties restore..."
            );
        }

        if state.running.get() {
            let active = state.env.active_sandboxes().decrement();
            if active == 0 {
                // No sandbox is left to own the escaped keys.
                state.release_escape_keys();
            }
            debug!(sandbox = %state.name, active, "Deactivated proxy sandbox");
        }
        state.running.set(false);
    }

    fn is_running(&self) -> bool {
        self.proxy.state.running.get()
    }

    fn modified_keys(&self) -> Vec<PropertyKey> {
        self.proxy.state.updated_keys.borrow().iter().cloned().collect()
    }
}
