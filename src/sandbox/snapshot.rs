//! Snapshot/diff sandbox for hosts without fine-grained interception.
//!
//! Module code runs against the real global namespace. Activation records a
//! baseline and replays the module's previous divergence; deactivation
//! records what changed and puts the baseline back.
//!
//! Any change made by the host or another module while this sandbox is
//! active is indistinguishable from the module's own and is captured and
//! restored as such.

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::config::types::SandboxKind;
use crate::namespace::{GlobalNamespace, NamespaceOps, PropertyDescriptor, PropertyKey, Value};
use crate::sandbox::env::SandboxEnv;
use crate::sandbox::traits::Sandbox;

/// Tracked even when not enumerable, for older hosts that hide it.
pub const LEGACY_TRACKED_KEY: &str = "clearInterval";

/// Divergence recorded at deactivation: `None` marks a key the module removed.
pub type ModifiedProps = IndexMap<PropertyKey, Option<Value>>;

/// A tracked key as it stood at activation.
#[derive(Debug, Clone)]
struct Baseline {
    value: Value,
    descriptor: PropertyDescriptor,
}

#[derive(Debug)]
pub struct SnapshotSandbox {
    name: String,
    env: SandboxEnv,
    running: bool,
    snapshot: IndexMap<PropertyKey, Baseline>,
    modified: ModifiedProps,
}

impl SnapshotSandbox {
    pub fn new(name: impl Into<String>, env: &SandboxEnv) -> Self {
        let name = name.into();
        debug!(sandbox = %name, "Created snapshot sandbox");
        Self {
            name,
            env: env.clone(),
            running: false,
            snapshot: IndexMap::new(),
            modified: IndexMap::new(),
        }
    }

    /// Divergence recorded by the last deactivation.
    pub fn modified_props(&self) -> &ModifiedProps {
        &self.modified
    }

    fn global(&self) -> &GlobalNamespace {
        self.env.global()
    }
}

fn tracked_keys(global: &GlobalNamespace) -> Vec<PropertyKey> {
    let mut keys = global.enumerable_keys();
    let legacy = PropertyKey::from(LEGACY_TRACKED_KEY);
    if global.has_own_property(&legacy) && !keys.contains(&legacy) {
        keys.push(legacy);
    }
    keys
}

impl Sandbox for SnapshotSandbox {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SandboxKind {
        SandboxKind::Snapshot
    }

    fn proxy(&self) -> &dyn NamespaceOps {
        self.env.global()
    }

    fn activate(&mut self) {
        let global = self.env.global();

        self.snapshot = tracked_keys(global)
            .into_iter()
            .filter_map(|key| {
                let descriptor = global.get_own_property(&key)?;
                let value = global.get(&key);
                Some((key, Baseline { value, descriptor }))
            })
            .collect();

        // Restore this module's divergence from its last deactivation.
        for (key, value) in &self.modified {
            match value {
                Some(value) => global.set(key, value.clone()),
                None => global.delete(key),
            };
        }

        self.running = true;
        debug!(
            sandbox = %self.name,
            baseline = self.snapshot.len(),
            replayed = self.modified.len(),
            "Activated snapshot sandbox"
        );
    }

    fn deactivate(&mut self) {
        if !self.running {
            debug!(sandbox = %self.name, "Snapshot sandbox is not active");
            return;
        }

        let global = self.global().clone();
        self.modified.clear();

        for key in tracked_keys(&global) {
            let current = global.get(&key);
            match self.snapshot.get(&key) {
                Some(baseline) if baseline.value == current => {}
                Some(baseline) => {
                    let value = baseline.value.clone();
                    self.modified.insert(key.clone(), Some(current));
                    global.set(&key, value);
                }
                None => {
                    self.modified.insert(key.clone(), Some(current));
                    global.delete(&key);
                }
            }
        }

        for (key, baseline) in &self.snapshot {
            if !global.has_own_property(key) {
                self.modified.insert(key.clone(), None);
                global.define_property(key, baseline.descriptor.clone());
            }
        }

        if self.env.options().development {
            let keys: Vec<String> = self.modified.keys().map(ToString::to_string).collect();
            info!(sandbox = %self.name, keys = ?keys, "Origin global namespace restore...");
        }

        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn modified_keys(&self) -> Vec<PropertyKey> {
        self.modified.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::PropertyDescriptor;
    use crate::sandbox::env::SandboxOptions;

    fn key(s: &str) -> PropertyKey {
        PropertyKey::from(s)
    }

    fn setup() -> (GlobalNamespace, SandboxEnv) {
        let global = GlobalNamespace::new();
        global.insert("x", "base");
        global.insert("keep", 1);
        let env = SandboxEnv::new(global.clone(), SandboxOptions::default());
        (global, env)
    }

    #[test]
    fn test_restores_baseline_and_records_change() {
        let (global, env) = setup();
        let mut sandbox = SnapshotSandbox::new("app", &env);

        sandbox.activate();
        sandbox.proxy().set(&key("x"), Value::from("changed"));
        sandbox.deactivate();

        assert_eq!(global.get(&key("x")), Value::from("base"));
        assert_eq!(global.get(&key("keep")), Value::from(1));
        assert_eq!(sandbox.modified_props().len(), 1);
        assert_eq!(
            sandbox.modified_props().get(&key("x")),
            Some(&Some(Value::from("changed")))
        );
    }

    #[test]
    fn test_remount_replays_divergence() {
        let (global, env) = setup();
        let mut sandbox = SnapshotSandbox::new("app", &env);

        sandbox.activate();
        global.insert("x", "changed");
        global.insert("added", true);
        sandbox.deactivate();
        assert!(!global.has_own_property(&key("added")));

        sandbox.activate();
        assert_eq!(global.get(&key("x")), Value::from("changed"));
        assert_eq!(global.get(&key("added")), Value::Bool(true));
        sandbox.deactivate();
        assert_eq!(global.get(&key("x")), Value::from("base"));
    }

    #[test]
    fn test_setting_same_value_is_not_a_change() {
        let (global, env) = setup();
        global.insert("zero", 0.0);
        let mut sandbox = SnapshotSandbox::new("app", &env);

        sandbox.activate();
        global.insert("x", "base");
        global.insert("zero", -0.0);
        sandbox.deactivate();
        assert!(sandbox.modified_props().is_empty());
    }

    #[test]
    fn test_nan_never_equals_its_baseline() {
        let (global, env) = setup();
        global.insert("nan", f64::NAN);
        let mut sandbox = SnapshotSandbox::new("app", &env);

        sandbox.activate();
        sandbox.deactivate();
        assert_eq!(sandbox.modified_keys(), vec![key("nan")]);
        assert!(matches!(global.get(&key("nan")), Value::Number(n) if n.is_nan()));
    }

    #[test]
    fn test_deleted_baseline_key_is_restored() {
        let (global, env) = setup();
        let mut sandbox = SnapshotSandbox::new("app", &env);

        sandbox.activate();
        global.delete(&key("keep"));
        sandbox.deactivate();
        assert_eq!(global.get(&key("keep")), Value::from(1));
        assert_eq!(sandbox.modified_props().get(&key("keep")), Some(&None));

        sandbox.activate();
        assert!(!global.has_own_property(&key("keep")));
        sandbox.deactivate();
        assert!(global.has_own_property(&key("keep")));
    }

    #[test]
    fn test_legacy_key_tracked_when_hidden() {
        let (global, env) = setup();
        global.define_property(
            &key(LEGACY_TRACKED_KEY),
            PropertyDescriptor::Data {
                value: Value::from("native"),
                writable: true,
                enumerable: false,
                configurable: true,
            },
        );
        let mut sandbox = SnapshotSandbox::new("app", &env);

        sandbox.activate();
        global.set(&key(LEGACY_TRACKED_KEY), Value::from("patched"));
        sandbox.deactivate();

        assert_eq!(global.get(&key(LEGACY_TRACKED_KEY)), Value::from("native"));
        assert!(sandbox
            .modified_props()
            .contains_key(&key(LEGACY_TRACKED_KEY)));
    }

    #[test]
    fn test_deleted_key_restored_with_its_attributes() {
        let (global, env) = setup();
        global.define_property(
            &key(LEGACY_TRACKED_KEY),
            PropertyDescriptor::Data {
                value: Value::from("native"),
                writable: true,
                enumerable: false,
                configurable: true,
            },
        );
        let mut sandbox = SnapshotSandbox::new("app", &env);

        sandbox.activate();
        global.delete(&key(LEGACY_TRACKED_KEY));
        sandbox.deactivate();

        let restored = global.get_own_property(&key(LEGACY_TRACKED_KEY)).unwrap();
        assert_eq!(restored.value(), Some(&Value::from("native")));
        assert!(!restored.is_enumerable());
        assert!(!global.enumerable_keys().contains(&key(LEGACY_TRACKED_KEY)));
    }

    #[test]
    fn test_deactivate_before_activate_is_noop() {
        let (global, env) = setup();
        let mut sandbox = SnapshotSandbox::new("app", &env);
        assert!(!sandbox.is_running());

        sandbox.deactivate();
        assert_eq!(global.get(&key("x")), Value::from("base"));
        assert!(sandbox.modified_keys().is_empty());
    }

    #[test]
    fn test_proxy_is_the_global_namespace() {
        let (global, env) = setup();
        let sandbox = SnapshotSandbox::new("app", &env);
        assert_eq!(sandbox.proxy().identity(), global.identity());
        assert_eq!(sandbox.kind(), SandboxKind::Snapshot);
    }
}
