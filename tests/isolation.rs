use scopebox::config::types::{SandboxConfig, SandboxKind};
use scopebox::namespace::{GlobalNamespace, NamespaceOps, PropertyDescriptor, PropertyKey, Value};
use scopebox::sandbox::{create_sandbox, Sandbox, SandboxEnv, SandboxOptions, SnapshotSandbox};
use scopebox::scenario::{parse_scenario, run_scenario};

fn key(s: &str) -> PropertyKey {
    PropertyKey::from(s)
}

fn env() -> (GlobalNamespace, SandboxEnv) {
    let global = GlobalNamespace::new();
    let env = SandboxEnv::new(global.clone(), SandboxOptions::default());
    (global, env)
}

#[test]
fn concurrent_proxies_do_not_see_each_other() {
    let (global, env) = env();
    let a = create_sandbox(SandboxKind::Proxy, "app1", &env).unwrap();
    let b = create_sandbox(SandboxKind::Proxy, "app2", &env).unwrap();

    assert!(a.proxy().set(&key("counter"), Value::from(1)));

    assert_eq!(b.proxy().get(&key("counter")), Value::Undefined);
    assert!(!b.proxy().has(&key("counter")));
    assert!(!global.has_own_property(&key("counter")));
    assert_eq!(a.proxy().get(&key("counter")), Value::from(1));
}

#[test]
fn reads_fall_through_to_global() {
    let (global, env) = env();
    global.insert("shared", "host");
    let sandbox = create_sandbox(SandboxKind::Proxy, "app", &env).unwrap();

    assert_eq!(sandbox.proxy().get(&key("shared")), Value::from("host"));
    global.insert("shared", "updated");
    assert_eq!(sandbox.proxy().get(&key("shared")), Value::from("updated"));
}

#[test]
fn escape_keys_are_shared_until_last_sandbox_leaves() {
    let (global, env) = env();
    let mut a = create_sandbox(SandboxKind::Proxy, "app1", &env).unwrap();
    let mut b = create_sandbox(SandboxKind::Proxy, "app2", &env).unwrap();

    a.proxy().set(&key("__cjsWrapper"), Value::from("wrapper"));
    assert_eq!(global.get(&key("__cjsWrapper")), Value::from("wrapper"));

    a.activate();
    assert_eq!(env.active_sandboxes().count(), 2);

    a.deactivate();
    assert_eq!(global.get(&key("__cjsWrapper")), Value::from("wrapper"));
    b.deactivate();
    assert_eq!(env.active_sandboxes().count(), 0);
    assert!(!global.has_own_property(&key("__cjsWrapper")));
    assert!(!global.has_own_property(&key("System")));
}

#[test]
fn snapshot_restores_baseline() {
    let (global, env) = env();
    global.insert("x", "base");
    global.insert("untouched", 7);

    let mut sandbox = SnapshotSandbox::new("legacy", &env);
    sandbox.activate();
    global.set(&key("x"), Value::from("changed"));
    global.set(&key("untouched"), Value::from(7));
    global.set(&key("fresh"), Value::from(true));
    sandbox.deactivate();

    assert_eq!(global.get(&key("x")), Value::from("base"));
    assert_eq!(global.get(&key("untouched")), Value::from(7));
    assert!(!global.has_own_property(&key("fresh")));

    let modified = sandbox.modified_props();
    assert_eq!(
        modified.get(&key("x")),
        Some(&Some(Value::from("changed")))
    );
    assert!(!modified.contains_key(&key("untouched")));
    assert_eq!(modified.get(&key("fresh")), Some(&Some(Value::from(true))));

    sandbox.activate();
    assert_eq!(global.get(&key("x")), Value::from("changed"));
    assert_eq!(global.get(&key("fresh")), Value::from(true));
}

#[test]
fn non_configurable_global_keeps_its_descriptor() {
    let (global, env) = env();
    global.define_property(
        &key("frozenFlag"),
        PropertyDescriptor::Data {
            value: Value::from(1),
            writable: true,
            enumerable: true,
            configurable: false,
        },
    );
    let sandbox = create_sandbox(SandboxKind::Proxy, "app", &env).unwrap();

    let descriptor = sandbox
        .proxy()
        .get_own_property_descriptor(&key("frozenFlag"))
        .unwrap();
    assert!(!descriptor.is_configurable());

    let redefined = sandbox.proxy().define_property(
        &key("frozenFlag"),
        PropertyDescriptor::Data {
            value: Value::from(2),
            writable: true,
            enumerable: true,
            configurable: false,
        },
    );
    assert!(redefined);
    assert_eq!(global.get(&key("frozenFlag")), Value::from(2));
    assert_eq!(sandbox.proxy().get(&key("frozenFlag")), Value::from(2));
}

#[test]
fn running_app_cleared_after_unit_of_work() {
    let (_, env) = env();
    let sandbox = create_sandbox(SandboxKind::Proxy, "app1", &env).unwrap();

    sandbox.proxy().get(&key("anything"));
    sandbox.proxy().set(&key("other"), Value::from(1));
    assert_eq!(env.context().get().map(|app| app.name), Some("app1".to_string()));
    assert_eq!(env.context().get().map(|app| app.proxy), Some(sandbox.proxy().identity()));

    assert_eq!(env.flush(), 1);
    assert!(env.context().get().is_none());
}

#[test]
fn scenario_file_drives_snapshot_fallback() {
    let scenario = parse_scenario(
        r#"
        [globals]
        x = "base"

        [[steps]]
        op = "create"
        sandbox = "legacy"

        [[steps]]
        op = "activate"
        sandbox = "legacy"

        [[steps]]
        op = "set"
        sandbox = "legacy"
        key = "x"
        value = "changed"

        [[steps]]
        op = "deactivate"
        sandbox = "legacy"
        "#,
    )
    .unwrap();
    let config = SandboxConfig {
        interception_available: false,
        ..SandboxConfig::default()
    };

    let report = run_scenario(&scenario, &config).unwrap();
    assert_eq!(report.sandboxes[0].kind, SandboxKind::Snapshot);
    assert_eq!(report.globals.get("x"), Some(&serde_json::json!("base")));
    assert_eq!(report.sandboxes[0].modified_keys, vec!["x".to_string()]);
}
