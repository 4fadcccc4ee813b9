//! Scripted orchestration replayed against a fresh global namespace.
//!
//! A scenario seeds the global namespace, then drives sandboxes the way a
//! module orchestrator would: create, activate, run module operations through
//! the sandbox proxy, deactivate. Each step is one synchronous unit of work;
//! deferred tasks only run on an explicit `flush` step.
//!
//! ```toml
//! [globals]
//! x = "base"
//!
//! [[steps]]
//! op = "create"
//! sandbox = "app1"
//! kind = "proxy"
//!
//! [[steps]]
//! op = "set"
//! sandbox = "app1"
//! key = "counter"
//! value = 1
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::config::types::{SandboxConfig, SandboxKind};
use crate::error::{Result, ScopeboxError};
use crate::namespace::{GlobalNamespace, NamespaceOps, ObjectId, PropertyDescriptor, PropertyKey, Value};
use crate::sandbox::{create_sandbox, Sandbox, SandboxEnv, SandboxInfo};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Plain properties seeded into the global namespace
    pub globals: toml::Table,
    /// Non-configurable properties seeded into the global namespace
    pub frozen: Vec<FrozenGlobal>,
    /// Whether the global namespace is nested inside a parent
    pub nested: bool,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrozenGlobal {
    pub key: String,
    pub value: toml::Value,
    #[serde(default)]
    pub writable: bool,
    #[serde(default)]
    pub enumerable: bool,
}

/// One orchestrator or module action. Omitting `sandbox` targets the global
/// namespace directly.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Create {
        sandbox: String,
        kind: Option<SandboxKind>,
    },
    Activate {
        sandbox: String,
    },
    Deactivate {
        sandbox: String,
    },
    Get {
        sandbox: Option<String>,
        key: String,
    },
    Set {
        sandbox: Option<String>,
        key: String,
        value: toml::Value,
    },
    Delete {
        sandbox: Option<String>,
        key: String,
    },
    Has {
        sandbox: Option<String>,
        key: String,
    },
    Keys {
        sandbox: Option<String>,
    },
    /// End the current unit of work and run deferred tasks
    Flush,
    /// Report the running-context marker
    Current,
}

impl Step {
    fn op(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Activate { .. } => "activate",
            Self::Deactivate { .. } => "deactivate",
            Self::Get { .. } => "get",
            Self::Set { .. } => "set",
            Self::Delete { .. } => "delete",
            Self::Has { .. } => "has",
            Self::Keys { .. } => "keys",
            Self::Flush => "flush",
            Self::Current => "current",
        }
    }

    fn target(&self) -> String {
        match self {
            Self::Create { sandbox, .. }
            | Self::Activate { sandbox }
            | Self::Deactivate { sandbox } => sandbox.clone(),
            Self::Get { sandbox, key }
            | Self::Set { sandbox, key, .. }
            | Self::Delete { sandbox, key }
            | Self::Has { sandbox, key } => {
                format!("{}.{}", sandbox.as_deref().unwrap_or("global"), key)
            }
            Self::Keys { sandbox } => sandbox.as_deref().unwrap_or("global").to_string(),
            Self::Flush | Self::Current => "-".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step: usize,
    pub op: &'static str,
    pub target: String,
    pub result: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct ScenarioReport {
    pub steps: Vec<StepOutcome>,
    pub sandboxes: Vec<SandboxInfo>,
    pub active_sandboxes: usize,
    pub globals: IndexMap<String, serde_json::Value>,
}

/// Load a scenario file.
pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let content = std::fs::read_to_string(path)?;
    parse_scenario(&content)
}

pub fn parse_scenario(text: &str) -> Result<Scenario> {
    toml::from_str(text).map_err(|e| ScopeboxError::Scenario(e.to_string()))
}

/// Replay `scenario` against a fresh global namespace.
pub fn run_scenario(scenario: &Scenario, config: &SandboxConfig) -> Result<ScenarioReport> {
    let global = GlobalNamespace::new();
    if scenario.nested {
        global.set_parent(Some(ObjectId::next()));
    }

    let env = SandboxEnv::from_config(global, config);
    let mut runner = ScenarioRunner::new(env, config.default_kind);
    runner.seed(scenario)?;

    let mut outcomes = Vec::with_capacity(scenario.steps.len());
    for (index, step) in scenario.steps.iter().enumerate() {
        outcomes.push(runner.run_step(index + 1, step)?);
    }

    info!(steps = outcomes.len(), "Scenario complete");
    Ok(runner.report(outcomes))
}

/// Drives sandboxes on behalf of a scenario.
pub struct ScenarioRunner {
    env: SandboxEnv,
    default_kind: SandboxKind,
    sandboxes: IndexMap<String, Box<dyn Sandbox>>,
}

impl ScenarioRunner {
    pub fn new(env: SandboxEnv, default_kind: SandboxKind) -> Self {
        Self {
            env,
            default_kind,
            sandboxes: IndexMap::new(),
        }
    }

    pub fn env(&self) -> &SandboxEnv {
        &self.env
    }

    pub fn sandbox(&self, name: &str) -> Option<&dyn Sandbox> {
        self.sandboxes.get(name).map(|s| &**s)
    }

    /// Populate the global namespace from the scenario header.
    pub fn seed(&self, scenario: &Scenario) -> Result<()> {
        let global = self.env.global();
        for (key, value) in &scenario.globals {
            global.set(&PropertyKey::from(key.as_str()), to_value(value)?);
        }
        for frozen in &scenario.frozen {
            let descriptor = PropertyDescriptor::Data {
                value: to_value(&frozen.value)?,
                writable: frozen.writable,
                enumerable: frozen.enumerable,
                configurable: false,
            };
            if !global.define_property(&PropertyKey::from(frozen.key.as_str()), descriptor) {
                return Err(ScopeboxError::Scenario(format!(
                    "cannot define frozen global '{}'",
                    frozen.key
                )));
            }
        }
        debug!(keys = global.len(), "Seeded global namespace");
        Ok(())
    }

    pub fn run_step(&mut self, index: usize, step: &Step) -> Result<StepOutcome> {
        let result = match step {
            Step::Create { sandbox, kind } => {
                if self.sandboxes.contains_key(sandbox) {
                    return Err(ScopeboxError::SandboxExists {
                        name: sandbox.clone(),
                    });
                }
                let created =
                    create_sandbox(kind.unwrap_or(self.default_kind), sandbox, &self.env)?;
                let result = json!({
                    "kind": created.kind(),
                    "running": created.is_running(),
                });
                self.sandboxes.insert(sandbox.clone(), created);
                result
            }
            Step::Activate { sandbox } => {
                self.sandbox_mut(sandbox)?.activate();
                json!({ "active_sandboxes": self.env.active_sandboxes().count() })
            }
            Step::Deactivate { sandbox } => {
                let target = self.sandbox_mut(sandbox)?;
                target.deactivate();
                let modified: Vec<String> =
                    target.modified_keys().iter().map(ToString::to_string).collect();
                json!({
                    "modified": modified,
                    "active_sandboxes": self.env.active_sandboxes().count(),
                })
            }
            Step::Get { sandbox, key } => self
                .view(sandbox.as_deref())?
                .get(&PropertyKey::from(key.as_str()))
                .to_json(),
            Step::Set {
                sandbox,
                key,
                value,
            } => {
                let value = to_value(value)?;
                json!(self
                    .view(sandbox.as_deref())?
                    .set(&PropertyKey::from(key.as_str()), value))
            }
            Step::Delete { sandbox, key } => json!(self
                .view(sandbox.as_deref())?
                .delete(&PropertyKey::from(key.as_str()))),
            Step::Has { sandbox, key } => json!(self
                .view(sandbox.as_deref())?
                .has(&PropertyKey::from(key.as_str()))),
            Step::Keys { sandbox } => {
                let keys: Vec<String> = self
                    .view(sandbox.as_deref())?
                    .own_keys()
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                json!(keys)
            }
            Step::Flush => json!({ "ran": self.env.flush() }),
            Step::Current => match self.env.context().get() {
                Some(app) => json!(app.name),
                None => serde_json::Value::Null,
            },
        };

        Ok(StepOutcome {
            step: index,
            op: step.op(),
            target: step.target(),
            result,
        })
    }

    pub fn report(&self, steps: Vec<StepOutcome>) -> ScenarioReport {
        let global = self.env.global();
        let globals = global
            .own_keys()
            .into_iter()
            .map(|key| {
                let value = global.get(&key).to_json();
                (key.to_string(), value)
            })
            .collect();

        ScenarioReport {
            steps,
            sandboxes: self.sandboxes.values().map(|s| s.info()).collect(),
            active_sandboxes: self.env.active_sandboxes().count(),
            globals,
        }
    }

    fn view(&self, sandbox: Option<&str>) -> Result<&dyn NamespaceOps> {
        match sandbox {
            None => Ok(self.env.global()),
            Some(name) => self
                .sandboxes
                .get(name)
                .map(|s| s.proxy())
                .ok_or_else(|| ScopeboxError::SandboxNotFound {
                    name: name.to_string(),
                }),
        }
    }

    fn sandbox_mut(&mut self, name: &str) -> Result<&mut Box<dyn Sandbox>> {
        self.sandboxes
            .get_mut(name)
            .ok_or_else(|| ScopeboxError::SandboxNotFound {
                name: name.to_string(),
            })
    }
}

fn to_value(value: &toml::Value) -> Result<Value> {
    match value {
        toml::Value::String(s) => Ok(Value::Str(s.clone())),
        toml::Value::Integer(n) => Ok(Value::Number(*n as f64)),
        toml::Value::Float(n) => Ok(Value::Number(*n)),
        toml::Value::Boolean(b) => Ok(Value::Bool(*b)),
        other => Err(ScopeboxError::Scenario(format!(
            "unsupported value type: {}",
            other.type_str()
        ))),
    }
}
