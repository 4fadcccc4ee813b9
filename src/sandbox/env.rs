use std::rc::Rc;

use crate::config::types::SandboxConfig;
use crate::namespace::GlobalNamespace;
use crate::rebind::FunctionRebinder;
use crate::runtime::{ActiveSandboxCounter, RunningContext, TaskQueue};
use crate::sandbox::whitelist::EscapeWhitelist;

/// Host capabilities and diagnostics switches.
#[derive(Debug, Clone)]
pub struct SandboxOptions {
    /// Emit restore diagnostics and straggling-write warnings
    pub development: bool,
    /// Treat `mockTop`/`mockSafariTop` like `top`
    pub test_allowances: bool,
    /// Whether fine-grained interception is supported
    pub interception_available: bool,
}

impl Default for SandboxOptions {
    fn default() -> Self {
        Self {
            development: false,
            test_allowances: false,
            interception_available: true,
        }
    }
}

impl From<&SandboxConfig> for SandboxOptions {
    fn from(config: &SandboxConfig) -> Self {
        Self {
            development: config.development,
            test_allowances: config.test_allowances,
            interception_available: config.interception_available,
        }
    }
}

/// Process-wide state injected into every sandbox at construction.
///
/// Cloning shares the state; the host creates one environment per global
/// namespace and hands clones to each sandbox it builds.
#[derive(Debug, Clone)]
pub struct SandboxEnv {
    global: GlobalNamespace,
    context: Rc<RunningContext>,
    tasks: Rc<TaskQueue>,
    active: Rc<ActiveSandboxCounter>,
    rebinder: Rc<FunctionRebinder>,
    whitelist: Rc<EscapeWhitelist>,
    options: SandboxOptions,
}

impl SandboxEnv {
    pub fn new(global: GlobalNamespace, options: SandboxOptions) -> Self {
        let whitelist = EscapeWhitelist::for_environment::<&str>(options.development, &[]);
        Self {
            global,
            context: Rc::new(RunningContext::new()),
            tasks: Rc::new(TaskQueue::new()),
            active: Rc::new(ActiveSandboxCounter::new()),
            rebinder: Rc::new(FunctionRebinder::new()),
            whitelist: Rc::new(whitelist),
            options,
        }
    }

    pub fn from_config(global: GlobalNamespace, config: &SandboxConfig) -> Self {
        let whitelist = EscapeWhitelist::for_environment(
            config.development,
            config.extra_escape_keys.as_slice(),
        );
        Self::new(global, SandboxOptions::from(config)).with_whitelist(whitelist)
    }

    pub fn with_whitelist(mut self, whitelist: EscapeWhitelist) -> Self {
        self.whitelist = Rc::new(whitelist);
        self
    }

    pub fn global(&self) -> &GlobalNamespace {
        &self.global
    }

    pub fn context(&self) -> &Rc<RunningContext> {
        &self.context
    }

    pub fn tasks(&self) -> &TaskQueue {
        &self.tasks
    }

    pub fn active_sandboxes(&self) -> &ActiveSandboxCounter {
        &self.active
    }

    pub fn rebinder(&self) -> &FunctionRebinder {
        &self.rebinder
    }

    pub fn whitelist(&self) -> &EscapeWhitelist {
        &self.whitelist
    }

    pub fn options(&self) -> &SandboxOptions {
        &self.options
    }

    /// Mark the end of a synchronous unit of work: run deferred tasks.
    pub fn flush(&self) -> usize {
        self.tasks.run_pending()
    }
}
