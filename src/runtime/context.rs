use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::trace;

use super::TaskQueue;
use crate::namespace::ObjectId;

/// The sandboxed module currently executing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningApp {
    pub name: String,
    /// Identity of the proxy the module was handed.
    pub proxy: ObjectId,
}

/// Single-slot record of which sandboxed module is executing.
///
/// Overwritten on every mark, never queued. `None` means execution is
/// outside any sandboxed module.
#[derive(Debug, Default)]
pub struct RunningContext {
    current: RefCell<Option<RunningApp>>,
    clear_scheduled: Cell<bool>,
}

impl RunningContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, app: Option<RunningApp>) {
        *self.current.borrow_mut() = app;
    }

    pub fn get(&self) -> Option<RunningApp> {
        self.current.borrow().clone()
    }

    /// Record `app` as running and schedule the marker to be cleared once the
    /// current synchronous unit of work completes.
    ///
    /// At most one clear is outstanding at a time.
    pub fn mark(self: &Rc<Self>, app: RunningApp, tasks: &TaskQueue) {
        let unchanged = self.current.borrow().as_ref() == Some(&app);
        if !unchanged {
            trace!(app = %app.name, "Marking running app");
            self.set(Some(app));
        }

        if !self.clear_scheduled.replace(true) {
            let context = Rc::downgrade(self);
            tasks.schedule(move || {
                if let Some(context) = context.upgrade() {
                    context.clear_scheduled.set(false);
                    context.set(None);
                }
            });
        }
    }
}
