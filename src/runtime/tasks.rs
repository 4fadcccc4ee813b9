use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;

use tracing::trace;

type Task = Box<dyn FnOnce()>;

/// Callbacks deferred until the current synchronous unit of work completes.
///
/// The embedding host calls [`TaskQueue::run_pending`] once the unit that
/// scheduled them has returned, before starting the next externally
/// triggered unit.
#[derive(Default)]
pub struct TaskQueue {
    queue: RefCell<VecDeque<Task>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&self, task: impl FnOnce() + 'static) {
        self.queue.borrow_mut().push_back(Box::new(task));
    }

    /// Number of callbacks waiting to run.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Run queued callbacks in FIFO order, including any they schedule.
    /// Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            // The borrow ends before the task runs so it may schedule more work.
            let next = self.queue.borrow_mut().pop_front();
            match next {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => break,
            }
        }
        if ran > 0 {
            trace!(count = ran, "Ran deferred tasks");
        }
        ran
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.pending())
            .finish()
    }
}
