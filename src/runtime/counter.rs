use std::cell::Cell;

/// Count of sandbox instances currently active.
#[derive(Debug, Default)]
pub struct ActiveSandboxCounter {
    count: Cell<usize>,
}

impl ActiveSandboxCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count.get()
    }

    /// Returns the new count.
    pub fn increment(&self) -> usize {
        let next = self.count.get() + 1;
        self.count.set(next);
        next
    }

    /// Returns the new count. Never goes below zero.
    pub fn decrement(&self) -> usize {
        let next = self.count.get().saturating_sub(1);
        self.count.set(next);
        next
    }
}
