//! Ambient error events raised by the host.
//!
//! Thin subscription helpers; the sandboxes do not depend on this module.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

/// Ambient topics an uncaught-error handler listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorTopic {
    /// An uncaught error
    Error,
    /// A rejected promise nobody handled
    UnhandledRejection,
}

impl ErrorTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::UnhandledRejection => "unhandledrejection",
        }
    }
}

impl fmt::Display for ErrorTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ErrorEvent {
    pub topic: ErrorTopic,
    pub message: String,
    /// Module the error originated from, when known
    pub source: Option<String>,
}

pub type ErrorHandler = Rc<dyn Fn(&ErrorEvent)>;

/// Listener registry for the ambient error topics.
#[derive(Default)]
pub struct ErrorEventHub {
    listeners: RefCell<HashMap<ErrorTopic, Vec<ErrorHandler>>>,
}

impl ErrorEventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registering the same handler twice on a topic has no effect.
    pub fn add_event_listener(&self, topic: ErrorTopic, handler: ErrorHandler) {
        let mut listeners = self.listeners.borrow_mut();
        let entry = listeners.entry(topic).or_default();
        if !entry.iter().any(|h| Rc::ptr_eq(h, &handler)) {
            entry.push(handler);
        }
    }

    pub fn remove_event_listener(&self, topic: ErrorTopic, handler: &ErrorHandler) {
        if let Some(entry) = self.listeners.borrow_mut().get_mut(&topic) {
            entry.retain(|h| !Rc::ptr_eq(h, handler));
        }
    }

    /// Subscribe `handler` to both uncaught errors and unhandled rejections.
    pub fn add_global_uncaught_error_handler(&self, handler: ErrorHandler) {
        self.add_event_listener(ErrorTopic::Error, Rc::clone(&handler));
        self.add_event_listener(ErrorTopic::UnhandledRejection, handler);
    }

    pub fn remove_global_uncaught_error_handler(&self, handler: &ErrorHandler) {
        self.remove_event_listener(ErrorTopic::Error, handler);
        self.remove_event_listener(ErrorTopic::UnhandledRejection, handler);
    }

    pub fn listener_count(&self, topic: ErrorTopic) -> usize {
        self.listeners
            .borrow()
            .get(&topic)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Deliver `event` to its topic's listeners. Returns how many were called.
    pub fn dispatch(&self, event: &ErrorEvent) -> usize {
        // Handlers may (un)subscribe while being called.
        let handlers: Vec<ErrorHandler> = self
            .listeners
            .borrow()
            .get(&event.topic)
            .cloned()
            .unwrap_or_default();

        debug!(topic = %event.topic, listeners = handlers.len(), "Dispatching error event");
        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }
}

impl fmt::Debug for ErrorEventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorEventHub")
            .field("error", &self.listener_count(ErrorTopic::Error))
            .field(
                "unhandledrejection",
                &self.listener_count(ErrorTopic::UnhandledRejection),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn event(topic: ErrorTopic) -> ErrorEvent {
        ErrorEvent {
            topic,
            message: "boom".to_string(),
            source: Some("app1".to_string()),
        }
    }

    #[test]
    fn test_global_handler_covers_both_topics() {
        let hub = ErrorEventHub::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let handler: ErrorHandler = Rc::new(move |_: &ErrorEvent| counter.set(counter.get() + 1));

        hub.add_global_uncaught_error_handler(Rc::clone(&handler));
        hub.add_global_uncaught_error_handler(Rc::clone(&handler));
        assert_eq!(hub.listener_count(ErrorTopic::Error), 1);

        hub.dispatch(&event(ErrorTopic::Error));
        hub.dispatch(&event(ErrorTopic::UnhandledRejection));
        assert_eq!(hits.get(), 2);

        hub.remove_global_uncaught_error_handler(&handler);
        assert_eq!(hub.dispatch(&event(ErrorTopic::Error)), 0);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_remove_only_matching_handler() {
        let hub = ErrorEventHub::new();
        let a: ErrorHandler = Rc::new(|_: &ErrorEvent| {});
        let b: ErrorHandler = Rc::new(|_: &ErrorEvent| {});
        hub.add_event_listener(ErrorTopic::Error, Rc::clone(&a));
        hub.add_event_listener(ErrorTopic::Error, Rc::clone(&b));

        hub.remove_event_listener(ErrorTopic::Error, &a);
        assert_eq!(hub.listener_count(ErrorTopic::Error), 1);
        assert_eq!(hub.listener_count(ErrorTopic::UnhandledRejection), 0);
    }
}
