//! Rebinding of functions read through a sandbox proxy.
//!
//! Host APIs such as timers or `fetch` expect the real global namespace as
//! their receiver. A plain function read through the proxy is therefore bound
//! to the global identity before it is handed to module code.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Weak;

use crate::namespace::{FunctionId, FunctionKind, FunctionValue, ObjectId, Value};

/// Caches bound functions so repeated reads return the identical value.
///
/// An entry lives only as long as the original function does; entries whose
/// original has been dropped are pruned before each new binding is cached.
#[derive(Debug, Default)]
pub struct FunctionRebinder {
    bound: RefCell<HashMap<(FunctionId, ObjectId), CachedBinding>>,
}

#[derive(Debug)]
struct CachedBinding {
    original: Weak<()>,
    bound: FunctionValue,
}

impl FunctionRebinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `value` as module code should observe it when read from `target`.
    pub fn target_value(&self, target: ObjectId, value: Value) -> Value {
        match value {
            Value::Function(function) if needs_binding(&function) => {
                Value::Function(self.bind_cached(target, &function))
            }
            other => other,
        }
    }

    fn bind_cached(&self, target: ObjectId, function: &FunctionValue) -> FunctionValue {
        let mut cache = self.bound.borrow_mut();
        let key = (function.id(), target);
        if let Some(entry) = cache.get(&key) {
            return entry.bound.clone();
        }

        cache.retain(|_, entry| entry.original.strong_count() > 0);
        let bound = function.bind(target);
        cache.insert(
            key,
            CachedBinding {
                original: function.downgrade(),
                bound: bound.clone(),
            },
        );
        bound
    }

    /// Number of cached bound functions.
    pub fn len(&self) -> usize {
        self.bound.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.borrow().is_empty()
    }
}

fn needs_binding(function: &FunctionValue) -> bool {
    !is_bound(function) && !is_constructable(function)
}

fn is_bound(function: &FunctionValue) -> bool {
    function.kind() == FunctionKind::Bound
        || function.bound_this().is_some()
        || function.name().starts_with("bound ")
}

/// Constructors keep their identity so `new Ctor()` and `instanceof` still work.
/// Capitalized names are treated as constructors as well.
fn is_constructable(function: &FunctionValue) -> bool {
    function.kind() == FunctionKind::Constructor
        || function
            .name()
            .chars()
            .next()
            .map(|c| c.is_ascii_uppercase())
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receiver_echo(name: &str) -> FunctionValue {
        FunctionValue::new(name, |this, _| match this {
            Some(id) => Value::Number(id.0 as f64),
            None => Value::Null,
        })
    }

    #[test]
    fn test_plain_function_is_bound_to_target() {
        let rebinder = FunctionRebinder::new();
        let target = ObjectId(77);
        let value = rebinder.target_value(target, Value::from(receiver_echo("fetch")));

        let bound = value.as_function().unwrap();
        assert_eq!(bound.kind(), FunctionKind::Bound);
        assert_eq!(bound.call(Some(ObjectId(1)), &[]), Value::Number(77.0));
    }

    #[test]
    fn test_repeated_reads_are_identical() {
        let rebinder = FunctionRebinder::new();
        let f = Value::from(receiver_echo("setTimeout"));
        let a = rebinder.target_value(ObjectId(1), f.clone());
        let b = rebinder.target_value(ObjectId(1), f);
        assert_eq!(a, b);
        assert_eq!(rebinder.len(), 1);
    }

    #[test]
    fn test_dropped_functions_leave_the_cache() {
        let rebinder = FunctionRebinder::new();
        let kept = receiver_echo("setInterval");
        let bound = rebinder.target_value(ObjectId(1), Value::from(receiver_echo("fetch")));
        rebinder.target_value(ObjectId(1), Value::from(kept.clone()));
        assert_eq!(rebinder.len(), 1);

        // A bound copy handed out earlier stays callable.
        let bound = bound.as_function().unwrap();
        assert_eq!(bound.call(None, &[]), Value::Number(1.0));
        assert_eq!(
            rebinder.target_value(ObjectId(1), Value::from(kept.clone())),
            rebinder.target_value(ObjectId(1), Value::from(kept))
        );
    }

    #[test]
    fn test_constructors_and_bound_functions_pass_through() {
        let rebinder = FunctionRebinder::new();
        let ctor = Value::from(FunctionValue::constructor("makeThing", |_, _| Value::Null));
        assert_eq!(rebinder.target_value(ObjectId(1), ctor.clone()), ctor);

        let capitalized = Value::from(receiver_echo("Promise"));
        assert_eq!(rebinder.target_value(ObjectId(1), capitalized.clone()), capitalized);

        let already = Value::from(receiver_echo("log").bind(ObjectId(5)));
        assert_eq!(rebinder.target_value(ObjectId(1), already.clone()), already);
        assert!(rebinder.is_empty());
    }

    #[test]
    fn test_non_functions_pass_through() {
        let rebinder = FunctionRebinder::new();
        assert_eq!(
            rebinder.target_value(ObjectId(1), Value::from("text")),
            Value::from("text")
        );
    }
}
