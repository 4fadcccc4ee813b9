//! Property descriptors.

use super::value::{FunctionValue, ObjectId, Value};

/// Either a data descriptor or an accessor descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyDescriptor {
    Data {
        value: Value,
        writable: bool,
        enumerable: bool,
        configurable: bool,
    },
    Accessor {
        get: Option<FunctionValue>,
        set: Option<FunctionValue>,
        enumerable: bool,
        configurable: bool,
    },
}

impl PropertyDescriptor {
    /// Writable, enumerable, configurable data property (plain assignment).
    pub fn data(value: impl Into<Value>) -> Self {
        Self::Data {
            value: value.into(),
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    /// Non-writable, non-enumerable, non-configurable data property.
    pub fn data_frozen(value: impl Into<Value>) -> Self {
        Self::Data {
            value: value.into(),
            writable: false,
            enumerable: false,
            configurable: false,
        }
    }

    pub fn accessor(
        get: Option<FunctionValue>,
        set: Option<FunctionValue>,
        enumerable: bool,
        configurable: bool,
    ) -> Self {
        Self::Accessor {
            get,
            set,
            enumerable,
            configurable,
        }
    }

    pub fn is_configurable(&self) -> bool {
        match self {
            Self::Data { configurable, .. } | Self::Accessor { configurable, .. } => *configurable,
        }
    }

    pub fn is_enumerable(&self) -> bool {
        match self {
            Self::Data { enumerable, .. } | Self::Accessor { enumerable, .. } => *enumerable,
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data { .. })
    }

    pub fn is_accessor(&self) -> bool {
        matches!(self, Self::Accessor { .. })
    }

    /// Accessors are never writable.
    pub fn is_writable(&self) -> bool {
        matches!(self, Self::Data { writable: true, .. })
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Data { value, .. } => Some(value),
            Self::Accessor { .. } => None,
        }
    }

    pub fn set_configurable(&mut self, flag: bool) {
        match self {
            Self::Data { configurable, .. } | Self::Accessor { configurable, .. } => {
                *configurable = flag
            }
        }
    }

    /// No effect on accessor descriptors.
    pub fn set_writable(&mut self, flag: bool) {
        if let Self::Data { writable, .. } = self {
            *writable = flag;
        }
    }

    /// Resolve the value this descriptor yields for `receiver`.
    ///
    /// Getters run with `receiver` as `this`; a missing getter yields `undefined`.
    pub fn read(&self, receiver: ObjectId) -> Value {
        match self {
            Self::Data { value, .. } => value.clone(),
            Self::Accessor { get: Some(getter), .. } => getter.call(Some(receiver), &[]),
            Self::Accessor { get: None, .. } => Value::Undefined,
        }
    }

    /// Check whether `self` may replace `current` on an existing property.
    pub(crate) fn can_replace(&self, current: &PropertyDescriptor) -> bool {
        if current.is_configurable() {
            return true;
        }
        if self.is_configurable() || self.is_enumerable() != current.is_enumerable() {
            return false;
        }
        match (current, self) {
            (
                Self::Data {
                    value: old,
                    writable: old_writable,
                    ..
                },
                Self::Data {
                    value: new,
                    writable: new_writable,
                    ..
                },
            ) => *old_writable || (!*new_writable && old.same_value(new)),
            (
                Self::Accessor {
                    get: old_get,
                    set: old_set,
                    ..
                },
                Self::Accessor {
                    get: new_get,
                    set: new_set,
                    ..
                },
            ) => old_get == new_get && old_set == new_set,
            _ => false,
        }
    }
}
