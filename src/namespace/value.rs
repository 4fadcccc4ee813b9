//! Keys and values stored in a namespace.

use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique symbol identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(pub u32);

/// Well-known symbols with a fixed allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKnownSymbol {
    Unscopables,
}

impl WellKnownSymbol {
    pub fn id(self) -> SymbolId {
        SymbolId(self as u32 + 1)
    }

    pub fn key(self) -> PropertyKey {
        PropertyKey::Symbol(self.id())
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Unscopables => "@@unscopables",
        }
    }
}

/// A property key: either a string or a symbol.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyKey {
    String(String),
    Symbol(SymbolId),
}

impl PropertyKey {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Symbol(_) => None,
        }
    }

    /// Array-index keys sort ahead of other strings in own-key order.
    pub(crate) fn array_index(&self) -> Option<u32> {
        let s = self.as_str()?;
        if s.is_empty() || (s.len() > 1 && s.starts_with('0')) {
            return None;
        }
        s.parse::<u32>().ok().filter(|n| *n != u32::MAX)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Symbol(id) => write!(f, "Symbol({})", id.0),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<SymbolId> for PropertyKey {
    fn from(id: SymbolId) -> Self {
        Self::Symbol(id)
    }
}

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_FUNCTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an object: a namespace, a proxy, or a prototype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub u64);

impl ObjectId {
    /// Allocate a fresh process-unique identity.
    pub fn next() -> Self {
        Self(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FunctionId(pub u64);

impl FunctionId {
    fn next() -> Self {
        Self(NEXT_FUNCTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Native function body. The first argument is the receiver (`this`).
pub type NativeFn = dyn Fn(Option<ObjectId>, &[Value]) -> Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Ordinary callable.
    Plain,
    /// Meant to be invoked with `new`; never rebound.
    Constructor,
    /// Produced by [`FunctionValue::bind`].
    Bound,
}

/// A callable value with identity.
#[derive(Clone)]
pub struct FunctionValue {
    id: FunctionId,
    name: Rc<str>,
    kind: FunctionKind,
    bound_this: Option<ObjectId>,
    body: Rc<NativeFn>,
    /// Shared by clones only; a bound copy gets its own.
    handle: Rc<()>,
}

impl FunctionValue {
    pub fn new(name: &str, body: impl Fn(Option<ObjectId>, &[Value]) -> Value + 'static) -> Self {
        Self::with_kind(name, FunctionKind::Plain, body)
    }

    pub fn constructor(
        name: &str,
        body: impl Fn(Option<ObjectId>, &[Value]) -> Value + 'static,
    ) -> Self {
        Self::with_kind(name, FunctionKind::Constructor, body)
    }

    fn with_kind(
        name: &str,
        kind: FunctionKind,
        body: impl Fn(Option<ObjectId>, &[Value]) -> Value + 'static,
    ) -> Self {
        Self {
            id: FunctionId::next(),
            name: Rc::from(name),
            kind,
            bound_this: None,
            body: Rc::new(body),
            handle: Rc::new(()),
        }
    }

    pub fn id(&self) -> FunctionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FunctionKind {
        self.kind
    }

    pub fn bound_this(&self) -> Option<ObjectId> {
        self.bound_this
    }

    /// Create a new function sharing this body with a fixed receiver.
    pub fn bind(&self, receiver: ObjectId) -> Self {
        Self {
            id: FunctionId::next(),
            name: Rc::from(format!("bound {}", self.name)),
            kind: FunctionKind::Bound,
            bound_this: Some(receiver),
            body: Rc::clone(&self.body),
            handle: Rc::new(()),
        }
    }

    /// Dead once every clone of this function value has been dropped.
    pub(crate) fn downgrade(&self) -> Weak<()> {
        Rc::downgrade(&self.handle)
    }

    /// Invoke the function. A bound receiver takes precedence over `this`.
    pub fn call(&self, this: Option<ObjectId>, args: &[Value]) -> Value {
        (self.body)(self.bound_this.or(this), args)
    }
}

impl PartialEq for FunctionValue {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionValue")
            .field("id", &self.id.0)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("bound_this", &self.bound_this)
            .finish_non_exhaustive()
    }
}

/// Runtime value held by a namespace property.
///
/// `==` is strict equality: `NaN` never equals itself, and objects and
/// functions compare by identity.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Symbol(SymbolId),
    Object(ObjectId),
    Function(FunctionValue),
}

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    pub fn as_function(&self) -> Option<&FunctionValue> {
        match self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "object",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::Symbol(_) => "symbol",
            Self::Object(_) => "object",
            Self::Function(_) => "function",
        }
    }

    /// SameValue comparison: `NaN` equals `NaN`, `+0` and `-0` differ.
    pub fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => {
                if a.is_nan() && b.is_nan() {
                    true
                } else if *a == 0.0 && *b == 0.0 {
                    a.is_sign_negative() == b.is_sign_negative()
                } else {
                    a == b
                }
            }
            _ => self == other,
        }
    }

    /// Convert a property-key-like argument into a key.
    pub fn to_property_key(&self) -> PropertyKey {
        match self {
            Self::Symbol(id) => PropertyKey::Symbol(*id),
            Self::Str(s) => PropertyKey::String(s.clone()),
            other => PropertyKey::String(other.to_string()),
        }
    }

    /// Render for machine-readable output.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Undefined | Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::String(self.to_string())),
            Self::Str(s) => serde_json::Value::String(s.clone()),
            other => serde_json::Value::String(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) if n.is_nan() => write!(f, "NaN"),
            Self::Number(n) if n.is_infinite() => {
                write!(f, "{}Infinity", if *n < 0.0 { "-" } else { "" })
            }
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Symbol(id) => write!(f, "Symbol({})", id.0),
            Self::Object(id) => write!(f, "[{id}]"),
            Self::Function(func) => write!(f, "[function {}]", func.name()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<FunctionValue> for Value {
    fn from(f: FunctionValue) -> Self {
        Self::Function(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_equality() {
        assert_ne!(Value::Number(f64::NAN), Value::Number(f64::NAN));
        assert_eq!(Value::from("a"), Value::from("a"));
        assert!(Value::Number(f64::NAN).same_value(&Value::Number(f64::NAN)));
        assert!(!Value::Number(0.0).same_value(&Value::Number(-0.0)));
    }

    #[test]
    fn test_bind_keeps_body_and_fixes_receiver() {
        let f = FunctionValue::new("whoami", |this, _| match this {
            Some(id) => Value::Number(id.0 as f64),
            None => Value::Undefined,
        });
        let bound = f.bind(ObjectId(42));

        assert_ne!(f, bound);
        assert_eq!(bound.name(), "bound whoami");
        assert_eq!(bound.kind(), FunctionKind::Bound);
        assert_eq!(bound.call(Some(ObjectId(7)), &[]), Value::Number(42.0));
        assert_eq!(f.call(Some(ObjectId(7)), &[]), Value::Number(7.0));
    }

    #[test]
    fn test_array_index_keys() {
        assert_eq!(PropertyKey::from("12").array_index(), Some(12));
        assert_eq!(PropertyKey::from("012").array_index(), None);
        assert_eq!(PropertyKey::from("x").array_index(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Number(1.0).to_string(), "1");
        assert_eq!(Value::Number(1.5).to_string(), "1.5");
        assert_eq!(Value::Undefined.to_string(), "undefined");
    }
}
