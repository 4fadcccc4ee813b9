use indexmap::IndexSet;

use crate::namespace::PropertyKey;

/// Keys every build mirrors to the global namespace.
///
/// `System` and `__cjsWrapper` are written by SystemJS through indirect
/// evaluation, which resolves against the real global namespace.
pub const BASELINE_ESCAPE_KEYS: &[&str] = &["System", "__cjsWrapper"];

/// Added in development builds for the React error overlay hook.
pub const DEVELOPMENT_ESCAPE_KEYS: &[&str] = &["__REACT_ERROR_OVERLAY_GLOBAL_HOOK__"];

/// Keys exempt from isolation. Writes through any active sandbox are also
/// applied to the global namespace.
///
/// The set can grow but never drops below [`BASELINE_ESCAPE_KEYS`].
#[derive(Debug, Clone)]
pub struct EscapeWhitelist {
    keys: IndexSet<PropertyKey>,
}

impl Default for EscapeWhitelist {
    fn default() -> Self {
        Self::baseline()
    }
}

impl EscapeWhitelist {
    pub fn baseline() -> Self {
        Self {
            keys: BASELINE_ESCAPE_KEYS
                .iter()
                .map(|k| PropertyKey::from(*k))
                .collect(),
        }
    }

    pub fn for_environment<S: AsRef<str>>(development: bool, extra: &[S]) -> Self {
        let mut whitelist = Self::baseline();
        if development {
            whitelist.extend(DEVELOPMENT_ESCAPE_KEYS.iter().copied());
        }
        whitelist.extend(extra.iter().map(AsRef::as_ref));
        whitelist
    }

    pub fn extend<'a>(&mut self, keys: impl IntoIterator<Item = &'a str>) {
        self.keys.extend(keys.into_iter().map(PropertyKey::from));
    }

    pub fn contains(&self, key: &PropertyKey) -> bool {
        self.keys.contains(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyKey> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_always_present() {
        let whitelist = EscapeWhitelist::for_environment::<&str>(false, &[]);
        assert_eq!(whitelist.len(), 2);
        assert!(whitelist.contains(&"System".into()));
        assert!(whitelist.contains(&"__cjsWrapper".into()));
        assert!(!whitelist.contains(&"__REACT_ERROR_OVERLAY_GLOBAL_HOOK__".into()));
    }

    #[test]
    fn test_development_and_extra_keys() {
        let whitelist = EscapeWhitelist::for_environment(true, &["webpackJsonp", "System"]);
        let keys: Vec<String> = whitelist.iter().map(ToString::to_string).collect();
        assert_eq!(
            keys,
            [
                "System",
                "__cjsWrapper",
                "__REACT_ERROR_OVERLAY_GLOBAL_HOOK__",
                "webpackJsonp"
            ]
        );
    }
}
