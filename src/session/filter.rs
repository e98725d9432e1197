//! Which session entries are written to disk.

use crate::namespace::{Namespace, Value};

/// Prompt bookkeeping names that never persist.
pub const EXCLUDED_NAMES: &[&str] = &["__builtins__", "In", "Out"];

/// Names starting with this prefix are internal and never persist.
pub const RESERVED_PREFIX: &str = "_";

pub fn is_excluded_name(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX) || EXCLUDED_NAMES.contains(&name)
}

/// Kinds that have no on-disk representation: classes, modules, bound
/// methods and functions.
pub fn is_transient_kind(value: &Value) -> bool {
    matches!(
        value,
        Value::Class(_) | Value::Module(_) | Value::Method(_) | Value::Native(_)
    )
}

/// Copy of `namespace` without excluded names.
pub fn retained(namespace: &Namespace) -> Namespace {
    namespace
        .iter()
        .filter(|(name, _)| !is_excluded_name(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excluded_names() {
        assert!(is_excluded_name("__builtins__"));
        assert!(is_excluded_name("In"));
        assert!(is_excluded_name("Out"));
        assert!(is_excluded_name("_"));
        assert!(is_excluded_name("_private"));
        assert!(!is_excluded_name("pkt"));
        assert!(!is_excluded_name("Input"));
    }

    #[test]
    fn test_retained_drops_only_names() {
        let ns: Namespace = [
            ("_tmp".to_string(), Value::Int(1)),
            ("Out".to_string(), Value::Int(2)),
            ("keep".to_string(), Value::Module("modules.console".into())),
        ]
        .into_iter()
        .collect();

        let kept = retained(&ns);
        assert_eq!(kept.len(), 1);
        assert!(is_transient_kind(kept.get("keep").unwrap()));
    }
}
