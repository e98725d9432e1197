//! Namespaces of live console values.
//!
//! This module provides the symbol table type shared by every component,
//! the dynamic [`Value`] model, packet classes and instances, and the
//! [`Environment`] that ties globals, the session and configuration together.

mod environment;
pub mod packet;
mod value;

use std::collections::BTreeMap;

pub use environment::Environment;
pub use packet::{FieldDefault, FieldDesc, Packet, PacketClass, PacketRef};
pub use value::{BoundMethod, CallArgs, Native, NativeFn, Value};

use crate::error::EvalError;

/// A mapping of symbol names to live values, iterated in sorted order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Namespace {
    entries: BTreeMap<String, Value>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(name.into(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.entries.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Union `other` into this namespace; entries of `other` win on collision.
    pub fn merge(&mut self, other: Namespace) {
        self.entries.extend(other.entries);
    }

    /// Resolve a dotted path such as `pkt.payload.dport`.
    pub fn resolve_path(&self, path: &str) -> Result<Value, EvalError> {
        let mut parts = path.split('.');
        let head = parts.next().unwrap_or_default();
        let mut value = self
            .get(head)
            .cloned()
            .ok_or_else(|| EvalError::Name(head.to_string()))?;
        for attr in parts {
            value = value.get_attr(attr)?;
        }
        Ok(value)
    }
}

impl FromIterator<(String, Value)> for Namespace {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<(String, Value)> for Namespace {
    fn extend<I: IntoIterator<Item = (String, Value)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl IntoIterator for Namespace {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_merge_last_writer_wins() {
        let mut ns: Namespace = [("a".to_string(), Value::Int(1))].into_iter().collect();
        let fragment: Namespace = [
            ("a".to_string(), Value::Int(2)),
            ("b".to_string(), Value::Int(3)),
        ]
        .into_iter()
        .collect();

        ns.merge(fragment);

        assert_eq!(ns.get("a"), Some(&Value::Int(2)));
        assert_eq!(ns.len(), 2);
    }

    #[test]
    fn test_sorted_iteration() {
        let mut ns = Namespace::new();
        ns.insert("sniff", Value::None);
        ns.insert("send", Value::None);
        let keys: Vec<_> = ns.keys().cloned().collect();
        assert_eq!(keys, vec!["send", "sniff"]);
    }

    #[test]
    fn test_resolve_path() {
        let class = Rc::new(PacketClass::new("IP", vec![FieldDesc::int("ttl", 64)]));
        let mut ns = Namespace::new();
        ns.insert("IP", Value::Class(class));

        assert_eq!(ns.resolve_path("IP.ttl").unwrap(), Value::Int(64));
        assert_eq!(
            ns.resolve_path("nope.x").unwrap_err(),
            EvalError::Name("nope".into())
        );
        assert!(matches!(
            ns.resolve_path("IP.bogus").unwrap_err(),
            EvalError::Attribute { .. }
        ));
    }
}
