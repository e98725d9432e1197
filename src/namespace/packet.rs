//! Packet classes and packet instances.
//!
//! A packet class carries its protocol fields as data (`fields_desc`), so the
//! set of attributes a packet exposes is known only at runtime. Instances are
//! shared (`Rc<RefCell<_>>`) and may reference each other through payloads
//! or packet-valued fields, cycles included.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::Value;
use crate::error::EvalError;

/// Shared handle to a packet instance.
pub type PacketRef = Rc<RefCell<Packet>>;

/// Reflected members of packet instances.
pub const PACKET_MEMBERS: &[&str] = &[
    "__div__", "__len__", "_do_summary", "copy", "fields", "name", "payload", "show", "summary",
];

/// Reflected members of packet classes.
pub const CLASS_MEMBERS: &[&str] = &["__name__", "_fields_index", "fields_desc", "name"];

/// Methods callable on packet instances.
pub const PACKET_METHODS: &[&str] = &["copy", "show", "summary"];

/// Default value of a protocol field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldDefault {
    /// Computed at build time (lengths, checksums).
    None,
    Int(i64),
    Str(String),
    Bytes(Vec<u8>),
}

impl FieldDefault {
    pub fn to_value(&self) -> Value {
        match self {
            Self::None => Value::None,
            Self::Int(v) => Value::Int(*v),
            Self::Str(s) => Value::Str(s.clone()),
            Self::Bytes(b) => Value::Bytes(b.clone()),
        }
    }
}

/// Protocol field descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDesc {
    pub name: String,
    pub default: FieldDefault,
}

impl FieldDesc {
    pub fn int(name: &str, default: i64) -> Self {
        Self {
            name: name.to_string(),
            default: FieldDefault::Int(default),
        }
    }

    pub fn str(name: &str, default: &str) -> Self {
        Self {
            name: name.to_string(),
            default: FieldDefault::Str(default.to_string()),
        }
    }

    pub fn bytes(name: &str) -> Self {
        Self {
            name: name.to_string(),
            default: FieldDefault::Bytes(Vec::new()),
        }
    }

    /// Field whose value is computed when the packet is built.
    pub fn auto(name: &str) -> Self {
        Self {
            name: name.to_string(),
            default: FieldDefault::None,
        }
    }
}

/// A packet class: a name and its ordered field descriptors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketClass {
    pub name: String,
    pub fields_desc: Vec<FieldDesc>,
}

impl PacketClass {
    pub fn new(name: &str, fields_desc: Vec<FieldDesc>) -> Self {
        Self {
            name: name.to_string(),
            fields_desc,
        }
    }

    /// Look up a field descriptor by name.
    pub fn field(&self, name: &str) -> Option<&FieldDesc> {
        self.fields_desc.iter().find(|f| f.name == name)
    }

    /// Names of the declared fields, in declaration order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields_desc.iter().map(|f| f.name.clone()).collect()
    }
}

/// A packet layer instance.
#[derive(Clone)]
pub struct Packet {
    class: Rc<PacketClass>,
    fields: BTreeMap<String, Value>,
    payload: Option<PacketRef>,
}

impl Packet {
    /// Create a packet with every field at its default.
    pub fn new(class: Rc<PacketClass>) -> Self {
        Self {
            class,
            fields: BTreeMap::new(),
            payload: None,
        }
    }

    /// Instantiate `class` with keyword field values.
    pub fn build(
        class: &Rc<PacketClass>,
        fields: Vec<(String, Value)>,
    ) -> Result<PacketRef, EvalError> {
        let mut packet = Packet::new(Rc::clone(class));
        for (name, value) in fields {
            packet.set_field(&name, value)?;
        }
        Ok(Rc::new(RefCell::new(packet)))
    }

    pub fn class(&self) -> &Rc<PacketClass> {
        &self.class
    }

    pub fn name(&self) -> &str {
        &self.class.name
    }

    /// Fields that were explicitly set.
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Field value, falling back to the declared default.
    pub fn get_field(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.fields.get(name) {
            return Some(value.clone());
        }
        self.class.field(name).map(|f| f.default.to_value())
    }

    /// Set a declared field.
    pub fn set_field(&mut self, name: &str, value: Value) -> Result<(), EvalError> {
        if self.class.field(name).is_none() {
            return Err(EvalError::attribute(&self.class.name, name));
        }
        self.fields.insert(name.to_string(), value);
        Ok(())
    }

    pub fn payload(&self) -> Option<&PacketRef> {
        self.payload.as_ref()
    }

    pub fn set_payload(&mut self, payload: Option<PacketRef>) {
        self.payload = payload;
    }

    /// Replace raw state without validation; used when decoding session images.
    pub(crate) fn restore(&mut self, fields: BTreeMap<String, Value>, payload: Option<PacketRef>) {
        self.fields = fields;
        self.payload = payload;
    }
}

impl std::fmt::Debug for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packet")
            .field("class", &self.class.name)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("has_payload", &self.payload.is_some())
            .finish()
    }
}

/// Layers of the payload chain starting at `packet`, stopping at the first
/// layer already visited.
pub fn layers(packet: &PacketRef) -> Vec<PacketRef> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut current = Some(Rc::clone(packet));
    while let Some(layer) = current {
        if !seen.insert(Rc::as_ptr(&layer) as usize) {
            break;
        }
        current = layer.borrow().payload.clone();
        chain.push(layer);
    }
    chain
}

/// Copy the payload chain of `packet`.
///
/// Packet-valued fields stay shared. A cyclic payload chain is copied up to
/// the first repeated layer.
pub fn deep_copy(packet: &PacketRef) -> PacketRef {
    let mut next: Option<PacketRef> = None;
    for layer in layers(packet).iter().rev() {
        let layer = layer.borrow();
        let copy = Packet {
            class: Rc::clone(&layer.class),
            fields: layer.fields.clone(),
            payload: next.take(),
        };
        next = Some(Rc::new(RefCell::new(copy)));
    }
    next.unwrap_or_else(|| Rc::clone(packet))
}

/// `lower / upper`: copy of `lower` with a copy of `upper` as innermost payload.
pub fn stack(lower: &PacketRef, upper: &PacketRef) -> PacketRef {
    let result = deep_copy(lower);
    let top = deep_copy(upper);
    if let Some(last) = layers(&result).last() {
        last.borrow_mut().payload = Some(top);
    }
    result
}

/// `IP / TCP` style summary of the payload chain.
pub fn summary(packet: &PacketRef) -> String {
    layers(packet)
        .iter()
        .map(|layer| layer.borrow().name().to_string())
        .collect::<Vec<_>>()
        .join(" / ")
}

/// Multi-line field listing of every layer.
pub fn show(packet: &PacketRef) -> String {
    let mut out = String::new();
    for layer in layers(packet) {
        let layer = layer.borrow();
        let _ = writeln!(out, "###[ {} ]###", layer.name());
        for desc in &layer.class.fields_desc {
            let value = layer.get_field(&desc.name).unwrap_or(Value::None);
            let _ = writeln!(out, "  {:<10}= {}", desc.name, value);
        }
    }
    out
}
