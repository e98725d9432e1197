//! On-disk representation of a session.
//!
//! Packets are written once into an object table and referenced by index,
//! so shared and cyclic packet graphs survive a round trip. Container
//! values live in a flat value table: a list or dict holds the indices of
//! its items, and every item is written before the container holding it.
//! Values without a stored form (classes, modules, methods, functions)
//! have no variant in [`StoredValue`] and are dropped while capturing.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::filter;
use crate::config::Conf;
use crate::namespace::{Namespace, Packet, PacketClass, PacketRef, Value};

/// Leading bytes of every session image.
pub const MAGIC: [u8; 4] = *b"PKSN";

/// Current image format version.
pub const FORMAT_VERSION: u32 = 1;

/// Deepest nesting of lists and dicts an image may hold.
pub const MAX_NESTING: usize = 100;

/// A serializable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoredValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    /// Indices into the value table.
    List(Vec<usize>),
    Dict(Vec<(String, usize)>),
    /// Index into the packet table.
    Packet(usize),
    Config(Conf),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoredPacket {
    class: usize,
    fields: Vec<(String, usize)>,
    payload: Option<usize>,
}

/// A complete session image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionImage {
    magic: [u8; 4],
    version: u32,
    classes: Vec<PacketClass>,
    packets: Vec<StoredPacket>,
    values: Vec<StoredValue>,
    entries: Vec<(String, usize)>,
}

/// An entry left out of an image, with the type name of its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub name: String,
    pub type_name: &'static str,
}

impl SessionImage {
    /// Capture every entry of `namespace` that has a stored form.
    ///
    /// A container holding a value without a stored form, or nested deeper
    /// than [`MAX_NESTING`], is skipped as a whole. Packet fields without a
    /// stored form fall back to their default.
    pub fn capture(namespace: &Namespace) -> (Self, Vec<Skipped>) {
        let mut encoder = Encoder::default();
        let mut entries = Vec::new();
        let mut skipped = Vec::new();

        for (name, value) in namespace.iter() {
            match encoder.value(value, 0) {
                Some(index) => entries.push((name.clone(), index)),
                None => skipped.push(Skipped {
                    name: name.clone(),
                    type_name: value.type_name(),
                }),
            }
        }

        let image = Self {
            magic: MAGIC,
            version: FORMAT_VERSION,
            classes: encoder.classes,
            packets: encoder.packets,
            values: encoder.values,
            entries,
        };
        (image, skipped)
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rebuild the live namespace.
    pub fn restore(self) -> Result<Namespace, String> {
        if self.magic != MAGIC {
            return Err("not a session image".to_string());
        }
        if self.version != FORMAT_VERSION {
            return Err(format!("unsupported image version {}", self.version));
        }

        let classes: Vec<Rc<PacketClass>> = self.classes.into_iter().map(Rc::new).collect();

        // allocate every packet first so forward and cyclic references resolve
        let mut packets = Vec::with_capacity(self.packets.len());
        for stored in &self.packets {
            let class = classes
                .get(stored.class)
                .ok_or_else(|| format!("dangling class index {}", stored.class))?;
            packets.push(Rc::new(RefCell::new(Packet::new(Rc::clone(class)))));
        }

        let mut decoder = Decoder::new(&packets);
        for stored in self.values {
            decoder.push(stored)?;
        }

        for (slot, stored) in packets.iter().zip(self.packets) {
            let mut fields = BTreeMap::new();
            for (name, index) in stored.fields {
                fields.insert(name, decoder.take(index)?.0);
            }
            let payload = stored.payload.map(|i| decoder.packet(i)).transpose()?;
            slot.borrow_mut().restore(fields, payload);
        }

        self.entries
            .into_iter()
            .map(|(name, index)| decoder.take(index).map(|(v, _)| (name, v)))
            .collect()
    }
}

#[derive(Default)]
struct Encoder {
    classes: Vec<PacketClass>,
    class_index: HashMap<*const PacketClass, usize>,
    packets: Vec<StoredPacket>,
    packet_index: HashMap<*const RefCell<Packet>, usize>,
    values: Vec<StoredValue>,
}

impl Encoder {
    /// Append `value` to the value table; `depth` counts enclosing containers.
    fn value(&mut self, value: &Value, depth: usize) -> Option<usize> {
        if filter::is_transient_kind(value) {
            return None;
        }
        let stored = match value {
            Value::None => StoredValue::None,
            Value::Bool(b) => StoredValue::Bool(*b),
            Value::Int(v) => StoredValue::Int(*v),
            Value::Float(v) => StoredValue::Float(*v),
            Value::Str(s) => StoredValue::Str(s.clone()),
            Value::Bytes(b) => StoredValue::Bytes(b.clone()),
            Value::List(_) | Value::Dict(_) if depth >= MAX_NESTING => return None,
            Value::List(items) => StoredValue::List(
                items
                    .iter()
                    .map(|item| self.value(item, depth + 1))
                    .collect::<Option<Vec<_>>>()?,
            ),
            Value::Dict(map) => StoredValue::Dict(
                map.iter()
                    .map(|(k, v)| Some((k.clone(), self.value(v, depth + 1)?)))
                    .collect::<Option<Vec<_>>>()?,
            ),
            Value::Packet(p) => StoredValue::Packet(self.packet(p)),
            Value::Config(conf) => StoredValue::Config(conf.borrow().clone()),
            Value::Class(_) | Value::Module(_) | Value::Method(_) | Value::Native(_) => {
                return None
            }
        };
        self.values.push(stored);
        Some(self.values.len() - 1)
    }

    fn class(&mut self, class: &Rc<PacketClass>) -> usize {
        let key = Rc::as_ptr(class);
        if let Some(&index) = self.class_index.get(&key) {
            return index;
        }
        let index = match self.classes.iter().position(|c| c == class.as_ref()) {
            Some(index) => index,
            None => {
                self.classes.push(class.as_ref().clone());
                self.classes.len() - 1
            }
        };
        self.class_index.insert(key, index);
        index
    }

    fn packet(&mut self, packet: &PacketRef) -> usize {
        let key = Rc::as_ptr(packet);
        if let Some(&index) = self.packet_index.get(&key) {
            return index;
        }

        let layer = packet.borrow();
        let index = self.packets.len();
        let class = self.class(layer.class());
        self.packets.push(StoredPacket {
            class,
            fields: Vec::new(),
            payload: None,
        });
        self.packet_index.insert(key, index);

        let fields = layer
            .fields()
            .iter()
            .filter_map(|(name, value)| Some((name.clone(), self.value(value, 0)?)))
            .collect();
        let payload = layer.payload().map(|p| self.packet(p));

        let slot = &mut self.packets[index];
        slot.fields = fields;
        slot.payload = payload;
        index
    }
}

/// Rebuilds the value table in order. Each stored item is moved into the
/// one container, field or entry that names it.
struct Decoder<'a> {
    packets: &'a [PacketRef],
    slots: Vec<Option<Value>>,
    nesting: Vec<usize>,
}

impl<'a> Decoder<'a> {
    fn new(packets: &'a [PacketRef]) -> Self {
        Self {
            packets,
            slots: Vec::new(),
            nesting: Vec::new(),
        }
    }

    fn packet(&self, index: usize) -> Result<PacketRef, String> {
        self.packets
            .get(index)
            .cloned()
            .ok_or_else(|| format!("dangling packet index {}", index))
    }

    /// Move the decoded value at `index` out of the table, with its nesting.
    fn take(&mut self, index: usize) -> Result<(Value, usize), String> {
        self.slots
            .get_mut(index)
            .and_then(Option::take)
            .map(|value| (value, self.nesting[index]))
            .ok_or_else(|| format!("dangling value index {}", index))
    }

    fn push(&mut self, stored: StoredValue) -> Result<(), String> {
        let (value, nesting) = match stored {
            StoredValue::None => (Value::None, 0),
            StoredValue::Bool(b) => (Value::Bool(b), 0),
            StoredValue::Int(v) => (Value::Int(v), 0),
            StoredValue::Float(v) => (Value::Float(v), 0),
            StoredValue::Str(s) => (Value::Str(s), 0),
            StoredValue::Bytes(b) => (Value::Bytes(b), 0),
            StoredValue::List(indices) => {
                let mut deepest = 0;
                let mut items = Vec::with_capacity(indices.len());
                for index in indices {
                    let (item, nesting) = self.take(index)?;
                    deepest = deepest.max(nesting);
                    items.push(item);
                }
                (Value::List(items), deepest + 1)
            }
            StoredValue::Dict(entries) => {
                let mut deepest = 0;
                let mut map = BTreeMap::new();
                for (key, index) in entries {
                    let (item, nesting) = self.take(index)?;
                    deepest = deepest.max(nesting);
                    map.insert(key, item);
                }
                (Value::Dict(map), deepest + 1)
            }
            StoredValue::Packet(index) => (Value::Packet(self.packet(index)?), 0),
            StoredValue::Config(conf) => (Value::Config(conf.into_ref()), 0),
        };
        if nesting > MAX_NESTING {
            return Err(format!("values nested deeper than {}", MAX_NESTING));
        }
        self.slots.push(Some(value));
        self.nesting.push(nesting);
        Ok(())
    }
}
