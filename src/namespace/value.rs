//! Dynamically typed console values.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::Rc;

use super::packet::{PacketClass, PacketRef, CLASS_MEMBERS, PACKET_MEMBERS, PACKET_METHODS};
use super::Environment;
use crate::config::{ConfRef, CONF_ATTRS};
use crate::error::EvalError;

/// Signature of functions exported by extensions.
pub type NativeFn = fn(&mut Environment, CallArgs) -> Result<Value, EvalError>;

/// A function implemented by the toolkit.
#[derive(Clone, Copy)]
pub struct Native {
    pub name: &'static str,
    pub doc: &'static str,
    pub func: NativeFn,
}

impl fmt::Debug for Native {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}>", self.name)
    }
}

/// A method looked up on a value but not called yet.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundMethod {
    pub receiver: Box<Value>,
    pub name: String,
}

/// Arguments of a call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub keywords: Vec<(String, Value)>,
}

impl CallArgs {
    /// Argument given either at `index` or as keyword `name`.
    pub fn get(&self, index: usize, name: &str) -> Option<&Value> {
        self.keywords
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
            .or_else(|| self.positional.get(index))
    }

    /// Optional string argument; `None` and absence both map to `Ok(None)`.
    pub fn opt_str(&self, index: usize, name: &str) -> Result<Option<String>, EvalError> {
        match self.get(index, name) {
            None | Some(Value::None) => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s.clone())),
            Some(other) => Err(EvalError::Type(format!(
                "argument '{}' must be a str, not '{}'",
                name,
                other.type_name()
            ))),
        }
    }

    /// Required string argument.
    pub fn str(&self, index: usize, name: &str) -> Result<String, EvalError> {
        self.opt_str(index, name)?
            .ok_or_else(|| EvalError::Type(format!("missing required argument '{}'", name)))
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keywords.is_empty()
    }
}

/// A live value bound in a namespace.
#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Dict(BTreeMap<String, Value>),
    Packet(PacketRef),
    Class(Rc<PacketClass>),
    Config(ConfRef),
    Native(Native),
    Method(BoundMethod),
    Module(String),
}

const STR_METHODS: &[&str] = &["endswith", "lower", "split", "startswith", "strip", "upper"];
const LIST_METHODS: &[&str] = &["count", "index"];
const DICT_METHODS: &[&str] = &["get", "keys", "values"];

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Packet(_) => "Packet",
            Value::Class(_) => "Packet_metaclass",
            Value::Config(_) => "Conf",
            Value::Native(_) => "function",
            Value::Method(_) => "method",
            Value::Module(_) => "module",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(v) => *v != 0,
            Value::Float(v) => *v != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Dict(d) => !d.is_empty(),
            _ => true,
        }
    }

    /// Attributes of the object itself.
    pub fn members(&self) -> Vec<String> {
        match self {
            Value::Packet(_) => to_strings(PACKET_MEMBERS),
            Value::Class(_) => to_strings(CLASS_MEMBERS),
            Value::Config(_) => to_strings(CONF_ATTRS),
            Value::Method(_) => to_strings(&["__func__", "__self__"]),
            _ => Vec::new(),
        }
    }

    /// Attributes provided by the object's type.
    pub fn class_members(&self) -> Vec<String> {
        match self {
            Value::Str(_) => to_strings(STR_METHODS),
            Value::List(_) => to_strings(LIST_METHODS),
            Value::Dict(_) => to_strings(DICT_METHODS),
            Value::Int(_) | Value::Float(_) => to_strings(&["imag", "real"]),
            _ => Vec::new(),
        }
    }

    /// Declared protocol field names, for packets and packet classes.
    pub fn field_names(&self) -> Option<Vec<String>> {
        match self {
            Value::Packet(p) => Some(p.borrow().class().field_names()),
            Value::Class(c) => Some(c.field_names()),
            _ => None,
        }
    }

    /// Attribute lookup (`value.name`).
    pub fn get_attr(&self, name: &str) -> Result<Value, EvalError> {
        match self {
            Value::Packet(p) => packet_attr(p, name),
            Value::Class(class) => match name {
                "name" | "__name__" => Ok(Value::Str(class.name.clone())),
                "fields_desc" => Ok(Value::List(
                    class.field_names().into_iter().map(Value::Str).collect(),
                )),
                _ => class
                    .field(name)
                    .map(|f| f.default.to_value())
                    .ok_or_else(|| EvalError::attribute(&class.name, name)),
            },
            Value::Config(conf) => conf
                .borrow()
                .get_attr(name)
                .ok_or_else(|| EvalError::attribute("Conf", name)),
            Value::Int(v) => match name {
                "real" => Ok(Value::Int(*v)),
                "imag" => Ok(Value::Int(0)),
                _ => Err(EvalError::attribute("int", name)),
            },
            Value::Float(v) => match name {
                "real" => Ok(Value::Float(*v)),
                "imag" => Ok(Value::Float(0.0)),
                _ => Err(EvalError::attribute("float", name)),
            },
            Value::Str(_) | Value::List(_) | Value::Dict(_)
                if self.class_members().iter().any(|m| m == name) =>
            {
                Ok(self.bind(name))
            }
            other => Err(EvalError::attribute(other.type_name(), name)),
        }
    }

    /// Attribute assignment (`value.name = new`). Only reference values accept it.
    pub fn set_attr(&self, name: &str, new: Value) -> Result<(), EvalError> {
        match self {
            Value::Packet(p) => {
                let mut packet = p.borrow_mut();
                if name == "payload" {
                    match new {
                        Value::Packet(payload) => packet.set_payload(Some(payload)),
                        Value::None => packet.set_payload(None),
                        other => {
                            return Err(EvalError::Type(format!(
                                "payload must be a packet, not '{}'",
                                other.type_name()
                            )))
                        }
                    }
                    Ok(())
                } else {
                    packet.set_field(name, new)
                }
            }
            Value::Config(conf) => conf.borrow_mut().set_attr(name, &new),
            other => Err(EvalError::Type(format!(
                "'{}' object attributes are read-only",
                other.type_name()
            ))),
        }
    }

    fn bind(&self, name: &str) -> Value {
        Value::Method(BoundMethod {
            receiver: Box::new(self.clone()),
            name: name.to_string(),
        })
    }

    fn fmt_with(&self, f: &mut fmt::Formatter<'_>, seen: &mut HashSet<usize>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{:?}", v),
            Value::Str(s) => write!(f, "'{}'", s.escape_default()),
            Value::Bytes(b) => {
                write!(f, "b'")?;
                for byte in b {
                    write!(f, "{}", std::ascii::escape_default(*byte))?;
                }
                write!(f, "'")
            }
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt_with(f, seen)?;
                }
                write!(f, "]")
            }
            Value::Dict(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{}': ", k.escape_default())?;
                    v.fmt_with(f, seen)?;
                }
                write!(f, "}}")
            }
            Value::Packet(p) => fmt_packet(p, f, seen),
            Value::Class(c) => write!(f, "<class '{}'>", c.name),
            Value::Config(c) => match c.try_borrow() {
                Ok(conf) => write!(f, "{}", conf),
                Err(_) => write!(f, "<Conf>"),
            },
            Value::Native(n) => write!(f, "<function {}>", n.name),
            Value::Method(m) => write!(f, "<bound method {}.{}>", m.receiver.type_name(), m.name),
            Value::Module(path) => write!(f, "<module '{}'>", path),
        }
    }

    fn eq_with(&self, other: &Value, seen: &mut HashSet<(usize, usize)>) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.eq_with(y, seen))
            }
            (Value::Dict(a), Value::Dict(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.eq_with(vb, seen))
            }
            (Value::Packet(a), Value::Packet(b)) => packets_eq(a, b, seen),
            (Value::Class(a), Value::Class(b)) => a == b,
            (Value::Config(a), Value::Config(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Native(a), Value::Native(b)) => a.name == b.name,
            (Value::Method(a), Value::Method(b)) => {
                a.name == b.name && a.receiver.eq_with(&b.receiver, seen)
            }
            (Value::Module(a), Value::Module(b)) => a == b,
            _ => false,
        }
    }
}

fn to_strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn packet_attr(p: &PacketRef, name: &str) -> Result<Value, EvalError> {
    let mut seen = HashSet::new();
    let mut current = Rc::clone(p);
    loop {
        if !seen.insert(Rc::as_ptr(&current) as usize) {
            break;
        }
        let next = {
            let layer = current.borrow();
            match name {
                "payload" => {
                    return Ok(layer
                        .payload()
                        .map(|pl| Value::Packet(Rc::clone(pl)))
                        .unwrap_or(Value::None))
                }
                "name" => return Ok(Value::Str(layer.name().to_string())),
                "fields" => {
                    return Ok(Value::Dict(
                        layer
                            .fields()
                            .iter()
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect(),
                    ))
                }
                _ if PACKET_METHODS.contains(&name) => {
                    return Ok(Value::Method(BoundMethod {
                        receiver: Box::new(Value::Packet(Rc::clone(&current))),
                        name: name.to_string(),
                    }))
                }
                _ => {}
            }
            if let Some(value) = layer.get_field(name) {
                return Ok(value);
            }
            layer.payload().cloned()
        };
        match next {
            Some(payload) => current = payload,
            None => break,
        }
    }
    Err(EvalError::attribute(p.borrow().name(), name))
}

fn fmt_packet(p: &PacketRef, f: &mut fmt::Formatter<'_>, seen: &mut HashSet<usize>) -> fmt::Result {
    let ptr = Rc::as_ptr(p) as usize;
    if !seen.insert(ptr) {
        return write!(f, "<...>");
    }
    let layer = match p.try_borrow() {
        Ok(layer) => layer,
        Err(_) => {
            seen.remove(&ptr);
            return write!(f, "<Packet>");
        }
    };
    write!(f, "<{}", layer.name())?;
    for (name, value) in layer.fields() {
        write!(f, " {}=", name)?;
        value.fmt_with(f, seen)?;
    }
    write!(f, " |")?;
    if let Some(payload) = layer.payload() {
        fmt_packet(payload, f, seen)?;
    }
    write!(f, ">")?;
    seen.remove(&ptr);
    Ok(())
}

fn packets_eq(a: &PacketRef, b: &PacketRef, seen: &mut HashSet<(usize, usize)>) -> bool {
    if Rc::ptr_eq(a, b) {
        return true;
    }
    let key = (Rc::as_ptr(a) as usize, Rc::as_ptr(b) as usize);
    if !seen.insert(key) {
        return true;
    }
    let (a, b) = (a.borrow(), b.borrow());
    if a.class() != b.class() || a.fields().len() != b.fields().len() {
        return false;
    }
    let fields_eq = a
        .fields()
        .iter()
        .zip(b.fields())
        .all(|((ka, va), (kb, vb))| ka == kb && va.eq_with(vb, seen));
    fields_eq
        && match (a.payload(), b.payload()) {
            (None, None) => true,
            (Some(pa), Some(pb)) => packets_eq(pa, pb, seen),
            _ => false,
        }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with(f, &mut HashSet::new())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with(f, &mut HashSet::new())
    }
}

/// Structural equality; packets compare by content and tolerate cycles.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.eq_with(other, &mut HashSet::new())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::packet::{FieldDesc, Packet};
    use std::cell::RefCell;

    fn ip() -> Rc<PacketClass> {
        Rc::new(PacketClass::new(
            "IP",
            vec![FieldDesc::str("dst", "127.0.0.1"), FieldDesc::int("ttl", 64)],
        ))
    }

    fn tcp() -> Rc<PacketClass> {
        Rc::new(PacketClass::new("TCP", vec![FieldDesc::int("dport", 80)]))
    }

    #[test]
    fn test_display_primitives() {
        assert_eq!(Value::None.to_string(), "None");
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
        assert_eq!(Value::from("a'b").to_string(), "'a\\'b'");
        assert_eq!(Value::Bytes(b"\x01A".to_vec()).to_string(), "b'\\x01A'");
        assert_eq!(
            Value::List(vec![Value::Int(1), Value::from("x")]).to_string(),
            "[1, 'x']"
        );
    }

    #[test]
    fn test_packet_repr_shows_explicit_fields() {
        let pkt = Packet::build(&ip(), vec![("ttl".into(), Value::Int(3))]).unwrap();
        let payload = Packet::build(&tcp(), vec![]).unwrap();
        pkt.borrow_mut().set_payload(Some(payload));
        assert_eq!(Value::Packet(pkt).to_string(), "<IP ttl=3 |<TCP |>>");
    }

    #[test]
    fn test_cyclic_repr_and_eq_terminate() {
        let a = Packet::build(&ip(), vec![]).unwrap();
        a.borrow_mut()
            .set_field("dst", Value::Packet(Rc::clone(&a)))
            .unwrap();

        let text = Value::Packet(Rc::clone(&a)).to_string();
        assert_eq!(text, "<IP dst=<...> |>");

        let b = Packet::build(&ip(), vec![]).unwrap();
        b.borrow_mut()
            .set_field("dst", Value::Packet(Rc::clone(&b)))
            .unwrap();
        assert_eq!(Value::Packet(Rc::clone(&a)), Value::Packet(Rc::clone(&b)));

        a.borrow_mut().set_field("dst", Value::None).unwrap();
        b.borrow_mut().set_field("dst", Value::None).unwrap();
    }

    #[test]
    fn test_packet_attr_falls_through_to_payload() {
        let pkt = Packet::build(&ip(), vec![]).unwrap();
        let inner = Packet::build(&tcp(), vec![("dport".into(), Value::Int(443))]).unwrap();
        pkt.borrow_mut().set_payload(Some(inner));

        let value = Value::Packet(pkt);
        assert_eq!(value.get_attr("dport").unwrap(), Value::Int(443));
        assert_eq!(value.get_attr("ttl").unwrap(), Value::Int(64));
        assert_eq!(value.get_attr("name").unwrap(), Value::from("IP"));
        assert!(matches!(value.get_attr("show").unwrap(), Value::Method(_)));
        assert_eq!(
            value.get_attr("nope").unwrap_err(),
            EvalError::attribute("IP", "nope")
        );
    }

    #[test]
    fn test_set_attr() {
        let pkt = Value::Packet(Packet::build(&ip(), vec![]).unwrap());
        pkt.set_attr("ttl", Value::Int(1)).unwrap();
        assert_eq!(pkt.get_attr("ttl").unwrap(), Value::Int(1));

        assert!(pkt.set_attr("payload", Value::Int(1)).is_err());
        assert!(pkt.set_attr("bogus", Value::Int(1)).is_err());
        assert!(Value::Int(1).set_attr("real", Value::Int(2)).is_err());
    }

    #[test]
    fn test_class_attrs() {
        let class = Value::Class(ip());
        assert_eq!(class.get_attr("ttl").unwrap(), Value::Int(64));
        assert_eq!(
            class.get_attr("fields_desc").unwrap(),
            Value::List(vec![Value::from("dst"), Value::from("ttl")])
        );
        assert_eq!(
            class.field_names(),
            Some(vec!["dst".to_string(), "ttl".to_string()])
        );
    }

    #[test]
    fn test_config_attr_reads_live_object() {
        let conf = crate::config::Conf::default().into_ref();
        let value = Value::Config(Rc::clone(&conf));
        value.set_attr("prompt", Value::from("# ")).unwrap();
        assert_eq!(conf.borrow().prompt, "# ");
        assert_eq!(value.get_attr("prompt").unwrap(), Value::from("# "));
    }

    #[test]
    fn test_call_args_lookup() {
        let args = CallArgs {
            positional: vec![Value::from("a")],
            keywords: vec![("keep".into(), Value::Bool(true))],
        };
        assert_eq!(args.get(0, "fname"), Some(&Value::from("a")));
        assert_eq!(args.get(1, "keep"), Some(&Value::Bool(true)));
        assert_eq!(args.opt_str(5, "other").unwrap(), None);
        assert!(args.opt_str(1, "keep").is_err());
    }

    #[test]
    fn test_reflection() {
        assert!(Value::from("x").class_members().contains(&"upper".to_string()));
        assert!(Value::from("x").members().is_empty());
        assert!(Value::Int(1).field_names().is_none());
        let shared = Rc::new(RefCell::new(crate::config::Conf::default()));
        assert!(Value::Config(shared)
            .members()
            .contains(&"histfile".to_string()));
    }
}
