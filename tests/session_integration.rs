//! Session store integration tests.
//!
//! These tests save and restore whole sessions through the public API,
//! including shared and cyclic packet graphs.

use std::fs;
use std::rc::Rc;

use bincode::Options;
use serde::Serialize;
use tempfile::tempdir;

use packet_console::config::Conf;
use packet_console::extension::layers;
use packet_console::namespace::{Packet, PacketClass, Value};
use packet_console::session::{
    backup_path, StoredValue, CONF_KEY, FORMAT_VERSION, MAGIC, MAX_NESTING,
};
use packet_console::{ConsoleError, Namespace, Session, SessionStore};

fn class(build: fn() -> PacketClass) -> Rc<PacketClass> {
    Rc::new(build())
}

fn sample_session() -> Session {
    let conf = Conf::default().into_ref();
    let mut session = Session::seeded(&conf);
    let ns = session.namespace_mut();
    ns.insert("count", Value::Int(3));
    ns.insert("ratio", Value::Float(0.5));
    ns.insert("label", Value::from("capture"));
    ns.insert("raw", Value::Bytes(vec![0xde, 0xad]));
    ns.insert(
        "nested",
        Value::List(vec![
            Value::Int(1),
            Value::List(vec![Value::Bool(true), Value::None]),
            Value::Dict(
                [("k".to_string(), Value::from("v"))]
                    .into_iter()
                    .collect(),
            ),
        ]),
    );
    session
}

// ============================================================================
// Round Trip Tests
// ============================================================================

#[test]
fn test_roundtrip_primitives_and_containers() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("work.pks");
    let session = sample_session();

    let store = SessionStore::new();
    store.save(&path, &session).unwrap();
    let loaded = store.load(&path).unwrap();

    for name in ["count", "ratio", "label", "raw", "nested"] {
        assert_eq!(loaded.get(name), session.get(name), "entry {}", name);
    }
    assert_eq!(loaded.len(), session.len());
}

#[test]
fn test_roundtrip_excludes_transient_and_reserved() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("work.pks");
    let mut session = sample_session();
    let ns = session.namespace_mut();
    ns.insert("IP", Value::Class(class(layers::ip)));
    ns.insert("mod", Value::Module("modules.console".into()));
    ns.insert("_scratch", Value::Int(9));
    ns.insert("Out", Value::Int(9));
    ns.insert("__builtins__", Value::None);

    let store = SessionStore::new();
    store.save(&path, &session).unwrap();
    let loaded = store.load(&path).unwrap();

    let keys: Vec<_> = loaded.keys().cloned().collect();
    assert_eq!(
        keys,
        vec!["conf", "count", "label", "nested", "ratio", "raw"]
    );
}

#[test]
fn test_roundtrip_cyclic_packets() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cycle.pks");

    let ip = class(layers::ip);
    let tcp = class(layers::tcp);
    let outer = Packet::build(&ip, vec![("ttl".into(), Value::Int(3))]).unwrap();
    let inner = Packet::build(&tcp, vec![("dport".into(), Value::Int(443))]).unwrap();
    inner.borrow_mut().set_payload(Some(Rc::clone(&outer)));
    outer.borrow_mut().set_payload(Some(Rc::clone(&inner)));

    let mut session = sample_session();
    session
        .namespace_mut()
        .insert("pkt", Value::Packet(Rc::clone(&outer)));
    session
        .namespace_mut()
        .insert("alias", Value::Packet(Rc::clone(&inner)));

    let store = SessionStore::new();
    store.save(&path, &session).unwrap();
    let loaded = store.load(&path).unwrap();

    let (Some(Value::Packet(pkt)), Some(Value::Packet(alias))) =
        (loaded.get("pkt"), loaded.get("alias"))
    else {
        panic!("packets not restored");
    };

    // identity survives: pkt -> alias -> pkt
    let second = pkt.borrow().payload().cloned().unwrap();
    assert!(Rc::ptr_eq(&second, alias));
    let third = alias.borrow().payload().cloned().unwrap();
    assert!(Rc::ptr_eq(&third, pkt));

    assert_eq!(pkt.borrow().get_field("ttl"), Some(Value::Int(3)));
    assert_eq!(alias.borrow().get_field("dport"), Some(Value::Int(443)));
    assert_eq!(loaded.get("pkt"), session.get("pkt"));
}

#[test]
fn test_restore_into_keeps_container_identity() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("work.pks");
    let store = SessionStore::new();
    store.save(&path, &sample_session()).unwrap();

    let live = Conf::default().into_ref();
    let mut session = Session::seeded(&live);
    session.namespace_mut().insert("stale", Value::Int(1));
    let before: *const Namespace = session.namespace();

    store.restore_into(&path, &mut session, &live).unwrap();

    assert!(std::ptr::eq(before, session.namespace()));
    assert!(session.get("stale").is_none());
    assert_eq!(session.get("count"), Some(&Value::Int(3)));
    match session.get(CONF_KEY) {
        Some(Value::Config(conf)) => assert!(Rc::ptr_eq(conf, &live)),
        other => panic!("unexpected conf entry: {:?}", other),
    }
}

// ============================================================================
// Backup Tests
// ============================================================================

#[test]
fn test_second_save_keeps_backup_of_first() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("work.pks");
    let store = SessionStore::new();

    let mut session = sample_session();
    store.save(&path, &session).unwrap();
    let first = fs::read(&path).unwrap();
    assert!(!backup_path(&path).exists());

    session.namespace_mut().insert("count", Value::Int(4));
    store.save(&path, &session).unwrap();

    assert_eq!(fs::read(backup_path(&path)).unwrap(), first);
    let loaded = store.load(&path).unwrap();
    assert_eq!(loaded.get("count"), Some(&Value::Int(4)));
}

// ============================================================================
// Format Detection Tests
// ============================================================================

#[test]
fn test_uncompressed_file_is_read() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plain.pks");

    SessionStore::uncompressed()
        .save(&path, &sample_session())
        .unwrap();
    let bytes = fs::read(&path).unwrap();
    assert_ne!(&bytes[..2], &[0x1f, 0x8b]);

    let loaded = SessionStore::new().load(&path).unwrap();
    assert_eq!(loaded.get("label"), Some(&Value::from("capture")));
}

#[test]
fn test_truncated_file_is_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("work.pks");
    let store = SessionStore::new();
    store.save(&path, &sample_session()).unwrap();

    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

    let err = store.load(&path).unwrap_err();
    assert!(matches!(err, ConsoleError::SessionCorrupt { .. }));
}

#[test]
fn test_truncated_plain_file_is_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plain.pks");
    let store = SessionStore::uncompressed();
    store.save(&path, &sample_session()).unwrap();

    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

    assert!(store.load(&path).is_err());
}

#[test]
fn test_missing_file_is_reported() {
    let dir = tempdir().unwrap();
    let err = SessionStore::new()
        .load(&dir.path().join("absent.pks"))
        .unwrap_err();
    assert!(matches!(err, ConsoleError::SessionNotFound(_)));
}

/// Same wire layout as a session image, built by hand.
#[derive(Serialize)]
struct RawImage {
    magic: [u8; 4],
    version: u32,
    classes: Vec<()>,
    packets: Vec<()>,
    values: Vec<StoredValue>,
    entries: Vec<(String, usize)>,
}

fn list_chain(levels: usize) -> Vec<u8> {
    let mut values = vec![StoredValue::Int(7)];
    for i in 0..levels {
        values.push(StoredValue::List(vec![i]));
    }
    let image = RawImage {
        magic: MAGIC,
        version: FORMAT_VERSION,
        classes: Vec::new(),
        packets: Vec::new(),
        entries: vec![("x".to_string(), values.len() - 1)],
        values,
    };
    bincode::DefaultOptions::new().serialize(&image).unwrap()
}

#[test]
fn test_deeply_nested_file_is_corrupt() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("deep.pks");
    fs::write(&path, list_chain(100_000)).unwrap();

    let err = SessionStore::uncompressed().load(&path).unwrap_err();
    assert!(matches!(err, ConsoleError::SessionCorrupt { .. }));
}

#[test]
fn test_nesting_at_limit_loads() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested.pks");
    fs::write(&path, list_chain(MAX_NESTING)).unwrap();

    let loaded = SessionStore::uncompressed().load(&path).unwrap();
    let mut value = loaded.get("x").cloned().unwrap();
    let mut levels = 0;
    while let Value::List(mut items) = value {
        value = items.pop().unwrap();
        levels += 1;
    }
    assert_eq!(levels, MAX_NESTING);
    assert_eq!(value, Value::Int(7));
}
