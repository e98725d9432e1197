//! Bundled protocol layers.

use std::rc::Rc;

use super::registry::{ExtensionKind, StaticExtension};
use crate::namespace::{FieldDesc, Namespace, PacketClass, Value};

pub(crate) fn extensions() -> Vec<StaticExtension> {
    vec![
        StaticExtension::new(ExtensionKind::Layers, "l2", "Link layer: Ether, ARP", l2),
        StaticExtension::new(
            ExtensionKind::Layers,
            "inet",
            "IPv4 and transports: IP, TCP, UDP, ICMP, Raw",
            inet,
        ),
    ]
}

fn fragment(classes: Vec<PacketClass>) -> Namespace {
    classes
        .into_iter()
        .map(|class| (class.name.clone(), Value::Class(Rc::new(class))))
        .collect()
}

pub fn ether() -> PacketClass {
    PacketClass::new(
        "Ether",
        vec![
            FieldDesc::str("dst", "ff:ff:ff:ff:ff:ff"),
            FieldDesc::str("src", "00:00:00:00:00:00"),
            FieldDesc::int("type", 0x9000),
        ],
    )
}

pub fn arp() -> PacketClass {
    PacketClass::new(
        "ARP",
        vec![
            FieldDesc::int("hwtype", 1),
            FieldDesc::int("ptype", 0x800),
            FieldDesc::auto("hwlen"),
            FieldDesc::auto("plen"),
            FieldDesc::int("op", 1),
            FieldDesc::str("hwsrc", "00:00:00:00:00:00"),
            FieldDesc::str("psrc", "0.0.0.0"),
            FieldDesc::str("hwdst", "00:00:00:00:00:00"),
            FieldDesc::str("pdst", "0.0.0.0"),
        ],
    )
}

pub fn ip() -> PacketClass {
    PacketClass::new(
        "IP",
        vec![
            FieldDesc::int("version", 4),
            FieldDesc::auto("ihl"),
            FieldDesc::int("tos", 0),
            FieldDesc::auto("len"),
            FieldDesc::int("id", 1),
            FieldDesc::int("flags", 0),
            FieldDesc::int("frag", 0),
            FieldDesc::int("ttl", 64),
            FieldDesc::int("proto", 0),
            FieldDesc::auto("chksum"),
            FieldDesc::str("src", "127.0.0.1"),
            FieldDesc::str("dst", "127.0.0.1"),
        ],
    )
}

pub fn tcp() -> PacketClass {
    PacketClass::new(
        "TCP",
        vec![
            FieldDesc::int("sport", 20),
            FieldDesc::int("dport", 80),
            FieldDesc::int("seq", 0),
            FieldDesc::int("ack", 0),
            FieldDesc::auto("dataofs"),
            FieldDesc::int("reserved", 0),
            FieldDesc::int("flags", 0x02),
            FieldDesc::int("window", 8192),
            FieldDesc::auto("chksum"),
            FieldDesc::int("urgptr", 0),
        ],
    )
}

pub fn udp() -> PacketClass {
    PacketClass::new(
        "UDP",
        vec![
            FieldDesc::int("sport", 53),
            FieldDesc::int("dport", 53),
            FieldDesc::auto("len"),
            FieldDesc::auto("chksum"),
        ],
    )
}

pub fn icmp() -> PacketClass {
    PacketClass::new(
        "ICMP",
        vec![
            FieldDesc::int("type", 8),
            FieldDesc::int("code", 0),
            FieldDesc::auto("chksum"),
            FieldDesc::int("id", 0),
            FieldDesc::int("seq", 0),
        ],
    )
}

pub fn raw() -> PacketClass {
    PacketClass::new("Raw", vec![FieldDesc::bytes("load")])
}

fn l2() -> Namespace {
    fragment(vec![ether(), arp()])
}

fn inet() -> Namespace {
    fragment(vec![ip(), tcp(), udp(), icmp(), raw()])
}
