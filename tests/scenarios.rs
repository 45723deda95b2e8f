//! End-to-end reproductions of the worked examples from the design notes,
//! driven entirely through the public crate surface (as an external user of
//! the crate would use it, not through any internal module path).

use indexmap::IndexMap;
use std::rc::Rc;

use packed_layout::endian::Endian;
use packed_layout::factory::{self as f, Named};
use packed_layout::structure::StructureBuilder;
use packed_layout::union_::{Discriminator, UnionBuilder};
use packed_layout::value::Value;
use packed_layout::Layout;

fn sensor_struct() -> packed_layout::structure::Structure {
    StructureBuilder::new(Some("sensor".into()))
        .field(f::u8().named("sensor_id"))
        .field(f::s16(Endian::Little).named("t_cel"))
        .field(f::u16(Endian::Little).named("rh_pph"))
        .field(f::u32(Endian::Little).named("timestamp_posix"))
        .build()
        .unwrap()
}

#[test]
fn scenario_1_packed_sensor_reading_round_trips() {
    let s = sensor_struct();
    let bytes = [0x05, 0x17, 0x00, 0x00, 0x00, 0xde, 0x26, 0x2d, 0x56];
    let decoded = s.decode(&bytes, 0).unwrap();
    let map = decoded.as_map().unwrap();
    assert_eq!(map["sensor_id"], Value::UInt(5));
    assert_eq!(map["t_cel"], Value::Int(23));

    let mut out = [0u8; 9];
    let n = s.encode(&decoded, &mut out, 0).unwrap();
    assert_eq!(n, 9);
    assert_eq!(out, bytes);
}

#[test]
fn scenario_2_externally_counted_sequence_via_negative_offset() {
    // struct { n: u8, items: seq(u16le, offset(lookup(n), -1)) }
    let n_lookup = f::offset(f::u8(), -1);
    let s = StructureBuilder::new(None)
        .field(f::u8().named("n"))
        .field(f::seq(f::u16(Endian::Little), n_lookup).named("items"))
        .build()
        .unwrap();

    let mut src = IndexMap::new();
    src.insert(
        "items".to_owned(),
        Value::Seq(vec![Value::UInt(1), Value::UInt(2)]),
    );
    let mut buf = [0u8; 5];
    s.encode(&Value::Map(src), &mut buf, 0).unwrap();
    assert_eq!(buf[0], 2);

    let decoded = s.decode(&buf, 0).unwrap();
    assert_eq!(decoded.as_map().unwrap()["n"], Value::UInt(2));
}

#[test]
fn scenario_3_tagged_union_infers_variant_from_source_shape() {
    let discr = Discriminator::Prefix(f::u8_layout());
    let union = UnionBuilder::new(discr, None)
        .add_variant(0, Some(f::u32(Endian::Little)), "a")
        .add_variant(
            1,
            Some(Layout::Structure(Rc::new(
                StructureBuilder::new(Some("pos".into()))
                    .field(f::u16(Endian::Little).named("x"))
                    .field(f::u16(Endian::Little).named("y"))
                    .build()
                    .unwrap(),
            ))),
            "pos",
        )
        .build()
        .unwrap();

    let mut record = IndexMap::new();
    record.insert("a".to_owned(), Value::UInt(0xDEADBEEF));
    let mut buf = [0u8; 5];
    let n = union.encode(&Value::Map(record), &mut buf, 0).unwrap();
    assert_eq!(n, 5);
    assert_eq!(buf, [0x00, 0xef, 0xbe, 0xad, 0xde]);

    let bytes = [0x01, 0x0a, 0x00, 0x14, 0x00];
    let decoded = union.decode(&bytes, 0).unwrap();
    let pos = decoded.as_map().unwrap()["pos"].as_map().unwrap();
    assert_eq!(pos["x"], Value::UInt(10));
    assert_eq!(pos["y"], Value::UInt(20));
}

#[test]
fn scenario_4_lsb_first_bitfields_pack_into_two_bytes() {
    use packed_layout::bitstruct::{BitOrder, BitStructureBuilder};

    let bs = BitStructureBuilder::new(2, Endian::Little, BitOrder::Lsb0)
        .unwrap()
        .add_field("a", 3)
        .unwrap()
        .add_field("b", 5)
        .unwrap()
        .add_field("c", 8)
        .unwrap()
        .build();

    let mut record = IndexMap::new();
    record.insert("a".to_owned(), Value::UInt(5));
    record.insert("b".to_owned(), Value::UInt(17));
    record.insert("c".to_owned(), Value::UInt(0xA5));
    let mut buf = [0u8; 2];
    bs.encode(&Value::Map(record), &mut buf, 0).unwrap();
    assert_eq!(buf, [0x8d, 0xa5]);
}

#[test]
fn scenario_5_cstr_round_trips_through_a_structure_field() {
    let s = StructureBuilder::new(None)
        .field(f::cstr().named("name"))
        .field(f::u8().named("flag"))
        .build()
        .unwrap();
    let buf = [0x68, 0x69, 0x00, 0x01];
    let decoded = s.decode(&buf, 0).unwrap();
    let map = decoded.as_map().unwrap();
    assert_eq!(map["name"], Value::Str("hi".to_owned()));
    assert_eq!(map["flag"], Value::UInt(1));

    let mut out = [0u8; 4];
    s.encode(&decoded, &mut out, 0).unwrap();
    assert_eq!(out, buf);
}

#[test]
fn scenario_6_decode_prefixes_stops_at_a_truncated_buffer() {
    let s = StructureBuilder::new(Some("rec".into()))
        .field(f::u8().named("a"))
        .field(f::u16(Endian::Little).named("b"))
        .field(f::u32(Endian::Little).named("c"))
        .decode_prefixes(true)
        .build()
        .unwrap();
    let buf = [0x01, 0x02, 0x00];
    let decoded = s.decode(&buf, 0).unwrap();
    let map = decoded.as_map().unwrap();
    assert_eq!(map.get("a"), Some(&Value::UInt(1)));
    assert_eq!(map.get("b"), Some(&Value::UInt(2)));
    assert_eq!(map.get("c"), None);
}
