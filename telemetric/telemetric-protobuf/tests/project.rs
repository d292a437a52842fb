
use bytes::Bytes;
use prost::Message;
use prost_reflect::{DescriptorPool, DynamicMessage, MapKey, Value as ProtoValue};
use prost_types::{
    FieldDescriptorProto,
    field_descriptor_proto::{Label, Type},
};
use telemetric_core::Value;
use telemetric_protobuf::message_to_value;
use test_helpers::*;

fn pool(fds: &[u8]) -> DescriptorPool {
    DescriptorPool::decode(fds).unwrap()
}

#[test]
fn scalar_kinds_collapse_to_generic_values() {
    let msg = message(
        "Scalars",
        vec![
            scalar_field("f_double", 1, Type::Double),
            scalar_field("f_float", 2, Type::Float),
            scalar_field("f_int32", 3, Type::Int32),
            scalar_field("f_sint64", 4, Type::Sint64),
            scalar_field("f_fixed32", 5, Type::Fixed32),
            scalar_field("f_uint64", 6, Type::Uint64),
            scalar_field("f_bool", 7, Type::Bool),
            scalar_field("f_string", 8, Type::String),
            scalar_field("f_bytes", 9, Type::Bytes),
        ],
    );
    let pool = pool(&build_fds("scalars.proto", "demo", vec![msg], vec![]));
    let desc = pool.get_message_by_name("demo.Scalars").unwrap();

    let mut dm = DynamicMessage::new(desc.clone());
    dm.set_field_by_name("f_double", ProtoValue::F64(3.25));
    dm.set_field_by_name("f_float", ProtoValue::F32(2.5));
    dm.set_field_by_name("f_int32", ProtoValue::I32(-42));
    dm.set_field_by_name("f_sint64", ProtoValue::I64(-100));
    dm.set_field_by_name("f_fixed32", ProtoValue::U32(42));
    dm.set_field_by_name("f_uint64", ProtoValue::U64(u64::MAX));
    dm.set_field_by_name("f_bool", ProtoValue::Bool(true));
    dm.set_field_by_name("f_string", ProtoValue::String("hello".to_string()));
    dm.set_field_by_name("f_bytes", ProtoValue::Bytes(Bytes::from_static(b"\xaa\xbb\xcc")));

    let decoded = DynamicMessage::decode(desc, dm.encode_to_vec().as_slice()).unwrap();
    let value = message_to_value(&decoded).unwrap();

    assert_eq!(
        value,
        Value::map([
            ("f_double", Value::Float(3.25)),
            ("f_float", Value::Float(2.5)),
            ("f_int32", Value::Int(-42)),
            ("f_sint64", Value::Int(-100)),
            ("f_fixed32", Value::UInt(42)),
            ("f_uint64", Value::UInt(u64::MAX)),
            ("f_bool", Value::Bool(true)),
            ("f_string", Value::string("hello")),
            ("f_bytes", Value::string("aa:bb:cc")),
        ])
    );
}

#[test]
fn unpopulated_fields_are_omitted() {
    let registry = if_stats_registry();
    let desc = descriptor(&registry, "demo.IfStats");

    let mut dm = DynamicMessage::new(desc);
    dm.set_field_by_name("packets", ProtoValue::U64(5));

    let value = message_to_value(&dm).unwrap();
    assert_eq!(value, Value::map([("packets", Value::UInt(5))]));
}

#[test]
fn enums_nested_and_repeated_fields() {
    let registry = if_stats_registry();
    let counters = descriptor(&registry, "demo.Counters");
    let counter = |rx: u64, tx: u64| {
        let mut c = DynamicMessage::new(counters.clone());
        c.set_field_by_name("rx", ProtoValue::U64(rx));
        c.set_field_by_name("tx", ProtoValue::U64(tx));
        c
    };

    let mut dm = DynamicMessage::new(descriptor(&registry, "demo.IfStats"));
    dm.set_field_by_name("state", ProtoValue::EnumNumber(1));
    dm.set_field_by_name(
        "samples",
        ProtoValue::List(vec![ProtoValue::U32(3), ProtoValue::U32(1), ProtoValue::U32(2)]),
    );
    dm.set_field_by_name("counters", ProtoValue::Message(counter(10, 20)));
    dm.set_field_by_name(
        "history",
        ProtoValue::List(vec![
            ProtoValue::Message(counter(1, 2)),
            ProtoValue::Message(counter(3, 4)),
        ]),
    );

    let value = message_to_value(&dm).unwrap();

    assert_eq!(value.get("state"), Some(&Value::Int(1)));
    assert_eq!(
        value.get("samples"),
        Some(&Value::List(vec![
            Value::UInt(3),
            Value::UInt(1),
            Value::UInt(2)
        ]))
    );
    assert_eq!(
        value.get("counters"),
        Some(&Value::map([("rx", Value::UInt(10)), ("tx", Value::UInt(20))]))
    );
    let history = value.get("history").unwrap().try_list().unwrap().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].get("tx"), Some(&Value::UInt(4)));
}

#[test]
fn map_fields_are_keyed_by_sorted_string_keys() {
    let entry = map_entry_message("LabelsEntry", Type::Uint32, Type::String);
    let holder = prost_types::DescriptorProto {
        nested_type: vec![entry],
        ..message(
            "Holder",
            vec![FieldDescriptorProto {
                name: Some("labels".to_string()),
                number: Some(1),
                r#type: Some(Type::Message.into()),
                type_name: Some(".demo.Holder.LabelsEntry".to_string()),
                label: Some(Label::Repeated.into()),
                ..Default::default()
            }],
        )
    };
    let pool = pool(&build_fds("map.proto", "demo", vec![holder], vec![]));
    let desc = pool.get_message_by_name("demo.Holder").unwrap();

    let mut dm = DynamicMessage::new(desc);
    let labels = [(20, "twenty"), (3, "three")]
        .into_iter()
        .map(|(k, v)| (MapKey::U32(k), ProtoValue::String(v.to_string())))
        .collect();
    dm.set_field_by_name("labels", ProtoValue::Map(labels));

    let value = message_to_value(&dm).unwrap();
    assert_eq!(
        value.get("labels"),
        Some(&Value::map([
            ("20", Value::string("twenty")),
            ("3", Value::string("three")),
        ]))
    );
}

#[test]
fn projection_serialises_to_json_in_field_order() {
    let registry = if_stats_registry();
    let mut dm = DynamicMessage::new(descriptor(&registry, "demo.IfStats"));
    dm.set_field_by_name("name", ProtoValue::String("Gi0".to_string()));
    dm.set_field_by_name("delta", ProtoValue::I32(-7));
    dm.set_field_by_name("mac", ProtoValue::Bytes(Bytes::from_static(&[0, 0x1b, 0xff])));

    let json = serde_json::to_value(message_to_value(&dm).unwrap()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"name": "Gi0", "delta": -7, "mac": "00:1b:ff"})
    );
}

#[test]
fn projecting_twice_is_identical() {
    let registry = if_stats_registry();
    let row = if_stats_row(&registry, "Gi0/0/0/1", 9);
    let desc = descriptor(&registry, "demo.IfStats");

    let first = message_to_value(&DynamicMessage::decode(desc.clone(), row.as_slice()).unwrap());
    let second = message_to_value(&DynamicMessage::decode(desc, row.as_slice()).unwrap());
    assert_eq!(first.unwrap(), second.unwrap());
}
