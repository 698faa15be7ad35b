//! End-to-end translation tests through the `AvroData` facade.

use avro_connect_types::{AvroData, AvroDataConfig, ConversionError};
use avro_schema::{parse_str, to_json_string, Record, Value};
use connect_core::{ConnectValue, Field, SchemaBuilder, SchemaKind};
use std::collections::BTreeMap;
use std::sync::Arc;

fn enhanced() -> AvroData {
    AvroData::new(AvroDataConfig::builder().enhanced_fidelity(true).build())
}

fn assert_text_round_trip(data: &AvroData, text: &str) {
    let avro = parse_str(text).unwrap();
    let connect = data.to_connect_schema(&avro).unwrap();
    let back = data.from_connect_schema(&connect).unwrap();
    assert_eq!(to_json_string(&back), text);
}

#[test]
fn test_person_record_round_trips_byte_identical() {
    let text = r#"{"type":"record","name":"P","fields":[{"name":"firstName","type":"string","doc":"First Name"},{"name":"age","type":"int"}]}"#;
    let data = AvroData::default();
    let connect = data.to_connect_schema(&parse_str(text).unwrap()).unwrap();

    let fields = connect.fields();
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].name, "firstName");
    assert_eq!(fields[0].doc.as_deref(), Some("First Name"));
    assert_eq!(fields[1].name, "age");
    assert_eq!(fields[1].doc, None);

    assert_text_round_trip(&data, text);
}

#[test]
fn test_general_union_value_populates_one_branch() {
    let schema = parse_str(
        r#"{"type":"record","name":"Holder","fields":[{"name":"u","type":["null",
            {"type":"record","name":"RecordA","fields":[{"name":"a","type":"string"}]},
            {"type":"record","name":"RecordB","fields":[{"name":"b","type":"int"}]}]}]}"#,
    )
    .unwrap();
    let original: Value = Record::new()
        .with("u", Record::new().with("a", Value::String("x".into())).into())
        .into();
    let data = AvroData::default();

    let converted = data.to_connect_data(&schema, &original).unwrap();
    let union_schema = &converted.schema.fields()[0].schema;
    assert!(union_schema.optional);
    let holder = converted.value.as_struct().unwrap();
    let union = holder.get("u").unwrap().as_struct().unwrap();
    let record_a = union.get("recordA").unwrap().as_struct().unwrap();
    assert_eq!(record_a.get("a"), Some(&ConnectValue::String("x".into())));
    assert_eq!(union.get("recordB"), Some(&ConnectValue::Null));

    let back = data.from_connect_data(&converted.schema, &converted.value).unwrap();
    assert_eq!(back, original);
}

#[test]
fn test_all_kinds_data_round_trip() {
    let schema = parse_str(
        r#"{"type":"record","name":"All","fields":[
            {"name":"b","type":"boolean"},
            {"name":"i","type":"int"},
            {"name":"l","type":"long"},
            {"name":"f","type":"float"},
            {"name":"d","type":"double"},
            {"name":"s","type":"string"},
            {"name":"by","type":"bytes"},
            {"name":"fx","type":{"type":"fixed","name":"Four","size":4}},
            {"name":"e","type":{"type":"enum","name":"Color","symbols":["RED","GREEN"]}},
            {"name":"arr","type":{"type":"array","items":"int"}},
            {"name":"m","type":{"type":"map","values":"long"}},
            {"name":"opt","type":["null","string"],"default":null}]}"#,
    )
    .unwrap();
    let original: Value = Record::new()
        .with("b", Value::Boolean(true))
        .with("i", Value::Int(-7))
        .with("l", Value::Long(1 << 40))
        .with("f", Value::Float(1.5))
        .with("d", Value::Double(-2.25))
        .with("s", Value::String("text".into()))
        .with("by", Value::Bytes(vec![0, 255]))
        .with("fx", Value::Bytes(vec![1, 2, 3, 4]))
        .with("e", Value::String("GREEN".into()))
        .with("arr", Value::Array(vec![Value::Int(1), Value::Int(2)]))
        .with(
            "m",
            Value::Map(BTreeMap::from([
                ("a".to_string(), Value::Long(1)),
                ("b".to_string(), Value::Long(2)),
            ])),
        )
        .with("opt", Value::String("set".into()))
        .into();

    for data in [AvroData::default(), enhanced()] {
        let converted = data.to_connect_data(&schema, &original).unwrap();
        converted.value.validate(&converted.schema).unwrap();
        let back = data.from_connect_data(&converted.schema, &converted.value).unwrap();
        assert_eq!(back, original);
    }
}

#[test]
fn test_repeated_named_type_shares_target_object() {
    let schema = parse_str(
        r#"{"type":"record","name":"R","fields":[
            {"name":"first","type":{"type":"record","name":"Point","fields":[{"name":"x","type":"int"}]}},
            {"name":"second","type":"Point"},
            {"name":"list","type":{"type":"array","items":"Point"}}]}"#,
    )
    .unwrap();
    let connect = AvroData::default().to_connect_schema(&schema).unwrap();
    let fields = connect.fields();
    assert!(Arc::ptr_eq(&fields[0].schema, &fields[1].schema));
    let SchemaKind::Array(items) = &fields[2].schema.kind else {
        panic!("expected array")
    };
    assert!(Arc::ptr_eq(&fields[0].schema, items));
}

#[test]
fn test_field_doc_and_type_doc_are_independent() {
    let text = |field_doc: &str| {
        format!(
            r#"{{"type":"record","name":"R","fields":[{{"name":"f","type":{{"type":"record","name":"T","doc":"B","fields":[]}},"doc":"{field_doc}"}}]}}"#
        )
    };
    let data = AvroData::new(AvroDataConfig::builder().cache_capacity(0).build());
    for field_doc in ["A", "C"] {
        let connect = data.to_connect_schema(&parse_str(&text(field_doc)).unwrap()).unwrap();
        let field = &connect.fields()[0];
        assert_eq!(field.doc.as_deref(), Some(field_doc));
        assert_eq!(field.schema.doc.as_deref(), Some("B"));
    }
    assert_text_round_trip(&data, &text("A"));
}

#[test]
fn test_defaults_survive_round_trip() {
    let data = AvroData::default();
    for text in [
        r#"{"type":"record","name":"R","fields":[{"name":"e","type":{"type":"enum","name":"Num","symbols":["ONE","TWO"],"default":"ONE"},"default":"TWO"}]}"#,
        r#"{"type":"record","name":"F","fields":[{"name":"x","type":"float","default":9.18},{"name":"y","type":"double","default":1.0}]}"#,
        r#"{"type":"record","name":"Outer","fields":[{"name":"inner","type":{"type":"record","name":"Inner","fields":[{"name":"data","type":"string"}]},"default":{"data":""}}]}"#,
        r#"{"type":"record","name":"O","fields":[{"name":"s","type":["null","string"],"default":null},{"name":"b","type":"bytes","default":"ÿ"}]}"#,
    ] {
        assert_text_round_trip(&data, text);
    }
}

#[test]
fn test_enum_field_default_differs_from_type_default() {
    let schema = parse_str(
        r#"{"type":"record","name":"R","fields":[{"name":"e","type":{"type":"enum","name":"E","symbols":["A","B"],"default":"A"},"default":"B"}]}"#,
    )
    .unwrap();
    let connect = AvroData::default().to_connect_schema(&schema).unwrap();
    let field = &connect.fields()[0];
    assert_eq!(field.default, Some(ConnectValue::String("B".into())));
    assert_eq!(field.schema.parameter("avro.enum.default"), Some("A"));
}

#[test]
fn test_record_default_decomposes_into_fields() {
    let schema = parse_str(
        r#"{"type":"record","name":"Outer","fields":[{"name":"inner","type":{"type":"record","name":"Inner","fields":[
            {"name":"data","type":"string"},{"name":"n","type":"int","default":3}]},"default":{"data":""}}]}"#,
    )
    .unwrap();
    let connect = AvroData::default().to_connect_schema(&schema).unwrap();
    let default = connect.fields()[0].default.as_ref().unwrap().as_struct().unwrap();
    assert_eq!(default.get("data"), Some(&ConnectValue::String(String::new())));
    assert_eq!(default.get("n"), Some(&ConnectValue::Int32(3)));

    // A partial value falls back to field defaults.
    let converted = AvroData::default()
        .to_connect_data(&schema, &Record::new().into())
        .unwrap();
    let inner = converted.value.as_struct().unwrap().get("inner").unwrap();
    assert_eq!(inner.as_struct().unwrap().get("n"), Some(&ConnectValue::Int32(3)));
}

#[test]
fn test_cache_is_bounded_and_recomputes_after_eviction() {
    let data = AvroData::new(AvroDataConfig::builder().cache_capacity(1).build());
    let a = parse_str(r#"{"type":"record","name":"A","fields":[]}"#).unwrap();
    let b = parse_str(r#"{"type":"record","name":"B","fields":[]}"#).unwrap();

    let first = data.to_connect_schema(&a).unwrap();
    assert!(Arc::ptr_eq(&first, &data.to_connect_schema(&a).unwrap()));

    data.to_connect_schema(&b).unwrap();
    assert_eq!(data.cached_schemas().0, 1);

    let recomputed = data.to_connect_schema(&a).unwrap();
    assert!(!Arc::ptr_eq(&first, &recomputed));
    assert_eq!(first, recomputed);
}

#[test]
fn test_union_branch_selection_is_deterministic() {
    let schema = parse_str(
        r#"["null",
            {"type":"record","name":"A","fields":[{"name":"x","type":"int"}]},
            {"type":"record","name":"B","fields":[{"name":"x","type":"int"}]}]"#,
    )
    .unwrap();
    let value: Value = Record::new().with("x", Value::Int(1)).into();
    let data = AvroData::default();
    for _ in 0..10 {
        let converted = data.to_connect_data(&schema, &value).unwrap();
        let union = converted.value.as_struct().unwrap();
        assert!(!union.get("a").unwrap().is_null());
        assert!(union.get("b").unwrap().is_null());
    }
}

#[test]
fn test_recursive_schema_and_data() {
    let text = r#"{"type":"record","name":"Node","fields":[{"name":"value","type":"int"},{"name":"next","type":["null","Node"],"default":null}]}"#;
    let data = AvroData::default();
    assert_text_round_trip(&data, text);

    let schema = parse_str(text).unwrap();
    let list: Value = Record::new()
        .with("value", Value::Int(1))
        .with(
            "next",
            Record::new()
                .with("value", Value::Int(2))
                .with("next", Value::Null)
                .into(),
        )
        .into();
    let converted = data.to_connect_data(&schema, &list).unwrap();
    let back = data.from_connect_data(&converted.schema, &converted.value).unwrap();
    assert_eq!(back, list);
}

#[test]
fn test_concurrent_translation_shares_one_instance() {
    let data = AvroData::new(AvroDataConfig::builder().cache_capacity(4).build());
    let schema = parse_str(
        r#"{"type":"record","name":"C","fields":[{"name":"u","type":["null","int","string"]}]}"#,
    )
    .unwrap();
    let value: Value = Record::new().with("u", Value::String("s".into())).into();

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| data.to_connect_data(&schema, &value).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for result in &results {
        assert_eq!(result, &results[0]);
    }
    assert_eq!(data.cached_schemas().0, 1);
}

#[test]
fn test_enhanced_fidelity_restores_exact_schema() {
    let text = r#"{"type":"record","name":"E","namespace":"demo","doc":"enhanced","fields":[{"name":"u","type":["int","null","string"]},{"name":"o","type":["string","null"],"default":"x"},{"name":"s","type":{"type":"string","avro.java.string":"String"},"custom":true},{"name":"k","type":{"type":"enum","name":"K","symbols":["B","A"]}}]}"#;
    let original = parse_str(text).unwrap();
    let data = enhanced();
    let connect = data.to_connect_schema(&original).unwrap();
    let back = data.from_connect_schema(&connect).unwrap();
    assert_eq!(back, original);
    assert_eq!(to_json_string(&back), text);
}

#[test]
fn test_without_enhanced_fidelity_union_order_is_normalized() {
    let original = parse_str(
        r#"{"type":"record","name":"R","fields":[{"name":"u","type":["int","null","string"]}]}"#,
    )
    .unwrap();
    let data = AvroData::default();
    let back = data
        .from_connect_schema(&data.to_connect_schema(&original).unwrap())
        .unwrap();
    assert_eq!(
        to_json_string(&back),
        r#"{"type":"record","name":"R","fields":[{"name":"u","type":["null","int","string"],"default":null}]}"#
    );
}

#[test]
fn test_nameless_struct_cannot_become_record() {
    let schema = SchemaBuilder::struct_()
        .field(Field::new("a", SchemaBuilder::int32().build().unwrap()))
        .build()
        .unwrap();
    assert!(matches!(
        AvroData::default().from_connect_schema(&schema),
        Err(ConversionError::MissingRequiredName(_))
    ));
}

#[test]
fn test_narrow_int_round_trips_through_connect_type() {
    assert_text_round_trip(&AvroData::default(), r#"{"type":"int","connect.type":"int8"}"#);

    let schema = SchemaBuilder::int16().build().unwrap();
    let data = AvroData::default();
    let avro = data.from_connect_schema(&schema).unwrap();
    assert_eq!(data.to_connect_schema(&avro).unwrap(), schema);
}

#[test]
fn test_non_string_keyed_map_round_trip() {
    let schema = SchemaBuilder::map(
        SchemaBuilder::int32().build().unwrap(),
        SchemaBuilder::string().build().unwrap(),
    )
    .build()
    .unwrap();
    let value = ConnectValue::Map(vec![
        (ConnectValue::Int32(1), ConnectValue::String("one".into())),
        (ConnectValue::Int32(2), ConnectValue::String("two".into())),
    ]);
    let data = AvroData::default();
    let avro_value = data.from_connect_data(&schema, &value).unwrap();
    let avro_schema = data.from_connect_schema(&schema).unwrap();

    let back = data.to_connect_data(&avro_schema, &avro_value).unwrap();
    assert_eq!(back.schema, schema);
    assert_eq!(back.value, value);
}

#[test]
fn test_multiple_populated_branches_are_rejected() {
    let schema = parse_str(
        r#"{"type":"record","name":"R","fields":[{"name":"u","type":["int","string"]}]}"#,
    )
    .unwrap();
    let data = AvroData::default();
    let connect = data.to_connect_schema(&schema).unwrap();
    let union_schema = connect.fields()[0].schema.clone();

    let both = connect_core::Struct::new(union_schema.clone())
        .unwrap()
        .with("int", ConnectValue::Int32(1))
        .unwrap()
        .with("string", ConnectValue::String("s".into()))
        .unwrap();
    let record = connect_core::Struct::new(connect.clone())
        .unwrap()
        .with("u", ConnectValue::Struct(both))
        .unwrap();
    assert!(matches!(
        data.from_connect_data(&connect, &ConnectValue::Struct(record)),
        Err(ConversionError::SchemaValueMismatch { .. })
    ));

    let none = connect_core::Struct::new(union_schema).unwrap();
    let record = connect_core::Struct::new(connect.clone())
        .unwrap()
        .with("u", ConnectValue::Struct(none))
        .unwrap();
    assert!(matches!(
        data.from_connect_data(&connect, &ConnectValue::Struct(record)),
        Err(ConversionError::UnresolvedUnionBranch { .. })
    ));
}
