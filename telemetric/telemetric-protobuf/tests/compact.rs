
use telemetric_core::{DecodeError, Value};
use telemetric_protobuf::{
    COMPACT_ENCODING, DecodeOptions, DecodedRows, NO_DECODER_PLACEHOLDER, decode_compact,
};
use test_helpers::*;

#[test]
fn single_table_single_row_decodes_and_projects() {
    let registry = if_stats_registry();
    let bytes = single_row_compact(&registry);

    let msg = decode_compact(&registry, &bytes, DecodeOptions::all()).unwrap();

    assert_eq!(msg.header.encoding, COMPACT_ENCODING);
    assert_eq!(msg.header.policy_name, "ifstats");
    assert_eq!(msg.header.identifier, "router-1");
    assert_eq!(msg.tables.len(), 1);

    let value = msg.to_value().unwrap();
    let tables = value.get("tables").unwrap().try_list().unwrap().unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(
        tables[0].get("policy_path"),
        Some(&Value::string(IF_STATS_PATH))
    );
    let rows = tables[0].get("row").unwrap().try_list().unwrap().unwrap();
    assert_eq!(
        rows,
        &[Value::map([
            ("name", Value::string("GigabitEthernet0/0/0/0")),
            ("packets", Value::UInt(42)),
        ])]
    );
    assert_eq!(value.get("encoding"), Some(&Value::UInt(0x8765_4321)));
}

#[test]
fn encoding_mismatch_is_rejected_before_tables() {
    let registry = if_stats_registry();
    let bytes = compact_message(&registry, 0x1234_5678, vec![("Unknown.Path", vec![vec![1]])]);

    let err = decode_compact(&registry, &bytes, DecodeOptions::all()).unwrap_err();
    match err {
        DecodeError::EncodingMismatch { found, expected } => {
            assert_eq!(found, 0x1234_5678);
            assert_eq!(expected, COMPACT_ENCODING);
        }
        other => panic!("expected EncodingMismatch, got {other:?}"),
    }
}

#[test]
fn encoding_mismatch_message_matches_hex_format() {
    let err = DecodeError::EncodingMismatch {
        found: 0x1,
        expected: COMPACT_ENCODING,
    };
    assert_eq!(
        err.to_string(),
        "invalid 'encoding' value 0x1 (expected 0x87654321)"
    );
}

#[test]
fn unknown_schema_path_yields_placeholder_and_continues() {
    let registry = if_stats_registry();
    let row = if_stats_row(&registry, "Gi0", 1);
    let bytes = compact_message(
        &registry,
        COMPACT_ENCODING,
        vec![
            ("Not.Registered", vec![vec![0x08, 0x01], vec![0x08, 0x02]]),
            (IF_STATS_PATH, vec![row]),
        ],
    );

    let msg = decode_compact(&registry, &bytes, DecodeOptions::all()).unwrap();
    assert!(matches!(msg.tables[0].rows, DecodedRows::NoDecoder));
    assert_eq!(msg.tables[0].row_count, 2);
    assert!(matches!(
        &msg.tables[1].rows,
        DecodedRows::Decoded { rows, failed: 0 } if rows.len() == 1
    ));

    let value = msg.to_value().unwrap();
    let tables = value.get("tables").unwrap().try_list().unwrap().unwrap();
    assert_eq!(
        tables[0].get("row"),
        Some(&Value::List(vec![Value::string(NO_DECODER_PLACEHOLDER)]))
    );
    assert_eq!(
        tables[1].get("row").unwrap().try_list().unwrap().unwrap().len(),
        1
    );
}

#[test]
fn undecodable_row_is_skipped_and_counted() {
    let registry = if_stats_registry();
    let good = if_stats_row(&registry, "Gi0", 1);
    // Field 1 declared length-delimited with a length past the end.
    let bad = vec![0x0a, 0x7f, 0x01];
    let bytes = compact_message(
        &registry,
        COMPACT_ENCODING,
        vec![(IF_STATS_PATH, vec![bad, good])],
    );

    let msg = decode_compact(&registry, &bytes, DecodeOptions::all()).unwrap();
    let DecodedRows::Decoded { rows, failed } = &msg.tables[0].rows else {
        panic!("expected decoded rows");
    };
    assert_eq!(*failed, 1);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].index, 1);
}

#[test]
fn brief_mode_decodes_only_first_row() {
    let registry = if_stats_registry();
    let rows = vec![
        if_stats_row(&registry, "Gi0", 1),
        if_stats_row(&registry, "Gi1", 2),
        if_stats_row(&registry, "Gi2", 3),
    ];
    let bytes = compact_message(&registry, COMPACT_ENCODING, vec![(IF_STATS_PATH, rows)]);

    let msg = decode_compact(&registry, &bytes, DecodeOptions::brief()).unwrap();
    assert_eq!(msg.tables[0].row_count, 3);
    let value = msg.to_value().unwrap();
    let tables = value.get("tables").unwrap().try_list().unwrap().unwrap();
    let rows = tables[0].get("row").unwrap().try_list().unwrap().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&Value::string("Gi0")));

    let text = msg.render();
    assert!(text.contains("  # Rows: 3 (Only first row displayed)\n"));
    assert!(text.contains("    Row 0:\n"));
    assert!(!text.contains("Row 1:"));
}

#[test]
fn render_lists_header_and_row_fields() {
    let registry = if_stats_registry();
    let bytes = single_row_compact(&registry);

    let text = decode_compact(&registry, &bytes, DecodeOptions::all())
        .unwrap()
        .render();

    let expected = [
        "Encoding:    0x87654321",
        "Policy Name: ifstats",
        "Version:     25",
        "Identifier:  router-1",
        "Start Time:  Fri Jul 14 02:40:00 2017 (123ms)",
        "End Time:    Fri Jul 14 02:40:00 2017 (456ms)",
        "# Tables:    1",
        "  Schema Path: RootOper.InfraStatistics.Interface.Latest.GenericCounters",
        "  # Rows: 1",
        "    Row 0:",
        "    name: GigabitEthernet0/0/0/0",
        "    packets: 42",
        "    delta: 0",
        "    mac: ",
        "    state: DOWN",
        "    samples: []",
        "    counters {",
        "    }",
        "    history (0 items) [",
        "    ]",
        "",
    ];
    assert_eq!(text, format!("{}\n", expected.join("\n")));
}

#[test]
fn render_marks_tables_without_decoder() {
    let registry = if_stats_registry();
    let bytes = compact_message(&registry, COMPACT_ENCODING, vec![("Nope", vec![vec![]])]);

    let text = decode_compact(&registry, &bytes, DecodeOptions::all())
        .unwrap()
        .render();
    assert!(text.contains("  Schema Path: Nope\n  # Rows: 1\n  No decoder available\n"));
}

#[test]
fn garbage_payload_is_a_decode_error() {
    let registry = if_stats_registry();
    let err = decode_compact(&registry, &[0xff, 0xff, 0xff], DecodeOptions::all()).unwrap_err();
    assert!(matches!(err, DecodeError::MessageDecode { .. }));
}

#[test]
fn decoding_twice_is_identical() {
    let registry = if_stats_registry();
    let bytes = single_row_compact(&registry);

    let first = decode_compact(&registry, &bytes, DecodeOptions::all()).unwrap();
    let second = decode_compact(&registry, &bytes, DecodeOptions::all()).unwrap();
    assert_eq!(first.to_value().unwrap(), second.to_value().unwrap());
}
