use schema_bridge::{commands, ConversionOpts};
use std::io::Write;

const ORDER: &str = r#"{"type":"record","name":"Order","namespace":"shop","fields":[{"name":"id","type":"long"},{"name":"status","type":{"type":"enum","name":"Status","symbols":["NEW","PAID"]},"default":"NEW"},{"name":"tags","type":{"type":"map","values":"string"},"avro.java.string":"String"}]}"#;

#[test]
fn test_conversion_opts_defaults() {
    let config = ConversionOpts::default().to_config().unwrap();
    assert_eq!(config.cache_capacity, 1);
    assert!(config.attach_provenance_metadata);
    assert!(!config.enhanced_fidelity);
}

#[test]
fn test_conversion_opts_flags_override_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "cache_capacity: 16\nenhanced_fidelity: false").unwrap();
    let opts = ConversionOpts {
        config: Some(file.path().to_path_buf()),
        cache_capacity: None,
        enhanced: true,
        no_metadata: true,
    };
    let config = opts.to_config().unwrap();
    assert_eq!(config.cache_capacity, 16);
    assert!(config.enhanced_fidelity);
    assert!(!config.attach_provenance_metadata);
}

#[test]
fn test_missing_config_file() {
    let opts = ConversionOpts {
        config: Some("/nonexistent/schema-bridge.yaml".into()),
        ..ConversionOpts::default()
    };
    let err = opts.to_config().unwrap_err();
    assert!(format!("{err:#}").contains("Failed to load config"));
}

#[test]
fn test_to_connect_then_from_connect() {
    let config = ConversionOpts {
        enhanced: true,
        ..ConversionOpts::default()
    }
    .to_config()
    .unwrap();
    let connect = commands::to_connect(ORDER, config).unwrap();
    assert_eq!(connect["name"], "shop.Order");

    let avro = commands::from_connect(&connect.to_string(), config).unwrap();
    assert_eq!(avro.to_string(), ORDER);
}

#[test]
fn test_round_trip_without_enhanced_drops_custom_props() {
    let report = commands::round_trip(ORDER, ConversionOpts::default().to_config().unwrap()).unwrap();
    assert!(!report.structurally_equal);
    assert!(!report.restored.contains("avro.java.string"));
}

#[tokio::test]
async fn test_convert_data() {
    let out = commands::convert_data(
        ORDER,
        r#"{"id":42,"status":"PAID","tags":{"a":"b"}}"#,
        None,
        ConversionOpts::default().to_config().unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(out["payload"]["id"], 42);
    assert_eq!(out["payload"]["status"], "PAID");
    assert_eq!(out["payload"]["tags"]["a"], "b");
    assert!(out.get("frame").is_none());
}

#[tokio::test]
async fn test_convert_data_rejects_mismatched_datum() {
    let err = commands::convert_data(
        ORDER,
        r#"{"id":"not a number"}"#,
        None,
        ConversionOpts::default().to_config().unwrap(),
    )
    .await
    .unwrap_err();
    assert!(format!("{err:#}").contains("Datum does not match"));
}
