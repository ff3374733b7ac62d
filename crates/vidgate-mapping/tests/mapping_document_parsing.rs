//! Integration tests for parsing and editing a rack mapping document.
//!
//! These tests validate that the mapping models deserialize a realistic
//! document and that the store operates on a copy of it.

use std::fs;
use std::path::PathBuf;

use vidgate_core::Error;
use vidgate_mapping::{DeviceType, MappingDocument, MappingStore, SlotAssignment, UNMAPPED};

/// Get the path to the test fixtures directory.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Load the mapping document fixture from disk.
fn load_mapping_fixture() -> String {
    let fixture_path = fixtures_dir().join("slot_mappings.json");
    fs::read_to_string(&fixture_path).unwrap_or_else(|e| {
        panic!(
            "Failed to read mapping fixture at {}: {}",
            fixture_path.display(),
            e
        )
    })
}

fn parse_fixture() -> MappingDocument {
    let json_data = load_mapping_fixture();
    serde_json::from_str(&json_data)
        .unwrap_or_else(|e| panic!("Failed to deserialize mapping document: {e}\nJSON: {json_data}"))
}

#[test]
fn test_deserialize_mapping_document() {
    let doc = parse_fixture();

    assert_eq!(doc.slots.len(), 8, "Expected 8 slots in test data");
    assert_eq!(doc.devices.len(), 4, "Expected 4 devices in test data");
    assert_eq!(doc.rack_host, "rack07.lab.example.net");
    assert_eq!(doc.rack_ip, "10.20.7.1");
    assert!(doc.use_proxy);
    assert_eq!(doc.proxy_base_url, "proxy.lab.example.net/");
}

#[test]
fn test_device_types() {
    let doc = parse_fixture();
    let types: Vec<&DeviceType> = doc.devices.iter().map(|d| &d.device_type).collect();

    assert_eq!(types[0], &DeviceType::AxisP7216);
    assert_eq!(types[1], &DeviceType::AxisFA54);
    assert_eq!(types[2], &DeviceType::HanwhaSPE1620);
    assert_eq!(
        types[3],
        &DeviceType::Unknown("Bosch.VIP-X1600".to_string())
    );
}

#[test]
fn test_blank_and_null_network_fields() {
    let doc = parse_fixture();
    let device = doc.device(2).expect("device 2 present");
    assert_eq!(device.internal_ip, "");
    assert_eq!(device.internal_port, "");
    assert_eq!(device.nat_ssl_port, "8412");
    assert_eq!(device.max_port, 4);
}

#[test]
fn test_all_mapped_slots_resolve() {
    let doc = parse_fixture();

    for (slot, value) in &doc.slots {
        if value == UNMAPPED {
            continue;
        }
        let assignment = doc.assignment(slot).unwrap();
        let device = doc
            .device(assignment.device_id)
            .unwrap_or_else(|| panic!("slot {slot} references unknown device"));
        assert!(device.has_outlet(assignment.outlet), "slot {slot} outlet out of range");
    }
}

#[test]
fn test_quoted_legacy_value_resolves() {
    let doc = parse_fixture();
    assert_eq!(doc.slots["8"], "\"1:5\"");
    assert_eq!(
        doc.assignment("8").unwrap(),
        SlotAssignment {
            device_id: 1,
            outlet: 5
        }
    );
}

#[tokio::test]
async fn test_store_over_fixture_copy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slot_mappings.json");
    fs::write(&path, load_mapping_fixture()).unwrap();

    let store = MappingStore::open(&path).await;

    assert_eq!(
        store.assignment("7").await.unwrap(),
        SlotAssignment {
            device_id: 3,
            outlet: 3
        }
    );
    assert!(matches!(store.get_mapping("4").await, Err(Error::NotFound(_))));

    store.update_mapping("4", "\"2:4\"").await.unwrap();
    assert_eq!(store.get_mapping("4").await.unwrap(), "2:4");

    let err = store.update_mapping("4", "2:5").await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert_eq!(store.get_mapping("4").await.unwrap(), "2:4");

    // Round trip keeps the device list and rack fields intact.
    let reloaded: MappingDocument =
        serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(reloaded.devices, parse_fixture().devices);
    assert!(reloaded.use_proxy);
}
