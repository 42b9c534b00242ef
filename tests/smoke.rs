//! Basic smoke test to verify the public API surface.

#[test]
fn crate_compiles() {
    let _ = std::any::type_name::<licenselog::LoggerConfig>();
    let _ = std::any::type_name::<licenselog::LicenseLogError>();
    let _ = std::any::type_name::<licenselog::LogManager>();
}

#[test]
fn manager_round_trip_on_disk() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = licenselog::LoggerConfig::new("k", dir.path().join("nested").join("logs.db"));
    let manager = licenselog::LogManager::new(config).unwrap();

    let payload = licenselog::ingest::payload::parse_payload(
        br#"{"license_key":"ABC-123","device_id":"dev-1","result":"success"}"#,
    )
    .unwrap();
    let receipt = manager.ingest(payload, None).unwrap();

    let mut query = licenselog::query::page::SearchQuery::default();
    query.filter.license_key = Some("ABC-123".to_string());
    let page = manager.search(&query).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.records[0].id, receipt.id);
    assert_eq!(page.records[0].device_id.as_deref(), Some("dev-1"));
    assert_eq!(page.records[0].result, licenselog::ValidationOutcome::Success);
}
