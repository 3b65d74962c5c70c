use sentinel_guard::{AbortScope, RelationId, SentinelConfig};

// Environment variables are process-wide, so this binary holds a single test.
#[test]
fn test_env_overrides_file_settings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sentinel.json");
    std::fs::write(&path, r#"{"relation_id": 100, "column_no": 3}"#).unwrap();

    std::env::set_var("SENTINEL_RELATION_ID", "200");
    std::env::set_var("SENTINEL_ABORT_STATEMENT_ONLY", "true");

    let mut config = SentinelConfig::load(&path).unwrap();
    config.apply_env_overrides().unwrap();

    assert_eq!(config.relation_id, RelationId(200));
    assert_eq!(config.column_no, 3);
    assert_eq!(config.marker(), "SENTINEL");
    assert_eq!(config.abort_scope, AbortScope::StatementOnly);

    std::env::set_var("SENTINEL_COLUMN_NO", "not-a-number");
    assert!(config.apply_env_overrides().is_err());

    std::env::remove_var("SENTINEL_RELATION_ID");
    std::env::remove_var("SENTINEL_ABORT_STATEMENT_ONLY");
    std::env::remove_var("SENTINEL_COLUMN_NO");
}
