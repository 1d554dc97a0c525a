use pretty_assertions::assert_eq;
use recordkit_model::{LocalIds, ModelError, RegistryConfig};
use std::io::Write;

// ── Defaults ─────────────────────────────────────────────────────

#[test]
fn defaults() {
    let config = RegistryConfig::default();
    assert!(config.use_api);
    assert!(config.empty_string_is_empty);
    assert_eq!(config.local_ids, LocalIds::Sequential);
    assert_eq!(config.lang, None);
    assert_eq!(config.default_lang, "en");
}

#[test]
fn empty_document_gives_defaults() {
    assert_eq!(RegistryConfig::from_toml_str("").unwrap(), RegistryConfig::default());
}

// ── Parsing ──────────────────────────────────────────────────────

#[test]
fn parses_registry_table() {
    let config = RegistryConfig::from_toml_str(
        r#"
        [registry]
        use_api = false
        empty_string_is_empty = false
        local_ids = "uuid"
        lang = "de"
        default_lang = "fr"
        "#,
    )
    .unwrap();

    assert!(!config.use_api);
    assert!(!config.empty_string_is_empty);
    assert_eq!(config.local_ids, LocalIds::Uuid);
    assert_eq!(config.lang.as_deref(), Some("de"));
    assert_eq!(config.default_lang, "fr");
}

#[test]
fn partial_table_keeps_other_defaults() {
    let config = RegistryConfig::from_toml_str("[registry]\nuse_api = false\n").unwrap();
    assert!(!config.use_api);
    assert!(config.empty_string_is_empty);
    assert_eq!(config.default_lang, "en");
}

#[test]
fn malformed_toml_is_a_config_error() {
    let err = RegistryConfig::from_toml_str("[registry\nuse_api = ").unwrap_err();
    assert!(matches!(err, ModelError::Config(_)));
}

#[test]
fn unknown_local_ids_is_a_config_error() {
    let err = RegistryConfig::from_toml_str("[registry]\nlocal_ids = \"random\"\n").unwrap_err();
    assert!(format!("{err}").contains("config error"));
}

// ── Loading from disk ────────────────────────────────────────────

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = RegistryConfig::load_from(dir.path().join("absent.toml"));
    assert_eq!(config, RegistryConfig::default());
}

#[test]
fn loads_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[registry]\nuse_api = false\nlocal_ids = \"uuid\"").unwrap();

    let config = RegistryConfig::load_from(file.path());
    assert!(!config.use_api);
    assert_eq!(config.local_ids, LocalIds::Uuid);
}

#[test]
fn malformed_file_falls_back_to_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[registry]\nuse_api = \"sometimes\"").unwrap();

    assert_eq!(RegistryConfig::load_from(file.path()), RegistryConfig::default());
}
