//! Config file loading and store construction from the binary's point of view.

use repoledger::config::Config;
use repoledger::ledger_cli::open_store;

#[test]
fn configured_file_builds_shared_store() {
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("state").join("cache.db");
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[remote]
token = "ghp_example"
owner = "acme"
repo = "ledger"
branch = "main"
path = "data/repositories-data.json"

[cache]
db_path = "{}"
"#,
            cache_path.display()
        ),
    )
    .unwrap();

    let config = Config::load_from_file(&config_path).unwrap();
    config.validate().unwrap();

    let store = open_store(&config).unwrap();
    assert!(store.is_shared());
    assert_eq!(
        store.remote().unwrap().target(),
        "acme/ledger@main:data/repositories-data.json"
    );
    assert!(cache_path.exists());
}

#[test]
fn partial_remote_section_stays_local() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[remote]
owner = "acme"
repo = "ledger"

[cache]
db_path = "{}"
"#,
            dir.path().join("cache.db").display()
        ),
    )
    .unwrap();

    let mut config = Config::load_from_file(&config_path).unwrap();
    // Only the env fallback could fill the token; clear it for a stable result.
    config.remote.token = None;

    let store = open_store(&config).unwrap();
    assert!(!store.is_shared());
    assert_eq!(config.remote.missing_fields(), vec!["token", "branch"]);
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, "[remote\nowner = ").unwrap();
    assert!(Config::load_from_file(&config_path).is_err());
}
