//! Configuration files, proxy pools and statistics on disk

use rubric_harvest::config::{compute_config_hash, load_config_with_hash};
use rubric_harvest::output::load_statistics;
use rubric_harvest::session::ProxyPool;
use rubric_harvest::state::EntityState;
use rubric_harvest::storage::{SqliteStorage, Storage};
use rubric_harvest::ConfigError;
use std::io::Write;
use tempfile::NamedTempFile;

const CONFIG: &str = r#"
[catalog]
base-url = "https://catalog.example.com"

[proxy]
mode = "list"
servers = [
    { server = "http://10.0.0.1:3128" },
    { server = "http://10.0.0.2:3128", username = "user", password = "secret" },
]

[storage]
database-path = "./harvest.db"
"#;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_config_hash_tracks_content() {
    let file = write_config(CONFIG);
    let (_, hash) = load_config_with_hash(file.path()).unwrap();

    assert_eq!(hash.len(), 64);
    assert_eq!(hash, compute_config_hash(file.path()).unwrap());

    let edited = write_config(&CONFIG.replace("10.0.0.2", "10.0.0.3"));
    assert_ne!(hash, compute_config_hash(edited.path()).unwrap());
}

#[test]
fn test_list_pool_rotates_through_servers() {
    let file = write_config(CONFIG);
    let (config, _) = load_config_with_hash(file.path()).unwrap();

    let mut pool = ProxyPool::from_config(&config.proxy);
    assert_eq!(pool.ceiling(), 2);
    assert_eq!(pool.current().index, 0);

    assert!(pool.advance());
    assert_eq!(pool.current().index, 1);
    assert_eq!(pool.current().username.as_deref(), Some("user"));
    assert!(!pool.advance());

    pool.reset();
    assert_eq!(pool.current().index, 0);
}

#[test]
fn test_invalid_proxy_is_rejected() {
    let file = write_config(&CONFIG.replace("http://10.0.0.1:3128", "not a url"));
    let result = load_config_with_hash(file.path());
    assert!(matches!(result, Err(ConfigError::InvalidUrl(_))));
}

#[test]
fn test_statistics_from_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("harvest.db");

    {
        let mut storage = SqliteStorage::new(&path).unwrap();
        storage
            .add_entity_names("Physics of the Earth", &["0869-5652".to_string()])
            .unwrap();
        storage.set_link("0869-5652", "").unwrap();
        storage.set_link("1069-3513", "title_items.asp?id=9").unwrap();
    }

    let storage = SqliteStorage::new(&path).unwrap();
    let stats = load_statistics(&storage).unwrap();

    assert_eq!(stats.total_entities, 2);
    assert_eq!(stats.entities_by_state.get(&EntityState::Unresolved), Some(&1));
    assert_eq!(stats.entities_by_state.get(&EntityState::Unprepared), Some(&1));
    assert_eq!(stats.total_records, 0);
    assert_eq!(stats.passes, 0);
    assert!(stats.latest_pass.is_none());
}
