//! Import, link resolution and category census over HTTP

use crate::catalog_site::{CatalogSite, ENTITY_LINK};
use crate::test_config;
use rubric_harvest::crawler::{import_codes, Driver};
use rubric_harvest::session::HttpBrowser;
use rubric_harvest::state::EntityState;
use rubric_harvest::storage::{SqliteStorage, Storage};
use std::io::Write;
use tempfile::NamedTempFile;

const FOUND: &str = "0869-5652";
const MISSING: &str = "0000-0000";

fn codes_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"Physics of the Earth": ["{}", "{}"], "Zoology Letters": ["{}"]}}"#,
        MISSING, FOUND, FOUND
    )
    .unwrap();
    file
}

#[tokio::test]
async fn test_import_resolve_prepare_and_harvest() {
    let site = CatalogSite::new(20);
    site.add_title(FOUND, ENTITY_LINK);
    site.add_category("1001", 25);
    site.add_category("1002", 3);
    let server = site.serve().await;

    let mut storage = SqliteStorage::new_in_memory().unwrap();
    let file = codes_file();
    assert_eq!(import_codes(&mut storage, file.path()).unwrap(), 2);

    let config = test_config(
        &server.uri(),
        ":memory:",
        "[interest]\ncategories = [\"1001\"]",
    );
    let browser = HttpBrowser::new(&config.catalog);
    let mut driver = Driver::new(config, "test-hash", browser, storage).unwrap();

    let resolve = driver.resolve_links().await.unwrap();
    assert_eq!(resolve.names, 2);
    assert_eq!(resolve.resolved, 1);
    assert_eq!(resolve.not_found, 1);
    assert_eq!(resolve.already_resolved, 1);
    assert_eq!(driver.storage().get_link(FOUND).unwrap().as_deref(), Some(ENTITY_LINK));
    assert_eq!(driver.storage().get_link(MISSING).unwrap().as_deref(), Some(""));

    let census = driver.prepare_categories().await.unwrap();
    assert_eq!(census.prepared, 1);
    assert_eq!(census.skipped, 1);
    assert_eq!(census.categories_kept, 1);

    let categories = driver.storage().load_categories(FOUND).unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].category_id, "1001");
    assert_eq!(categories[0].amount, 25);
    assert_eq!(categories[0].parsed, 0);

    let report = driver.run_pass().await.unwrap();
    assert_eq!(report.unresolved, 1);
    assert_eq!(report.newly_done, 1);

    let states: Vec<(String, EntityState)> = driver
        .storage()
        .list_entities()
        .unwrap()
        .into_iter()
        .map(|e| (e.code.clone(), e.state()))
        .collect();
    assert_eq!(
        states,
        vec![
            (MISSING.to_string(), EntityState::Unresolved),
            (FOUND.to_string(), EntityState::Done),
        ]
    );
}

#[tokio::test]
async fn test_blocked_search_stores_nothing() {
    let site = CatalogSite::new(20);
    site.add_title(FOUND, ENTITY_LINK);
    site.block_everything();
    let server = site.serve().await;

    let mut storage = SqliteStorage::new_in_memory().unwrap();
    storage
        .add_entity_names("Physics of the Earth", &[FOUND.to_string()])
        .unwrap();

    let config = test_config(&server.uri(), ":memory:", "");
    let browser = HttpBrowser::new(&config.catalog);
    let mut driver = Driver::new(config, "test-hash", browser, storage).unwrap();

    assert!(driver.resolve_links().await.is_err());
    assert_eq!(driver.storage().get_link(FOUND).unwrap(), None);
}
