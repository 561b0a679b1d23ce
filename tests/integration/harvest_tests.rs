//! End-to-end crawl passes over HTTP

use crate::catalog_site::{CatalogSite, ENTITY_LINK};
use crate::test_config;
use rubric_harvest::config::{load_config_with_hash, Config};
use rubric_harvest::crawler::{run_harvest, Driver};
use rubric_harvest::session::HttpBrowser;
use rubric_harvest::state::CategoryProgress;
use rubric_harvest::storage::{PassStatus, PositionedRecord, Record, SqliteStorage, Storage};
use rubric_harvest::HarvestError;

const CODE: &str = "0869-5652";

fn seeded_storage(categories: &[(&str, u64)]) -> SqliteStorage {
    let mut storage = SqliteStorage::new_in_memory().unwrap();
    seed(&mut storage, categories);
    storage
}

fn seed(storage: &mut SqliteStorage, categories: &[(&str, u64)]) {
    storage.set_link(CODE, ENTITY_LINK).unwrap();
    let categories: Vec<CategoryProgress> = categories
        .iter()
        .map(|(id, amount)| CategoryProgress::new(*id, *amount))
        .collect();
    storage.replace_categories(CODE, &categories).unwrap();
}

fn driver(config: Config, storage: SqliteStorage) -> Driver<HttpBrowser, SqliteStorage> {
    let browser = HttpBrowser::new(&config.catalog);
    Driver::new(config, "test-hash", browser, storage).unwrap()
}

fn stored(category: &str, position: u64) -> PositionedRecord {
    PositionedRecord {
        position,
        record: Record {
            remote_id: format!("{}-{}", category, position),
            title: format!("publication {} of {}", position, category),
            link: format!("/item.asp?id={}-{}", category, position),
        },
    }
}

#[tokio::test]
async fn test_full_harvest_single_entity() {
    let site = CatalogSite::new(20);
    site.add_category("1001", 45);
    site.add_category("1002", 3);
    let server = site.serve().await;

    let config = test_config(&server.uri(), ":memory:", "");
    let mut driver = driver(config, seeded_storage(&[("1001", 45), ("1002", 3)]));

    let report = driver.run_pass().await.unwrap();

    assert_eq!(report.entities_crawled, 1);
    assert_eq!(report.entities_done, 1);
    assert_eq!(report.newly_done, 1);
    assert_eq!(report.records_written, 48);

    let storage = driver.storage();
    assert!(storage.is_done(CODE).unwrap());

    let records = storage.load_records(CODE, "1001").unwrap();
    assert_eq!(records.len(), 45);
    assert_eq!(records[0], stored("1001", 1));
    assert_eq!(records[44], stored("1001", 45));
    assert!(records
        .iter()
        .enumerate()
        .all(|(i, r)| r.position == i as u64 + 1));

    let categories = storage.load_categories(CODE).unwrap();
    assert!(categories.iter().all(|c| c.is_complete()));

    let pass = storage.get_latest_pass().unwrap().unwrap();
    assert_eq!(pass.status, PassStatus::Completed);
    assert_eq!(pass.entities_done, 1);
}

#[tokio::test]
async fn test_resume_jumps_to_stored_page() {
    let site = CatalogSite::new(20);
    site.add_category("1001", 45);
    let server = site.serve().await;

    let mut storage = seeded_storage(&[("1001", 45)]);
    let first_page: Vec<PositionedRecord> = (1..=25).map(|pos| stored("1001", pos)).collect();
    storage.append_records(CODE, "1001", &first_page).unwrap();
    storage.update_parsed(CODE, "1001", 25).unwrap();

    let config = test_config(&server.uri(), ":memory:", "");
    let mut driver = driver(config, storage);
    let report = driver.run_pass().await.unwrap();

    assert_eq!(report.records_written, 20);
    assert_eq!(driver.storage().count_records(CODE, "1001").unwrap(), 45);
    assert!(driver.storage().is_done(CODE).unwrap());

    // Page 2 is entered directly, its first five rows are skipped
    assert_eq!(site.listing_hits(2), 1);
    assert_eq!(site.listing_hits(3), 1);
}

#[tokio::test]
async fn test_server_error_is_retried_on_same_identity() {
    let site = CatalogSite::new(20);
    site.add_category("1001", 30);
    site.fail_next_listing(500);
    let server = site.serve().await;

    let config = test_config(&server.uri(), ":memory:", "rotate-on-transient = false");
    let mut driver = driver(config, seeded_storage(&[("1001", 30)]));

    let report = driver.run_pass().await.unwrap();

    assert_eq!(report.aborted, 0);
    assert_eq!(report.entities_done, 1);
    assert_eq!(driver.storage().count_records(CODE, "1001").unwrap(), 30);
    assert_eq!(driver.sessions().identity().index, 0);
    assert_eq!(site.listing_hits(1), 2);
}

#[tokio::test]
async fn test_blocked_without_spare_identity_fails_pass() {
    let site = CatalogSite::new(20);
    site.add_category("1001", 30);
    site.block_everything();
    let server = site.serve().await;

    let config = test_config(&server.uri(), ":memory:", "");
    let mut driver = driver(config, seeded_storage(&[("1001", 30)]));

    let result = driver.run_pass().await;

    assert!(matches!(
        result,
        Err(HarvestError::ProxyPoolExhausted { index: 0 })
    ));
    assert_eq!(driver.storage().count_records(CODE, "1001").unwrap(), 0);
    assert!(!driver.storage().is_done(CODE).unwrap());

    let pass = driver.storage().get_latest_pass().unwrap().unwrap();
    assert_eq!(pass.status, PassStatus::Failed);
}

#[tokio::test]
async fn test_missing_category_is_skipped() {
    let site = CatalogSite::new(20);
    site.add_category("1001", 5);
    let server = site.serve().await;

    let config = test_config(&server.uri(), ":memory:", "");
    let mut driver = driver(config, seeded_storage(&[("1001", 5), ("2002", 10)]));

    let report = driver.run_pass().await.unwrap();

    assert_eq!(report.aborted, 0);
    assert_eq!(report.entities_done, 0);
    assert_eq!(driver.storage().count_records(CODE, "1001").unwrap(), 5);
    assert_eq!(driver.storage().count_records(CODE, "2002").unwrap(), 0);
}

#[tokio::test]
async fn test_run_harvest_from_config_file() {
    let site = CatalogSite::new(20);
    site.add_category("1001", 21);
    let server = site.serve().await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("harvest.db");
    let config_path = dir.path().join("harvest.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[catalog]
base-url = "{}/"
courtesy-delay-ms = 0

[retry]
retry-delay-ms = 0

[storage]
database-path = "{}"

[driver]
max-passes = 3
"#,
            server.uri(),
            db_path.display()
        ),
    )
    .unwrap();

    {
        let mut storage = SqliteStorage::new(&db_path).unwrap();
        seed(&mut storage, &[("1001", 21)]);
    }

    let (config, hash) = load_config_with_hash(&config_path).unwrap();
    run_harvest(config, &hash, Some(1)).await.unwrap();

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert!(storage.is_done(CODE).unwrap());
    assert_eq!(storage.count_total_records().unwrap(), 21);
    assert_eq!(storage.count_passes().unwrap(), 1);

    let pass = storage.get_latest_pass().unwrap().unwrap();
    assert_eq!(pass.config_hash, hash);
    assert_eq!(pass.status, PassStatus::Completed);
}
