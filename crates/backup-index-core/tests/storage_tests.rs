use chrono::Utc;

use backup_index_core::catalog::{self, FileSnapshot};
use backup_index_core::storage::{Database, ResourceFilter, StatusSummary};

fn file_snapshot(checksum: &str) -> FileSnapshot {
    FileSnapshot {
        size: 42,
        last_modified: Utc::now(),
        is_directory: false,
        checksum: Some(checksum.to_string()),
    }
}

fn dir_snapshot() -> FileSnapshot {
    FileSnapshot {
        size: 0,
        last_modified: Utc::now(),
        is_directory: true,
        checksum: None,
    }
}

#[test]
fn test_find_resource_by_name() {
    let db = Database::open_in_memory().unwrap();
    let registered = catalog::register_snapshot(&db, &file_snapshot("aa"), "docs/a.txt").unwrap();

    let found = db.find_resource_by_name("docs/a.txt").unwrap().unwrap();
    assert_eq!(found, registered);
    assert!(db.find_resource_by_name("docs/missing.txt").unwrap().is_none());
    assert!(db.get_resource(registered.id + 100).unwrap().is_none());
}

#[test]
fn test_count_by_filter() {
    let db = Database::open_in_memory().unwrap();
    catalog::register_snapshot(&db, &file_snapshot("aa"), "a").unwrap();
    catalog::register_snapshot(&db, &file_snapshot("bb"), "b").unwrap();
    catalog::register_snapshot(&db, &dir_snapshot(), "dir").unwrap();

    assert_eq!(db.count_resources(ResourceFilter::All).unwrap(), 3);
    assert_eq!(db.count_resources(ResourceFilter::Pending).unwrap(), 2);
    assert_eq!(db.count_resources(ResourceFilter::Stalled).unwrap(), 0);
}

#[test]
fn test_fetch_resources_respects_offset_and_limit() {
    let db = Database::open_in_memory().unwrap();
    for name in ["e", "d", "c", "b", "a"] {
        catalog::register_snapshot(&db, &file_snapshot("00"), name).unwrap();
    }

    let page: Vec<String> = db
        .fetch_resources(ResourceFilter::All, 1, 2)
        .unwrap()
        .into_iter()
        .map(|r| r.filename)
        .collect();
    assert_eq!(page, vec!["b", "c"]);

    // pending listing follows insertion order
    let page: Vec<String> = db
        .fetch_resources(ResourceFilter::Pending, 0, 2)
        .unwrap()
        .into_iter()
        .map(|r| r.filename)
        .collect();
    assert_eq!(page, vec!["e", "d"]);

    assert!(db.fetch_resources(ResourceFilter::All, 10, 2).unwrap().is_empty());
}

#[test]
fn test_status_summary() {
    let db = Database::open_in_memory().unwrap();
    assert_eq!(db.status_summary().unwrap(), StatusSummary::default());

    catalog::register_snapshot(&db, &dir_snapshot(), "dir").unwrap();
    let mut synced = catalog::register_snapshot(&db, &file_snapshot("a"), "synced").unwrap();
    let mut stalled = catalog::register_snapshot(&db, &file_snapshot("b"), "stalled").unwrap();
    let mut busy = catalog::register_snapshot(&db, &file_snapshot("c"), "busy").unwrap();
    catalog::register_snapshot(&db, &file_snapshot("d"), "waiting").unwrap();

    catalog::report_success(&db, &mut synced).unwrap();
    catalog::report_failure(&db, &mut stalled, 1).unwrap();
    catalog::start_progress(&db, &mut busy).unwrap();

    assert_eq!(
        db.status_summary().unwrap(),
        StatusSummary {
            total: 5,
            directories: 1,
            queued: 2,
            in_progress: 1,
            synced: 1,
            stalled: 1,
        }
    );
}

#[test]
fn test_truncate_all_empties_index() {
    let db = Database::open_in_memory().unwrap();
    catalog::register_snapshot(&db, &file_snapshot("a"), "a").unwrap();
    db.truncate_all().unwrap();

    assert_eq!(db.count_resources(ResourceFilter::All).unwrap(), 0);
    // names are free again
    catalog::register_snapshot(&db, &file_snapshot("a"), "a").unwrap();
}
