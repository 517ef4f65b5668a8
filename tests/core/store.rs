use mhwimm::core::broker;
use mhwimm::core::db::ModStore;
use mhwimm::core::error::{MhwimmError, StoreError};
use mhwimm::core::schemas;
use mhwimm::core::store::{DeleteScope, RecordFilter};
use std::fs;
use tempfile::tempdir;

fn record(mod_name: &str, path: &str) -> RecordFilter {
    RecordFilter::for_mod(mod_name)
        .with_path(path)
        .with_installed_at("1771220592Z")
}

#[test]
fn open_creates_schema_once_and_reopens_existing_store() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("data");

    let mut store = ModStore::open(&root).unwrap();
    assert_eq!(store.db_path(), root.join(schemas::MOD_DB_NAME));
    assert_eq!(store.last_diagnostic(), "nil");
    store.add(record("sword", "blade.cfg")).unwrap();
    drop(store);

    let mut store = ModStore::open(&root).unwrap();
    let rows = store.ask(&RecordFilter::all()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].relative_path, "blade.cfg");
}

#[test]
fn open_fails_when_data_root_is_a_file() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("data");
    fs::write(&root, "not a directory").unwrap();
    let err = ModStore::open(&root).err().unwrap();
    assert!(matches!(err, MhwimmError::PathError(_)));
}

#[test]
fn ask_returns_rows_in_insertion_order_and_filters_by_every_field() {
    let tmp = tempdir().unwrap();
    let mut store = ModStore::open(tmp.path()).unwrap();
    store
        .add_all(vec![
            record("sword", "tex"),
            record("sword", "blade.cfg"),
            record("sword", "tex/skin.png"),
            record("armor", "plate.cfg"),
        ])
        .unwrap();

    let paths: Vec<String> = store
        .ask(&RecordFilter::for_mod("sword"))
        .unwrap()
        .into_iter()
        .map(|r| r.relative_path)
        .collect();
    assert_eq!(paths, vec!["tex", "blade.cfg", "tex/skin.png"]);

    let exact = store
        .ask(&RecordFilter::for_mod("sword").with_path("tex").with_installed_at("1771220592Z"))
        .unwrap();
    assert_eq!(exact.len(), 1);

    let stale = store
        .ask(&RecordFilter::all().with_installed_at("0Z"))
        .unwrap();
    assert!(stale.is_empty());
}

#[test]
fn add_all_is_atomic() {
    let tmp = tempdir().unwrap();
    let mut store = ModStore::open(tmp.path()).unwrap();
    store.add(record("sword", "blade.cfg")).unwrap();

    let err = store
        .add_all(vec![record("sword", "new.cfg"), record("sword", "blade.cfg")])
        .unwrap_err();
    assert!(matches!(err, StoreError::Add(_)));
    assert_eq!(store.last_diagnostic(), err.to_string());
    assert!(store.ask(&RecordFilter::all().with_path("new.cfg")).unwrap().is_empty());
}

#[test]
fn incomplete_record_never_reaches_sqlite() {
    let tmp = tempdir().unwrap();
    let mut store = ModStore::open(tmp.path()).unwrap();
    let err = store
        .add_all(vec![record("sword", "a.cfg"), RecordFilter::for_mod("sword").with_path("b.cfg")])
        .unwrap_err();
    assert!(matches!(err, StoreError::Incomplete { field: "installed_at" }));
    assert!(store.ask(&RecordFilter::all()).unwrap().is_empty());
}

#[test]
fn delete_by_mod_and_by_path() {
    let tmp = tempdir().unwrap();
    let mut store = ModStore::open(tmp.path()).unwrap();
    store
        .add_all(vec![record("sword", "a.cfg"), record("sword", "b.cfg")])
        .unwrap();
    store.add(record("armor", "a.cfg")).unwrap();

    let removed = store
        .delete(&DeleteScope::mod_name("sword").with_path("a.cfg"))
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(store.delete(&DeleteScope::mod_name("sword")).unwrap(), 1);
    assert_eq!(store.delete(&DeleteScope::mod_name("ghost")).unwrap(), 0);
    assert_eq!(store.last_diagnostic(), "ok");

    let left = store.ask(&RecordFilter::all()).unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].mod_name, "armor");
}

#[test]
fn every_operation_lands_in_the_audit_log() {
    let tmp = tempdir().unwrap();
    let mut store = ModStore::open(tmp.path()).unwrap();
    store.add(record("sword", "a.cfg")).unwrap();
    store.add(record("sword", "a.cfg")).unwrap_err();
    store.ask(&RecordFilter::for_mod("sword")).unwrap();
    store.delete(&DeleteScope::mod_name("sword")).unwrap();

    let events = broker::read_events(tmp.path()).unwrap();
    let summary: Vec<(&str, &str, usize)> = events
        .iter()
        .map(|e| (e.op.as_str(), e.status.as_str(), e.rows))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("add", "success", 1),
            ("add", "error", 0),
            ("ask", "success", 1),
            ("delete", "success", 1),
        ]
    );
    assert!(events.iter().all(|e| e.mod_name.as_deref() == Some("sword")));
    assert!(events[1].diagnostic.as_deref().unwrap().starts_with("db: error:"));
    assert_ne!(events[0].event_id, events[1].event_id);
}
