//! Engine/store protocol tests: a real store worker on its own thread driven
//! through the rendezvous, the way the session drives it.

use mhwimm::core::db::ModStore;
use mhwimm::core::rendezvous::{self, RendezvousClosed};
use mhwimm::core::staging::SharedStaging;
use mhwimm::core::store::{DeleteScope, RecordFilter};
use mhwimm::core::worker::{Interest, StoreLink, StoreReply, StoreRequest, StoreWorker};
use std::fs;
use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tempfile::tempdir;

const DEADLINE: Option<Duration> = Some(Duration::from_secs(10));

fn start_worker(root: &Path, staging: &SharedStaging) -> (StoreLink, JoinHandle<ModStore>) {
    let store = ModStore::open(root).unwrap();
    let (engine, worker_side) = rendezvous::pair::<StoreRequest, StoreReply>("engine", "store", DEADLINE);
    let worker = StoreWorker::new(store, staging.clone(), worker_side);
    let handle = thread::spawn(move || worker.run());
    (engine, handle)
}

fn call(link: &StoreLink, request: StoreRequest) -> StoreReply {
    link.hand_off(request).unwrap();
    link.wait_turn().unwrap()
}

fn stage(staging: &SharedStaging, dirs: &[&str], files: &[&str]) {
    let mut area = staging.lock();
    area.clear();
    area.directories = dirs.iter().map(|s| s.to_string()).collect();
    area.regular_files = files.iter().map(|s| s.to_string()).collect();
}

#[test]
fn add_then_ask_round_trip_through_the_worker() {
    let tmp = tempdir().unwrap();
    let staging = SharedStaging::new();
    let (link, handle) = start_worker(tmp.path(), &staging);

    stage(&staging, &["tex"], &["blade.cfg", "tex/skin.png"]);
    let reply = call(
        &link,
        StoreRequest::Add {
            template: RecordFilter::for_mod("sword").with_installed_at("100Z"),
        },
    );
    assert_eq!(reply, StoreReply { ok: true, rows: 3, diagnostic: "ok".to_string() });

    stage(&staging, &[], &[]);
    let reply = call(
        &link,
        StoreRequest::Ask {
            filter: RecordFilter::all(),
            interest: Interest::ModNames,
        },
    );
    assert!(reply.ok);
    assert_eq!(reply.rows, 3);
    assert_eq!(staging.lock().mod_names, vec!["sword"]);
    assert_eq!(link.turn(), 4);

    drop(link);
    let store = handle.join().unwrap();
    assert!(store.db_path().exists());
}

#[test]
fn ask_for_paths_classifies_against_the_install_root() {
    let tmp = tempdir().unwrap();
    let install_root = tmp.path().join("game");
    fs::create_dir_all(install_root.join("tex")).unwrap();
    fs::write(install_root.join("tex/skin.png"), "x").unwrap();

    let staging = SharedStaging::new();
    let (link, _handle) = start_worker(&tmp.path().join("data"), &staging);

    stage(&staging, &["tex"], &["tex/skin.png", "gone.cfg"]);
    call(
        &link,
        StoreRequest::Add {
            template: RecordFilter::for_mod("sword").with_installed_at("100Z"),
        },
    );

    stage(&staging, &[], &[]);
    let reply = call(
        &link,
        StoreRequest::Ask {
            filter: RecordFilter::for_mod("sword"),
            interest: Interest::Paths {
                classify_under: install_root.clone(),
            },
        },
    );
    assert!(reply.ok);
    let area = staging.lock().clone();
    assert_eq!(area.directories, vec!["tex"]);
    assert_eq!(area.regular_files, vec!["tex/skin.png", "gone.cfg"]);
}

#[test]
fn duplicate_add_fails_with_a_diagnostic_and_leaves_no_partial_rows() {
    let tmp = tempdir().unwrap();
    let staging = SharedStaging::new();
    let (link, _handle) = start_worker(tmp.path(), &staging);

    stage(&staging, &[], &["a.cfg"]);
    assert!(call(&link, StoreRequest::Add {
        template: RecordFilter::for_mod("sword").with_installed_at("1Z"),
    })
    .ok);

    stage(&staging, &[], &["b.cfg", "a.cfg"]);
    let reply = call(
        &link,
        StoreRequest::Add {
            template: RecordFilter::for_mod("sword").with_installed_at("2Z"),
        },
    );
    assert!(!reply.ok);
    assert!(reply.diagnostic.starts_with("db: error: failed to process insert"));

    let reply = call(
        &link,
        StoreRequest::Ask {
            filter: RecordFilter::for_mod("sword").with_path("b.cfg"),
            interest: Interest::ModNames,
        },
    );
    assert_eq!(reply.rows, 0);
}

#[test]
fn incomplete_template_is_rejected_locally() {
    let tmp = tempdir().unwrap();
    let staging = SharedStaging::new();
    let (link, _handle) = start_worker(tmp.path(), &staging);

    stage(&staging, &[], &["a.cfg"]);
    let reply = call(
        &link,
        StoreRequest::Add {
            template: RecordFilter::for_mod("sword"),
        },
    );
    assert!(!reply.ok);
    assert_eq!(
        reply.diagnostic,
        "db: error: lack values to be inserted (installed_at missing)."
    );
}

#[test]
fn delete_is_scoped_to_one_mod() {
    let tmp = tempdir().unwrap();
    let staging = SharedStaging::new();
    let (link, _handle) = start_worker(tmp.path(), &staging);

    for name in ["sword", "armor"] {
        stage(&staging, &[], &["shared.cfg"]);
        assert!(call(&link, StoreRequest::Add {
            template: RecordFilter::for_mod(name).with_installed_at("1Z"),
        })
        .ok);
    }

    let reply = call(
        &link,
        StoreRequest::Del {
            scope: DeleteScope::mod_name("sword"),
        },
    );
    assert_eq!(reply.rows, 1);

    call(
        &link,
        StoreRequest::Ask {
            filter: RecordFilter::all(),
            interest: Interest::ModNames,
        },
    );
    assert_eq!(staging.lock().mod_names, vec!["armor"]);
}

#[test]
fn worker_stops_when_the_engine_goes_away() {
    let tmp = tempdir().unwrap();
    let staging = SharedStaging::new();
    let (link, handle) = start_worker(tmp.path(), &staging);
    drop(link);
    handle.join().unwrap();
}

#[test]
fn engine_sees_closed_link_when_worker_is_gone() {
    let (engine, worker) = rendezvous::pair::<StoreRequest, StoreReply>("engine", "store", DEADLINE);
    drop(worker);
    let err = engine
        .hand_off(StoreRequest::Del {
            scope: DeleteScope::mod_name("sword"),
        })
        .unwrap_err();
    assert_eq!(err, RendezvousClosed { peer: "store" });
}
