//! Store worker loop: the single writer of the installed-mods store.
//!
//! The worker owns the [`ModStore`] and sits on the odd side of the
//! engine/store rendezvous. Each turn it takes one [`StoreRequest`], runs it
//! against the store (reading or filling the staging area as needed), and
//! hands a [`StoreReply`] back. It stops when the engine drops its endpoint,
//! which the engine only does at a cycle boundary, so a request is never
//! abandoned half way.

use crate::core::db::ModStore;
use crate::core::error::StoreError;
use crate::core::rendezvous::{Endpoint, RendezvousClosed};
use crate::core::staging::SharedStaging;
use crate::core::store::{DeleteScope, RecordFilter};
use std::fs;
use std::io;
use std::path::PathBuf;

/// What an ASK should leave in the staging area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interest {
    /// Distinct mod names, first-seen order.
    ModNames,
    /// Paths, split into directories and regular files by inspecting
    /// `classify_under/<path>`.
    Paths { classify_under: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreRequest {
    Ask { filter: RecordFilter, interest: Interest },
    /// Insert one record per staged directory and regular file, completing
    /// `template` (mod name and install timestamp) with each path.
    Add { template: RecordFilter },
    Del { scope: DeleteScope },
}

impl StoreRequest {
    pub fn op_name(&self) -> &'static str {
        match self {
            StoreRequest::Ask { .. } => "ask",
            StoreRequest::Add { .. } => "add",
            StoreRequest::Del { .. } => "del",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreReply {
    pub ok: bool,
    pub rows: usize,
    pub diagnostic: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Idle,
    Working,
    Error,
}

/// Engine-side end of the engine/store pair.
pub type StoreLink = Endpoint<StoreRequest, StoreReply>;
/// Worker-side end of the engine/store pair.
pub type WorkerLink = Endpoint<StoreReply, StoreRequest>;

pub struct StoreWorker {
    store: ModStore,
    staging: SharedStaging,
    link: WorkerLink,
    status: WorkerStatus,
}

impl StoreWorker {
    pub fn new(store: ModStore, staging: SharedStaging, link: WorkerLink) -> Self {
        Self {
            store,
            staging,
            link,
            status: WorkerStatus::Idle,
        }
    }

    pub fn status(&self) -> WorkerStatus {
        self.status
    }

    /// Serve requests until the engine goes away. Returns the store so the
    /// caller can close it explicitly.
    pub fn run(mut self) -> ModStore {
        loop {
            let request = match self.link.wait_turn() {
                Ok(request) => request,
                Err(RendezvousClosed { peer }) => {
                    tracing::debug!(peer, "engine closed the store link");
                    break;
                }
            };
            let reply = self.serve(request);
            if self.link.hand_off(reply).is_err() {
                break;
            }
        }
        self.store
    }

    /// Execute one request and build its reply.
    pub fn serve(&mut self, request: StoreRequest) -> StoreReply {
        self.status = WorkerStatus::Working;
        let op = request.op_name();
        let result = match request {
            StoreRequest::Ask { filter, interest } => self.ask(&filter, interest),
            StoreRequest::Add { template } => self.add(template),
            StoreRequest::Del { scope } => self.store.delete(&scope),
        };
        let reply = match result {
            Ok(rows) => {
                self.status = WorkerStatus::Idle;
                StoreReply {
                    ok: true,
                    rows,
                    diagnostic: self.store.last_diagnostic().to_string(),
                }
            }
            Err(e) => {
                self.status = WorkerStatus::Error;
                StoreReply {
                    ok: false,
                    rows: 0,
                    diagnostic: e.to_string(),
                }
            }
        };
        tracing::debug!(op, ok = reply.ok, rows = reply.rows, "store request served");
        reply
    }

    fn ask(&mut self, filter: &RecordFilter, interest: Interest) -> Result<usize, StoreError> {
        let records = self.store.ask(filter)?;
        let mut staging = self.staging.lock();
        match interest {
            Interest::ModNames => {
                staging.mod_names.clear();
                for r in &records {
                    staging.push_mod_name(&r.mod_name);
                }
            }
            Interest::Paths { classify_under } => {
                staging.clear_paths();
                for r in &records {
                    match fs::symlink_metadata(classify_under.join(&r.relative_path)) {
                        Ok(meta) if meta.is_dir() => staging.directories.push(r.relative_path.clone()),
                        Ok(_) => staging.regular_files.push(r.relative_path.clone()),
                        Err(e) if e.kind() == io::ErrorKind::NotFound => {
                            staging.regular_files.push(r.relative_path.clone())
                        }
                        Err(source) => {
                            return Err(StoreError::Classify {
                                path: r.relative_path.clone(),
                                source,
                            });
                        }
                    }
                }
            }
        }
        Ok(records.len())
    }

    fn add(&mut self, template: RecordFilter) -> Result<usize, StoreError> {
        let paths: Vec<String> = {
            let staging = self.staging.lock();
            staging
                .directories
                .iter()
                .chain(staging.regular_files.iter())
                .cloned()
                .collect()
        };
        let records = paths
            .into_iter()
            .map(|p| template.clone().with_path(p))
            .collect();
        self.store.add_all(records)
    }
}
