//! Session loop: drives one command cycle at a time across the three roles.
//!
//! ```text
//!  front-end ──Command──▶ session ──Ask──▶ store      (lookup, if needed)
//!                          │  ◀──Reply──┘
//!                          ├─ engine.execute()        (filesystem effect)
//!                          ├──Add/Del──▶ store        (commit, if needed)
//!                          │  ◀──Reply──┘
//!  front-end ◀─MoreOutput─ ┤  (release_without_advance, one per line)
//!  front-end ◀─NoOutput── ─┘  (hand_off, turn back to the front-end)
//! ```
//!
//! A cycle that fails before any effect answers with one `LastOutput`
//! hand-off carrying the error line.

use crate::core::config::Config;
use crate::core::db::ModStore;
use crate::core::error::MhwimmError;
use crate::core::rendezvous::{self, Endpoint, RendezvousClosed};
use crate::core::shutdown::Shutdown;
use crate::core::staging::SharedStaging;
use crate::core::worker::{StoreLink, StoreReply, StoreRequest, StoreWorker};
use crate::engine::CommandEngine;
use crate::frontend::FrontEnd;
use std::io::{BufRead, Write};
use std::panic;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeStatus {
    /// Raw command text from the front-end.
    Command,
    /// One output line; more follow.
    MoreOutput,
    /// The only output line of the cycle; the turn comes back with it.
    LastOutput,
    /// Output is drained; the turn comes back with it.
    NoOutput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub status: ExchangeStatus,
    pub payload: String,
}

impl Exchange {
    pub fn command(text: impl Into<String>) -> Self {
        Self {
            status: ExchangeStatus::Command,
            payload: text.into(),
        }
    }

    pub fn more(line: impl Into<String>) -> Self {
        Self {
            status: ExchangeStatus::MoreOutput,
            payload: line.into(),
        }
    }

    pub fn last(line: impl Into<String>) -> Self {
        Self {
            status: ExchangeStatus::LastOutput,
            payload: line.into(),
        }
    }

    pub fn no_output() -> Self {
        Self {
            status: ExchangeStatus::NoOutput,
            payload: String::new(),
        }
    }
}

/// Either end of the front-end/engine pair.
pub type FrontLink = Endpoint<Exchange, Exchange>;

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Initial working directory of the engine.
    pub work_dir: PathBuf,
    /// Bound on every rendezvous wait; a stall past it panics. Tests only.
    pub handoff_deadline: Option<Duration>,
}

impl SessionOptions {
    pub fn new(work_dir: PathBuf) -> Self {
        Self {
            work_dir,
            handoff_deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.handoff_deadline = Some(deadline);
        self
    }
}

pub struct Session {
    engine: CommandEngine,
    front: FrontLink,
    store: StoreLink,
    staging: SharedStaging,
    shutdown: Shutdown,
}

impl Session {
    pub fn new(
        engine: CommandEngine,
        front: FrontLink,
        store: StoreLink,
        staging: SharedStaging,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            engine,
            front,
            store,
            staging,
            shutdown,
        }
    }

    /// Run cycles until shutdown or until the front-end goes away. Returns
    /// the configuration as the commands left it.
    pub fn run(mut self) -> Config {
        while !self.shutdown.is_triggered() {
            if let Err(closed) = self.cycle() {
                tracing::debug!(peer = closed.peer, "session ending");
                break;
            }
        }
        self.engine.into_config()
    }

    fn cycle(&mut self) -> Result<(), RendezvousClosed> {
        self.staging.lock().clear();
        self.engine.reset();

        let request = self.front.wait_turn()?;
        tracing::debug!(command = %request.payload, "cycle started");

        if self.engine.parse(&request.payload).is_err() {
            return self.reply_single();
        }

        match self.engine.before_request() {
            Err(_) => return self.reply_single(),
            Ok(Some(lookup)) => {
                let reply = self.ask_store(lookup)?;
                if self.engine.check_lookup(&reply).is_err() {
                    return self.reply_single();
                }
            }
            Ok(None) => {}
        }

        if self.engine.execute().is_ok() {
            if let Some(commit) = self.engine.after_request() {
                let reply = self.ask_store(commit).inspect_err(|_| self.engine.compensate_install())?;
                if self.engine.check_commit(&reply).is_err() {
                    self.undo_install()?;
                }
            }
        }

        self.drain()
    }

    /// Drop the partial records of a failed install, then its links.
    fn undo_install(&mut self) -> Result<(), RendezvousClosed> {
        if let Some(undo) = self.engine.compensating_request() {
            let reply = self.ask_store(undo).inspect_err(|_| self.engine.compensate_install())?;
            self.engine.check_compensation(&reply);
        }
        self.engine.compensate_install();
        Ok(())
    }

    fn ask_store(&mut self, request: StoreRequest) -> Result<StoreReply, RendezvousClosed> {
        tracing::debug!(op = request.op_name(), "posting store request");
        self.store.hand_off(request)?;
        self.store.wait_turn()
    }

    fn reply_single(&mut self) -> Result<(), RendezvousClosed> {
        self.staging.lock().clear();
        let line = self.engine.next_output_line().unwrap_or_default();
        self.front.hand_off(Exchange::last(line))?;
        Ok(())
    }

    fn drain(&mut self) -> Result<(), RendezvousClosed> {
        self.staging.lock().clear();
        while let Some(line) = self.engine.next_output_line() {
            self.front.release_without_advance(Exchange::more(line))?;
        }
        self.front.hand_off(Exchange::no_output())?;
        Ok(())
    }
}

/// Start the engine and store threads, run the front-end on the calling
/// thread until it exits, and return the final configuration.
pub fn launch<R, W>(
    config: Config,
    store: ModStore,
    options: SessionOptions,
    shutdown: &Shutdown,
    input: R,
    output: &mut W,
) -> Result<Config, MhwimmError>
where
    R: BufRead + Send + 'static,
    W: Write,
{
    let deadline = options.handoff_deadline;
    let staging = SharedStaging::new();
    let (front, engine_front) = rendezvous::pair::<Exchange, Exchange>("front-end", "engine", deadline);
    let (engine_store, worker_store) =
        rendezvous::pair::<StoreRequest, StoreReply>("engine", "store", deadline);

    let worker = StoreWorker::new(store, staging.clone(), worker_store);
    let store_thread = thread::Builder::new()
        .name("mhwimm-store".to_string())
        .spawn(move || worker.run())?;

    let engine = CommandEngine::new(config, options.work_dir, staging.clone(), shutdown.clone());
    let session = Session::new(engine, engine_front, engine_store, staging, shutdown.clone());
    let engine_thread = thread::Builder::new()
        .name("mhwimm-engine".to_string())
        .spawn(move || session.run())?;

    let front_result = FrontEnd::new(front, shutdown.clone()).run(input, output);
    // The front-end endpoint is gone now, so the session ends at its next
    // wait and closes the store link behind it.
    let config = engine_thread.join().unwrap_or_else(|e| panic::resume_unwind(e));
    let store = store_thread.join().unwrap_or_else(|e| panic::resume_unwind(e));
    tracing::debug!(db = %store.db_path().display(), "store closed");

    front_result?;
    Ok(config)
}
