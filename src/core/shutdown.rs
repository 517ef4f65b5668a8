//! Process-wide termination token.
//!
//! Set by SIGINT/SIGTERM or by the `exit` command. Loops poll
//! [`Shutdown::is_triggered`] at their cycle boundary; a loop that blocks on
//! something else (the front-end waiting for a line) selects on
//! [`Shutdown::notified`], which disconnects once the token fires.

use crossbeam::channel::{self, Receiver, Sender};
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
    notify_tx: Arc<Mutex<Option<Sender<()>>>>,
    notify_rx: Receiver<()>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, rx) = channel::bounded(0);
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            notify_tx: Arc::new(Mutex::new(Some(tx))),
            notify_rx: rx,
        }
    }

    /// Set the flag and wake everyone selecting on [`Shutdown::notified`].
    /// Calling it again is a no-op.
    pub fn trigger(&self) {
        if !self.flag.swap(true, Ordering::AcqRel) {
            tracing::debug!("shutdown triggered");
        }
        let sender = self
            .notify_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(sender);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Receiver that never yields a value and disconnects on trigger.
    pub fn notified(&self) -> &Receiver<()> {
        &self.notify_rx
    }

    /// Route SIGINT and SIGTERM to [`Shutdown::trigger`] from a dedicated
    /// thread. The returned guard unregisters the handlers when dropped.
    pub fn register_signals(&self) -> io::Result<SignalGuard> {
        let mut signals = Signals::new([SIGINT, SIGTERM])?;
        let handle = signals.handle();
        let token = self.clone();
        let thread = thread::Builder::new()
            .name("mhwimm-signals".to_string())
            .spawn(move || {
                if let Some(sig) = signals.forever().next() {
                    tracing::info!(signal = sig, "termination signal received");
                    token.trigger();
                }
            })?;
        Ok(SignalGuard {
            handle,
            thread: Some(thread),
        })
    }
}

pub struct SignalGuard {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
