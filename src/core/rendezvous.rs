//! Two-party rendezvous with a shared turn counter.
//!
//! Each pair of cooperating loops (front-end/engine, engine/store) talks
//! through two [`Endpoint`]s created by [`pair`]. The counter starts at zero;
//! an even value means it is role A's turn, an odd value role B's. Only the
//! active role may advance it, and advancing always happens together with
//! handing a message to the peer over a zero-capacity channel, so the send
//! completes only once the expected party has taken the message.
//!
//! ```text
//!   A (even)                      B (odd)
//!   hand_off(cmd)  ──turn 0→1──▶  wait_turn()
//!   receive()      ◀────────────  release_without_advance(line)
//!   receive()      ◀──turn 1→2──  hand_off(done)
//! ```
//!
//! Waiting on the wrong parity is a contract violation and panics. A stalled
//! wait only panics when the pair was built with a hand-off deadline, which
//! tests use so that a deadlock fails fast instead of hanging.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    Even,
    Odd,
}

impl Parity {
    pub fn of(turn: u64) -> Self {
        if turn % 2 == 0 { Parity::Even } else { Parity::Odd }
    }
}

/// The peer dropped its endpoint. Loops treat this as orderly shutdown.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("rendezvous peer `{peer}` has gone away")]
pub struct RendezvousClosed {
    pub peer: &'static str,
}

/// One side of a rendezvous pair: sends `Out`, receives `In`.
pub struct Endpoint<Out, In> {
    role: &'static str,
    peer: &'static str,
    parity: Parity,
    turn: Arc<AtomicU64>,
    tx: Sender<Out>,
    rx: Receiver<In>,
    deadline: Option<Duration>,
}

/// Build a rendezvous pair. Role `a` owns even turns and is active first.
pub fn pair<AOut, BOut>(
    a: &'static str,
    b: &'static str,
    deadline: Option<Duration>,
) -> (Endpoint<AOut, BOut>, Endpoint<BOut, AOut>) {
    let turn = Arc::new(AtomicU64::new(0));
    let (a_tx, b_rx) = channel::bounded(0);
    let (b_tx, a_rx) = channel::bounded(0);
    (
        Endpoint {
            role: a,
            peer: b,
            parity: Parity::Even,
            turn: Arc::clone(&turn),
            tx: a_tx,
            rx: a_rx,
            deadline,
        },
        Endpoint {
            role: b,
            peer: a,
            parity: Parity::Odd,
            turn,
            tx: b_tx,
            rx: b_rx,
            deadline,
        },
    )
}

impl<Out, In> Endpoint<Out, In> {
    pub fn role(&self) -> &'static str {
        self.role
    }

    pub fn turn(&self) -> u64 {
        self.turn.load(Ordering::Acquire)
    }

    pub fn is_my_turn(&self) -> bool {
        Parity::of(self.turn()) == self.parity
    }

    /// Block until the peer hands the turn over, returning its message.
    pub fn wait_turn(&self) -> Result<In, RendezvousClosed> {
        let msg = self.receive()?;
        let turn = self.turn();
        assert!(
            Parity::of(turn) == self.parity,
            "rendezvous contract violation: `{}` resumed at turn {turn} owned by `{}`",
            self.role,
            self.peer
        );
        tracing::trace!(role = self.role, turn, "turn acquired");
        Ok(msg)
    }

    /// Take the next message from the peer without claiming the turn.
    ///
    /// Used by the passive side while the active side streams messages with
    /// [`Endpoint::release_without_advance`].
    pub fn receive(&self) -> Result<In, RendezvousClosed> {
        let Some(limit) = self.deadline else {
            return self.rx.recv().map_err(|_| self.closed());
        };
        match self.rx.recv_timeout(limit) {
            Ok(msg) => Ok(msg),
            Err(RecvTimeoutError::Disconnected) => Err(self.closed()),
            Err(RecvTimeoutError::Timeout) => panic!(
                "rendezvous deadlock: `{}` waited {limit:?} for `{}` at turn {}",
                self.role,
                self.peer,
                self.turn()
            ),
        }
    }

    /// Advance the counter and give the turn, with `msg`, to the peer.
    /// Returns the new counter value.
    pub fn hand_off(&self, msg: Out) -> Result<u64, RendezvousClosed> {
        self.assert_active("hand_off");
        let next = self.turn.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::trace!(role = self.role, turn = next, "turn released");
        self.deliver(msg)?;
        Ok(next)
    }

    /// Deliver `msg` to the peer while keeping the turn.
    pub fn release_without_advance(&self, msg: Out) -> Result<(), RendezvousClosed> {
        self.assert_active("release_without_advance");
        self.deliver(msg)
    }

    fn deliver(&self, msg: Out) -> Result<(), RendezvousClosed> {
        let Some(limit) = self.deadline else {
            return self.tx.send(msg).map_err(|_| self.closed());
        };
        match self.tx.send_timeout(msg, limit) {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Disconnected(_)) => Err(self.closed()),
            Err(SendTimeoutError::Timeout(_)) => panic!(
                "rendezvous deadlock: `{}` waited {limit:?} for `{}` to receive at turn {}",
                self.role,
                self.peer,
                self.turn()
            ),
        }
    }

    fn assert_active(&self, op: &str) {
        let turn = self.turn();
        assert!(
            Parity::of(turn) == self.parity,
            "rendezvous contract violation: `{}` called {op} at turn {turn} owned by `{}`",
            self.role,
            self.peer
        );
    }

    fn closed(&self) -> RendezvousClosed {
        RendezvousClosed { peer: self.peer }
    }
}
