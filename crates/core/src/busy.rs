//! Busy gate: blocks player-initiated actions while transitions are in flight
//!
//! Any code path that starts a non-interruptible transition (a tween, a
//! scripted move) acquires a token before starting; the token releases the
//! gate when dropped, on every exit path. Host input handling consults
//! [`BusyGate::is_busy`] before accepting new commands.

use std::cell::Cell;
use std::rc::Rc;

/// Shared reference-counted gate. Cloning yields another handle to the same
/// counter, so a world and its components all observe the same busy state.
#[derive(Debug, Clone, Default)]
pub struct BusyGate {
    count: Rc<Cell<usize>>,
}

impl BusyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the gate for the lifetime of the returned token.
    #[must_use = "the gate is released as soon as the token is dropped"]
    pub fn acquire(&self) -> BusyToken {
        self.count.set(self.count.get() + 1);
        tracing::trace!(depth = self.count.get(), "busy gate acquired");
        BusyToken {
            count: Rc::clone(&self.count),
        }
    }

    /// True while any acquired token is alive.
    pub fn is_busy(&self) -> bool {
        self.count.get() > 0
    }

    /// Number of outstanding tokens.
    pub fn depth(&self) -> usize {
        self.count.get()
    }
}

/// Scoped acquisition of a [`BusyGate`]; releases exactly once on drop.
///
/// The counter is unsigned and only ever decremented by a live token, so it
/// cannot go negative regardless of drop order or unwinding.
#[derive(Debug)]
pub struct BusyToken {
    count: Rc<Cell<usize>>,
}

impl Drop for BusyToken {
    fn drop(&mut self) {
        let current = self.count.get();
        debug_assert!(current > 0, "busy token outlived its gate count");
        self.count.set(current.saturating_sub(1));
        tracing::trace!(depth = self.count.get(), "busy gate released");
    }
}
