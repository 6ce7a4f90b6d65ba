//! Synchronous key-change notification.

use crate::KeyState;

/// A coarse state transition on one cell, reported during the scan that
/// produced it. Events are passed by value and never buffered; if nobody
/// is listening they simply don't exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyEvent {
    /// Row-major cell index (`row * cols + col`).
    pub index: usize,
    /// The symbol mapped to that cell.
    pub key: char,
    pub previous: KeyState,
    pub current: KeyState,
}

/// Observer for key state changes.
///
/// Called inline from [`Keypad::scan`](crate::Keypad) on the caller's own
/// execution context — never deferred, queued or retried — so the callback
/// must be quick. At most one listener is registered at a time and the
/// keypad does not own it.
///
/// Note that a release fires twice: once for the edge into `Released` and
/// once more when that one-shot state advances to `Idle` (or back to
/// `Pressed`) on the following scan. Listeners that only care about the
/// release edge should match on `current == KeyState::Released`.
pub trait KeypadListener {
    fn key_state_changed(&mut self, event: KeyEvent);
}
