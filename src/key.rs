//! Per-key debounce and edge-detection state machine.
//!
//! Each matrix cell owns one [`Key`]. The scan engine feeds it raw samples
//! and the key reduces them to a four-state coarse view plus a per-cycle
//! `changed` flag. The machine is keyed on *edges* (the new reading
//! differing from the previous one), which is what debounces contact
//! chatter: a bouncing contact produces an edge, lands in `Pressed` or
//! `Released`, and further identical samples don't move it again until the
//! next edge or the hold deadline.

use crate::Instant;

/// Raw sample of a column pin while its row is selected.
///
/// `Up` is the pulled-up idle level, `Down` means the switch is shorting
/// the column to the selected (low) row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Up,
    Down,
}

/// Coarse state of one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyState {
    /// No press in progress.
    Idle,
    /// Press edge seen, or press continuing below the hold threshold.
    Pressed,
    /// The key just went up. One-shot: the very next observation leaves
    /// this state again, so a release is observable for exactly one cycle.
    Released,
    /// Press sustained past the hold threshold.
    Held,
}

/// One switch in the matrix: the symbol it produces and its debounce state.
#[derive(Debug, Clone)]
pub struct Key {
    value: char,
    state: KeyState,
    last_reading: Level,
    hold_deadline: Option<Instant>,
    changed: bool,
}

impl Key {
    pub(crate) fn new(value: char) -> Self {
        Key {
            value,
            state: KeyState::Idle,
            last_reading: Level::Up,
            hold_deadline: None,
            changed: false,
        }
    }

    /// The symbol this key produces, fixed at matrix construction.
    pub fn value(&self) -> char {
        self.value
    }

    pub fn state(&self) -> KeyState {
        self.state
    }

    /// Whether the most recent [`observe`](Self::observe) moved the coarse
    /// state. Recomputed on every observation, never sticky.
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Feed one raw sample into the state machine.
    ///
    /// Total over its inputs: always records `reading`, always recomputes
    /// `changed`, and returns it. `now` only matters while `Pressed`,
    /// where it is compared against the armed hold deadline.
    pub(crate) fn observe(&mut self, reading: Level, now: Instant) -> bool {
        let edge = reading != self.last_reading;
        self.last_reading = reading;

        self.changed = match self.state {
            KeyState::Idle => {
                if edge {
                    self.state = KeyState::Pressed;
                }
                edge
            }
            KeyState::Pressed => {
                if edge {
                    self.state = KeyState::Released;
                    true
                } else if self.hold_deadline.is_some_and(|d| now >= d) {
                    self.state = KeyState::Held;
                    true
                } else {
                    false
                }
            }
            KeyState::Released => {
                // One-shot: advance no matter what the reading did. Same
                // reading means the key stayed up; an edge means it bounced
                // straight back down.
                self.state = if edge { KeyState::Pressed } else { KeyState::Idle };
                true
            }
            KeyState::Held => {
                if edge {
                    self.state = KeyState::Released;
                }
                edge
            }
        };

        self.changed
    }

    /// Arm the hold deadline. The scan engine calls this exactly when a
    /// transition into `Pressed` is detected; staying `Pressed` never
    /// re-arms it.
    pub(crate) fn arm_hold(&mut self, deadline: Instant) {
        self.hold_deadline = Some(deadline);
    }

    /// Reset the per-cycle flag without touching the state. Used when a
    /// scan is skipped, so stale flags don't leak to fast pollers.
    pub(crate) fn clear_changed(&mut self) {
        self.changed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Duration;

    fn at(ms: u32) -> Instant {
        Instant::from_ticks(ms)
    }

    fn key_in(state: KeyState, last_reading: Level) -> Key {
        Key {
            value: '5',
            state,
            last_reading,
            hold_deadline: None,
            changed: false,
        }
    }

    fn flip(level: Level) -> Level {
        match level {
            Level::Up => Level::Down,
            Level::Down => Level::Up,
        }
    }

    #[test]
    fn transition_table() {
        use KeyState::*;

        // (from, edge, expected state, expected changed) for every row of
        // the table that doesn't depend on the hold deadline.
        let cases = [
            (Idle, false, Idle, false),
            (Idle, true, Pressed, true),
            (Released, false, Idle, true),
            (Released, true, Pressed, true),
            (Held, false, Held, false),
            (Held, true, Released, true),
        ];

        for (from, edge, expect_state, expect_changed) in cases {
            for last in [Level::Up, Level::Down] {
                let reading = if edge { flip(last) } else { last };
                let mut key = key_in(from, last);
                let changed = key.observe(reading, at(0));
                assert_eq!(key.state(), expect_state, "from {from:?}, edge {edge}");
                assert_eq!(changed, expect_changed, "from {from:?}, edge {edge}");
                assert_eq!(key.changed(), changed);
                assert_eq!(key.last_reading, reading);
            }
        }
    }

    #[test]
    fn pressed_stays_below_hold_deadline() {
        let mut key = key_in(KeyState::Pressed, Level::Down);
        key.arm_hold(at(2000));

        assert!(!key.observe(Level::Down, at(100)));
        assert_eq!(key.state(), KeyState::Pressed);
        assert!(!key.observe(Level::Down, at(1999)));
        assert_eq!(key.state(), KeyState::Pressed);
    }

    #[test]
    fn pressed_becomes_held_at_deadline() {
        let mut key = key_in(KeyState::Pressed, Level::Down);
        key.arm_hold(at(2000));

        assert!(key.observe(Level::Down, at(2000)));
        assert_eq!(key.state(), KeyState::Held);
    }

    #[test]
    fn pressed_without_armed_deadline_never_holds() {
        let mut key = key_in(KeyState::Pressed, Level::Down);
        assert!(!key.observe(Level::Down, at(u32::MAX)));
        assert_eq!(key.state(), KeyState::Pressed);
    }

    #[test]
    fn pressed_edge_releases() {
        let mut key = key_in(KeyState::Pressed, Level::Down);
        key.arm_hold(at(2000));

        // Edge wins even when the deadline has also expired.
        assert!(key.observe(Level::Up, at(5000)));
        assert_eq!(key.state(), KeyState::Released);
    }

    #[test]
    fn released_is_one_shot() {
        // No reading can keep a key in Released for two observations.
        for reading in [Level::Up, Level::Down] {
            let mut key = key_in(KeyState::Released, Level::Up);
            assert!(key.observe(reading, at(0)));
            assert_ne!(key.state(), KeyState::Released, "reading {reading:?}");
        }
    }

    #[test]
    fn press_hold_release_sequence() {
        // [Down, Down, Down, Up] with time passing the hold threshold
        // between samples 2 and 3 yields [Pressed, Held, Held, Released].
        let hold = Duration::millis(2000);
        let mut key = Key::new('a');

        assert!(key.observe(Level::Down, at(0)));
        assert_eq!(key.state(), KeyState::Pressed);
        key.arm_hold(at(0) + hold);

        assert!(key.observe(Level::Down, at(2500)));
        assert_eq!(key.state(), KeyState::Held);

        assert!(!key.observe(Level::Down, at(2600)));
        assert_eq!(key.state(), KeyState::Held);

        assert!(key.observe(Level::Up, at(2700)));
        assert_eq!(key.state(), KeyState::Released);
    }

    #[test]
    fn clear_changed_leaves_state() {
        let mut key = Key::new('a');
        key.observe(Level::Down, at(0));
        assert!(key.changed());

        key.clear_changed();
        assert!(!key.changed());
        assert_eq!(key.state(), KeyState::Pressed);
    }
}
