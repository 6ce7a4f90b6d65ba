//! Matrix ownership, the timed scan walk, and the caller-facing queries.

use core::convert::Infallible;

use arrayvec::ArrayVec;
use embedded_hal::{
    blocking::delay::DelayMs,
    digital::v2::{InputPin, OutputPin},
};

use crate::{
    key::{Key, KeyState, Level},
    Clock, ConfigError, Duration, IndexError, Instant, KeyEvent, KeypadListener,
};

/// Hard cap on `rows * cols`. Sized for the usual 3x3 to 5x4 pads.
pub const MAX_KEYS: usize = 20;

const DEFAULT_SCAN_PERIOD: Duration = Duration::millis(50);
const DEFAULT_HOLD_THRESHOLD: Duration = Duration::millis(2000);

/// A debounced matrix keypad.
///
/// Owns one [`Key`] per cell in row-major order (`index = row * cols + col`,
/// matching the keymap) and borrows the pins: row pins are driven outputs,
/// column pins are pulled-up inputs. All scanning entry points take the
/// current time explicitly, so the driver has no clock of its own and tests
/// can run without real delays.
///
/// Scans are rate-limited by the scan period (default 50 ms): calls that
/// arrive sooner perform no pin I/O at all. The per-key `changed` flags are
/// cleared on the first such skipped call so that a caller polling faster
/// than the scan period can't see the same edge twice.
pub struct Keypad<'r, 'c, 'l> {
    keys: ArrayVec<Key, MAX_KEYS>,
    row_pins: &'r mut [&'r mut dyn OutputPin<Error = Infallible>],
    col_pins: &'c [&'c dyn InputPin<Error = Infallible>],
    rows: usize,
    cols: usize,
    scan_period: Duration,
    hold_threshold: Duration,
    last_scan: Option<Instant>,
    flags_cleared: bool,
    listener: Option<&'l mut dyn KeypadListener>,
}

impl<'r, 'c, 'l> Keypad<'r, 'c, 'l> {
    /// Build a keypad from a row-major keymap and its pins.
    ///
    /// The grid dimensions are the pin slice lengths, so `keymap` must hold
    /// exactly `row_pins.len() * col_pins.len()` symbols and the product
    /// must fit in [`MAX_KEYS`]. Fails fast: an invalid configuration never
    /// yields a usable keypad.
    pub fn new(
        keymap: &[char],
        row_pins: &'r mut [&'r mut dyn OutputPin<Error = Infallible>],
        col_pins: &'c [&'c dyn InputPin<Error = Infallible>],
    ) -> Result<Self, ConfigError> {
        let rows = row_pins.len();
        let cols = col_pins.len();
        let size = rows * cols;

        if size > MAX_KEYS {
            return Err(ConfigError::TooManyKeys { requested: size, max: MAX_KEYS });
        }
        if keymap.len() != size {
            return Err(ConfigError::KeymapLength { expected: size, actual: keymap.len() });
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("keypad: {=usize}x{=usize} matrix, {=usize} keys", rows, cols, size);

        Ok(Keypad {
            keys: keymap.iter().map(|&value| Key::new(value)).collect(),
            row_pins,
            col_pins,
            rows,
            cols,
            scan_period: DEFAULT_SCAN_PERIOD,
            hold_threshold: DEFAULT_HOLD_THRESHOLD,
            last_scan: None,
            flags_cleared: false,
            listener: None,
        })
    }

    /// Drive every row pin to the deselected (high) level.
    ///
    /// Pin *modes* (push-pull output rows, pull-up input columns) are
    /// configured in the HAL before the pins are handed in; this only puts
    /// the already-configured outputs into their idle state.
    pub fn init(&mut self) {
        for pin in self.row_pins.iter_mut() {
            pin.set_high().unwrap();
        }
    }

    /// Sample the whole matrix, rate-limited by the scan period.
    ///
    /// Returns true iff any key's coarse state changed during this call.
    /// A call within the scan period of the previous real scan touches no
    /// pins, clears the per-key `changed` flags (once), and returns false.
    ///
    /// Each row is driven low in turn while all others stay high, every
    /// column is sampled, and the raw levels are fed through the per-key
    /// state machines. A key entering `Pressed` arms its hold deadline at
    /// `now + hold_threshold`. The listener, if any, is notified inline for
    /// every cell whose coarse state differs from its pre-scan value.
    pub fn scan(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_scan {
            let elapsed = now.checked_duration_since(last);
            if elapsed.map_or(true, |d| d < self.scan_period) {
                if !self.flags_cleared {
                    for key in &mut self.keys {
                        key.clear_changed();
                    }
                    self.flags_cleared = true;
                }
                return false;
            }
        }
        self.flags_cleared = false;

        // Park every row high before selecting the first one.
        for pin in self.row_pins.iter_mut() {
            pin.set_high().unwrap();
        }

        let mut any_changed = false;
        for row in 0..self.rows {
            self.row_pins[row].set_low().unwrap();

            for col in 0..self.cols {
                let reading = if self.col_pins[col].is_low().unwrap() {
                    Level::Down
                } else {
                    Level::Up
                };

                let index = row * self.cols + col;
                let key = &mut self.keys[index];
                let previous = key.state();
                let changed = key.observe(reading, now);
                if changed && key.state() == KeyState::Pressed {
                    key.arm_hold(now + self.hold_threshold);
                }
                any_changed |= changed;

                let current = key.state();
                let value = key.value();
                if previous != current {
                    if let Some(listener) = self.listener.as_mut() {
                        listener.key_state_changed(KeyEvent {
                            index,
                            key: value,
                            previous,
                            current,
                        });
                    }
                }
            }

            self.row_pins[row].set_high().unwrap();
        }

        self.last_scan = Some(now);
        any_changed
    }

    /// Scan, then report the key that just went down, if any.
    ///
    /// "Just went down" means `Pressed` with its `changed` flag set this
    /// cycle, so a sustained press is reported exactly once. Cells are
    /// checked in row-major order; with multiple fresh presses the lowest
    /// index wins.
    pub fn get_key(&mut self, now: Instant) -> Option<char> {
        self.scan(now);
        self.keys
            .iter()
            .find(|key| key.state() == KeyState::Pressed && key.changed())
            .map(Key::value)
    }

    /// Scan, then report whether any cell mapped to `key` is currently
    /// down (`Pressed` or `Held`).
    pub fn is_pressed(&mut self, key: char, now: Instant) -> bool {
        self.scan(now);
        self.keys.iter().any(|k| {
            k.value() == key && matches!(k.state(), KeyState::Pressed | KeyState::Held)
        })
    }

    /// Coarse state of the cell at `index`, without scanning.
    pub fn key_state(&self, index: usize) -> Result<KeyState, IndexError> {
        self.keys
            .get(index)
            .map(Key::state)
            .ok_or(IndexError { index, len: self.keys.len() })
    }

    /// Block until a key goes down and return it.
    ///
    /// Polls [`get_key`](Self::get_key) with the injected clock, sleeping
    /// one scan period between attempts. This is the only operation that
    /// can block, and it blocks indefinitely: if no key is ever pressed it
    /// never returns. Meant for simple polling loops, not for anything
    /// latency-sensitive.
    pub fn wait_for_key(&mut self, clock: &mut dyn Clock, delay: &mut dyn DelayMs<u32>) -> char {
        loop {
            if let Some(key) = self.get_key(clock.now()) {
                return key;
            }
            delay.delay_ms(self.scan_period.to_millis());
        }
    }

    /// Register (or with `None`, remove) the listener notified during
    /// scans. Replaces any previous listener; the keypad does not own it.
    pub fn set_listener(&mut self, listener: Option<&'l mut dyn KeypadListener>) {
        self.listener = listener;
    }

    /// Minimum time between two real scans.
    pub fn scan_period(&self) -> Duration {
        self.scan_period
    }

    pub fn set_scan_period(&mut self, period: Duration) {
        self.scan_period = period;
    }

    /// How long a key must stay down before it is reported as `Held`.
    pub fn hold_threshold(&self) -> Duration {
        self.hold_threshold
    }

    pub fn set_hold_threshold(&mut self, threshold: Duration) {
        self.hold_threshold = threshold;
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The per-cell keys in row-major order, for read-only inspection.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }
}
