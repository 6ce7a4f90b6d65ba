//! Platform-agnostic driver for row/column matrix keypads.
//!
//! A keypad matrix multiplexes `rows * cols` momentary switches over
//! `rows + cols` pins: each row is driven low in turn while the column
//! pins (inputs with pull-ups) are sampled, so a pressed key shows up as
//! a low reading on its column while its row is selected. This crate owns
//! that scan walk and the per-key debounce/edge detection on top of it,
//! reporting each key as `Idle`, `Pressed`, `Released` or `Held`.
//!
//! The driver never touches hardware directly. Row and column pins are
//! borrowed as `embedded-hal` trait objects, time is passed explicitly
//! into every scanning call as a [`fugit`] millisecond instant, and the
//! one blocking operation ([`Keypad::wait_for_key`]) takes [`Clock`] and
//! `DelayMs` capabilities so it can be driven by a stub on the host.
//!
//! ```no_run
//! # use core::convert::Infallible;
//! # use embedded_hal::digital::v2::{InputPin, OutputPin};
//! use matrix_keypad::{Instant, Keypad};
//!
//! # fn demo<'a>(
//! #     rows: &'a mut [&'a mut dyn OutputPin<Error = Infallible>],
//! #     cols: &'a [&'a dyn InputPin<Error = Infallible>],
//! #     millis: impl Fn() -> u32,
//! # ) {
//! let keymap = ['1', '2', '3', '4', '5', '6', '7', '8', '9', '*', '0', '#'];
//! let mut keypad = Keypad::new(&keymap, rows, cols).unwrap();
//! keypad.init();
//!
//! loop {
//!     if let Some(key) = keypad.get_key(Instant::from_ticks(millis())) {
//!         // a key just went down
//!         let _ = key;
//!     }
//! }
//! # }
//! ```
//!
//! Electrical assumptions: row pins are push-pull outputs, column pins are
//! inputs with pull-ups (idle high, low while pressed). Configuring the
//! pins into those modes is the HAL's job, before handing them in.

#![cfg_attr(not(test), no_std)]

mod event;
mod key;
mod keypad;

pub use event::{KeyEvent, KeypadListener};
pub use key::{Key, KeyState, Level};
pub use keypad::{Keypad, MAX_KEYS};

/// Millisecond-resolution monotonic timestamp fed into every scan.
pub type Instant = fugit::TimerInstantU32<1000>;

/// Millisecond-resolution span, used for the scan period and hold threshold.
pub type Duration = fugit::TimerDurationU32<1000>;

/// Monotonic time source, needed only by [`Keypad::wait_for_key`].
///
/// Everything else takes `now` as an argument, so a firmware embedding
/// typically implements this as a thin wrapper over its timer peripheral
/// and tests implement it over a counter.
pub trait Clock {
    fn now(&mut self) -> Instant;
}

/// Rejected keypad configuration. Construction fails fast; no partially
/// initialized keypad is ever returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// `rows * cols` exceeds the fixed cell capacity [`MAX_KEYS`].
    TooManyKeys { requested: usize, max: usize },
    /// Keymap length does not equal `rows * cols`.
    KeymapLength { expected: usize, actual: usize },
}

/// Cell index outside `0..rows * cols`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IndexError {
    pub index: usize,
    pub len: usize,
}
