//! Interrupt-fed button debouncing
//!
//! The interrupt handler only ever raises a [`PressFlag`]. Everything else
//! (lock, timestamps, pin sampling) lives in [`Debouncer`] and runs on the
//! main loop.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::BUTTON_COUNT;

/// Minimum time between two accepted presses of the same button (milliseconds)
pub const DEBOUNCE_DELAY_MS: u64 = 200;

/// Physical button levels as seen by the main loop.
pub trait ButtonBank {
    /// Returns `true` while the button currently reads LOW (held down).
    fn is_pressed(&mut self, button: usize) -> bool;
}

/// Single-producer/single-consumer pending-edge cell.
///
/// Raised from interrupt context, taken from the main loop. A second edge
/// before the consumer runs overwrites the first rather than queueing.
#[derive(Debug)]
pub struct PressFlag(AtomicBool);

impl PressFlag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Mark a falling edge. Safe to call from an interrupt handler.
    #[inline]
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Consume the pending edge, if any.
    #[inline]
    pub fn take(&self) -> bool {
        // Load + store instead of swap: riscv32imc has no atomic RMW.
        if self.0.load(Ordering::Acquire) {
            self.0.store(false, Ordering::Release);
            true
        } else {
            false
        }
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for PressFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Main-loop debounce state for one button
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ButtonDebounce {
    /// Set on an accepted press, cleared once the pin reads released again
    locked: bool,
    /// Timestamp (ms) of the last accepted press
    last_press_ms: u64,
}

/// Turns raw interrupt edges into rate-limited logical presses.
#[derive(Debug, Clone)]
pub struct Debouncer {
    buttons: [ButtonDebounce; BUTTON_COUNT],
    delay_ms: u64,
}

impl Debouncer {
    pub fn new(now_ms: u64) -> Self {
        Self::with_delay(DEBOUNCE_DELAY_MS, now_ms)
    }

    pub fn with_delay(delay_ms: u64, now_ms: u64) -> Self {
        Self {
            buttons: [ButtonDebounce {
                locked: false,
                last_press_ms: now_ms,
            }; BUTTON_COUNT],
            delay_ms,
        }
    }

    /// Run the debounce rules for one button.
    ///
    /// `pending` is the edge taken from the button's [`PressFlag`], `pressed`
    /// the pin level sampled this iteration. Returns `true` when a logical
    /// press is accepted.
    pub fn update(&mut self, button: usize, pending: bool, pressed: bool, now_ms: u64) -> bool {
        let Some(state) = self.buttons.get_mut(button) else {
            return false;
        };

        if state.locked && !pressed {
            state.locked = false;
        }

        if !pending || state.locked {
            return false;
        }

        // A bounce that has already released by the time we look is not a press.
        if pressed && now_ms.saturating_sub(state.last_press_ms) >= self.delay_ms {
            state.last_press_ms = now_ms;
            state.locked = true;
            return true;
        }

        false
    }

    /// Take the pending edge for `button` and debounce it against the live pin level.
    pub fn poll<B: ButtonBank>(
        &mut self,
        button: usize,
        flag: &PressFlag,
        bank: &mut B,
        now_ms: u64,
    ) -> bool {
        let pressed = bank.is_pressed(button);
        let pending = flag.take();
        self.update(button, pending, pressed, now_ms)
    }

    /// Forget locks and restart every button's debounce window at `now_ms`.
    pub fn reset(&mut self, flags: &[PressFlag; BUTTON_COUNT], now_ms: u64) {
        for (state, flag) in self.buttons.iter_mut().zip(flags.iter()) {
            flag.clear();
            state.locked = false;
            state.last_press_ms = now_ms;
        }
    }

    pub fn is_locked(&self, button: usize) -> bool {
        self.buttons.get(button).is_some_and(|s| s.locked)
    }
}
