//! LED bank abstraction

use embedded_hal::digital::OutputPin;

use crate::BUTTON_COUNT;

/// The four game LEDs, indexed like the buttons.
pub trait LedBank {
    fn set(&mut self, led: usize, on: bool);

    fn set_all(&mut self, on: bool) {
        for led in 0..BUTTON_COUNT {
            self.set(led, on);
        }
    }
}

impl<P: OutputPin> LedBank for [P; BUTTON_COUNT] {
    fn set(&mut self, led: usize, on: bool) {
        if let Some(pin) = self.get_mut(led) {
            // GPIO writes on the supported targets are infallible
            let _ = if on { pin.set_high() } else { pin.set_low() };
        }
    }
}
