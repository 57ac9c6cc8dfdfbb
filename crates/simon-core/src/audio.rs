//! Audio feedback: tone cue tables and the buzzer player
//!
//! Playback is blocking from the game's point of view: [`Audio::play`] only
//! resolves once the last note and rest have elapsed.

use embedded_hal_async::delay::DelayNs;
use log::debug;

/// One tone followed by an optional silence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    pub freq_hz: u32,
    pub duration_ms: u32,
    /// Silence after the tone (milliseconds)
    pub rest_ms: u32,
}

impl Note {
    pub const fn new(freq_hz: u32, duration_ms: u32, rest_ms: u32) -> Self {
        Self {
            freq_hz,
            duration_ms,
            rest_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    WifiConnected,
    BrokerConnected,
    GoodInput,
    StartGame,
    RoundWin,
    GameOver,
}

const WIFI_CONNECTED: [Note; 1] = [Note::new(1500, 80, 0)];
const BROKER_CONNECTED: [Note; 1] = [Note::new(1800, 80, 0)];
const GOOD_INPUT: [Note; 1] = [Note::new(2000, 50, 0)];
const START_GAME: [Note; 1] = [Note::new(1200, 100, 0)];
const ROUND_WIN: [Note; 2] = [Note::new(1800, 80, 60), Note::new(2000, 80, 0)];
const GAME_OVER: [Note; 3] = [
    Note::new(600, 120, 80),
    Note::new(600, 120, 80),
    Note::new(600, 120, 80),
];

impl Cue {
    pub const fn notes(self) -> &'static [Note] {
        match self {
            Self::WifiConnected => &WIFI_CONNECTED,
            Self::BrokerConnected => &BROKER_CONNECTED,
            Self::GoodInput => &GOOD_INPUT,
            Self::StartGame => &START_GAME,
            Self::RoundWin => &ROUND_WIN,
            Self::GameOver => &GAME_OVER,
        }
    }

    /// Total time the cue holds the caller, tones and rests included.
    pub fn duration_ms(self) -> u32 {
        self.notes()
            .iter()
            .map(|n| n.duration_ms + n.rest_ms)
            .sum()
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::WifiConnected => "wifi connected",
            Self::BrokerConnected => "broker connected",
            Self::GoodInput => "good input",
            Self::StartGame => "start game",
            Self::RoundWin => "round win",
            Self::GameOver => "game over",
        }
    }
}

/// A PWM tone output.
pub trait ToneOutput {
    /// Drive `freq_hz` for `duration_ms`, then silence the output.
    fn play(&mut self, freq_hz: u32, duration_ms: u32) -> impl Future<Output = ()>;
}

/// Something that can play feedback cues. Boards without a buzzer use [`Muted`].
pub trait Audio {
    fn play(&mut self, cue: Cue) -> impl Future<Output = ()>;
}

/// Plays cue tables on a [`ToneOutput`].
pub struct Buzzer<T, D> {
    tone: T,
    delay: D,
}

impl<T, D> Buzzer<T, D>
where
    T: ToneOutput,
    D: DelayNs,
{
    pub const fn new(tone: T, delay: D) -> Self {
        Self { tone, delay }
    }
}

impl<T, D> Audio for Buzzer<T, D>
where
    T: ToneOutput,
    D: DelayNs,
{
    async fn play(&mut self, cue: Cue) {
        debug!("Playing {} cue ({} ms)", cue.label(), cue.duration_ms());
        for note in cue.notes() {
            self.tone.play(note.freq_hz, note.duration_ms).await;
            if note.rest_ms > 0 {
                self.delay.delay_ms(note.rest_ms).await;
            }
        }
    }
}

/// No-op audio for hardware variants without a buzzer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Muted;

impl Audio for Muted {
    async fn play(&mut self, _cue: Cue) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockDelay, VirtualClock};
    use alloc::vec::Vec;
    use embassy_futures::block_on;

    struct RecordingTone {
        clock: VirtualClock,
        played: Vec<(u32, u32, u64)>,
    }

    impl ToneOutput for RecordingTone {
        async fn play(&mut self, freq_hz: u32, duration_ms: u32) {
            self.played.push((freq_hz, duration_ms, self.clock.now_ms()));
            self.clock.advance_ms(u64::from(duration_ms));
        }
    }

    #[test]
    fn test_cue_durations() {
        assert_eq!(Cue::GoodInput.duration_ms(), 50);
        assert_eq!(Cue::RoundWin.duration_ms(), 220);
        assert_eq!(Cue::GameOver.duration_ms(), 600);
    }

    #[test]
    fn test_round_win_ascends() {
        let notes = Cue::RoundWin.notes();
        assert_eq!(notes.len(), 2);
        assert!(notes[0].freq_hz < notes[1].freq_hz);
    }

    #[test]
    fn test_game_over_is_three_low_beeps() {
        let notes = Cue::GameOver.notes();
        assert_eq!(notes.len(), 3);
        assert!(notes.iter().all(|n| n.freq_hz < 1000));
    }

    #[test]
    fn test_buzzer_plays_notes_with_rests() {
        let clock = VirtualClock::new();
        let tone = RecordingTone {
            clock: clock.clone(),
            played: Vec::new(),
        };
        let mut buzzer = Buzzer::new(tone, MockDelay::new(clock.clone()));

        block_on(buzzer.play(Cue::RoundWin));

        assert_eq!(buzzer.tone.played, [(1800, 80, 0), (2000, 80, 140)]);
        assert_eq!(clock.now_ms(), 220);
    }

    #[test]
    fn test_muted_takes_no_time() {
        block_on(Muted.play(Cue::GameOver));
    }
}
