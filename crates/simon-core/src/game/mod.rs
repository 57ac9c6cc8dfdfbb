//! Sequence-memory game state machine
//!
//! The engine owns the sequence, round and input cursor. It drives LEDs and
//! audio through [`Feedback`] and reports what happened through
//! [`PressOutcome`]; restarting (which needs the clock and the debouncer) and
//! score reporting are left to the caller.

mod sequence;

pub use sequence::{SEQUENCE_CAPACITY, Sequence, Xorshift32};

use embedded_hal_async::delay::DelayNs;
use log::{debug, info};
use thiserror_no_std::Error;

use crate::BUTTON_COUNT;
use crate::audio::{Audio, Cue};
use crate::leds::LedBank;

/// Pause before the sequence playback starts (milliseconds)
pub const SHOW_SETTLE_MS: u32 = 400;
/// LED on-time for each step of the playback
pub const SHOW_ON_MS: u32 = 400;
/// LED off-time between playback steps
pub const SHOW_OFF_MS: u32 = 100;
/// Flash on-time confirming a correct press
pub const PRESS_FLASH_ON_MS: u32 = 200;
/// Flash off-time confirming a correct press
pub const PRESS_FLASH_OFF_MS: u32 = 50;
/// Half-period of the game-over all-LED flash
pub const GAME_OVER_FLASH_MS: u32 = 150;
/// Number of all-LED flashes per game-over animation pass
pub const GAME_OVER_FLASHES: usize = 3;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameError {
    #[error("sequence step {0} is not a button index")]
    InvalidStep(u8),
    #[error("sequence is at capacity")]
    SequenceFull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Play back the sequence, then wait for input
    ShowSequence,
    /// Passive; presses are checked against the sequence
    WaitInput,
    /// Animation repeats until any press restarts the game
    GameOver,
}

/// Result of feeding one logical press to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    /// Press arrived while the sequence was being shown
    Ignored,
    /// Matched the expected step; more input needed this round
    Correct,
    /// Completed the round; the sequence grew by one
    RoundWon,
    /// Mismatch; `score` is the last fully completed round
    GameOver { score: u32 },
    /// Completed a full-capacity round; the caller restarts the game
    Cleared { score: u32 },
    /// Press during game over; the caller restarts the game
    Restart,
}

/// Outputs the engine drives: LEDs, audio and the delay that paces them.
pub struct Feedback<L, A, D> {
    pub leds: L,
    pub audio: A,
    pub delay: D,
}

impl<L, A, D> Feedback<L, A, D>
where
    L: LedBank,
    A: Audio,
    D: DelayNs,
{
    pub const fn new(leds: L, audio: A, delay: D) -> Self {
        Self { leds, audio, delay }
    }

    /// Light one LED for `on_ms`, then keep it dark for `off_ms`.
    pub async fn flash(&mut self, led: usize, on_ms: u32, off_ms: u32) {
        self.leds.set(led, true);
        self.delay.delay_ms(on_ms).await;
        self.leds.set(led, false);
        self.delay.delay_ms(off_ms).await;
    }

    pub async fn flash_all(&mut self, on_ms: u32, off_ms: u32) {
        self.leds.set_all(true);
        self.delay.delay_ms(on_ms).await;
        self.leds.set_all(false);
        self.delay.delay_ms(off_ms).await;
    }
}

pub struct GameEngine {
    sequence: Sequence,
    cursor: usize,
    phase: GamePhase,
    rng: Xorshift32,
}

impl GameEngine {
    /// Create an engine with a fresh one-step game.
    pub fn new(seed: u32) -> Self {
        let mut engine = Self {
            sequence: Sequence::new(),
            cursor: 0,
            phase: GamePhase::ShowSequence,
            rng: Xorshift32::new(seed),
        };
        engine.start_new_game(seed);
        engine
    }

    /// Reseed, draw the first step and go back to round one.
    pub fn start_new_game(&mut self, seed: u32) {
        self.rng = Xorshift32::new(seed);
        self.sequence.clear();
        let first = self.rng.next_button();
        // An empty sequence always has room and `next_button` is in range.
        let _ = self.sequence.push(first);
        self.cursor = 0;
        self.phase = GamePhase::ShowSequence;
        info!("New game, first step {}", first);
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Current sequence length being tested (1-based)
    pub fn round(&self) -> usize {
        self.sequence.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn sequence(&self) -> &[u8] {
        self.sequence.as_slice()
    }

    /// Advance the state machine once. Blocks for the playback or animation.
    pub async fn step<L, A, D>(&mut self, out: &mut Feedback<L, A, D>)
    where
        L: LedBank,
        A: Audio,
        D: DelayNs,
    {
        match self.phase {
            GamePhase::ShowSequence => self.show_sequence(out).await,
            GamePhase::WaitInput => {}
            GamePhase::GameOver => Self::game_over_animation(out).await,
        }
    }

    async fn show_sequence<L, A, D>(&mut self, out: &mut Feedback<L, A, D>)
    where
        L: LedBank,
        A: Audio,
        D: DelayNs,
    {
        out.delay.delay_ms(SHOW_SETTLE_MS).await;
        debug!("Showing round {}: {:?}", self.round(), self.sequence());
        for &step in self.sequence.as_slice() {
            out.flash(usize::from(step), SHOW_ON_MS, SHOW_OFF_MS).await;
        }
        self.cursor = 0;
        self.phase = GamePhase::WaitInput;
    }

    async fn game_over_animation<L, A, D>(out: &mut Feedback<L, A, D>)
    where
        L: LedBank,
        A: Audio,
        D: DelayNs,
    {
        out.audio.play(Cue::GameOver).await;
        for _ in 0..GAME_OVER_FLASHES {
            out.flash_all(GAME_OVER_FLASH_MS, GAME_OVER_FLASH_MS).await;
        }
    }

    /// Feed one debounced press of `button`.
    pub async fn on_press<L, A, D>(
        &mut self,
        button: usize,
        out: &mut Feedback<L, A, D>,
    ) -> PressOutcome
    where
        L: LedBank,
        A: Audio,
        D: DelayNs,
    {
        match self.phase {
            GamePhase::ShowSequence => PressOutcome::Ignored,
            GamePhase::GameOver => PressOutcome::Restart,
            GamePhase::WaitInput => self.check_input(button, out).await,
        }
    }

    async fn check_input<L, A, D>(
        &mut self,
        button: usize,
        out: &mut Feedback<L, A, D>,
    ) -> PressOutcome
    where
        L: LedBank,
        A: Audio,
        D: DelayNs,
    {
        let expected = self.sequence.get(self.cursor).map(usize::from);
        if button >= BUTTON_COUNT || expected != Some(button) {
            let score = (self.round() - 1) as u32;
            info!(
                "Wrong button {} at step {} (expected {:?}), score {}",
                button, self.cursor, expected, score
            );
            out.audio.play(Cue::GameOver).await;
            self.phase = GamePhase::GameOver;
            return PressOutcome::GameOver { score };
        }

        out.audio.play(Cue::GoodInput).await;
        out.flash(button, PRESS_FLASH_ON_MS, PRESS_FLASH_OFF_MS).await;
        self.cursor += 1;

        if self.cursor < self.round() {
            return PressOutcome::Correct;
        }

        if self.sequence.is_full() {
            let score = self.round() as u32;
            info!("Sequence cleared at full length, score {}", score);
            return PressOutcome::Cleared { score };
        }

        let next = self.rng.next_button();
        let _ = self.sequence.push(next);
        info!("Round complete, advancing to round {}", self.round());
        out.audio.play(Cue::RoundWin).await;
        self.phase = GamePhase::ShowSequence;
        PressOutcome::RoundWon
    }
}
