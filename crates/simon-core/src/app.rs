//! Application context: one cooperative loop over connectivity, buttons and
//! the game engine.

use embedded_hal_async::delay::DelayNs;
use log::{debug, info};

use crate::BUTTON_COUNT;
use crate::audio::{Audio, Cue};
use crate::clock::Clock;
use crate::debounce::{ButtonBank, Debouncer, PressFlag};
use crate::game::{Feedback, GameEngine, GamePhase, PressOutcome};
use crate::leds::LedBank;
use crate::net::{BrokerSession, ConnectivityManager, ReportOutcome, WifiLink};

/// Everything the game owns, wired together.
///
/// `flags` are the per-button pending edges raised by the interrupt handler;
/// every other field is touched only from the loop.
pub struct Simon<'a, W, B, P, L, A, D, C> {
    net: ConnectivityManager<W, B>,
    engine: GameEngine,
    debouncer: Debouncer,
    flags: &'a [PressFlag; BUTTON_COUNT],
    buttons: P,
    out: Feedback<L, A, D>,
    clock: C,
}

/// Fold the microsecond clock into an RNG seed.
fn seed_from(now_us: u64) -> u32 {
    (now_us ^ (now_us >> 32)) as u32
}

impl<'a, W, B, P, L, A, D, C> Simon<'a, W, B, P, L, A, D, C>
where
    W: WifiLink,
    B: BrokerSession,
    P: ButtonBank,
    L: LedBank,
    A: Audio,
    D: DelayNs,
    C: Clock,
{
    pub fn new(
        net: ConnectivityManager<W, B>,
        flags: &'a [PressFlag; BUTTON_COUNT],
        buttons: P,
        out: Feedback<L, A, D>,
        clock: C,
    ) -> Self {
        Self {
            net,
            engine: GameEngine::new(seed_from(clock.now_us())),
            debouncer: Debouncer::new(clock.now_ms()),
            flags,
            buttons,
            out,
            clock,
        }
    }

    pub fn net(&self) -> &ConnectivityManager<W, B> {
        &self.net
    }

    pub fn net_mut(&mut self) -> &mut ConnectivityManager<W, B> {
        &mut self.net
    }

    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }

    pub fn buttons_mut(&mut self) -> &mut P {
        &mut self.buttons
    }

    pub fn feedback(&self) -> &Feedback<L, A, D> {
        &self.out
    }

    pub fn feedback_mut(&mut self) -> &mut Feedback<L, A, D> {
        &mut self.out
    }

    /// Bring up the network and broker session, then start the first game.
    pub async fn start(&mut self) {
        self.out.leds.set_all(false);
        self.net.associate(&mut self.out.delay, &mut self.out.audio).await;
        self.net
            .ensure_session(&mut self.out.delay, &mut self.out.audio)
            .await;
        self.new_game().await;
    }

    /// One pass of the main loop.
    pub async fn tick(&mut self) {
        self.net
            .ensure_session(&mut self.out.delay, &mut self.out.audio)
            .await;
        self.net.pump(&self.clock, &mut self.out.delay).await;
        self.service_buttons().await;
        self.engine.step(&mut self.out).await;
    }

    pub async fn run(&mut self) -> ! {
        loop {
            self.tick().await;
        }
    }

    /// Reseed, reset the engine and debounce state, and play the start cue.
    pub async fn new_game(&mut self) {
        self.engine.start_new_game(seed_from(self.clock.now_us()));
        self.debouncer.reset(self.flags, self.clock.now_ms());
        self.out.audio.play(Cue::StartGame).await;
    }

    async fn service_buttons(&mut self) {
        for button in 0..BUTTON_COUNT {
            let now = self.clock.now_ms();
            if self
                .debouncer
                .poll(button, &self.flags[button], &mut self.buttons, now)
            {
                debug!("Button {} pressed", button);
                self.dispatch(button).await;
            }
        }
    }

    async fn dispatch(&mut self, button: usize) {
        match self.engine.on_press(button, &mut self.out).await {
            PressOutcome::GameOver { score } => {
                self.report(score).await;
            }
            PressOutcome::Cleared { score } => {
                self.report(score).await;
                self.new_game().await;
            }
            PressOutcome::Restart => {
                info!("Restarting after game over");
                self.new_game().await;
            }
            PressOutcome::Ignored | PressOutcome::Correct | PressOutcome::RoundWon => {}
        }
    }

    async fn report(&mut self, score: u32) -> ReportOutcome {
        self.net
            .report_score(score, &mut self.out.delay, &mut self.out.audio)
            .await
    }

    pub fn phase(&self) -> GamePhase {
        self.engine.phase()
    }
}
