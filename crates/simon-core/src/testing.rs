//! Host-side doubles for the hardware and network collaborators.
//!
//! Every timed double shares one [`VirtualClock`], so a test can assert
//! exactly how long a blocking operation held the loop.

use std::cell::Cell;
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::rc::Rc;
use std::string::String;
use std::vec::Vec;

use embedded_hal_async::delay::DelayNs;

use crate::BUTTON_COUNT;
use crate::audio::{Audio, Cue};
use crate::clock::Clock;
use crate::debounce::ButtonBank;
use crate::leds::LedBank;
use crate::net::{BrokerSession, InboundMessage, WifiLink};

/// Shared microsecond counter that only moves when a test advances it.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock(Rc<Cell<u64>>);

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.0.get() / 1_000
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance_us(ms * 1_000);
    }

    pub fn advance_us(&self, us: u64) {
        self.0.set(self.0.get() + us);
    }
}

impl Clock for VirtualClock {
    fn now_ms(&self) -> u64 {
        VirtualClock::now_ms(self)
    }

    fn now_us(&self) -> u64 {
        self.0.get()
    }
}

/// Delay that advances the virtual clock instead of sleeping.
#[derive(Debug, Clone)]
pub struct MockDelay {
    clock: VirtualClock,
}

impl MockDelay {
    pub fn new(clock: VirtualClock) -> Self {
        Self { clock }
    }
}

impl DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.clock.advance_us(u64::from(ns) / 1_000);
    }

    async fn delay_us(&mut self, us: u32) {
        self.clock.advance_us(u64::from(us));
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.clock.advance_ms(u64::from(ms));
    }
}

/// Audio that records cues and takes no time.
#[derive(Debug, Default)]
pub struct RecordingAudio {
    pub cues: Vec<Cue>,
}

impl Audio for RecordingAudio {
    async fn play(&mut self, cue: Cue) {
        self.cues.push(cue);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedEvent {
    Set { led: usize, on: bool },
    All { on: bool },
}

#[derive(Debug, Default)]
pub struct MockLeds {
    pub state: [bool; BUTTON_COUNT],
    pub events: Vec<LedEvent>,
}

impl MockLeds {
    /// Indices of every single LED switched on, in order.
    pub fn lit_history(&self) -> Vec<usize> {
        self.events
            .iter()
            .filter_map(|e| match e {
                LedEvent::Set { led, on: true } => Some(*led),
                _ => None,
            })
            .collect()
    }

    pub fn all_on_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, LedEvent::All { on: true }))
            .count()
    }
}

impl LedBank for MockLeds {
    fn set(&mut self, led: usize, on: bool) {
        if let Some(slot) = self.state.get_mut(led) {
            *slot = on;
        }
        self.events.push(LedEvent::Set { led, on });
    }

    fn set_all(&mut self, on: bool) {
        self.state = [on; BUTTON_COUNT];
        self.events.push(LedEvent::All { on });
    }
}

/// Button levels set directly by the test.
#[derive(Debug, Clone, Default)]
pub struct MockButtons {
    pub held: [bool; BUTTON_COUNT],
}

impl ButtonBank for MockButtons {
    fn is_pressed(&mut self, button: usize) -> bool {
        self.held.get(button).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockError;

/// Wi-Fi link that comes up `connect_after_ms` after `begin`, unless the
/// credentials are rejected.
#[derive(Debug)]
pub struct MockWifi {
    mac: [u8; 6],
    clock: VirtualClock,
    connected: bool,
    /// Virtual time at which a pending association completes
    pending_until: Option<u64>,
    pub connect_after_ms: u64,
    pub reject_password: Option<String>,
    pub reject_empty_ssid: bool,
    pub begun: Vec<(String, String)>,
}

impl MockWifi {
    pub fn new(mac: [u8; 6], clock: VirtualClock) -> Self {
        Self {
            mac,
            clock,
            connected: false,
            pending_until: None,
            connect_after_ms: 0,
            reject_password: None,
            reject_empty_ssid: false,
            begun: Vec::new(),
        }
    }

    pub fn drop_link(&mut self) {
        self.connected = false;
        self.pending_until = None;
    }
}

impl WifiLink for MockWifi {
    type Error = MockError;

    async fn begin(&mut self, ssid: &str, password: &str) -> Result<(), MockError> {
        self.begun.push((ssid.into(), password.into()));
        self.connected = false;
        self.pending_until = None;
        if self.reject_empty_ssid && ssid.is_empty() {
            return Err(MockError);
        }
        if self.reject_password.as_deref() != Some(password) {
            self.pending_until = Some(self.clock.now_ms() + self.connect_after_ms);
        }
        Ok(())
    }

    fn is_connected(&mut self) -> bool {
        if let Some(until) = self.pending_until
            && self.clock.now_ms() >= until
        {
            self.connected = true;
            self.pending_until = None;
        }
        self.connected
    }

    fn mac_address(&self) -> [u8; 6] {
        self.mac
    }

    fn local_ip(&self) -> Option<Ipv4Addr> {
        self.connected.then_some(Ipv4Addr::new(192, 168, 1, 42))
    }
}

/// Broker that records traffic and replays a scripted inbox.
#[derive(Debug, Default)]
pub struct MockBroker {
    connected: bool,
    /// Number of upcoming connect attempts to refuse
    pub refuse_connects: usize,
    pub fail_publishes: bool,
    pub client_ids: Vec<String>,
    pub subscriptions: Vec<String>,
    pub published: Vec<(String, Vec<u8>)>,
    pub inbox: VecDeque<InboundMessage>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drop_session(&mut self) {
        self.connected = false;
    }

    /// Payloads published on `topic`, in order.
    pub fn published_on(&self, topic: &str) -> Vec<&[u8]> {
        self.published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.as_slice())
            .collect()
    }
}

impl BrokerSession for MockBroker {
    type Error = MockError;

    async fn connect(&mut self, client_id: &str) -> Result<(), MockError> {
        self.client_ids.push(client_id.into());
        if self.refuse_connects > 0 {
            self.refuse_connects -= 1;
            return Err(MockError);
        }
        self.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), MockError> {
        if !self.connected {
            return Err(MockError);
        }
        self.subscriptions.push(topic.into());
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), MockError> {
        if !self.connected || self.fail_publishes {
            return Err(MockError);
        }
        self.published.push((topic.into(), payload.to_vec()));
        Ok(())
    }

    async fn poll(&mut self) -> Result<Option<InboundMessage>, MockError> {
        if !self.connected {
            return Err(MockError);
        }
        Ok(self.inbox.pop_front())
    }
}
