use alloc::string::String;

use embedded_hal_async::delay::DelayNs;
use log::{debug, info, warn};

use super::messages::{PairAck, PairRequest, PairStatus, ScoreReport, to_payload};
use super::{BrokerSession, DeviceIdentity, PAIR_ACK_TOPIC, PAIR_TOPIC, SCORE_TOPIC, WifiLink};
use crate::audio::{Audio, Cue};
use crate::clock::Clock;
use crate::config::Config;

/// Interval between association status checks
pub const ASSOCIATE_POLL_MS: u32 = 500;
/// Upper bound on the association attempt made for a pairing request
pub const PAIR_ASSOCIATE_TIMEOUT_MS: u64 = 10_000;
/// Fixed delay between broker connection attempts
pub const SESSION_RETRY_MS: u32 = 2_000;

/// What happened to a score handed to [`ConnectivityManager::report_score`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// No paired account; the score is dropped.
    Skipped,
    Published,
    /// The publish call failed; the score is lost.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Credentials {
    ssid: String,
    password: String,
}

/// Owns the Wi-Fi link, the broker session, the device identity and the
/// paired account.
pub struct ConnectivityManager<W, B> {
    wifi: W,
    broker: B,
    identity: DeviceIdentity,
    /// Credentials of the network the device should be on
    active: Credentials,
    /// Empty means unpaired
    paired_account: String,
}

impl<W, B> ConnectivityManager<W, B>
where
    W: WifiLink,
    B: BrokerSession,
{
    pub fn new(wifi: W, broker: B, config: &Config<'_>) -> Self {
        let identity = DeviceIdentity::from_mac(wifi.mac_address());
        info!("Device identity {}", identity);
        Self {
            wifi,
            broker,
            identity,
            active: Credentials {
                ssid: config.internet.ssid.into(),
                password: config.internet.password.into(),
            },
            paired_account: String::new(),
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Username bound by the last successful pairing, if any
    pub fn paired_account(&self) -> Option<&str> {
        Some(self.paired_account.as_str()).filter(|account| !account.is_empty())
    }

    /// Name of the network the device is configured for
    pub fn ssid(&self) -> &str {
        &self.active.ssid
    }

    pub fn wifi(&self) -> &W {
        &self.wifi
    }

    pub fn wifi_mut(&mut self) -> &mut W {
        &mut self.wifi
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    pub fn broker_mut(&mut self) -> &mut B {
        &mut self.broker
    }

    /// Associate with the configured network, polling until it succeeds.
    pub async fn associate<D: DelayNs, A: Audio>(&mut self, delay: &mut D, audio: &mut A) {
        info!("Connecting to Wi-Fi network \"{}\"", self.active.ssid);
        if let Err(e) = self.wifi.begin(&self.active.ssid, &self.active.password).await {
            warn!("Wi-Fi begin failed: {:?}", e);
        }
        while !self.wifi.is_connected() {
            delay.delay_ms(ASSOCIATE_POLL_MS).await;
        }
        match self.wifi.local_ip() {
            Some(ip) => info!("Wi-Fi connected, IP: {}", ip),
            None => info!("Wi-Fi connected"),
        }
        audio.play(Cue::WifiConnected).await;
    }

    /// Make sure the link and the broker session are up, blocking until they are.
    pub async fn ensure_session<D: DelayNs, A: Audio>(&mut self, delay: &mut D, audio: &mut A) {
        if self.broker.is_connected() {
            return;
        }
        if !self.wifi.is_connected() {
            warn!("Wi-Fi link down, re-associating");
            self.associate(delay, audio).await;
        }

        let client_id = self.identity.client_id();
        loop {
            match self.open_session(&client_id).await {
                Ok(()) => break,
                Err(e) => {
                    warn!("Broker connection failed: {:?}, retrying in {} ms", e, SESSION_RETRY_MS);
                    delay.delay_ms(SESSION_RETRY_MS).await;
                }
            }
        }
        info!("Broker session up as {}", client_id);
        audio.play(Cue::BrokerConnected).await;
    }

    async fn open_session(&mut self, client_id: &str) -> Result<(), B::Error> {
        self.broker.connect(client_id).await?;
        self.broker.subscribe(PAIR_TOPIC).await
    }

    /// Service the session and dispatch at most one inbound message.
    pub async fn pump<C: Clock, D: DelayNs>(&mut self, clock: &C, delay: &mut D) {
        let message = match self.broker.poll().await {
            Ok(Some(message)) => message,
            Ok(None) => return,
            Err(e) => {
                warn!("Broker poll failed: {:?}", e);
                return;
            }
        };

        debug!(
            "Inbound on {} ({} bytes)",
            message.topic.as_str(),
            message.payload.len()
        );
        if message.topic.as_str() == PAIR_TOPIC {
            self.handle_pairing(&message.payload, clock, delay).await;
        }
    }

    /// Run the pairing handshake for one inbound payload.
    ///
    /// Returns `None` when the payload is not JSON; no acknowledgement is
    /// sent in that case.
    pub async fn handle_pairing<C: Clock, D: DelayNs>(
        &mut self,
        payload: &[u8],
        clock: &C,
        delay: &mut D,
    ) -> Option<PairStatus> {
        let Some(request) = PairRequest::parse(payload) else {
            debug!("Discarding malformed pairing payload");
            return None;
        };

        info!(
            "Pairing request for user \"{}\" on network \"{}\"",
            request.username, request.ssid
        );

        let status = if self.try_associate(&request, clock, delay).await {
            PairStatus::Paired
        } else {
            PairStatus::Failed
        };

        let ack = PairAck {
            ssid: &request.ssid,
            username: &request.username,
            status,
        };
        match to_payload(&ack) {
            Ok(bytes) => self.publish_ack(&bytes).await,
            Err(e) => warn!("Failed to encode pairing ack: {:?}", e),
        }

        if status == PairStatus::Paired {
            info!("Paired with \"{}\"", request.username);
            self.active = Credentials {
                ssid: request.ssid,
                password: request.password,
            };
            self.paired_account = request.username;
        } else {
            warn!("Pairing failed, staying on \"{}\"", self.active.ssid);
        }

        Some(status)
    }

    /// One bounded association attempt with the requested credentials.
    async fn try_associate<C: Clock, D: DelayNs>(
        &mut self,
        request: &PairRequest,
        clock: &C,
        delay: &mut D,
    ) -> bool {
        if let Err(e) = self.wifi.begin(&request.ssid, &request.password).await {
            warn!("Wi-Fi begin failed: {:?}", e);
            return false;
        }
        let start = clock.now_ms();
        while !self.wifi.is_connected()
            && clock.now_ms().saturating_sub(start) < PAIR_ASSOCIATE_TIMEOUT_MS
        {
            delay.delay_ms(ASSOCIATE_POLL_MS).await;
        }
        self.wifi.is_connected()
    }

    /// Best-effort ack: a single reconnect attempt, no retry loop.
    async fn publish_ack(&mut self, payload: &[u8]) {
        if !self.broker.is_connected() {
            let client_id = self.identity.client_id();
            if let Err(e) = self.open_session(&client_id).await {
                warn!("Could not reopen session for pairing ack: {:?}", e);
                return;
            }
        }
        if let Err(e) = self.broker.publish(PAIR_ACK_TOPIC, payload).await {
            warn!("Failed to publish pairing ack: {:?}", e);
        }
    }

    /// Publish a finished game's score for the paired account.
    pub async fn report_score<D: DelayNs, A: Audio>(
        &mut self,
        score: u32,
        delay: &mut D,
        audio: &mut A,
    ) -> ReportOutcome {
        self.ensure_session(delay, audio).await;

        if self.paired_account.is_empty() {
            debug!("Not paired, dropping score {}", score);
            return ReportOutcome::Skipped;
        }

        let report = ScoreReport {
            ssid: &self.active.ssid,
            username: &self.paired_account,
            score,
        };
        let payload = match to_payload(&report) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to encode score report: {:?}", e);
                return ReportOutcome::Failed;
            }
        };

        match self.broker.publish(SCORE_TOPIC, &payload).await {
            Ok(()) => {
                info!("Reported score {} for \"{}\"", score, self.paired_account);
                ReportOutcome::Published
            }
            Err(e) => {
                warn!("Failed to publish score: {:?}", e);
                ReportOutcome::Failed
            }
        }
    }
}
