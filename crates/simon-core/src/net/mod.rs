//! Network association, broker session and the pairing/score protocol

mod connectivity;
pub mod messages;

pub use connectivity::{
    ASSOCIATE_POLL_MS, ConnectivityManager, PAIR_ASSOCIATE_TIMEOUT_MS, ReportOutcome,
    SESSION_RETRY_MS,
};

use core::fmt::{self, Write};
use core::net::Ipv4Addr;

use heapless::{String, Vec};

/// Inbound pairing requests (subscribed)
pub const PAIR_TOPIC: &str = "simon/pair";
/// Pairing acknowledgements (published)
pub const PAIR_ACK_TOPIC: &str = "simon/pair/ack";
/// Score events (published)
pub const SCORE_TOPIC: &str = "simon/scores";

pub const MAX_TOPIC_LEN: usize = 64;
pub const MAX_PAYLOAD_LEN: usize = 256;

/// Network association collaborator.
pub trait WifiLink {
    type Error: fmt::Debug;

    /// Start associating with `ssid`. Completion is observed via [`is_connected`].
    ///
    /// [`is_connected`]: WifiLink::is_connected
    fn begin(
        &mut self,
        ssid: &str,
        password: &str,
    ) -> impl Future<Output = Result<(), Self::Error>>;

    fn is_connected(&mut self) -> bool;

    fn mac_address(&self) -> [u8; 6];

    fn local_ip(&self) -> Option<Ipv4Addr>;
}

/// Persistent publish/subscribe session with the broker.
pub trait BrokerSession {
    type Error: fmt::Debug;

    fn connect(&mut self, client_id: &str) -> impl Future<Output = Result<(), Self::Error>>;

    fn is_connected(&self) -> bool;

    fn subscribe(&mut self, topic: &str) -> impl Future<Output = Result<(), Self::Error>>;

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), Self::Error>>;

    /// Service the session and hand back at most one inbound message.
    fn poll(&mut self) -> impl Future<Output = Result<Option<InboundMessage>, Self::Error>>;
}

/// A message delivered on a subscribed topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String<MAX_TOPIC_LEN>,
    pub payload: Vec<u8, MAX_PAYLOAD_LEN>,
}

impl InboundMessage {
    /// Copy a topic and payload in. Returns `None` if either is oversized.
    pub fn new(topic: &str, payload: &[u8]) -> Option<Self> {
        Some(Self {
            topic: String::try_from(topic).ok()?,
            payload: Vec::from_slice(payload).ok()?,
        })
    }
}

/// Device identity derived from the station MAC, e.g. `"A1B2C3D4E5F6"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity(String<32>);

/// Prefix of the broker client id
const CLIENT_ID_PREFIX: &str = "ESP32-";

impl DeviceIdentity {
    pub fn from_mac(mac: [u8; 6]) -> Self {
        let mut id = String::new();
        for byte in mac {
            // 12 hex digits always fit
            let _ = write!(id, "{byte:02X}");
        }
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Broker client identifier, `ESP32-<identity>`.
    pub fn client_id(&self) -> String<40> {
        let mut id = String::new();
        let _ = id.push_str(CLIENT_ID_PREFIX);
        let _ = id.push_str(&self.0);
        id
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_from_mac() {
        let id = DeviceIdentity::from_mac([0xA4, 0xCF, 0x12, 0x0B, 0x9E, 0x01]);
        assert_eq!(id.as_str(), "A4CF120B9E01");
        assert_eq!(id.client_id().as_str(), "ESP32-A4CF120B9E01");
    }

    #[test]
    fn test_inbound_message_limits() {
        assert!(InboundMessage::new(PAIR_TOPIC, b"{}").is_some());
        assert!(InboundMessage::new(PAIR_TOPIC, &[b' '; MAX_PAYLOAD_LEN + 1]).is_none());
        let long_topic = "t".repeat(MAX_TOPIC_LEN + 1);
        assert!(InboundMessage::new(&long_topic, b"{}").is_none());
    }
}
