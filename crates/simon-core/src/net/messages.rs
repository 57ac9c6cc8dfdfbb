//! JSON payloads on the pairing and score topics

use alloc::string::String;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound on `simon/pair`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairRequest {
    pub ssid: String,
    pub password: String,
    pub username: String,
}

impl PairRequest {
    /// Parse a pairing payload.
    ///
    /// Returns `None` only when the payload is not JSON at all. Missing or
    /// non-string fields read as empty.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let doc: Value = serde_json::from_slice(payload).ok()?;
        let field = |key: &str| -> String {
            doc.get(key)
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_default()
        };
        Some(Self {
            ssid: field("ssid"),
            password: field("password"),
            username: field("username"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairStatus {
    Paired,
    Failed,
}

/// Outbound on `simon/pair/ack`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairAck<'a> {
    pub ssid: &'a str,
    pub username: &'a str,
    pub status: PairStatus,
}

/// Outbound on `simon/scores`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport<'a> {
    pub ssid: &'a str,
    pub username: &'a str,
    pub score: u32,
}

/// Serialize a message to compact JSON bytes.
pub fn to_payload<T: Serialize>(message: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(message)
}
