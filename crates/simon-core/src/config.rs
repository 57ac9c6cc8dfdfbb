use serde::{Deserialize, Serialize};

/// Network name the device associates with at boot.
pub const DEFAULT_WIFI_SSID: &str = "SIMON_123";
/// Credential for [`DEFAULT_WIFI_SSID`].
pub const DEFAULT_WIFI_PASSWORD: &str = "123";
/// Broker address used when nothing else is configured.
pub const DEFAULT_BROKER_HOST: &str = "192.168.1.10";
/// Plain MQTT port.
pub const DEFAULT_BROKER_PORT: u16 = 1883;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct Config<'a> {
    #[serde(default)]
    pub internet: InternetConfig<'a>,
    #[serde(default)]
    pub broker: BrokerConfig<'a>,
}

impl Default for Config<'_> {
    fn default() -> Self {
        Self {
            internet: InternetConfig::default(),
            broker: BrokerConfig::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternetConfig<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

impl Default for InternetConfig<'_> {
    fn default() -> Self {
        Self {
            ssid: DEFAULT_WIFI_SSID,
            password: DEFAULT_WIFI_PASSWORD,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokerConfig<'a> {
    /// IPv4 address in dotted form
    pub host: &'a str,
    pub port: u16,
}

impl Default for BrokerConfig<'_> {
    fn default() -> Self {
        Self {
            host: DEFAULT_BROKER_HOST,
            port: DEFAULT_BROKER_PORT,
        }
    }
}

impl BrokerConfig<'_> {
    /// Parse the configured host as an IPv4 address.
    pub fn ipv4(&self) -> Option<core::net::Ipv4Addr> {
        self.host.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_compiled_constants() {
        let config = Config::default();
        assert_eq!(config.internet.ssid, "SIMON_123");
        assert_eq!(config.internet.password, "123");
        assert_eq!(config.broker.port, 1883);
        assert_eq!(
            config.broker.ipv4(),
            Some(core::net::Ipv4Addr::new(192, 168, 1, 10))
        );
    }

    #[test]
    fn test_partial_config_falls_back_to_defaults() {
        let json = r#"{"broker":{"host":"10.0.0.2","port":1884}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.internet, InternetConfig::default());
        assert_eq!(config.broker.host, "10.0.0.2");
        assert_eq!(config.broker.port, 1884);
    }

    #[test]
    fn test_unparseable_host() {
        let broker = BrokerConfig {
            host: "broker.local",
            port: 1883,
        };
        assert_eq!(broker.ipv4(), None);
    }
}
