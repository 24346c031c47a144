use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Length of a temporary exposure key in bytes
pub const KEY_DATA_LENGTH: usize = 16;

/// Number of 10-minute intervals a key is valid for (one day)
pub const DEFAULT_ROLLING_PERIOD: u32 = 144;

/// Highest transmission risk level the backend accepts
pub const MAX_TRANSMISSION_RISK_LEVEL: u8 = 8;

const INTERVAL_SECONDS: i64 = 600;
const SECONDS_PER_DAY: i64 = 86_400;

// Proximity key models

/// One interval's locally generated tracing key.
///
/// Orchestration code treats the content as opaque; the fields exist so that
/// transports can put the key on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityKey {
    #[serde(with = "hex_bytes")]
    key_data: Vec<u8>,
    rolling_start_number: u32,
    rolling_period: u32,
    transmission_risk_level: u8,
}

impl ProximityKey {
    /// Create a key valid for the default rolling period
    pub fn new(
        key_data: Vec<u8>,
        rolling_start_number: u32,
        transmission_risk_level: u8,
    ) -> Result<Self> {
        Self::with_rolling_period(
            key_data,
            rolling_start_number,
            DEFAULT_ROLLING_PERIOD,
            transmission_risk_level,
        )
    }

    pub fn with_rolling_period(
        key_data: Vec<u8>,
        rolling_start_number: u32,
        rolling_period: u32,
        transmission_risk_level: u8,
    ) -> Result<Self> {
        if key_data.len() != KEY_DATA_LENGTH {
            return Err(Error::InvalidKey(format!(
                "key data must be {} bytes, got {}",
                KEY_DATA_LENGTH,
                key_data.len()
            )));
        }

        if rolling_period == 0 || rolling_period > DEFAULT_ROLLING_PERIOD {
            return Err(Error::InvalidKey(format!(
                "rolling period must be within 1..={}, got {}",
                DEFAULT_ROLLING_PERIOD, rolling_period
            )));
        }

        if transmission_risk_level > MAX_TRANSMISSION_RISK_LEVEL {
            return Err(Error::InvalidKey(format!(
                "transmission risk level must be at most {}, got {}",
                MAX_TRANSMISSION_RISK_LEVEL, transmission_risk_level
            )));
        }

        Ok(Self {
            key_data,
            rolling_start_number,
            rolling_period,
            transmission_risk_level,
        })
    }

    pub fn key_data(&self) -> &[u8] {
        &self.key_data
    }

    pub fn rolling_start_number(&self) -> u32 {
        self.rolling_start_number
    }

    pub fn rolling_period(&self) -> u32 {
        self.rolling_period
    }

    pub fn transmission_risk_level(&self) -> u8 {
        self.transmission_risk_level
    }

    /// 10-minute interval index containing `at`
    pub fn interval_number(at: DateTime<Utc>) -> u32 {
        (at.timestamp().max(0) / INTERVAL_SECONDS) as u32
    }

    /// Whether this key started within the last `days` days before `now`
    pub fn is_within_window(&self, now: DateTime<Utc>, days: u32) -> bool {
        let window_start = (now.timestamp() - i64::from(days) * SECONDS_PER_DAY) / INTERVAL_SECONDS;
        i64::from(self.rolling_start_number) >= window_start
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(encoded).map_err(serde::de::Error::custom)
    }
}

// Registration models

/// Opaque identifier linking this device to a prior enrollment.
///
/// `Display` and `Debug` only show a short prefix so the token never lands in logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationToken(String);

impl RegistrationToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short tokens would be shown whole, so they get the marker alone
    fn redacted(&self) -> String {
        const SHOWN: usize = 4;
        if self.0.chars().count() <= SHOWN {
            return "…".to_string();
        }
        let prefix: String = self.0.chars().take(SHOWN).collect();
        format!("{}…", prefix)
    }
}

impl fmt::Display for RegistrationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.redacted())
    }
}

impl fmt::Debug for RegistrationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RegistrationToken").field(&self.redacted()).finish()
    }
}

impl From<&str> for RegistrationToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for RegistrationToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}
