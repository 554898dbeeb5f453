use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Named data streams offered by the adaptor.
///
/// The set is closed and fixed at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Characteristic {
    /// Signal-strength readings: one per data frame and one per radio report.
    Rssi,
    /// Message bytes of received data frames.
    Message,
}

impl Characteristic {
    /// Every characteristic, in announcement order.
    pub const ALL: [Characteristic; 2] = [Characteristic::Rssi, Characteristic::Message];

    pub fn as_str(self) -> &'static str {
        match self {
            Characteristic::Rssi => "rssi",
            Characteristic::Message => "message",
        }
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Characteristic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rssi" => Ok(Characteristic::Rssi),
            "message" => Ok(Characteristic::Message),
            other => Err(format!(
                "unknown characteristic '{other}' (expected rssi or message)"
            )),
        }
    }
}

/// Opaque identity of a subscribing app.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(String);

impl SubscriberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubscriberId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SubscriberId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
