//! Host collaborator interface.
//!
//! The adaptor never talks to a message bus directly. It reports state and
//! delivers characteristic data through [`HostSink`]; the host decides how to
//! forward them. The message types below are the JSON shapes a device manager
//! expects on its bus.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::characteristic::{Characteristic, SubscriberId};
use crate::state::LinkState;

/// Host message status: state report.
pub const STATUS_STATE: &str = "state";
/// Host message status: service announcement accepted.
pub const STATUS_OK: &str = "ok";
/// Host message content: characteristic data.
pub const CONTENT_CHARACTERISTIC: &str = "characteristic";
/// Host message content: service announcement.
pub const CONTENT_SERVICE: &str = "service";

/// Outbound effects of the adaptor.
///
/// Calls arrive on the adaptor's worker threads. `on_state_changed` is invoked
/// while the state lock is held, so implementations must not call back into
/// the adaptor from it.
pub trait HostSink: Send + Sync {
    fn on_state_changed(&self, state: LinkState);

    fn on_characteristic_data(
        &self,
        characteristic: Characteristic,
        payload: &Bytes,
        timestamp: SystemTime,
        subscriber: &SubscriberId,
    );
}

/// State report sent to the device manager.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateReport {
    pub id: String,
    pub status: String,
    pub state: LinkState,
}

impl StateReport {
    pub fn new(adaptor_id: &str, state: LinkState) -> Self {
        Self {
            id: adaptor_id.to_string(),
            status: STATUS_STATE.to_string(),
            state,
        }
    }
}

/// Characteristic data addressed to one subscriber.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CharacteristicMessage {
    pub id: String,
    pub content: String,
    pub characteristic: Characteristic,
    pub data: serde_json::Value,
    #[serde(rename = "timeStamp")]
    pub time_stamp: f64,
}

impl CharacteristicMessage {
    pub fn new(
        adaptor_id: &str,
        characteristic: Characteristic,
        payload: &[u8],
        timestamp: SystemTime,
    ) -> Self {
        Self {
            id: adaptor_id.to_string(),
            content: CONTENT_CHARACTERISTIC.to_string(),
            characteristic,
            data: characteristic_data(characteristic, payload),
            time_stamp: unix_seconds(timestamp),
        }
    }
}

/// One offered characteristic in a service announcement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceEntry {
    pub characteristic: Characteristic,
    pub interval: u32,
}

/// Reply to a newly initialized app listing what the adaptor offers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceAnnouncement {
    pub id: String,
    pub status: String,
    pub service: Vec<ServiceEntry>,
    pub content: String,
}

impl ServiceAnnouncement {
    pub fn new(adaptor_id: &str, characteristics: &[Characteristic]) -> Self {
        Self {
            id: adaptor_id.to_string(),
            status: STATUS_OK.to_string(),
            service: characteristics
                .iter()
                .map(|&characteristic| ServiceEntry {
                    characteristic,
                    interval: 0,
                })
                .collect(),
            content: CONTENT_SERVICE.to_string(),
        }
    }
}

/// JSON rendering of a characteristic payload.
///
/// Signal strength is a number; messages are lossy UTF-8 text.
pub fn characteristic_data(characteristic: Characteristic, payload: &[u8]) -> serde_json::Value {
    match characteristic {
        Characteristic::Rssi => payload
            .first()
            .map(|&rssi| serde_json::Value::from(rssi))
            .unwrap_or(serde_json::Value::Null),
        Characteristic::Message => {
            serde_json::Value::String(String::from_utf8_lossy(payload).into_owned())
        }
    }
}

/// Seconds since the Unix epoch, with sub-second precision.
pub fn unix_seconds(timestamp: SystemTime) -> f64 {
    timestamp
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
