use std::sync::mpsc::Sender;
use std::time::SystemTime;

use bytes::Bytes;
use radiolink_link::{Characteristic, HostSink, LinkState, SubscriberId};
use tracing::{debug, info};

/// Adaptor id used in host messages printed by the CLI.
pub const ADAPTOR_ID: &str = "radiolink";

/// Subscriber id the CLI registers under.
pub const CLI_SUBSCRIBER: &str = "cli";

#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    State(LinkState),
    Data {
        characteristic: Characteristic,
        payload: Bytes,
        timestamp: SystemTime,
    },
}

/// Forwards adaptor callbacks to the main thread for printing.
pub struct ChannelSink {
    tx: Sender<LinkEvent>,
}

impl ChannelSink {
    pub fn new(tx: Sender<LinkEvent>) -> Self {
        Self { tx }
    }
}

impl HostSink for ChannelSink {
    fn on_state_changed(&self, state: LinkState) {
        let _ = self.tx.send(LinkEvent::State(state));
    }

    fn on_characteristic_data(
        &self,
        characteristic: Characteristic,
        payload: &Bytes,
        timestamp: SystemTime,
        _subscriber: &SubscriberId,
    ) {
        let _ = self.tx.send(LinkEvent::Data {
            characteristic,
            payload: payload.clone(),
            timestamp,
        });
    }
}

/// Host sink for one-shot commands: everything goes to the log.
pub struct LogSink;

impl HostSink for LogSink {
    fn on_state_changed(&self, state: LinkState) {
        info!(%state, "link state");
    }

    fn on_characteristic_data(
        &self,
        characteristic: Characteristic,
        payload: &Bytes,
        _timestamp: SystemTime,
        subscriber: &SubscriberId,
    ) {
        debug!(%characteristic, %subscriber, len = payload.len(), "characteristic data");
    }
}
