use std::sync::Mutex;
use std::time::SystemTime;

use bytes::Bytes;

use crate::characteristic::{Characteristic, SubscriberId};
use crate::host::HostSink;
use crate::state::LinkState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Delivery {
    pub characteristic: Characteristic,
    pub payload: Bytes,
    pub subscriber: SubscriberId,
}

/// Sink that records everything it receives.
#[derive(Default)]
pub(crate) struct RecordingSink {
    states: Mutex<Vec<LinkState>>,
    deliveries: Mutex<Vec<Delivery>>,
}

impl RecordingSink {
    pub fn states(&self) -> Vec<LinkState> {
        self.states.lock().unwrap().clone()
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }
}

impl HostSink for RecordingSink {
    fn on_state_changed(&self, state: LinkState) {
        self.states.lock().unwrap().push(state);
    }

    fn on_characteristic_data(
        &self,
        characteristic: Characteristic,
        payload: &Bytes,
        _timestamp: SystemTime,
        subscriber: &SubscriberId,
    ) {
        self.deliveries.lock().unwrap().push(Delivery {
            characteristic,
            payload: payload.clone(),
            subscriber: subscriber.clone(),
        });
    }
}
