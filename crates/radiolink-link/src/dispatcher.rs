use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::characteristic::{Characteristic, SubscriberId};
use crate::host::HostSink;

/// Characteristic → subscribers, in registration order.
///
/// A subscriber appears under exactly the characteristics it requested in
/// its most recent registration.
#[derive(Debug, Clone)]
pub struct SubscriptionTable {
    entries: BTreeMap<Characteristic, Vec<SubscriberId>>,
}

impl Default for SubscriptionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionTable {
    /// Empty table covering every known characteristic.
    pub fn new() -> Self {
        Self {
            entries: Characteristic::ALL
                .iter()
                .map(|&characteristic| (characteristic, Vec::new()))
                .collect(),
        }
    }

    /// Replace the registrations of `id` with `requested`.
    ///
    /// Returns whether `id` is registered anywhere afterwards.
    pub fn update(&mut self, id: &SubscriberId, requested: &[Characteristic]) -> bool {
        for subscribers in self.entries.values_mut() {
            subscribers.retain(|existing| existing != id);
        }

        for characteristic in requested {
            let subscribers = self.entries.entry(*characteristic).or_default();
            if !subscribers.contains(id) {
                subscribers.push(id.clone());
            }
        }

        !requested.is_empty()
    }

    /// Subscribers of `characteristic`.
    pub fn subscribers(&self, characteristic: Characteristic) -> &[SubscriberId] {
        self.entries
            .get(&characteristic)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Characteristics `id` is currently registered for.
    pub fn characteristics_of(&self, id: &SubscriberId) -> Vec<Characteristic> {
        self.entries
            .iter()
            .filter(|(_, subscribers)| subscribers.contains(id))
            .map(|(characteristic, _)| *characteristic)
            .collect()
    }

    /// True when no characteristic has a subscriber.
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }
}

/// Fans delivered payloads out to subscribers through the host sink.
pub struct Dispatcher {
    table: RwLock<SubscriptionTable>,
    sink: Arc<dyn HostSink>,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn HostSink>) -> Self {
        Self {
            table: RwLock::new(SubscriptionTable::new()),
            sink,
        }
    }

    /// Replace-not-merge registration. Returns whether `id` is now registered.
    pub fn update_subscriptions(&self, id: &SubscriberId, requested: &[Characteristic]) -> bool {
        let mut table = self.table.write().unwrap_or_else(|poison| poison.into_inner());
        let registered = table.update(id, requested);
        debug!(
            subscriber = %id,
            characteristics = ?table.characteristics_of(id),
            "subscriptions updated"
        );
        registered
    }

    /// Deliver `payload` to every subscriber of `characteristic`.
    ///
    /// Returns the number of recipients. Zero subscribers is not an error.
    pub fn deliver(
        &self,
        characteristic: Characteristic,
        payload: &Bytes,
        timestamp: SystemTime,
    ) -> usize {
        let recipients = self.subscribers(characteristic);
        if recipients.is_empty() {
            trace!(%characteristic, "no subscribers, dropping payload");
            return 0;
        }

        for subscriber in &recipients {
            self.sink
                .on_characteristic_data(characteristic, payload, timestamp, subscriber);
        }
        recipients.len()
    }

    /// Snapshot of the subscribers of `characteristic`.
    pub fn subscribers(&self, characteristic: Characteristic) -> Vec<SubscriberId> {
        self.table
            .read()
            .unwrap_or_else(|poison| poison.into_inner())
            .subscribers(characteristic)
            .to_vec()
    }

    /// True when at least one subscriber is registered.
    pub fn has_subscribers(&self) -> bool {
        !self
            .table
            .read()
            .unwrap_or_else(|poison| poison.into_inner())
            .is_empty()
    }
}
