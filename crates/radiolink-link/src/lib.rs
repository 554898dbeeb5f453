//! Serial radio link management.
//!
//! This is the layer a host talks to. Configure a [`LinkAdaptor`] over a
//! transport, register subscribers for characteristics, and receive signal
//! strength readings and messages through a [`HostSink`]. Behind the facade
//! three worker threads run the link: a read loop, a dispatch worker and the
//! send scheduler.

pub mod adaptor;
pub mod characteristic;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handshake;
pub mod host;
pub mod read_loop;
pub mod scheduler;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use adaptor::LinkAdaptor;
pub use characteristic::{Characteristic, SubscriberId};
pub use config::{LinkConfig, LinkTiming, Role, MAX_TIMING_DELAY};
pub use dispatcher::{Dispatcher, SubscriptionTable};
pub use error::{ErrorKind, HandshakeStep, LinkError, Result};
pub use handshake::{initialize, Ready};
pub use host::{
    CharacteristicMessage, HostSink, ServiceAnnouncement, ServiceEntry, StateReport,
};
pub use read_loop::{ReadLoop, FRAME_CHANNEL_DEPTH};
pub use scheduler::{OutboundCounter, SchedulerHandle, SendOutcome, SendReceipt, SendScheduler};
pub use state::{LinkState, LinkStateMachine, StateAction};
