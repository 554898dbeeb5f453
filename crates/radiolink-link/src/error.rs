use std::fmt;

use radiolink_frame::FrameError;
use radiolink_transport::TransportError;

use crate::characteristic::SubscriberId;

/// Handshake step that was being written when a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStep {
    Unlock,
    UnlockAck,
    Bandwidth,
    BandwidthAck,
}

impl fmt::Display for HandshakeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandshakeStep::Unlock => "unlock",
            HandshakeStep::UnlockAck => "unlock acknowledgement",
            HandshakeStep::Bandwidth => "bandwidth select",
            HandshakeStep::BandwidthAck => "bandwidth acknowledgement",
        };
        f.write_str(name)
    }
}

/// Coarse error classification for hosts that branch on the failure type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    TransportOpenFailed,
    HandshakeFailed,
    TransientReadFailure,
    TransientWriteFailure,
    MissingPayload,
    NotConfigured,
    InvalidConfig,
    WorkerSpawn,
}

/// Errors that can occur in link operations.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The transport device could not be opened.
    #[error("transport open failed: {0}")]
    TransportOpenFailed(#[source] TransportError),

    /// A handshake write failed. The link stays unusable until reconfigured.
    #[error("handshake failed at {step}: {source}")]
    HandshakeFailed {
        step: HandshakeStep,
        #[source]
        source: FrameError,
    },

    /// A read failed. The read loop keeps running.
    #[error("transient read failure: {0}")]
    TransientReadFailure(#[source] FrameError),

    /// A write failed. The next scheduled send proceeds independently.
    #[error("transient write failure: {0}")]
    TransientWriteFailure(#[source] FrameError),

    /// An outbound request carried no payload.
    #[error("outbound request from {0} carries no payload")]
    MissingPayload(SubscriberId),

    /// The adaptor has not been configured yet, or was stopped.
    #[error("link is not configured")]
    NotConfigured,

    /// The supplied configuration cannot be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A worker thread could not be started.
    #[error("failed to start {name} worker: {source}")]
    WorkerSpawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl LinkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LinkError::TransportOpenFailed(_) => ErrorKind::TransportOpenFailed,
            LinkError::HandshakeFailed { .. } => ErrorKind::HandshakeFailed,
            LinkError::TransientReadFailure(_) => ErrorKind::TransientReadFailure,
            LinkError::TransientWriteFailure(_) => ErrorKind::TransientWriteFailure,
            LinkError::MissingPayload(_) => ErrorKind::MissingPayload,
            LinkError::NotConfigured => ErrorKind::NotConfigured,
            LinkError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            LinkError::WorkerSpawn { .. } => ErrorKind::WorkerSpawn,
        }
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;
