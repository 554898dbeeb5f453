use radiolink_transport::{lock_transport, SharedTransport};
use tracing::debug;

use crate::command::ACK;
use crate::error::{FrameError, Result};

/// Writes complete frames to the shared transport.
///
/// Each frame is written under the transport lock, so frames never interleave
/// with each other or with an inbound frame being reassembled.
#[derive(Clone)]
pub struct FrameWriter {
    transport: SharedTransport,
}

impl FrameWriter {
    /// Create a new frame writer.
    pub fn new(transport: SharedTransport) -> Self {
        Self { transport }
    }

    /// Write one frame (blocking).
    pub fn send(&self, frame: &[u8]) -> Result<()> {
        if frame.is_empty() {
            return Err(FrameError::Empty);
        }

        let mut transport = lock_transport(&self.transport)?;
        transport.write_all(frame)?;
        debug!(
            transport = transport.name(),
            len = frame.len(),
            frame = %String::from_utf8_lossy(frame),
            "sent frame"
        );
        Ok(())
    }

    /// Write the acknowledgement frame.
    pub fn send_ack(&self) -> Result<()> {
        self.send(ACK)
    }
}
