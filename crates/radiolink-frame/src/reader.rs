use std::time::SystemTime;

use bytes::{BufMut, BytesMut};
use radiolink_transport::{lock_transport, SharedTransport};
use tracing::{debug, trace};

use crate::codec::{Frame, FrameConfig};
use crate::error::Result;

const READ_CHUNK_SIZE: usize = 64;

/// Reassembles frames from the shared transport.
///
/// The wire carries no length prefix and no checksum, so a frame ends when
/// the line stays quiet for one `inter_byte_gap`. Two packets arriving closer
/// together than that are merged, and a packet stalled mid-air is split. This
/// is a property of the radio protocol; the reader does not try to repair it.
///
/// The transport lock is held from the first byte until the frame is
/// complete, so no write can land in the middle of an inbound frame.
pub struct FrameReader {
    transport: SharedTransport,
    config: FrameConfig,
}

impl FrameReader {
    /// Create a new frame reader with default configuration.
    pub fn new(transport: SharedTransport) -> Self {
        Self::with_config(transport, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(transport: SharedTransport, config: FrameConfig) -> Self {
        Self { transport, config }
    }

    /// Read the next frame.
    ///
    /// Returns `Ok(None)` when no byte arrived within `read_timeout`.
    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        let mut transport = lock_transport(&self.transport)?;

        let Some(first) = transport.read_byte(self.config.read_timeout)? else {
            return Ok(None);
        };
        let received_at = SystemTime::now();

        let max = self.config.max_frame_len.max(1);
        let mut buf = BytesMut::with_capacity(max.min(READ_CHUNK_SIZE));
        buf.put_u8(first);

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        while buf.len() < max {
            let mut available = transport.bytes_available()?;
            if available == 0 {
                std::thread::sleep(self.config.inter_byte_gap);
                available = transport.bytes_available()?;
                if available == 0 {
                    break;
                }
            }

            let want = available.min(max - buf.len()).min(chunk.len());
            let read = transport.read_available(&mut chunk[..want])?;
            if read == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..read]);
        }

        if buf.len() >= max && transport.bytes_available()? > 0 {
            debug!(
                max_frame_len = max,
                "frame reached maximum length, remainder starts a new frame"
            );
        }
        drop(transport);

        trace!(len = buf.len(), "reassembled frame");
        Ok(Frame::from_raw(buf.freeze(), received_at))
    }
}
