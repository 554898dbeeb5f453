//! Gap-delimited framing for half-duplex serial radios.
//!
//! The radio wire format has no magic, no length prefix and no checksum.
//! A frame is simply a run of bytes followed by a quiet gap on the line:
//! - the first byte of a data frame is the receiver's signal-strength reading
//! - frames containing `RSSI:` are signal-strength reports
//! - frames starting with `R?` are requests to report signal strength
//!
//! This layer reassembles those runs, classifies them, and encodes the
//! handful of command frames the radio understands.

pub mod codec;
pub mod command;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    classify, relay_frame, sequence_payload, Frame, FrameConfig, FrameKind, DEFAULT_MAX_FRAME_LEN,
};
pub use command::{
    bandwidth_command, unlock_command, BandwidthPreset, RadioVariant, ACK, RELAY_TAG,
    REQUEST_RSSI_COMMAND, RSSI_MARKER, RSSI_REQUEST_SENTINEL, SEQUENCE_TAG,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
