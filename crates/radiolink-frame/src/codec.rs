use std::time::{Duration, SystemTime};

use bytes::{BufMut, Bytes, BytesMut};

use crate::command::{RELAY_TAG, RSSI_MARKER, RSSI_REQUEST_SENTINEL, SEQUENCE_TAG};

/// Default maximum frame length. Radio packets never exceed this.
pub const DEFAULT_MAX_FRAME_LEN: usize = 255;

/// Classification of a reassembled frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Ordinary data: signal-strength byte followed by message bytes.
    Data,
    /// A signal-strength report produced by the radio itself.
    SignalReport,
    /// The peer asks us to report the last received signal strength.
    RssiRequest,
}

/// A reassembled, classified frame.
///
/// Data frame layout:
/// ```text
/// ┌────────────┬──────────────────────────┐
/// │ RSSI (1B)  │ Message (0..n bytes)     │
/// └────────────┴──────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    /// Raw frame bytes. Empty for [`FrameKind::RssiRequest`].
    pub payload: Bytes,
    /// Time the first byte arrived.
    pub received_at: SystemTime,
}

impl Frame {
    /// Classify raw bytes into a frame. Returns `None` for an empty run.
    pub fn from_raw(raw: Bytes, received_at: SystemTime) -> Option<Self> {
        let kind = classify(&raw)?;
        let payload = match kind {
            FrameKind::RssiRequest => Bytes::new(),
            FrameKind::Data | FrameKind::SignalReport => raw,
        };
        Some(Self {
            kind,
            payload,
            received_at,
        })
    }

    /// Signal-strength reading carried by this frame, if any.
    pub fn signal_strength(&self) -> Option<u8> {
        match self.kind {
            FrameKind::Data => self.payload.first().copied(),
            FrameKind::SignalReport => parse_report(&self.payload),
            FrameKind::RssiRequest => None,
        }
    }

    /// Message bytes of a data frame. Empty for every other kind.
    pub fn message(&self) -> Bytes {
        match self.kind {
            FrameKind::Data if self.payload.len() > 1 => self.payload.slice(1..),
            _ => Bytes::new(),
        }
    }
}

/// Classify a byte run.
///
/// First matching rule wins, in this order:
/// 1. contains [`RSSI_MARKER`] → [`FrameKind::SignalReport`]
/// 2. starts with [`RSSI_REQUEST_SENTINEL`] → [`FrameKind::RssiRequest`]
/// 3. anything else non-empty → [`FrameKind::Data`]
pub fn classify(raw: &[u8]) -> Option<FrameKind> {
    if raw.is_empty() {
        return None;
    }
    if find(raw, RSSI_MARKER).is_some() {
        return Some(FrameKind::SignalReport);
    }
    if raw.starts_with(&RSSI_REQUEST_SENTINEL) {
        return Some(FrameKind::RssiRequest);
    }
    Some(FrameKind::Data)
}

/// Relay frame for data echoed back by a SLAVE.
pub fn relay_frame(message: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(RELAY_TAG.len() + message.len());
    buf.put_slice(RELAY_TAG);
    buf.put_slice(message);
    buf.freeze()
}

/// Synthesized payload for an outbound counter value: `SQ` + lowercase hex.
pub fn sequence_payload(counter: u8) -> Bytes {
    let mut buf = BytesMut::with_capacity(SEQUENCE_TAG.len() + 2);
    buf.put_slice(SEQUENCE_TAG);
    buf.put_slice(format!("{counter:x}").as_bytes());
    buf.freeze()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn parse_report(raw: &[u8]) -> Option<u8> {
    let start = find(raw, RSSI_MARKER)? + RSSI_MARKER.len();
    let digits: Vec<u8> = raw[start..]
        .iter()
        .copied()
        .skip_while(|b| *b == b' ')
        .take_while(u8::is_ascii_digit)
        .collect();
    std::str::from_utf8(&digits).ok()?.parse::<u8>().ok()
}

/// Configuration for frame reassembly.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum frame length in bytes. Default: 255.
    pub max_frame_len: usize,
    /// How long to wait for the first byte of a frame.
    pub read_timeout: Duration,
    /// Quiet time on the line that terminates a frame.
    pub inter_byte_gap: Duration,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            read_timeout: Duration::from_millis(100),
            inter_byte_gap: Duration::from_millis(5),
        }
    }
}
