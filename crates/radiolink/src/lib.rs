//! Serial radio link adaptor.
//!
//! radiolink drives a half-duplex serial radio: it runs the radio's unlock and
//! bandwidth handshake, reassembles gap-delimited frames, schedules outbound
//! sends by role, and fans received signal-strength readings and messages out
//! to subscribers.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte transport over a serial device, plus an in-memory double
//! - [`frame`]: gap-delimited framing, classification and radio command frames
//! - [`link`]: the link adaptor facade (behind the `link` feature)

/// Re-export transport types.
pub mod transport {
    pub use radiolink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use radiolink_frame::*;
}

/// Re-export link types (requires `link` feature).
#[cfg(feature = "link")]
pub mod link {
    pub use radiolink_link::*;
}
