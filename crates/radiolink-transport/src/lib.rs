//! Half-duplex byte transport abstraction for serial radio links.
//!
//! Provides a small contract over the physical device:
//! - a blocking single-byte read bounded by a timeout
//! - a non-blocking poll for bytes that are already buffered
//! - a blocking write of a complete byte sequence
//!
//! This is the lowest layer of radiolink. Everything else builds on top of
//! the [`Transport`] trait and the mutex-guarded [`SharedTransport`] handle.

pub mod error;
pub mod memory;
pub mod serial;
pub mod traits;

pub use error::{Result, TransportError};
pub use memory::{MemoryHandle, MemoryTransport, WrittenFrame};
pub use serial::{SerialConfig, SerialTransport};
pub use traits::{lock_transport, shared, SharedTransport, Transport};
