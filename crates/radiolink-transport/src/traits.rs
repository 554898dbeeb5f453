use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{Result, TransportError};

/// A half-duplex byte transport.
///
/// Implementations wrap the physical device handle. The contract is
/// intentionally small: the framing layer decides where frames begin and end,
/// the transport only moves bytes.
pub trait Transport: Send {
    /// Read one byte, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` when nothing arrived before the timeout expired.
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>>;

    /// Number of bytes buffered and readable without blocking.
    fn bytes_available(&mut self) -> Result<usize>;

    /// Read already-buffered bytes into `buf` without blocking.
    ///
    /// Returns the number of bytes copied, which may be zero.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write the complete byte sequence and flush it to the device.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Human-readable device name for logging.
    fn name(&self) -> &str;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        (**self).read_byte(timeout)
    }

    fn bytes_available(&mut self) -> Result<usize> {
        (**self).bytes_available()
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read_available(buf)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_all(bytes)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// The single shared handle to the device.
///
/// Every read accumulation and every write holds this mutex, which is what
/// keeps the half-duplex byte stream from interleaving.
pub type SharedTransport = Arc<Mutex<Box<dyn Transport>>>;

/// Wrap a transport in a [`SharedTransport`].
pub fn shared(transport: impl Transport + 'static) -> SharedTransport {
    Arc::new(Mutex::new(Box::new(transport)))
}

/// Lock the shared transport, mapping poisoning to [`TransportError::Poisoned`].
pub fn lock_transport(
    transport: &SharedTransport,
) -> Result<MutexGuard<'_, Box<dyn Transport>>> {
    transport.lock().map_err(|_| TransportError::Poisoned)
}
