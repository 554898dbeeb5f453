use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{DataBits, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Serial line settings for the radio.
///
/// Line discipline is fixed at 8N1; only the device path and baud rate vary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyUSB0`.
    pub port: String,
    /// Line speed in baud.
    pub baud_rate: u32,
    /// Initial read timeout applied when the port is opened.
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 19_200,
            timeout: Duration::from_millis(500),
        }
    }
}

/// Serial device transport backed by the `serialport` crate.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    name: String,
    current_timeout: Duration,
}

impl SerialTransport {
    /// Open the device described by `config`.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(config.timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: config.port.clone(),
                source,
            })?;

        info!(
            port = %config.port,
            baud_rate = config.baud_rate,
            "opened serial transport"
        );

        Ok(Self {
            port,
            name: config.port.clone(),
            current_timeout: config.timeout,
        })
    }

    fn apply_timeout(&mut self, timeout: Duration) -> Result<()> {
        if timeout == self.current_timeout {
            return Ok(());
        }
        self.port
            .set_timeout(timeout)
            .map_err(|source| TransportError::Configure {
                port: self.name.clone(),
                source,
            })?;
        self.current_timeout = timeout;
        Ok(())
    }
}

impl Transport for SerialTransport {
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        self.apply_timeout(timeout)?;

        let mut byte = [0u8; 1];
        loop {
            match self.port.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::TimedOut => return Ok(None),
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn bytes_available(&mut self) -> Result<usize> {
        let pending = self
            .port
            .bytes_to_read()
            .map_err(|err| TransportError::Io(err.into()))?;
        Ok(pending as usize)
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        let pending = self.bytes_available()?;
        if pending == 0 || buf.is_empty() {
            return Ok(0);
        }

        let want = pending.min(buf.len());
        loop {
            match self.port.read(&mut buf[..want]) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::TimedOut => return Ok(0),
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.port.write(&bytes[offset..]) {
                Ok(0) => return Err(TransportError::Shutdown),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        self.port.flush()?;
        debug!(port = %self.name, len = bytes.len(), "wrote to serial transport");
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port", &self.name)
            .field("timeout", &self.current_timeout)
            .finish()
    }
}
