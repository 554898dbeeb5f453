//! In-process transport.
//!
//! `MemoryTransport` behaves like a radio whose inbound traffic is scripted in
//! bursts. Each burst pushed through [`MemoryHandle::push_inbound`] is exposed
//! as one contiguous run of bytes followed by a quiet gap, which is exactly how
//! a real device separates frames. Writes are recorded with their timestamps.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// One recorded write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFrame {
    pub bytes: Vec<u8>,
    pub at: Instant,
}

#[derive(Default)]
struct MemoryState {
    pending: VecDeque<Vec<u8>>,
    current: VecDeque<u8>,
    written: Vec<WrittenFrame>,
    write_attempts: usize,
    failing_reads: usize,
    failing_writes: usize,
    failing_write_at: Option<usize>,
}

struct Shared {
    state: Mutex<MemoryState>,
    changed: Condvar,
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state.lock().map_err(|_| TransportError::Poisoned)
    }
}

/// Scripted in-memory transport.
pub struct MemoryTransport {
    shared: Arc<Shared>,
}

/// Test-side handle for a [`MemoryTransport`].
#[derive(Clone)]
pub struct MemoryHandle {
    shared: Arc<Shared>,
}

impl MemoryTransport {
    /// Create a transport and the handle that drives it.
    pub fn new() -> (Self, MemoryHandle) {
        let shared = Arc::new(Shared {
            state: Mutex::new(MemoryState::default()),
            changed: Condvar::new(),
        });
        (
            Self {
                shared: Arc::clone(&shared),
            },
            MemoryHandle { shared },
        )
    }
}

impl Transport for MemoryTransport {
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        let mut state = self.shared.lock()?;

        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(TransportError::Io(std::io::Error::other(
                "injected read failure",
            )));
        }

        if state.current.is_empty() && state.pending.is_empty() {
            let (guard, _) = self
                .shared
                .changed
                .wait_timeout_while(state, timeout, |s| {
                    s.current.is_empty() && s.pending.is_empty()
                })
                .map_err(|_| TransportError::Poisoned)?;
            state = guard;
        }

        if state.current.is_empty() {
            match state.pending.pop_front() {
                Some(burst) => state.current = burst.into(),
                None => return Ok(None),
            }
        }

        Ok(state.current.pop_front())
    }

    fn bytes_available(&mut self) -> Result<usize> {
        Ok(self.shared.lock()?.current.len())
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut state = self.shared.lock()?;
        let n = state.current.len().min(buf.len());
        for slot in buf.iter_mut().take(n) {
            if let Some(byte) = state.current.pop_front() {
                *slot = byte;
            }
        }
        Ok(n)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let mut state = self.shared.lock()?;
        let attempt = state.write_attempts;
        state.write_attempts += 1;

        let injected = if state.failing_write_at == Some(attempt) {
            state.failing_write_at = None;
            true
        } else if state.failing_writes > 0 {
            state.failing_writes -= 1;
            true
        } else {
            false
        };
        if injected {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "injected write failure",
            )));
        }

        state.written.push(WrittenFrame {
            bytes: bytes.to_vec(),
            at: Instant::now(),
        });
        self.shared.changed.notify_all();
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

impl MemoryHandle {
    /// Queue one inbound burst. Empty bursts are ignored.
    pub fn push_inbound(&self, burst: &[u8]) {
        if burst.is_empty() {
            return;
        }
        if let Ok(mut state) = self.shared.lock() {
            state.pending.push_back(burst.to_vec());
            self.shared.changed.notify_all();
        }
    }

    /// Snapshot of every successful write so far.
    pub fn written(&self) -> Vec<WrittenFrame> {
        self.shared
            .lock()
            .map(|state| state.written.clone())
            .unwrap_or_default()
    }

    /// Snapshot of written byte sequences without timestamps.
    pub fn written_bytes(&self) -> Vec<Vec<u8>> {
        self.written().into_iter().map(|w| w.bytes).collect()
    }

    /// Block until at least `count` writes succeeded or `timeout` elapsed.
    pub fn wait_for_writes(&self, count: usize, timeout: Duration) -> Vec<WrittenFrame> {
        let Ok(state) = self.shared.lock() else {
            return Vec::new();
        };
        match self
            .shared
            .changed
            .wait_timeout_while(state, timeout, |s| s.written.len() < count)
        {
            Ok((state, _)) => state.written.clone(),
            Err(_) => Vec::new(),
        }
    }

    /// Make the next `count` reads fail with an I/O error.
    pub fn fail_next_reads(&self, count: usize) {
        if let Ok(mut state) = self.shared.lock() {
            state.failing_reads += count;
        }
    }

    /// Make the next `count` write attempts fail with an I/O error.
    pub fn fail_next_writes(&self, count: usize) {
        if let Ok(mut state) = self.shared.lock() {
            state.failing_writes += count;
        }
    }

    /// Make the write attempt with zero-based index `index` fail.
    pub fn fail_write_at(&self, index: usize) {
        if let Ok(mut state) = self.shared.lock() {
            state.failing_write_at = Some(index);
        }
    }

    /// Number of write attempts, failed ones included.
    pub fn write_attempts(&self) -> usize {
        self.shared
            .lock()
            .map(|state| state.write_attempts)
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport").finish_non_exhaustive()
    }
}
