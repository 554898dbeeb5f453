use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use radiolink_frame::{Frame, FrameReader};
use tracing::{debug, info, warn};

use crate::error::{LinkError, Result};
use crate::state::{LinkState, LinkStateMachine, StateAction};

/// Depth of the channel between the read loop and the dispatch worker.
pub const FRAME_CHANNEL_DEPTH: usize = 32;

/// Pulls frames off the transport until stopped.
///
/// Timeouts are normal and only cause an idle pause. Read errors mark the link
/// as unhealthy but never end the loop; the next frame clears the error.
pub struct ReadLoop {
    reader: FrameReader,
    frames: SyncSender<Frame>,
    state: Arc<LinkStateMachine>,
    stop: Arc<AtomicBool>,
    idle_delay: Duration,
}

impl ReadLoop {
    pub fn new(
        reader: FrameReader,
        frames: SyncSender<Frame>,
        state: Arc<LinkStateMachine>,
        stop: Arc<AtomicBool>,
        idle_delay: Duration,
    ) -> Self {
        Self {
            reader,
            frames,
            state,
            stop,
            idle_delay,
        }
    }

    /// Run on a dedicated thread.
    pub fn spawn(self) -> Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("radiolink-reader".to_string())
            .spawn(move || self.run())
            .map_err(|source| LinkError::WorkerSpawn {
                name: "read loop",
                source,
            })
    }

    /// Loop until the stop flag is set or the frame channel closes.
    pub fn run(mut self) {
        info!("read loop started");

        while !self.stop.load(Ordering::SeqCst) {
            match self.reader.read_frame() {
                Ok(Some(frame)) => {
                    if self.state.state() == LinkState::Error {
                        self.state.set_state(StateAction::ClearError);
                    }
                    debug!(kind = ?frame.kind, len = frame.payload.len(), "received frame");
                    if self.frames.send(frame).is_err() {
                        debug!("frame channel closed");
                        break;
                    }
                }
                Ok(None) => thread::sleep(self.idle_delay),
                Err(source) => {
                    let err = LinkError::TransientReadFailure(source);
                    warn!(error = %err, "read failed");
                    self.state.set_state(StateAction::Error);
                    thread::sleep(self.idle_delay);
                }
            }
        }

        info!("read loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Instant;

    use radiolink_frame::{FrameConfig, FrameKind};
    use radiolink_transport::{shared, MemoryHandle, MemoryTransport};

    use super::*;
    use crate::test_support::RecordingSink;

    const WAIT: Duration = Duration::from_secs(2);

    struct Harness {
        memory: MemoryHandle,
        frames: mpsc::Receiver<Frame>,
        state: Arc<LinkStateMachine>,
        sink: Arc<RecordingSink>,
        stop: Arc<AtomicBool>,
        join: Option<JoinHandle<()>>,
    }

    fn start() -> Harness {
        let (transport, memory) = MemoryTransport::new();
        let config = FrameConfig {
            read_timeout: Duration::from_millis(20),
            ..FrameConfig::default()
        };
        let reader = FrameReader::with_config(shared(transport), config);
        let (tx, frames) = mpsc::sync_channel(FRAME_CHANNEL_DEPTH);
        let sink = Arc::new(RecordingSink::default());
        let state = Arc::new(LinkStateMachine::new(sink.clone()));
        state.set_state(StateAction::Running);
        let stop = Arc::new(AtomicBool::new(false));

        let join = ReadLoop::new(
            reader,
            tx,
            state.clone(),
            stop.clone(),
            Duration::from_millis(10),
        )
        .spawn()
        .unwrap();

        Harness {
            memory,
            frames,
            state,
            sink,
            stop,
            join: Some(join),
        }
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            self.stop.store(true, Ordering::SeqCst);
            if let Some(join) = self.join.take() {
                join.join().unwrap();
            }
        }
    }

    #[test]
    fn forwards_frames_in_arrival_order() {
        let h = start();
        h.memory.push_inbound(b"\x40hello");
        h.memory.push_inbound(b"RSSI:77");

        let first = h.frames.recv_timeout(WAIT).unwrap();
        let second = h.frames.recv_timeout(WAIT).unwrap();
        assert_eq!(first.kind, FrameKind::Data);
        assert_eq!(first.message(), b"hello"[..]);
        assert_eq!(second.kind, FrameKind::SignalReport);
        assert_eq!(second.signal_strength(), Some(77));
    }

    #[test]
    fn read_error_marks_error_and_next_frame_clears_it() {
        let h = start();
        h.memory.fail_next_reads(1);

        let deadline = Instant::now() + WAIT;
        while h.state.state() != LinkState::Error && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(h.state.state(), LinkState::Error);

        h.memory.push_inbound(b"\x10x");
        h.frames.recv_timeout(WAIT).unwrap();
        assert_eq!(h.state.state(), LinkState::Running);
        assert_eq!(
            h.sink.states(),
            vec![LinkState::Running, LinkState::Error, LinkState::Running]
        );
    }

    #[test]
    fn stop_is_observed_within_polling_interval() {
        let mut h = start();
        let asked = Instant::now();
        h.stop.store(true, Ordering::SeqCst);
        if let Some(join) = h.join.take() {
            join.join().unwrap();
        }
        assert!(asked.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn closed_channel_ends_the_loop() {
        let mut h = start();
        // Replacing the receiver drops the one the loop feeds.
        h.frames = mpsc::sync_channel(1).1;
        h.memory.push_inbound(b"\x01a");
        if let Some(join) = h.join.take() {
            join.join().unwrap();
        }
    }
}
