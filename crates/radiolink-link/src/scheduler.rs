//! The single write path of a running link.
//!
//! Every runtime frame goes through one worker thread that owns a due-time
//! queue. Requests are ordered by `(due, sequence)`, so two frames enqueued
//! together keep their relative order and are written as separate frames.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::Bytes;
use radiolink_frame::{relay_frame, sequence_payload, FrameWriter, ACK, REQUEST_RSSI_COMMAND};
use tracing::{debug, info, trace, warn};

use crate::config::{LinkTiming, Role};
use crate::error::{LinkError, Result};
use crate::state::{LinkState, LinkStateMachine, StateAction};

const IDLE_WAIT: Duration = Duration::from_millis(500);

/// Wrapping counter behind synthesized payloads.
///
/// Starts at 0 and is advanced before each use, so the first payload is `SQ1`
/// and the 256th is `SQ0`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OutboundCounter(u8);

impl OutboundCounter {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Advance the counter and render the payload for the new value.
    pub fn next_payload(&mut self) -> Bytes {
        self.0 = self.0.wrapping_add(1);
        sequence_payload(self.0)
    }
}

/// How a queued write ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Written,
    /// Dropped unwritten because the link was stopped.
    Skipped,
}

/// Outcome of one explicitly submitted payload.
#[derive(Debug)]
pub struct SendReceipt {
    rx: Receiver<Result<SendOutcome>>,
}

impl SendReceipt {
    /// Wait up to `timeout` for the write.
    ///
    /// `None` means the write has not happened yet.
    pub fn wait(&self, timeout: Duration) -> Option<Result<SendOutcome>> {
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Ok(SendOutcome::Skipped)),
        }
    }
}

enum Payload {
    /// Rendered from the counter at write time.
    Sequence,
    Frame(Bytes),
}

struct Request {
    due: Instant,
    payload: Payload,
    receipt: Option<SyncSender<Result<SendOutcome>>>,
}

impl Request {
    fn at(due: Instant, payload: Payload) -> Self {
        Self {
            due,
            payload,
            receipt: None,
        }
    }
}

enum Command {
    Enqueue(Vec<Request>),
    Stop,
}

struct Pending {
    due: Instant,
    seq: u64,
    payload: Payload,
    receipt: Option<SyncSender<Result<SendOutcome>>>,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    // Reversed: BinaryHeap is a max-heap and the earliest entry must pop first.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Cloneable front end of the scheduler worker.
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: Sender<Command>,
    turnaround_delay: Duration,
    rssi_ack_delay: Duration,
}

impl SchedulerHandle {
    /// Queue a send due now. `None` synthesizes the next sequence payload.
    pub fn schedule_send(&self, explicit: Option<Bytes>) {
        let payload = match explicit {
            Some(bytes) => Payload::Frame(bytes),
            None => Payload::Sequence,
        };
        self.enqueue(vec![Request::at(Instant::now(), payload)]);
    }

    /// Queue `bytes` verbatim, due now, and return a receipt for the write.
    pub fn send_explicit(&self, bytes: Bytes) -> SendReceipt {
        let (tx, rx) = mpsc::sync_channel(1);
        self.enqueue(vec![Request {
            due: Instant::now(),
            payload: Payload::Frame(bytes),
            receipt: Some(tx),
        }]);
        SendReceipt { rx }
    }

    /// Echo `message` back after the half-duplex turnaround.
    pub fn schedule_relay(&self, message: &[u8]) {
        let Some(due) = Instant::now().checked_add(self.turnaround_delay) else {
            warn!(delay = ?self.turnaround_delay, "turnaround out of range, dropping relay");
            return;
        };
        self.enqueue(vec![Request::at(
            due,
            Payload::Frame(relay_frame(message)),
        )]);
    }

    /// Ask the radio for the strength of the last packet, then acknowledge.
    pub fn request_rssi_exchange(&self) {
        let now = Instant::now();
        let Some(ack_due) = now.checked_add(self.rssi_ack_delay) else {
            warn!(delay = ?self.rssi_ack_delay, "ack delay out of range, dropping exchange");
            return;
        };
        self.enqueue(vec![
            Request::at(now, Payload::Frame(Bytes::from_static(REQUEST_RSSI_COMMAND))),
            Request::at(ack_due, Payload::Frame(Bytes::from_static(ACK))),
        ]);
    }

    /// Wake the worker so it notices the stop flag.
    pub fn stop(&self) {
        let _ = self.tx.send(Command::Stop);
    }

    fn enqueue(&self, requests: Vec<Request>) {
        if self.tx.send(Command::Enqueue(requests)).is_err() {
            debug!("scheduler is gone, dropping request");
        }
    }
}

/// Spawns the scheduler worker.
pub struct SendScheduler;

impl SendScheduler {
    /// Start the worker thread.
    ///
    /// A MASTER gets a sequence send every `master_interval`, the first one a
    /// full interval after start.
    pub fn spawn(
        writer: FrameWriter,
        state: Arc<LinkStateMachine>,
        stop: Arc<AtomicBool>,
        role: Role,
        timing: &LinkTiming,
    ) -> Result<(SchedulerHandle, JoinHandle<()>)> {
        let interval = timing.master_interval;
        let next_tick = match role {
            Role::Master => Some(Instant::now().checked_add(interval).ok_or_else(|| {
                LinkError::InvalidConfig(format!("master_interval {interval:?} is out of range"))
            })?),
            Role::Slave => None,
        };

        let (tx, rx) = mpsc::channel();
        let worker = Worker {
            writer,
            state,
            stop,
            rx,
            queue: BinaryHeap::new(),
            next_seq: 0,
            counter: OutboundCounter::new(),
            next_tick,
            interval,
        };

        let join = thread::Builder::new()
            .name("radiolink-scheduler".to_string())
            .spawn(move || worker.run())
            .map_err(|source| LinkError::WorkerSpawn {
                name: "scheduler",
                source,
            })?;

        let handle = SchedulerHandle {
            tx,
            turnaround_delay: timing.turnaround_delay,
            rssi_ack_delay: timing.rssi_ack_delay,
        };
        Ok((handle, join))
    }
}

struct Worker {
    writer: FrameWriter,
    state: Arc<LinkStateMachine>,
    stop: Arc<AtomicBool>,
    rx: Receiver<Command>,
    queue: BinaryHeap<Pending>,
    next_seq: u64,
    counter: OutboundCounter,
    next_tick: Option<Instant>,
    interval: Duration,
}

impl Worker {
    fn run(mut self) {
        info!(periodic = self.next_tick.is_some(), "send scheduler started");

        loop {
            if self.stopped() {
                break;
            }

            self.enqueue_tick(Instant::now());
            self.fire_due();

            let wait = self
                .next_wakeup()
                .map(|at| at.saturating_duration_since(Instant::now()))
                .unwrap_or(IDLE_WAIT);

            match self.rx.recv_timeout(wait) {
                Ok(Command::Enqueue(requests)) => self.push(requests),
                Ok(Command::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }

        if !self.queue.is_empty() {
            debug!(dropped = self.queue.len(), "discarding queued writes");
        }
        info!("send scheduler stopped");
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn push(&mut self, requests: Vec<Request>) {
        for request in requests {
            let seq = self.next_seq;
            self.next_seq += 1;
            self.queue.push(Pending {
                due: request.due,
                seq,
                payload: request.payload,
                receipt: request.receipt,
            });
        }
    }

    fn enqueue_tick(&mut self, now: Instant) {
        let Some(tick) = self.next_tick else {
            return;
        };
        if now < tick {
            return;
        }

        self.push(vec![Request::at(tick, Payload::Sequence)]);

        let mut next = tick.checked_add(self.interval);
        if next.is_some_and(|next| next <= now) {
            debug!(
                behind_ms = now.duration_since(tick).as_millis() as u64,
                "periodic send fell behind, re-basing"
            );
            next = now.checked_add(self.interval);
        }
        if next.is_none() {
            warn!(interval = ?self.interval, "interval out of range, periodic sends stop");
        }
        self.next_tick = next;
    }

    fn next_wakeup(&self) -> Option<Instant> {
        let queued = self.queue.peek().map(|pending| pending.due);
        match (queued, self.next_tick) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn fire_due(&mut self) {
        while let Some(top) = self.queue.peek() {
            if top.due > Instant::now() || self.stopped() {
                break;
            }
            if let Some(pending) = self.queue.pop() {
                self.write(pending);
            }
        }
    }

    fn write(&mut self, pending: Pending) {
        let state = self.state.state();
        if !state.allows_sends() {
            debug!(seq = pending.seq, %state, "link stopped, skipping write");
            complete(pending.receipt, Ok(SendOutcome::Skipped));
            return;
        }

        let bytes = match pending.payload {
            Payload::Sequence => self.counter.next_payload(),
            Payload::Frame(bytes) => bytes,
        };
        trace!(seq = pending.seq, len = bytes.len(), "writing queued frame");

        match self.writer.send(&bytes) {
            Ok(()) => {
                if self.state.state() == LinkState::Error {
                    self.state.set_state(StateAction::ClearError);
                }
                complete(pending.receipt, Ok(SendOutcome::Written));
            }
            Err(source) => {
                let err = LinkError::TransientWriteFailure(source);
                warn!(error = %err, "write failed");
                self.state.set_state(StateAction::Error);
                complete(pending.receipt, Err(err));
            }
        }
    }
}

fn complete(receipt: Option<SyncSender<Result<SendOutcome>>>, outcome: Result<SendOutcome>) {
    if let Some(tx) = receipt {
        let _ = tx.try_send(outcome);
    }
}
