use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use radiolink_frame::{Frame, FrameKind, FrameReader, FrameWriter};
use radiolink_transport::{SerialConfig, SerialTransport, SharedTransport, Transport};
use tracing::{debug, error, info, warn};

use crate::characteristic::{Characteristic, SubscriberId};
use crate::config::{LinkConfig, Role};
use crate::dispatcher::Dispatcher;
use crate::error::{LinkError, Result};
use crate::handshake::{self, Ready};
use crate::host::HostSink;
use crate::read_loop::{ReadLoop, FRAME_CHANNEL_DEPTH};
use crate::scheduler::{SchedulerHandle, SendReceipt, SendScheduler};
use crate::state::{LinkState, LinkStateMachine, StateAction};

const DISPATCH_POLL: Duration = Duration::from_millis(100);

/// Serial radio link exposed to a host as subscribable characteristics.
///
/// Lifecycle: [`configure`](Self::configure) runs the radio handshake and
/// starts the workers (state Starting), the first subscriber registration
/// moves the link to Running, and [`stop`](Self::stop) joins every worker
/// and reports Stopped.
pub struct LinkAdaptor {
    state: Arc<LinkStateMachine>,
    dispatcher: Arc<Dispatcher>,
    session: Mutex<Option<Session>>,
}

struct Session {
    role: Role,
    scheduler: SchedulerHandle,
    stop: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl Session {
    fn shutdown(self) {
        self.stop.store(true, Ordering::SeqCst);
        self.scheduler.stop();
        for worker in self.workers {
            let name = worker.thread().name().unwrap_or("worker").to_string();
            if worker.join().is_err() {
                error!(worker = %name, "worker panicked");
            }
        }
    }
}

impl LinkAdaptor {
    pub fn new(sink: Arc<dyn HostSink>) -> Self {
        Self {
            state: Arc::new(LinkStateMachine::new(Arc::clone(&sink))),
            dispatcher: Arc::new(Dispatcher::new(sink)),
            session: Mutex::new(None),
        }
    }

    /// Open the serial device and configure the link over it.
    pub fn configure_serial(&self, config: LinkConfig, serial: &SerialConfig) -> Result<Ready> {
        config.validate()?;
        let transport = SerialTransport::open(serial).map_err(|source| {
            error!(port = %serial.port, error = %source, "failed to open serial port");
            LinkError::TransportOpenFailed(source)
        })?;
        self.configure(config, Box::new(transport))
    }

    /// Run the radio handshake over `transport` and start the workers.
    ///
    /// A running link is stopped first. On handshake failure the state stays
    /// Stopped and nothing is started.
    pub fn configure(&self, config: LinkConfig, transport: Box<dyn Transport>) -> Result<Ready> {
        config.validate()?;

        let mut session = self.lock_session();
        if let Some(previous) = session.take() {
            info!("reconfiguring, stopping previous link");
            previous.shutdown();
            self.state.set_state(StateAction::Stopped);
        }

        let transport: SharedTransport = Arc::new(Mutex::new(transport));
        let writer = FrameWriter::new(Arc::clone(&transport));
        let ready = handshake::initialize(&writer, &config)?;

        // Workers may write as soon as they exist.
        self.state.set_state(StateAction::Starting);
        match self.start_workers(&config, transport, writer) {
            Ok(started) => *session = Some(started),
            Err(err) => {
                self.state.set_state(StateAction::Stopped);
                return Err(err);
            }
        }
        if self.dispatcher.has_subscribers() {
            self.state
                .set_state_from(LinkState::Starting, StateAction::Running);
        }

        info!(role = %config.role, "link configured");
        Ok(ready)
    }

    fn start_workers(
        &self,
        config: &LinkConfig,
        transport: SharedTransport,
        writer: FrameWriter,
    ) -> Result<Session> {
        let stop = Arc::new(AtomicBool::new(false));
        let (scheduler, scheduler_join) = SendScheduler::spawn(
            writer,
            Arc::clone(&self.state),
            Arc::clone(&stop),
            config.role,
            &config.timing,
        )?;

        let mut session = Session {
            role: config.role,
            scheduler,
            stop,
            workers: vec![scheduler_join],
        };

        let (frames_tx, frames_rx) = mpsc::sync_channel(FRAME_CHANNEL_DEPTH);
        let dispatch = DispatchWorker {
            frames: frames_rx,
            dispatcher: Arc::clone(&self.dispatcher),
            scheduler: session.scheduler.clone(),
            role: session.role,
            stop: Arc::clone(&session.stop),
        };
        match dispatch.spawn() {
            Ok(join) => session.workers.push(join),
            Err(err) => {
                session.shutdown();
                return Err(err);
            }
        }

        let reader = FrameReader::with_config(transport, config.frame_config());
        let read_loop = ReadLoop::new(
            reader,
            frames_tx,
            Arc::clone(&self.state),
            Arc::clone(&session.stop),
            config.timing.idle_delay,
        );
        match read_loop.spawn() {
            Ok(join) => session.workers.push(join),
            Err(err) => {
                session.shutdown();
                return Err(err);
            }
        }

        Ok(session)
    }

    /// Replace the characteristics `id` subscribes to.
    ///
    /// Returns whether `id` is registered for anything afterwards. The first
    /// such registration on a Starting link moves it to Running.
    pub fn register_subscriber(
        &self,
        id: impl Into<SubscriberId>,
        characteristics: &[Characteristic],
    ) -> bool {
        let id = id.into();
        let registered = self.dispatcher.update_subscriptions(&id, characteristics);
        if registered {
            self.state
                .set_state_from(LinkState::Starting, StateAction::Running);
        }
        registered
    }

    /// Queue `payload` for transmission on behalf of `id`.
    pub fn submit_outbound_payload(
        &self,
        id: &SubscriberId,
        payload: Option<Bytes>,
    ) -> Result<SendReceipt> {
        let bytes = match payload {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => {
                warn!(subscriber = %id, "outbound request without payload");
                return Err(LinkError::MissingPayload(id.clone()));
            }
        };

        let session = self.lock_session();
        let Some(session) = session.as_ref() else {
            return Err(LinkError::NotConfigured);
        };
        debug!(subscriber = %id, len = bytes.len(), "outbound payload queued");
        Ok(session.scheduler.send_explicit(bytes))
    }

    /// Current link state.
    pub fn state(&self) -> LinkState {
        self.state.state()
    }

    /// Characteristics this adaptor offers.
    pub fn services(&self) -> &'static [Characteristic] {
        &Characteristic::ALL
    }

    /// Whether workers are running.
    pub fn is_configured(&self) -> bool {
        self.lock_session().is_some()
    }

    /// Stop every worker and report Stopped. Idempotent.
    pub fn stop(&self) {
        let session = self.lock_session().take();
        if let Some(session) = session {
            info!("stopping link");
            session.shutdown();
        }
        if self.state.state() != LinkState::Stopped {
            self.state.set_state(StateAction::Stopped);
        }
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl Drop for LinkAdaptor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Turns received frames into deliveries and reactive sends.
struct DispatchWorker {
    frames: Receiver<Frame>,
    dispatcher: Arc<Dispatcher>,
    scheduler: SchedulerHandle,
    role: Role,
    stop: Arc<AtomicBool>,
}

impl DispatchWorker {
    fn spawn(self) -> Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("radiolink-dispatch".to_string())
            .spawn(move || self.run())
            .map_err(|source| LinkError::WorkerSpawn {
                name: "dispatch",
                source,
            })
    }

    fn run(self) {
        while !self.stop.load(Ordering::SeqCst) {
            match self.frames.recv_timeout(DISPATCH_POLL) {
                Ok(frame) => self.handle(frame),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!("dispatch worker stopped");
    }

    fn handle(&self, frame: Frame) {
        match frame.kind {
            FrameKind::Data => {
                if let Some(rssi) = frame.signal_strength() {
                    self.dispatcher.deliver(
                        Characteristic::Rssi,
                        &Bytes::copy_from_slice(&[rssi]),
                        frame.received_at,
                    );
                }

                let message = frame.message();
                if !message.is_empty() {
                    self.dispatcher
                        .deliver(Characteristic::Message, &message, frame.received_at);
                }
                // Every data frame gets exactly one reactive send.
                if self.role == Role::Slave {
                    self.scheduler.schedule_relay(&message);
                }
            }
            FrameKind::SignalReport => match frame.signal_strength() {
                Some(rssi) => {
                    self.dispatcher.deliver(
                        Characteristic::Rssi,
                        &Bytes::copy_from_slice(&[rssi]),
                        frame.received_at,
                    );
                }
                None => debug!(
                    report = %String::from_utf8_lossy(&frame.payload),
                    "signal report without a reading"
                ),
            },
            FrameKind::RssiRequest => {
                if self.role == Role::Slave {
                    debug!("ignoring signal-strength request in slave role");
                } else {
                    self.scheduler.request_rssi_exchange();
                }
            }
        }
    }
}
