use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use bytes::Bytes;
use radiolink_link::{
    Characteristic, HandshakeStep, HostSink, LinkAdaptor, LinkConfig, LinkError, LinkState,
    LinkTiming, Role, SendOutcome, SubscriberId,
};
use radiolink_transport::{MemoryHandle, MemoryTransport};

const HANDSHAKE_WRITES: usize = 4;
const WAIT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct RecordingSink {
    states: Mutex<Vec<LinkState>>,
    deliveries: Mutex<Vec<(Characteristic, Bytes, SubscriberId)>>,
}

impl RecordingSink {
    fn states(&self) -> Vec<LinkState> {
        self.states.lock().unwrap().clone()
    }

    fn deliveries(&self) -> Vec<(Characteristic, Bytes, SubscriberId)> {
        self.deliveries.lock().unwrap().clone()
    }
}

impl HostSink for RecordingSink {
    fn on_state_changed(&self, state: LinkState) {
        self.states.lock().unwrap().push(state);
    }

    fn on_characteristic_data(
        &self,
        characteristic: Characteristic,
        payload: &Bytes,
        _timestamp: SystemTime,
        subscriber: &SubscriberId,
    ) {
        self.deliveries
            .lock()
            .unwrap()
            .push((characteristic, payload.clone(), subscriber.clone()));
    }
}

fn timing(master_interval: Duration) -> LinkTiming {
    LinkTiming {
        settle_delay: Duration::from_millis(5),
        master_interval,
        turnaround_delay: Duration::from_millis(40),
        rssi_ack_delay: Duration::from_millis(60),
        read_timeout: Duration::from_millis(20),
        idle_delay: Duration::from_millis(10),
        ..LinkTiming::default()
    }
}

fn start(role: Role, master_interval: Duration) -> (LinkAdaptor, MemoryHandle, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let adaptor = LinkAdaptor::new(sink.clone());
    let (transport, memory) = MemoryTransport::new();
    let config = LinkConfig {
        role,
        timing: timing(master_interval),
        ..LinkConfig::default()
    };
    adaptor
        .configure(config, Box::new(transport))
        .expect("configure should succeed");
    (adaptor, memory, sink)
}

fn runtime_writes(memory: &MemoryHandle) -> Vec<Vec<u8>> {
    memory
        .written_bytes()
        .into_iter()
        .skip(HANDSHAKE_WRITES)
        .collect()
}

fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn master_sends_sequence_payloads_on_its_interval() {
    let (adaptor, memory, _sink) = start(Role::Master, Duration::from_millis(50));
    adaptor.register_subscriber("app-1", &[Characteristic::Rssi]);

    let written = memory.wait_for_writes(HANDSHAKE_WRITES + 3, WAIT);
    let runtime: Vec<_> = written[HANDSHAKE_WRITES..].to_vec();
    assert_eq!(runtime[0].bytes, b"SQ1".to_vec());
    assert_eq!(runtime[1].bytes, b"SQ2".to_vec());
    assert_eq!(runtime[2].bytes, b"SQ3".to_vec());

    let handshake_done = written[HANDSHAKE_WRITES - 1].at;
    assert!(runtime[0].at.duration_since(handshake_done) >= Duration::from_millis(40));
}

#[test]
fn slave_relays_received_messages_after_turnaround() {
    let (adaptor, memory, sink) = start(Role::Slave, Duration::from_millis(50));
    adaptor.register_subscriber("app-1", &Characteristic::ALL);

    let pushed = Instant::now();
    memory.push_inbound(b"\x30ping");

    let written = memory.wait_for_writes(HANDSHAKE_WRITES + 1, WAIT);
    assert_eq!(written[HANDSHAKE_WRITES].bytes, b"RLping".to_vec());
    assert!(written[HANDSHAKE_WRITES].at.duration_since(pushed) >= Duration::from_millis(40));

    assert!(wait_until(|| sink.deliveries().len() == 2));
    let deliveries = sink.deliveries();
    assert_eq!(deliveries[0].0, Characteristic::Rssi);
    assert_eq!(deliveries[0].1, Bytes::from_static(&[0x30]));
    assert_eq!(deliveries[1].0, Characteristic::Message);
    assert_eq!(deliveries[1].1, Bytes::from_static(b"ping"));

    // A slave never sends unprompted.
    thread::sleep(Duration::from_millis(150));
    assert_eq!(runtime_writes(&memory), vec![b"RLping".to_vec()]);
}

#[test]
fn rssi_request_writes_command_then_delayed_ack() {
    let (_adaptor, memory, _sink) = start(Role::Master, Duration::from_secs(60));

    memory.push_inbound(b"R?");

    let written = memory.wait_for_writes(HANDSHAKE_WRITES + 2, WAIT);
    let request = &written[HANDSHAKE_WRITES];
    let ack = &written[HANDSHAKE_WRITES + 1];
    assert_eq!(request.bytes, b"ER_CMD#T8".to_vec());
    assert_eq!(ack.bytes, b"ACK".to_vec());
    assert!(ack.at.duration_since(request.at) >= Duration::from_millis(30));
}

#[test]
fn handshake_failure_at_bandwidth_never_reports_running() {
    let sink = Arc::new(RecordingSink::default());
    let adaptor = LinkAdaptor::new(sink.clone());
    let (transport, memory) = MemoryTransport::new();
    memory.fail_write_at(2);

    let config = LinkConfig {
        timing: timing(Duration::from_millis(20)),
        ..LinkConfig::default()
    };
    let err = adaptor
        .configure(config, Box::new(transport))
        .expect_err("handshake should fail");
    assert!(matches!(
        err,
        LinkError::HandshakeFailed {
            step: HandshakeStep::Bandwidth,
            ..
        }
    ));

    adaptor.register_subscriber("app-1", &Characteristic::ALL);
    thread::sleep(Duration::from_millis(100));

    assert_eq!(adaptor.state(), LinkState::Stopped);
    assert!(!sink.states().contains(&LinkState::Running));
    assert_eq!(memory.write_attempts(), 3);
}

#[test]
fn sequence_counter_wraps_after_256_sends() {
    let (_adaptor, memory, _sink) = start(Role::Master, Duration::from_millis(1));

    let written = memory.wait_for_writes(HANDSHAKE_WRITES + 257, WAIT);
    let runtime: Vec<_> = written[HANDSHAKE_WRITES..].iter().map(|w| &w.bytes).collect();
    assert_eq!(runtime[0], b"SQ1");
    assert_eq!(runtime[9], b"SQa");
    assert_eq!(runtime[254], b"SQff");
    assert_eq!(runtime[255], b"SQ0");
    assert_eq!(runtime[256], b"SQ1");
}

#[test]
fn stop_halts_every_send() {
    let (adaptor, memory, sink) = start(Role::Master, Duration::from_millis(20));
    memory.wait_for_writes(HANDSHAKE_WRITES + 2, WAIT);

    adaptor.stop();
    let count = memory.write_attempts();
    thread::sleep(Duration::from_millis(150));

    assert_eq!(memory.write_attempts(), count);
    assert_eq!(adaptor.state(), LinkState::Stopped);
    assert_eq!(sink.states().last(), Some(&LinkState::Stopped));
}

#[test]
fn read_failure_flips_running_to_error_and_back() {
    let (adaptor, memory, sink) = start(Role::Slave, Duration::from_millis(50));
    adaptor.register_subscriber("app-1", &[Characteristic::Rssi]);

    memory.fail_next_reads(1);
    assert!(wait_until(|| adaptor.state() == LinkState::Error));

    memory.push_inbound(b"\x11");
    assert!(wait_until(|| adaptor.state() == LinkState::Running));
    assert_eq!(
        sink.states(),
        vec![
            LinkState::Starting,
            LinkState::Running,
            LinkState::Error,
            LinkState::Running,
        ]
    );
}

#[test]
fn submitted_payload_reaches_the_wire() {
    let (adaptor, memory, _sink) = start(Role::Slave, Duration::from_millis(50));
    let id = SubscriberId::from("app-1");

    let receipt = adaptor
        .submit_outbound_payload(&id, Some(Bytes::from_static(b"hello radio")))
        .expect("payload should be accepted");

    assert!(matches!(receipt.wait(WAIT), Some(Ok(SendOutcome::Written))));
    assert_eq!(runtime_writes(&memory), vec![b"hello radio".to_vec()]);
}

#[test]
fn reconfigure_restarts_the_link() {
    let (adaptor, _first, sink) = start(Role::Slave, Duration::from_millis(50));
    let (transport, second) = MemoryTransport::new();
    let config = LinkConfig {
        role: Role::Slave,
        timing: timing(Duration::from_millis(50)),
        ..LinkConfig::default()
    };

    adaptor
        .configure(config, Box::new(transport))
        .expect("reconfigure should succeed");

    assert_eq!(second.written_bytes().len(), HANDSHAKE_WRITES);
    assert_eq!(
        sink.states(),
        vec![LinkState::Starting, LinkState::Stopped, LinkState::Starting]
    );
}
