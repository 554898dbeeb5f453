//! Drive a SLAVE link over an in-memory transport.
//!
//! The example plays the part of the remote radio: it pushes an inbound
//! message, waits for the relay, then asks for a signal-strength exchange.
//!
//! Run with: `cargo run -p radiolink --example memory-link`

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use radiolink::link::{
    Characteristic, HostSink, LinkAdaptor, LinkConfig, LinkState, LinkTiming, Role, SubscriberId,
};
use radiolink::transport::MemoryTransport;

struct PrintSink;

impl HostSink for PrintSink {
    fn on_state_changed(&self, state: LinkState) {
        println!("state: {state}");
    }

    fn on_characteristic_data(
        &self,
        characteristic: Characteristic,
        payload: &Bytes,
        _timestamp: SystemTime,
        subscriber: &SubscriberId,
    ) {
        match characteristic {
            Characteristic::Rssi => println!("{subscriber} <- rssi: {:?}", payload.first()),
            Characteristic::Message => println!(
                "{subscriber} <- message: {}",
                String::from_utf8_lossy(payload)
            ),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let adaptor = LinkAdaptor::new(Arc::new(PrintSink));
    let (transport, radio) = MemoryTransport::new();

    let config = LinkConfig {
        role: Role::Slave,
        timing: LinkTiming {
            settle_delay: Duration::from_millis(50),
            turnaround_delay: Duration::from_millis(100),
            ..LinkTiming::default()
        },
        ..LinkConfig::default()
    };
    let ready = adaptor.configure(config, Box::new(transport))?;
    println!(
        "link up: role={} variant={:?} bandwidth={:?}",
        ready.role, ready.variant, ready.bandwidth
    );

    adaptor.register_subscriber("demo", &[Characteristic::Rssi, Characteristic::Message]);

    // The first byte of a data frame is the signal strength of the sender.
    radio.push_inbound(b"\x48hello");
    // Four handshake writes precede the relay.
    let relayed = radio.wait_for_writes(5, Duration::from_secs(2));
    if let Some(frame) = relayed.last() {
        println!("relayed: {}", String::from_utf8_lossy(&frame.bytes));
    }

    radio.push_inbound(b"RSSI: 60");
    std::thread::sleep(Duration::from_millis(200));

    adaptor.stop();
    Ok(())
}
