use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use radiolink_link::LinkAdaptor;
use tracing::info;

use crate::cmd::RunArgs;
use crate::exit::{link_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_characteristic, print_services, print_state, OutputFormat};
use crate::sink::{ChannelSink, LinkEvent, CLI_SUBSCRIBER};

const EVENT_POLL: Duration = Duration::from_millis(200);

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let link_config = args.link.link_config()?;
    let serial_config = args.link.serial_config();

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let (tx, rx) = mpsc::channel();
    let adaptor = LinkAdaptor::new(Arc::new(ChannelSink::new(tx)));
    print_services(adaptor.services(), format);

    adaptor
        .configure_serial(link_config, &serial_config)
        .map_err(|err| link_error("configure failed", err))?;
    adaptor.register_subscriber(CLI_SUBSCRIBER, &args.characteristic);

    let mut delivered = 0usize;
    while running.load(Ordering::SeqCst) {
        let event = match rx.recv_timeout(EVENT_POLL) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        if print_event(event, format) {
            delivered = delivered.saturating_add(1);
            if args.count.is_some_and(|count| delivered >= count) {
                break;
            }
        }
    }

    info!(delivered, "shutting down");
    adaptor.stop();
    while let Ok(event) = rx.try_recv() {
        if let LinkEvent::State(state) = event {
            print_state(state, format);
        }
    }

    Ok(SUCCESS)
}

/// Print one event. Returns true for a delivery.
fn print_event(event: LinkEvent, format: OutputFormat) -> bool {
    match event {
        LinkEvent::State(state) => {
            print_state(state, format);
            false
        }
        LinkEvent::Data {
            characteristic,
            payload,
            timestamp,
        } => {
            print_characteristic(characteristic, &payload, timestamp, format);
            true
        }
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
