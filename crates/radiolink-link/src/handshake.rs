use std::thread;
use std::time::Duration;

use radiolink_frame::{
    bandwidth_command, unlock_command, BandwidthPreset, FrameWriter, RadioVariant,
};
use tracing::{debug, info, warn};

use crate::config::{LinkConfig, Role};
use crate::error::{HandshakeStep, LinkError, Result};

/// Result of a successful handshake.
///
/// Only means the radio accepted its configuration commands. The radio never
/// answers, so nothing here says a peer is listening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ready {
    pub role: Role,
    pub variant: RadioVariant,
    pub bandwidth: BandwidthPreset,
}

/// Put the radio into operating mode.
///
/// Writes, in order: unlock, settle, `ACK`, bandwidth select, settle, `ACK`.
/// Any failed write aborts with [`LinkError::HandshakeFailed`] naming the step.
/// No retry.
pub fn initialize(writer: &FrameWriter, config: &LinkConfig) -> Result<Ready> {
    let settle = config.timing.settle_delay;
    info!(
        variant = %config.variant,
        bandwidth = %config.bandwidth,
        role = %config.role,
        "initializing radio"
    );

    write_step(HandshakeStep::Unlock, || {
        writer.send(unlock_command(config.variant))
    })?;
    settle_for(settle);
    write_step(HandshakeStep::UnlockAck, || writer.send_ack())?;

    write_step(HandshakeStep::Bandwidth, || {
        writer.send(&bandwidth_command(config.bandwidth))
    })?;
    settle_for(settle);
    write_step(HandshakeStep::BandwidthAck, || writer.send_ack())?;

    info!("radio initialized");
    Ok(Ready {
        role: config.role,
        variant: config.variant,
        bandwidth: config.bandwidth,
    })
}

fn write_step<F>(step: HandshakeStep, write: F) -> Result<()>
where
    F: FnOnce() -> radiolink_frame::Result<()>,
{
    debug!(%step, "handshake step");
    write().map_err(|source| {
        warn!(%step, error = %source, "handshake write failed");
        LinkError::HandshakeFailed { step, source }
    })
}

fn settle_for(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

#[cfg(test)]
mod tests {
    use radiolink_transport::{shared, MemoryTransport};

    use super::*;
    use crate::config::LinkTiming;

    fn fast_config(variant: RadioVariant, bandwidth: BandwidthPreset) -> LinkConfig {
        LinkConfig {
            variant,
            bandwidth,
            timing: LinkTiming {
                settle_delay: Duration::from_millis(20),
                ..LinkTiming::default()
            },
            ..LinkConfig::default()
        }
    }

    #[test]
    fn writes_commands_in_order() {
        let (transport, handle) = MemoryTransport::new();
        let writer = FrameWriter::new(shared(transport));
        let config = fast_config(RadioVariant::B, BandwidthPreset::Wide);

        let ready = initialize(&writer, &config).unwrap();

        assert_eq!(ready.variant, RadioVariant::B);
        assert_eq!(ready.bandwidth, BandwidthPreset::Wide);
        assert_eq!(ready.role, Role::Master);
        assert_eq!(
            handle.written_bytes(),
            vec![
                b"ER_CMD#a02".to_vec(),
                b"ACK".to_vec(),
                b"ER_CMD#B2".to_vec(),
                b"ACK".to_vec(),
            ]
        );
    }

    #[test]
    fn acknowledgements_wait_for_the_radio_to_settle() {
        let (transport, handle) = MemoryTransport::new();
        let writer = FrameWriter::new(shared(transport));
        let config = fast_config(RadioVariant::A, BandwidthPreset::Standard);

        initialize(&writer, &config).unwrap();

        let written = handle.written();
        assert!(written[1].at.duration_since(written[0].at) >= Duration::from_millis(20));
        assert!(written[3].at.duration_since(written[2].at) >= Duration::from_millis(20));
    }

    #[test]
    fn failure_names_the_step_and_stops() {
        let (transport, handle) = MemoryTransport::new();
        handle.fail_write_at(2);
        let writer = FrameWriter::new(shared(transport));
        let config = fast_config(RadioVariant::A, BandwidthPreset::Standard);

        let err = initialize(&writer, &config).unwrap_err();

        assert!(matches!(
            err,
            LinkError::HandshakeFailed {
                step: HandshakeStep::Bandwidth,
                ..
            }
        ));
        assert_eq!(handle.write_attempts(), 3);
        assert_eq!(handle.written_bytes().len(), 2);
    }

    #[test]
    fn ack_failure_names_the_acknowledgement_step() {
        let (transport, handle) = MemoryTransport::new();
        handle.fail_write_at(1);
        let writer = FrameWriter::new(shared(transport));
        let config = fast_config(RadioVariant::A, BandwidthPreset::Standard);

        let err = initialize(&writer, &config).unwrap_err();

        assert!(matches!(
            err,
            LinkError::HandshakeFailed {
                step: HandshakeStep::UnlockAck,
                ..
            }
        ));
        assert_eq!(handle.write_attempts(), 2);
        assert_eq!(handle.written_bytes(), vec![b"ER_CMD#a01".to_vec()]);
    }

    #[test]
    fn unlock_failure_writes_nothing_else() {
        let (transport, handle) = MemoryTransport::new();
        handle.fail_next_writes(1);
        let writer = FrameWriter::new(shared(transport));

        let err = initialize(&writer, &LinkConfig::default()).unwrap_err();

        assert!(matches!(
            err,
            LinkError::HandshakeFailed {
                step: HandshakeStep::Unlock,
                ..
            }
        ));
        assert_eq!(handle.write_attempts(), 1);
    }
}
