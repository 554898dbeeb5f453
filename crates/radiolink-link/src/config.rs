use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use radiolink_frame::{BandwidthPreset, FrameConfig, RadioVariant, DEFAULT_MAX_FRAME_LEN};

use crate::error::{LinkError, Result};

/// Scheduling role of this end of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    /// Sends a sequence frame every `master_interval`, unprompted.
    #[default]
    Master,
    /// Sends only in reaction to received data.
    Slave,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Master => "master",
            Role::Slave => "slave",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "master" => Ok(Role::Master),
            "slave" => Ok(Role::Slave),
            other => Err(format!("unknown role '{other}' (expected master or slave)")),
        }
    }
}

/// Longest delay any timing field may hold.
pub const MAX_TIMING_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Fixed delays of the radio protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTiming {
    /// Pause after each handshake command before its acknowledgement.
    pub settle_delay: Duration,
    /// Period of MASTER sequence sends.
    pub master_interval: Duration,
    /// Half-duplex turnaround before a SLAVE relays received data.
    pub turnaround_delay: Duration,
    /// Delay between the strength request and its acknowledgement.
    pub rssi_ack_delay: Duration,
    /// Bounded wait for the first byte of a frame.
    pub read_timeout: Duration,
    /// Pause between idle read attempts.
    pub idle_delay: Duration,
    /// Quiet time on the line that terminates a frame.
    pub inter_byte_gap: Duration,
}

impl Default for LinkTiming {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(2),
            master_interval: Duration::from_secs(2),
            turnaround_delay: Duration::from_millis(250),
            rssi_ack_delay: Duration::from_secs(1),
            read_timeout: Duration::from_millis(100),
            idle_delay: Duration::from_millis(100),
            inter_byte_gap: Duration::from_millis(5),
        }
    }
}

impl LinkTiming {
    fn named_delays(&self) -> [(&'static str, Duration); 7] {
        [
            ("settle_delay", self.settle_delay),
            ("master_interval", self.master_interval),
            ("turnaround_delay", self.turnaround_delay),
            ("rssi_ack_delay", self.rssi_ack_delay),
            ("read_timeout", self.read_timeout),
            ("idle_delay", self.idle_delay),
            ("inter_byte_gap", self.inter_byte_gap),
        ]
    }

    /// Upper bound on how long the read loop takes to notice a stop request.
    pub fn polling_interval(&self) -> Duration {
        self.read_timeout + self.idle_delay
    }
}

/// Link configuration supplied once by the host.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkConfig {
    pub variant: RadioVariant,
    pub role: Role,
    pub bandwidth: BandwidthPreset,
    pub timing: LinkTiming,
}

impl LinkConfig {
    /// Reject timings the link cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.timing.master_interval.is_zero() {
            return Err(LinkError::InvalidConfig(
                "master_interval must be greater than zero".to_string(),
            ));
        }
        if self.timing.read_timeout.is_zero() {
            return Err(LinkError::InvalidConfig(
                "read_timeout must be greater than zero".to_string(),
            ));
        }
        if self.timing.inter_byte_gap.is_zero() {
            return Err(LinkError::InvalidConfig(
                "inter_byte_gap must be greater than zero".to_string(),
            ));
        }
        for (name, delay) in self.timing.named_delays() {
            if delay > MAX_TIMING_DELAY {
                return Err(LinkError::InvalidConfig(format!(
                    "{name} must not exceed {}s",
                    MAX_TIMING_DELAY.as_secs()
                )));
            }
        }
        Ok(())
    }

    /// Frame reassembly settings derived from the timing.
    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            read_timeout: self.timing.read_timeout,
            inter_byte_gap: self.timing.inter_byte_gap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_radio_protocol() {
        let cfg = LinkConfig::default();
        assert_eq!(cfg.role, Role::Master);
        assert_eq!(cfg.variant, RadioVariant::A);
        assert_eq!(cfg.bandwidth, BandwidthPreset::Standard);
        assert_eq!(cfg.timing.settle_delay, Duration::from_secs(2));
        assert_eq!(cfg.timing.master_interval, Duration::from_secs(2));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let cfg = LinkConfig {
            timing: LinkTiming {
                master_interval: Duration::ZERO,
                ..LinkTiming::default()
            },
            ..LinkConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(LinkError::InvalidConfig(_))));
    }

    #[test]
    fn oversized_delays_are_rejected() {
        let huge = LinkConfig {
            timing: LinkTiming {
                master_interval: Duration::from_secs(u64::MAX),
                ..LinkTiming::default()
            },
            ..LinkConfig::default()
        };
        let err = huge.validate().unwrap_err();
        assert!(err.to_string().contains("master_interval"));

        let ack = LinkConfig {
            timing: LinkTiming {
                rssi_ack_delay: MAX_TIMING_DELAY + Duration::from_nanos(1),
                ..LinkTiming::default()
            },
            ..LinkConfig::default()
        };
        assert!(matches!(ack.validate(), Err(LinkError::InvalidConfig(_))));

        let edge = LinkConfig {
            timing: LinkTiming {
                turnaround_delay: MAX_TIMING_DELAY,
                ..LinkTiming::default()
            },
            ..LinkConfig::default()
        };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn frame_config_follows_timing() {
        let cfg = LinkConfig {
            timing: LinkTiming {
                read_timeout: Duration::from_millis(7),
                inter_byte_gap: Duration::from_millis(3),
                ..LinkTiming::default()
            },
            ..LinkConfig::default()
        };
        let frame = cfg.frame_config();
        assert_eq!(frame.read_timeout, Duration::from_millis(7));
        assert_eq!(frame.inter_byte_gap, Duration::from_millis(3));
        assert_eq!(cfg.timing.polling_interval(), Duration::from_millis(107));
    }

    #[test]
    fn parses_roles() {
        assert_eq!("SLAVE".parse::<Role>(), Ok(Role::Slave));
        assert!("peer".parse::<Role>().is_err());
    }
}
