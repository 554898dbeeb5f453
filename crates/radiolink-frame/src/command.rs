//! Radio command frames.
//!
//! Everything the adaptor ever writes to the radio is one of these.

use std::fmt;
use std::str::FromStr;

/// Acknowledgement frame. Confirms the preceding command.
pub const ACK: &[u8] = b"ACK";

/// Asks the radio to report the strength of the last received packet.
pub const REQUEST_RSSI_COMMAND: &[u8] = b"ER_CMD#T8";

/// Prefix of every bandwidth-select command; followed by one preset digit.
pub const BANDWIDTH_COMMAND_PREFIX: &[u8] = b"ER_CMD#B";

/// Tag prepended to relayed data (SLAVE role).
pub const RELAY_TAG: &[u8] = b"RL";

/// Tag prepended to synthesized sequence payloads.
pub const SEQUENCE_TAG: &[u8] = b"SQ";

/// Marker identifying a signal-strength report frame.
pub const RSSI_MARKER: &[u8] = b"RSSI:";

/// Two-byte prefix meaning "report last-received signal strength".
pub const RSSI_REQUEST_SENTINEL: [u8; 2] = *b"R?";

/// Radio hardware variant. Selects the unlock command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RadioVariant {
    #[default]
    A,
    B,
}

impl RadioVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            RadioVariant::A => "a",
            RadioVariant::B => "b",
        }
    }
}

impl fmt::Display for RadioVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RadioVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" | "variant-a" => Ok(RadioVariant::A),
            "b" | "variant-b" => Ok(RadioVariant::B),
            other => Err(format!("unknown radio variant '{other}' (expected a or b)")),
        }
    }
}

/// Channel bandwidth preset selected during the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BandwidthPreset {
    Narrow,
    #[default]
    Standard,
    Wide,
    Max,
}

impl BandwidthPreset {
    /// Digit sent after [`BANDWIDTH_COMMAND_PREFIX`].
    pub fn digit(self) -> u8 {
        match self {
            BandwidthPreset::Narrow => b'0',
            BandwidthPreset::Standard => b'1',
            BandwidthPreset::Wide => b'2',
            BandwidthPreset::Max => b'3',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BandwidthPreset::Narrow => "narrow",
            BandwidthPreset::Standard => "standard",
            BandwidthPreset::Wide => "wide",
            BandwidthPreset::Max => "max",
        }
    }
}

impl fmt::Display for BandwidthPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BandwidthPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "narrow" | "0" => Ok(BandwidthPreset::Narrow),
            "standard" | "1" => Ok(BandwidthPreset::Standard),
            "wide" | "2" => Ok(BandwidthPreset::Wide),
            "max" | "3" => Ok(BandwidthPreset::Max),
            other => Err(format!(
                "unknown bandwidth preset '{other}' (expected narrow, standard, wide or max)"
            )),
        }
    }
}

/// Variant-specific command that unlocks the radio's configuration mode.
pub fn unlock_command(variant: RadioVariant) -> &'static [u8] {
    match variant {
        RadioVariant::A => b"ER_CMD#a01",
        RadioVariant::B => b"ER_CMD#a02",
    }
}

/// Bandwidth-select command for `preset`.
pub fn bandwidth_command(preset: BandwidthPreset) -> Vec<u8> {
    let mut cmd = Vec::with_capacity(BANDWIDTH_COMMAND_PREFIX.len() + 1);
    cmd.extend_from_slice(BANDWIDTH_COMMAND_PREFIX);
    cmd.push(preset.digit());
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlock_commands_differ_per_variant() {
        assert_eq!(unlock_command(RadioVariant::A), b"ER_CMD#a01");
        assert_eq!(unlock_command(RadioVariant::B), b"ER_CMD#a02");
    }

    #[test]
    fn bandwidth_command_carries_preset_digit() {
        assert_eq!(bandwidth_command(BandwidthPreset::Narrow), b"ER_CMD#B0");
        assert_eq!(bandwidth_command(BandwidthPreset::Max), b"ER_CMD#B3");
    }

    #[test]
    fn parses_presets_and_variants() {
        assert_eq!("Wide".parse::<BandwidthPreset>(), Ok(BandwidthPreset::Wide));
        assert_eq!("1".parse::<BandwidthPreset>(), Ok(BandwidthPreset::Standard));
        assert_eq!("b".parse::<RadioVariant>(), Ok(RadioVariant::B));
        assert!("c".parse::<RadioVariant>().is_err());
        assert!("huge".parse::<BandwidthPreset>().is_err());
    }
}
