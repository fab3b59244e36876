//! Line-oriented ASCII command protocol for the laser controller.
//!
//! The protocol layer is split the way the device manual splits it:
//! [`frame`] frames requests and parses replies, [`registers`] decodes
//! the packed 2-byte status/failure/mode registers, and [`sequence`]
//! drives the multi-frame exchanges (reset, diode calibration, the
//! ad-hoc push drain). The device session in [`crate::laser`] composes
//! these over a transport.

pub mod frame;
pub mod registers;
pub mod sequence;

/// The single acknowledgment character for accepted set commands.
pub const ACK: &str = ">";

/// 3-character command mnemonics understood by the controller.
///
/// Names follow the device manual: `G…` get, `S…` set, `M…` measure.
pub mod mnemonic {
    /// Get firmware: model code, device id, firmware version.
    pub const GET_FIRMWARE: &[u8; 3] = b"GFw";
    /// Get serial number.
    pub const GET_SERIAL_NUMBER: &[u8; 3] = b"GSN";
    /// Get spec: wavelength and nominal power.
    pub const GET_SPEC_INFO: &[u8; 3] = b"GSI";
    /// Get maximum power.
    pub const GET_MAX_POWER: &[u8; 3] = b"GMP";
    /// Get working hours.
    pub const GET_WORKING_HOURS: &[u8; 3] = b"GWH";
    /// Measure diode power.
    pub const MEASURE_DIODE_POWER: &[u8; 3] = b"MDP";
    /// Measure diode temperature.
    pub const MEASURE_TEMPERATURE_DIODE: &[u8; 3] = b"MTD";
    /// Measure ambient temperature.
    pub const MEASURE_TEMPERATURE_AMBIENT: &[u8; 3] = b"MTA";
    /// Get actual status register.
    pub const GET_ACTUAL_STATUS: &[u8; 3] = b"GAS";
    /// Get live (unlatched) failure bytes.
    pub const GET_FAILURE_BYTE: &[u8; 3] = b"GFB";
    /// Get latched failure register.
    pub const GET_LATCHED_FAILURE: &[u8; 3] = b"GLF";
    /// Get level power (hex).
    pub const GET_LEVEL_POWER: &[u8; 3] = b"GLP";
    /// Set level power.
    pub const SET_LEVEL_POWER: &[u8; 3] = b"SLP";
    /// Get/set temporary power percentage.
    pub const TEMPORARY_POWER: &[u8; 3] = b"TPP";
    /// Get operating mode register.
    pub const GET_OPERATION_MODE: &[u8; 3] = b"GOM";
    /// Set operating mode register.
    pub const SET_OPERATION_MODE: &[u8; 3] = b"SOM";
    /// Set auto power-up.
    pub const SET_AUTO_POWERUP: &[u8; 3] = b"SAP";
    /// Set auto start-up.
    pub const SET_AUTO_STARTUP: &[u8; 3] = b"SAS";
    /// Set auto reset.
    pub const SET_AUTO_RESET: &[u8; 3] = b"ARs";
    /// Power the system up.
    pub const POWER_ON: &[u8; 3] = b"POn";
    /// Power the system down.
    pub const POWER_OFF: &[u8; 3] = b"POf";
    /// Switch the laser on.
    pub const LASER_ON: &[u8; 3] = b"LOn";
    /// Switch the laser off.
    pub const LASER_OFF: &[u8; 3] = b"LOf";
    /// Reset the controller (multi-frame).
    pub const RESET: &[u8; 3] = b"RsC";
    /// Calibrate the diode (multi-frame).
    pub const CALIBRATE_DIODE: &[u8; 3] = b"CLD";
}

/// Whether a parsed text reply is the device's acknowledgment.
///
/// A command succeeded iff the reply is exactly one field equal to `>`.
/// Anything else — other characters, extra fields, an empty field — is
/// an ordinary negative outcome at the device level, not an error.
pub fn is_acknowledged(fields: &[String]) -> bool {
    matches!(fields, [only] if only == ACK)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_ack_exact_match_only() {
        assert!(is_acknowledged(&fields(&[">"])));
        assert!(!is_acknowledged(&fields(&[""])));
        assert!(!is_acknowledged(&fields(&["x"])));
        assert!(!is_acknowledged(&fields(&[">>"])));
        assert!(!is_acknowledged(&fields(&[">", ""])));
        assert!(!is_acknowledged(&fields(&[])));
    }
}
