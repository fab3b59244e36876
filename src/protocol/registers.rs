//! Bit-field views over the device's 2-byte registers.
//!
//! The controller reports status, latched failures and the operating mode
//! as packed 2-byte registers. Each view here is an immutable value type
//! constructed from exactly two bytes, with named boolean fields computed
//! from fixed bit positions. `OperationMode` additionally supports the
//! inverse direction: re-encoding the current field values into the same
//! layout so a caller can toggle one field and write the whole register
//! back atomically.

use crate::error::{LaserError, Result};

fn bit(byte: u8, pos: u8) -> bool {
    byte & (0x01 << pos) != 0
}

/// Snapshot of the actual status register (mnemonic `GAS`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRegister {
    /// A preceding or pending error prevents the device from starting
    /// into normal operation. Only while unset will the laser/LED operate
    /// as expected.
    pub error: bool,
    /// The laser/LED is switched on and the working hours are counting.
    pub on: bool,
    /// The device is preheating; the laser will not emit light until the
    /// diode temperature reaches the valid range.
    pub preheating: bool,
    /// A situation occurred that needs special attention (device-family
    /// specific, e.g. LedHUB channel interlock).
    pub attention_required: bool,
    /// State of the laser-enable input pin at the control port. Stays
    /// active when the input is not connected.
    pub enabled_pin: bool,
    /// State of the key-switch input pin at the control port.
    pub key_switch: bool,
    /// CDRH operation only: a key-switch toggle is needed to release
    /// laser operation.
    pub toggle_key: bool,
    /// The laser/LED system is powered up.
    pub system_power: bool,
    /// An external light sensor is connected (LedHUB controller only).
    pub external_sensor_connected: bool,
}

impl StatusRegister {
    /// Decode the two raw status bytes.
    pub fn from_bytes(bytes: [u8; 2]) -> Self {
        Self {
            error: bit(bytes[0], 0),
            on: bit(bytes[0], 1),
            preheating: bit(bytes[0], 2),
            attention_required: bit(bytes[0], 4),
            enabled_pin: bit(bytes[0], 6),
            key_switch: bit(bytes[0], 7),
            toggle_key: bit(bytes[1], 0),
            system_power: bit(bytes[1], 1),
            external_sensor_connected: bit(bytes[1], 5),
        }
    }
}

/// Snapshot of the latched failure register (mnemonic `GLF`).
///
/// Latched flags persist on the device after the triggering condition
/// clears, until its own fault-handling procedure resets them. This
/// client only reads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatchedFailureRegister {
    /// The device is in an error state.
    pub error_state: bool,
    /// CDRH configuration mismatch.
    pub cdrh_error: bool,
    /// Internal communication error between controller boards.
    pub internal_communication_error: bool,
    /// K1 relay error.
    pub k1_relay_error: bool,
    /// High-power configuration mismatch.
    pub high_power_mismatch: bool,
    /// Supply under- or over-voltage.
    pub under_over_voltage: bool,
    /// External interlock circuit opened.
    pub external_interlock: bool,
    /// Diode current out of range.
    pub diode_current: bool,
    /// Ambient temperature out of range.
    pub ambient_temperature: bool,
    /// Diode temperature out of range.
    pub diode_temperature: bool,
    /// Self-test error.
    pub test_error: bool,
    /// Internal error.
    pub internal_error: bool,
    /// Diode power out of range.
    pub diode_power: bool,
}

impl LatchedFailureRegister {
    /// Decode the two raw failure bytes.
    pub fn from_bytes(bytes: [u8; 2]) -> Self {
        Self {
            error_state: bit(bytes[0], 0),
            cdrh_error: bit(bytes[0], 1),
            internal_communication_error: bit(bytes[0], 2),
            k1_relay_error: bit(bytes[0], 3),
            high_power_mismatch: bit(bytes[0], 4),
            under_over_voltage: bit(bytes[0], 5),
            external_interlock: bit(bytes[0], 6),
            diode_current: bit(bytes[0], 7),
            ambient_temperature: bit(bytes[1], 0),
            diode_temperature: bit(bytes[1], 1),
            test_error: bit(bytes[1], 2),
            internal_error: bit(bytes[1], 3),
            diode_power: bit(bytes[1], 4),
        }
    }

    /// True if any latched fault flag is set.
    pub fn any(&self) -> bool {
        self.error_state
            || self.cdrh_error
            || self.internal_communication_error
            || self.k1_relay_error
            || self.high_power_mismatch
            || self.under_over_voltage
            || self.external_interlock
            || self.diode_current
            || self.ambient_temperature
            || self.diode_temperature
            || self.test_error
            || self.internal_error
            || self.diode_power
    }
}

/// Snapshot of the operating mode register (mnemonics `GOM`/`SOM`).
///
/// Unlike the read-only registers this one round-trips: `to_bytes`
/// reproduces the exact bit layout with all reserved positions zeroed,
/// and `to_wire_value` serializes the 16-bit value the way the device
/// expects it in a `SOM` frame — lowercase hexadecimal ASCII digits with
/// no `0x` prefix and no padding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationMode {
    /// Internal clock generator active.
    pub internal_clock_generator: bool,
    /// Bias level released.
    pub bias_level_release: bool,
    /// Operating level released.
    pub operating_level_release: bool,
    /// Digital input released.
    pub digital_input_release: bool,
    /// Analog input released.
    pub analog_input_release: bool,
    /// Automatic power control (APC) mode.
    pub apc_mode: bool,
    /// Digital input impedance selection.
    pub digital_input_impedance: bool,
    /// Analog input impedance selection.
    pub analog_input_impedance: bool,
    /// Unsolicited ad-hoc messages over USB enabled.
    pub usb_adhoc_mode: bool,
    /// Auto start-up after power-on.
    pub auto_startup: bool,
    /// Auto power-up after power-on.
    pub auto_powerup: bool,
}

impl OperationMode {
    /// Decode the two raw mode bytes.
    pub fn from_bytes(bytes: [u8; 2]) -> Self {
        Self {
            internal_clock_generator: bit(bytes[0], 2),
            bias_level_release: bit(bytes[0], 3),
            operating_level_release: bit(bytes[0], 4),
            digital_input_release: bit(bytes[0], 5),
            analog_input_release: bit(bytes[0], 7),
            apc_mode: bit(bytes[1], 0),
            digital_input_impedance: bit(bytes[1], 3),
            analog_input_impedance: bit(bytes[1], 4),
            usb_adhoc_mode: bit(bytes[1], 5),
            auto_startup: bit(bytes[1], 6),
            auto_powerup: bit(bytes[1], 7),
        }
    }

    /// Re-encode the field values into the 2-byte register layout.
    ///
    /// Reserved bit positions are always zero, independent of any noise
    /// present in the bytes the mode was decoded from.
    pub fn to_bytes(&self) -> [u8; 2] {
        let mut bytes = [0u8, 0u8];
        let mut set = |byte: usize, pos: u8, value: bool| {
            if value {
                bytes[byte] |= 0x01 << pos;
            }
        };
        set(0, 2, self.internal_clock_generator);
        set(0, 3, self.bias_level_release);
        set(0, 4, self.operating_level_release);
        set(0, 5, self.digital_input_release);
        set(0, 7, self.analog_input_release);
        set(1, 0, self.apc_mode);
        set(1, 3, self.digital_input_impedance);
        set(1, 4, self.analog_input_impedance);
        set(1, 5, self.usb_adhoc_mode);
        set(1, 6, self.auto_startup);
        set(1, 7, self.auto_powerup);
        bytes
    }

    /// Serialize for transmission as a `SOM` set-command value.
    pub fn to_wire_value(&self) -> String {
        format!("{:x}", u16::from_be_bytes(self.to_bytes()))
    }
}

/// Outcome of the diode calibration sequence (mnemonic `CLD`).
///
/// The device reports the outcome as a single integer code at the end of
/// the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationResult {
    /// Calibration completed successfully.
    Success,
    /// The device reported an unspecified failure, or never acknowledged
    /// the calibration request.
    UnknownError,
    /// The configured maximum power could not be reached.
    MaxPowerNotReachable,
    /// Key switch is off.
    KeySwitchOff,
    /// The interlock circuit opened during calibration.
    InterlockOccurred,
    /// No light was detected at the monitor diode.
    NoLightDetected,
    /// An over-power condition occurred.
    OverPowerOccurred,
    /// The device was still preheating.
    PreheatingActive,
    /// Diode temperature out of range.
    DiodeTemperatureOutOfRange,
    /// Ambient temperature out of range.
    AmbientTemperatureOutOfRange,
    /// Supply voltage out of range.
    SupplyVoltageOutOfRange,
    /// The enable input pin was inactive.
    EnablePinInactive,
    /// CDRH operation requires a key-switch toggle first.
    CdrhToggleRequired,
    /// Calibration was aborted on the device side.
    CalibrationAborted,
    /// The device timed out internally during calibration.
    CalibrationTimeout,
}

impl CalibrationResult {
    /// Map the integer code reported by the device to an outcome.
    ///
    /// Codes outside the known range are a decoding failure, never
    /// silently coerced to [`CalibrationResult::UnknownError`].
    pub fn from_code(code: i64) -> Result<Self> {
        Ok(match code {
            0 => Self::Success,
            1 => Self::UnknownError,
            2 => Self::MaxPowerNotReachable,
            3 => Self::KeySwitchOff,
            4 => Self::InterlockOccurred,
            5 => Self::NoLightDetected,
            6 => Self::OverPowerOccurred,
            7 => Self::PreheatingActive,
            8 => Self::DiodeTemperatureOutOfRange,
            9 => Self::AmbientTemperatureOutOfRange,
            10 => Self::SupplyVoltageOutOfRange,
            11 => Self::EnablePinInactive,
            12 => Self::CdrhToggleRequired,
            13 => Self::CalibrationAborted,
            14 => Self::CalibrationTimeout,
            other => return Err(LaserError::InvalidCalibrationCode(other)),
        })
    }
}
