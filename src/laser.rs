//! Omicron laser controller device session.
//!
//! One [`OmicronLaser`] owns one transport exclusively. Construction
//! captures the device identity (firmware, serial number, wavelength and
//! power ratings) in four blocking exchanges; afterwards every operation
//! is a
//! synchronous request/response turn against the command protocol.
//!
//! The protocol is strictly half-duplex. No operation may be invoked
//! concurrently on the same session; callers wanting shared access must
//! serialize it themselves. A timeout during one of the multi-frame
//! sequences (reset, calibration, ad-hoc drain) leaves the framing
//! position on the wire unknown, so it surfaces as a transport error and
//! the session should be reconstructed, not reused.
//!
//! # Example
//!
//! ```no_run
//! use omicron_laser::{config::LaserSettings, OmicronLaser};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> omicron_laser::Result<()> {
//!     let settings = LaserSettings::load("config/laser")?;
//!     let mut laser = OmicronLaser::connect(settings.open_transport().await?).await?;
//!
//!     println!("serial number: {}", laser.identity().serial_number);
//!     println!("diode power:   {} mW", laser.measure_diode_power().await?);
//!
//!     if laser.laser_on().await? {
//!         println!("emitting");
//!     }
//!     Ok(())
//! }
//! ```

use log::{debug, info, warn};

use crate::error::{LaserError, Result};
use crate::protocol::registers::{
    CalibrationResult, LatchedFailureRegister, OperationMode, StatusRegister,
};
use crate::protocol::sequence::{
    AdhocDrain, AdhocEvent, CalibrationProgress, CalibrationSequence, ResetSequence,
    SequenceProgress,
};
use crate::protocol::{frame, is_acknowledged, mnemonic};
use crate::transport::{Transport, DELIMITER};

/// Immutable identity fields captured once at session creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Device model code (e.g. `LuxX`).
    pub model_code: String,
    /// Device id.
    pub device_id: String,
    /// Firmware version string.
    pub firmware_version: String,
    /// Serial number.
    pub serial_number: String,
    /// Emission wavelength in nm, as reported.
    pub wavelength: String,
    /// Nominal power, as reported.
    pub power: String,
    /// Maximum power, as reported.
    pub max_power: String,
}

/// Session talking to one laser/LED controller.
pub struct OmicronLaser {
    transport: Box<dyn Transport>,
    identity: DeviceIdentity,
    last_status: Option<StatusRegister>,
    last_failure: Option<LatchedFailureRegister>,
    last_mode: Option<OperationMode>,
    temporary_power: Option<f64>,
}

impl OmicronLaser {
    /// Open a session over an exclusively owned transport.
    ///
    /// Performs the four identity exchanges; any failure is fatal and
    /// reported as [`LaserError::InitializationFailed`] naming the
    /// exchange.
    pub async fn connect(transport: Box<dyn Transport>) -> Result<Self> {
        let mut session = Self {
            transport,
            identity: DeviceIdentity {
                model_code: String::new(),
                device_id: String::new(),
                firmware_version: String::new(),
                serial_number: String::new(),
                wavelength: String::new(),
                power: String::new(),
                max_power: String::new(),
            },
            last_status: None,
            last_failure: None,
            last_mode: None,
            temporary_power: None,
        };

        let firmware = session
            .ask(mnemonic::GET_FIRMWARE)
            .await
            .and_then(|fields| match <[String; 3]>::try_from(fields) {
                Ok([model, id, version]) => Ok((model, id, version)),
                Err(fields) => Err(LaserError::Malformed(format!(
                    "GFw returned {} fields, expected 3",
                    fields.len()
                ))),
            })
            .map_err(|e| LaserError::during_init("GFw", e))?;
        session.identity.model_code = firmware.0;
        session.identity.device_id = firmware.1;
        session.identity.firmware_version = firmware.2;

        session.identity.serial_number = session
            .ask_single(mnemonic::GET_SERIAL_NUMBER)
            .await
            .map_err(|e| LaserError::during_init("GSN", e))?;

        let specs = session
            .ask(mnemonic::GET_SPEC_INFO)
            .await
            .and_then(|fields| match <[String; 2]>::try_from(fields) {
                Ok([wavelength, power]) => Ok((wavelength, power)),
                Err(fields) => Err(LaserError::Malformed(format!(
                    "GSI returned {} fields, expected 2",
                    fields.len()
                ))),
            })
            .map_err(|e| LaserError::during_init("GSI", e))?;
        session.identity.wavelength = specs.0;
        session.identity.power = specs.1;

        session.identity.max_power = session
            .ask_single(mnemonic::GET_MAX_POWER)
            .await
            .map_err(|e| LaserError::during_init("GMP", e))?;

        info!(
            "connected to {} {} (firmware {}, serial {})",
            session.identity.model_code,
            session.identity.device_id,
            session.identity.firmware_version,
            session.identity.serial_number
        );
        Ok(session)
    }

    /// Identity captured at session start.
    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Most recent decoded status register, if any query succeeded yet.
    pub fn last_status(&self) -> Option<StatusRegister> {
        self.last_status
    }

    /// Most recent decoded latched failure register.
    pub fn last_failure(&self) -> Option<LatchedFailureRegister> {
        self.last_failure
    }

    /// Most recent decoded operating mode.
    pub fn last_mode(&self) -> Option<OperationMode> {
        self.last_mode
    }

    /// Temporary power percentage last pushed by the device (ad-hoc
    /// `$TPP` frames) or read back via [`get_temporary_power`].
    ///
    /// [`get_temporary_power`]: Self::get_temporary_power
    pub fn last_temporary_power(&self) -> Option<f64> {
        self.temporary_power
    }

    // ---- simple queries -------------------------------------------------

    /// Working hours counter, as reported by the device.
    pub async fn get_working_hours(&mut self) -> Result<String> {
        self.ask_single(mnemonic::GET_WORKING_HOURS).await
    }

    /// Measure the current diode power.
    pub async fn measure_diode_power(&mut self) -> Result<f64> {
        self.ask_float(mnemonic::MEASURE_DIODE_POWER).await
    }

    /// Measure the diode temperature.
    pub async fn measure_temperature_diode(&mut self) -> Result<f64> {
        self.ask_float(mnemonic::MEASURE_TEMPERATURE_DIODE).await
    }

    /// Measure the ambient temperature.
    pub async fn measure_temperature_ambient(&mut self) -> Result<f64> {
        self.ask_float(mnemonic::MEASURE_TEMPERATURE_AMBIENT).await
    }

    /// Query and decode the actual status register.
    pub async fn get_status(&mut self) -> Result<StatusRegister> {
        let bytes = self.ask_register(mnemonic::GET_ACTUAL_STATUS).await?;
        let status = StatusRegister::from_bytes(bytes);
        self.last_status = Some(status);
        Ok(status)
    }

    /// Raw live (unlatched) failure bytes.
    pub async fn get_failure_bytes(&mut self) -> Result<Vec<u8>> {
        self.ask_bytes(mnemonic::GET_FAILURE_BYTE).await
    }

    /// Query and decode the latched failure register.
    pub async fn get_latched_failure(&mut self) -> Result<LatchedFailureRegister> {
        let bytes = self.ask_register(mnemonic::GET_LATCHED_FAILURE).await?;
        let failure = LatchedFailureRegister::from_bytes(bytes);
        if failure.any() {
            warn!("latched failures present: {:?}", failure);
        }
        self.last_failure = Some(failure);
        Ok(failure)
    }

    /// Level power, reported by the device in base-16.
    pub async fn get_level_power(&mut self) -> Result<u32> {
        let field = self.ask_single(mnemonic::GET_LEVEL_POWER).await?;
        u32::from_str_radix(field.trim(), 16).map_err(|_| {
            LaserError::Malformed(format!("GLP returned non-hex level power: {field:?}"))
        })
    }

    /// Temporary power percentage read back from the device.
    pub async fn get_temporary_power(&mut self) -> Result<String> {
        let field = self.ask_single(mnemonic::TEMPORARY_POWER).await?;
        if let Ok(value) = field.trim().parse::<f64>() {
            self.temporary_power = Some(value);
        }
        Ok(field)
    }

    /// Query and decode the operating mode register.
    pub async fn get_operation_mode(&mut self) -> Result<OperationMode> {
        let bytes = self.ask_register(mnemonic::GET_OPERATION_MODE).await?;
        let mode = OperationMode::from_bytes(bytes);
        self.last_mode = Some(mode);
        Ok(mode)
    }

    // ---- set commands ---------------------------------------------------

    /// Set the level power (transmitted base-16, mirroring `GLP`).
    ///
    /// The device may follow the acknowledgment with ad-hoc `$TPP`
    /// frames; they are drained before returning.
    pub async fn set_level_power(&mut self, level: u32) -> Result<bool> {
        let accepted = self
            .set_acknowledged(mnemonic::SET_LEVEL_POWER, format!("{level:x}").as_bytes())
            .await?;
        self.drain_adhoc().await?;
        Ok(accepted)
    }

    /// Set the temporary power percentage, draining ad-hoc frames.
    pub async fn set_temporary_power(&mut self, percent: f64) -> Result<bool> {
        let accepted = self
            .set_acknowledged(mnemonic::TEMPORARY_POWER, format!("{percent}").as_bytes())
            .await?;
        self.drain_adhoc().await?;
        Ok(accepted)
    }

    /// Write the whole operating mode register back to the device.
    ///
    /// Re-sends the full encoded register, so the caller can toggle one
    /// field on a decoded [`OperationMode`] and write it back atomically.
    pub async fn set_operation_mode(&mut self, mode: OperationMode) -> Result<bool> {
        let accepted = self
            .set_acknowledged(mnemonic::SET_OPERATION_MODE, mode.to_wire_value().as_bytes())
            .await?;
        if accepted {
            self.last_mode = Some(mode);
        }
        Ok(accepted)
    }

    /// Enable or disable auto power-up.
    pub async fn set_auto_powerup(&mut self, enabled: bool) -> Result<bool> {
        self.set_flag(mnemonic::SET_AUTO_POWERUP, enabled).await
    }

    /// Enable or disable auto start-up.
    pub async fn set_auto_startup(&mut self, enabled: bool) -> Result<bool> {
        self.set_flag(mnemonic::SET_AUTO_STARTUP, enabled).await
    }

    /// Enable or disable auto reset.
    pub async fn set_auto_reset(&mut self, enabled: bool) -> Result<bool> {
        self.set_flag(mnemonic::SET_AUTO_RESET, enabled).await
    }

    /// Power the system up.
    pub async fn power_on(&mut self) -> Result<bool> {
        self.set_acknowledged(mnemonic::POWER_ON, b"").await
    }

    /// Power the system down.
    pub async fn power_off(&mut self) -> Result<bool> {
        self.set_acknowledged(mnemonic::POWER_OFF, b"").await
    }

    /// Switch the laser on.
    pub async fn laser_on(&mut self) -> Result<bool> {
        self.set_acknowledged(mnemonic::LASER_ON, b"").await
    }

    /// Switch the laser off.
    pub async fn laser_off(&mut self) -> Result<bool> {
        self.set_acknowledged(mnemonic::LASER_OFF, b"").await
    }

    // ---- multi-frame sequences ------------------------------------------

    /// Reset the controller.
    ///
    /// Expects the immediate `!RsC` echo, then reads frames until the
    /// device signals completion. Unbounded by device design; the
    /// transport timeout is the only bound, and a timeout here is fatal
    /// to the session.
    pub async fn reset(&mut self) -> Result<bool> {
        self.transport
            .write_all(&frame::build_query(mnemonic::RESET))
            .await?;

        let mut sequence = ResetSequence::new();
        loop {
            let raw = self.read_sequence_frame().await?;
            match sequence.feed(&raw) {
                SequenceProgress::Continue => {}
                SequenceProgress::Finished(ok) => {
                    info!("controller reset {}", if ok { "completed" } else { "refused" });
                    return Ok(ok);
                }
            }
        }
    }

    /// Run the diode calibration sequence.
    ///
    /// A rejected request yields [`CalibrationResult::UnknownError`]; a
    /// result code outside the known range is a decoding failure
    /// ([`LaserError::InvalidCalibrationCode`]), never coerced.
    pub async fn calibrate_diode(&mut self) -> Result<CalibrationResult> {
        let fields = self.ask(mnemonic::CALIBRATE_DIODE).await?;

        let mut sequence = CalibrationSequence::new();
        if let Some(outcome) = sequence.acknowledge(is_acknowledged(&fields)) {
            return Ok(outcome);
        }

        loop {
            let raw = self.read_sequence_frame().await?;
            match sequence.feed(&raw) {
                CalibrationProgress::Continue => {}
                CalibrationProgress::Finished(outcome) => {
                    let outcome = outcome?;
                    info!("diode calibration finished: {:?}", outcome);
                    return Ok(outcome);
                }
            }
        }
    }

    // ---- exchange helpers ------------------------------------------------

    async fn exchange(&mut self, request: Vec<u8>) -> Result<Vec<u8>> {
        self.transport.write_all(&request).await?;
        self.transport.read_until(DELIMITER).await
    }

    async fn ask(&mut self, mnemonic: &[u8; 3]) -> Result<Vec<String>> {
        let raw = self.exchange(frame::build_query(mnemonic)).await?;
        frame::parse_text_reply(&raw)
    }

    async fn ask_single(&mut self, mnemonic: &[u8; 3]) -> Result<String> {
        self.ask(mnemonic).await?.into_iter().next().ok_or_else(|| {
            LaserError::Malformed(format!(
                "{} reply carried no fields",
                String::from_utf8_lossy(mnemonic)
            ))
        })
    }

    async fn ask_float(&mut self, mnemonic: &[u8; 3]) -> Result<f64> {
        let field = self.ask_single(mnemonic).await?;
        field.trim().parse().map_err(|_| {
            LaserError::Malformed(format!(
                "{} returned a non-numeric field: {field:?}",
                String::from_utf8_lossy(mnemonic)
            ))
        })
    }

    async fn ask_bytes(&mut self, mnemonic: &[u8; 3]) -> Result<Vec<u8>> {
        let raw = self.exchange(frame::build_query(mnemonic)).await?;
        frame::parse_binary_reply(&raw)
    }

    async fn ask_register(&mut self, mnemonic: &[u8; 3]) -> Result<[u8; 2]> {
        let payload = self.ask_bytes(mnemonic).await?;
        let pair: [u8; 2] = payload[..].try_into().map_err(|_| {
            LaserError::Malformed(format!(
                "{} returned {} payload bytes, expected 2",
                String::from_utf8_lossy(mnemonic),
                payload.len()
            ))
        })?;
        Ok(pair)
    }

    async fn set_acknowledged(&mut self, mnemonic: &[u8; 3], value: &[u8]) -> Result<bool> {
        let raw = self.exchange(frame::build_set(mnemonic, value)).await?;
        let fields = frame::parse_text_reply(&raw)?;
        let accepted = is_acknowledged(&fields);
        if !accepted {
            debug!(
                "{} not acknowledged: {:?}",
                String::from_utf8_lossy(mnemonic),
                fields
            );
        }
        Ok(accepted)
    }

    async fn set_flag(&mut self, mnemonic: &[u8; 3], enabled: bool) -> Result<bool> {
        self.set_acknowledged(mnemonic, if enabled { b"1" } else { b"0" })
            .await
    }

    /// Drain unsolicited `$TPP` push frames until the link goes quiet.
    async fn drain_adhoc(&mut self) -> Result<()> {
        let mut drain = AdhocDrain::new();
        while !drain.is_done() {
            let raw = self.transport.read_until(DELIMITER).await?;
            if let AdhocEvent::TemporaryPower(value) = drain.feed(&raw) {
                debug!("ad-hoc temporary power update: {value}");
                self.temporary_power = Some(value);
            }
        }
        Ok(())
    }

    /// Read one frame of a multi-frame sequence.
    ///
    /// An empty read here means the device went quiet mid-sequence: the
    /// framing state is unknown and the session must be reconstructed.
    async fn read_sequence_frame(&mut self) -> Result<Vec<u8>> {
        let raw = self.transport.read_until(DELIMITER).await?;
        if raw.is_empty() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "device went quiet during a multi-frame sequence",
            )
            .into());
        }
        Ok(raw)
    }
}
