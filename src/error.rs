//! Custom error types for the driver.
//!
//! This module defines the primary error type, `LaserError`, for the whole
//! crate. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the failure modes of the device protocol:
//!
//! - **`Transport`**: wraps `std::io::Error` from the transport boundary
//!   (serial port or TCP socket). Never retried internally.
//! - **`Malformed`**: a reply frame too short to contain the echoed
//!   mnemonic prefix and terminator, or missing an expected field. A
//!   session that produced this should be considered suspect, since the
//!   framing position on the wire may be desynchronized.
//! - **`InvalidCalibrationCode`**: the diode-calibration sequence ended
//!   with an integer outside the known result codes. Deliberately not
//!   coerced to a default outcome.
//! - **`InitializationFailed`**: one of the identity exchanges during
//!   session construction failed. Fatal; the session is unusable.
//! - **`Config`**: wraps errors from the `config` crate when loading the
//!   transport settings file.
//!
//! A negative acknowledgment (the device answering anything other than
//! `>` to a set command) is *not* an error: it is an ordinary negative
//! outcome and surfaces as `Ok(false)` from the corresponding operation.

use thiserror::Error;

/// Convenience alias for results using the driver error type.
pub type Result<T> = std::result::Result<T, LaserError>;

/// Errors produced by the protocol driver.
#[derive(Error, Debug)]
pub enum LaserError {
    /// Read or write failure at the transport boundary.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Reply frame too short or missing expected delimiters/fields.
    #[error("malformed reply: {0}")]
    Malformed(String),

    /// Calibration finished with a result code outside the known range.
    #[error("unknown calibration result code {0}")]
    InvalidCalibrationCode(i64),

    /// An identity exchange failed while constructing the session.
    #[error("device initialization failed during {exchange} exchange: {source}")]
    InitializationFailed {
        /// Mnemonic of the identity exchange that failed.
        exchange: &'static str,
        /// Underlying protocol or transport error.
        #[source]
        source: Box<LaserError>,
    },

    /// Configuration file or environment parsing error.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl LaserError {
    /// Wrap an error from an identity exchange performed at session start.
    pub(crate) fn during_init(exchange: &'static str, source: LaserError) -> Self {
        LaserError::InitializationFailed {
            exchange,
            source: Box::new(source),
        }
    }
}
