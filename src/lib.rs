//! Protocol driver for Omicron LuxX/PhoxX laser and LED controllers.
//!
//! The controller speaks a line-oriented ASCII protocol over serial (or a
//! serial-over-TCP bridge): requests are `?` + 3-character mnemonic +
//! optional value + `|` + CR, replies echo a 4-character prefix and are
//! CR-terminated. This crate provides the full client side of that
//! protocol:
//!
//! - [`protocol::frame`] — request framing and reply parsing;
//! - [`protocol::registers`] — bit-field views over the 2-byte
//!   status/failure/mode registers, including the round-trippable
//!   operating mode encoder;
//! - [`protocol::sequence`] — the multi-frame exchanges (reset, diode
//!   calibration, ad-hoc push drain) as explicit state machines;
//! - [`laser`] — the [`OmicronLaser`] session owning the transport and
//!   exposing the operation surface;
//! - [`transport`] — the serial / TCP / mock transports;
//! - [`config`] — TOML + environment settings for the transport.
//!
//! Sessions are strictly half-duplex with one outstanding request; see
//! the [`laser`] module docs for the concurrency contract.

pub mod config;
pub mod error;
pub mod laser;
pub mod protocol;
pub mod transport;

pub use error::{LaserError, Result};
pub use laser::{DeviceIdentity, OmicronLaser};
pub use protocol::registers::{
    CalibrationResult, LatchedFailureRegister, OperationMode, StatusRegister,
};
pub use transport::{MockTransport, TcpTransport, Transport};

#[cfg(feature = "serial")]
pub use transport::SerialTransport;
