//! Multi-frame interaction sequences as explicit state machines.
//!
//! Three device commands span more than one request/response turn: the
//! ad-hoc push drain after power changes, the controller reset, and the
//! diode calibration. Each is modeled as an enumerated state plus a
//! transition function fed one delimiter-terminated frame at a time, so
//! the termination conditions and failure points are testable without a
//! transport attached. The session layer owns the read loop and simply
//! feeds frames until the machine reports completion.

use log::{debug, warn};

use crate::error::{LaserError, Result};
use crate::protocol::frame;
use crate::protocol::registers::CalibrationResult;

/// The tag on unsolicited temporary-power push frames.
pub const ADHOC_POWER_TAG: &[u8] = b"$TPP";

/// Exact echo frame expected immediately after a reset request.
pub const RESET_ECHO: &[u8] = b"!RsC\r";

/// Terminal sequence closing a reset.
pub const RESET_TERMINAL: &[u8] = b"\x00$RsC>\r";

/// Tag carrying the calibration result code.
pub const CALIBRATION_TAG: &str = "$CLD";

/// Outcome of feeding one frame to the ad-hoc drain.
#[derive(Debug, Clone, PartialEq)]
pub enum AdhocEvent {
    /// A `$TPP` push frame carried an updated temporary-power reading.
    TemporaryPower(f64),
    /// A frame with another tag was consumed and ignored.
    Ignored,
    /// The transport reported no more data; the drain is complete.
    Done,
}

/// Drains unsolicited push frames emitted after `SLP`/`TPP` commands.
///
/// The device may emit zero or more `$TPP` frames after the
/// acknowledgment; a zero-length read signals that the stream is quiet
/// again. Frames with unknown tags are consumed so they do not
/// desynchronize the request/response turn.
#[derive(Debug, Default)]
pub struct AdhocDrain {
    done: bool,
}

impl AdhocDrain {
    /// New drain, ready to consume push frames.
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a zero-length read has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Consume one frame read from the transport.
    pub fn feed(&mut self, raw: &[u8]) -> AdhocEvent {
        if raw.is_empty() {
            self.done = true;
            return AdhocEvent::Done;
        }
        if !raw.starts_with(ADHOC_POWER_TAG) {
            debug!("ignoring ad-hoc frame with unknown tag: {:?}", raw);
            return AdhocEvent::Ignored;
        }
        match frame::parse_text_reply(raw) {
            Ok(fields) => match fields.first().map(|f| f.parse::<f64>()) {
                Some(Ok(value)) => AdhocEvent::TemporaryPower(value),
                _ => {
                    warn!("unparsable $TPP payload in ad-hoc frame: {:?}", raw);
                    AdhocEvent::Ignored
                }
            },
            Err(_) => {
                warn!("malformed ad-hoc frame: {:?}", raw);
                AdhocEvent::Ignored
            }
        }
    }
}

/// States of the reset sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetState {
    /// Waiting for the immediate `!RsC` echo.
    AwaitEcho,
    /// Echo seen; accumulating frames until the terminal sequence.
    InProgress,
    /// Terminal sequence seen; reset succeeded.
    Done,
    /// The immediate reply was not the expected echo.
    Failed,
}

/// Outcome of feeding one frame to a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceProgress {
    /// Keep reading frames.
    Continue,
    /// The sequence finished with the given success flag.
    Finished(bool),
}

/// Drives the `RsC` reset exchange.
///
/// The device first echoes the command verbatim, then emits progress
/// frames until the terminal `\x00$RsC>` sequence. The loop is unbounded
/// by device design; the transport timeout is the only bound.
#[derive(Debug)]
pub struct ResetSequence {
    state: ResetState,
    accumulated: Vec<u8>,
}

impl Default for ResetSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl ResetSequence {
    /// New sequence awaiting the command echo.
    pub fn new() -> Self {
        Self {
            state: ResetState::AwaitEcho,
            accumulated: Vec::new(),
        }
    }

    /// Current state, for inspection in tests and logs.
    pub fn state(&self) -> ResetState {
        self.state
    }

    /// Consume one frame read from the transport.
    pub fn feed(&mut self, raw: &[u8]) -> SequenceProgress {
        match self.state {
            ResetState::AwaitEcho => {
                if raw == RESET_ECHO {
                    self.state = ResetState::InProgress;
                    SequenceProgress::Continue
                } else {
                    warn!("reset not echoed, got {:?}", raw);
                    self.state = ResetState::Failed;
                    SequenceProgress::Finished(false)
                }
            }
            ResetState::InProgress => {
                self.accumulated.extend_from_slice(raw);
                if self.accumulated.ends_with(RESET_TERMINAL) {
                    self.state = ResetState::Done;
                    SequenceProgress::Finished(true)
                } else {
                    SequenceProgress::Continue
                }
            }
            ResetState::Done => SequenceProgress::Finished(true),
            ResetState::Failed => SequenceProgress::Finished(false),
        }
    }
}

/// States of the diode calibration sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    /// Request not yet acknowledged.
    Init,
    /// Acknowledged; waiting for the calibration-initiated confirmation.
    Started,
    /// Accumulating frames until the `$CLD` result tag.
    Running,
    /// Result code received and decoded.
    Complete,
    /// The device rejected the calibration request.
    Failed,
}

/// Outcome of feeding one frame to the calibration sequence.
#[derive(Debug)]
pub enum CalibrationProgress {
    /// Keep reading frames.
    Continue,
    /// The result tag was seen and its code decoded (or rejected).
    Finished(Result<CalibrationResult>),
}

/// Drives the `CLD` diode calibration exchange.
#[derive(Debug)]
pub struct CalibrationSequence {
    state: CalibrationState,
    accumulated: String,
}

impl Default for CalibrationSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationSequence {
    /// New sequence awaiting the acknowledgment.
    pub fn new() -> Self {
        Self {
            state: CalibrationState::Init,
            accumulated: String::new(),
        }
    }

    /// Current state, for inspection in tests and logs.
    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// Record whether the device acknowledged the calibration request.
    ///
    /// A rejected request abandons the sequence with
    /// [`CalibrationResult::UnknownError`].
    pub fn acknowledge(&mut self, acknowledged: bool) -> Option<CalibrationResult> {
        if acknowledged {
            self.state = CalibrationState::Started;
            None
        } else {
            warn!("calibration request not acknowledged");
            self.state = CalibrationState::Failed;
            Some(CalibrationResult::UnknownError)
        }
    }

    /// Consume one frame read from the transport.
    pub fn feed(&mut self, raw: &[u8]) -> CalibrationProgress {
        match self.state {
            CalibrationState::Init | CalibrationState::Failed => {
                CalibrationProgress::Finished(Ok(CalibrationResult::UnknownError))
            }
            CalibrationState::Started => {
                // Calibration-initiated confirmation; observed, not parsed.
                debug!("calibration started: {:?}", raw);
                self.state = CalibrationState::Running;
                CalibrationProgress::Continue
            }
            CalibrationState::Running => {
                self.accumulated.extend(raw.iter().map(|&b| b as char));
                match self.accumulated.find(CALIBRATION_TAG) {
                    None => CalibrationProgress::Continue,
                    Some(pos) => {
                        let tail = &self.accumulated[pos + CALIBRATION_TAG.len()..];
                        let code_text = tail.trim_matches(|c| c == '\r' || c == '|');
                        if code_text.is_empty() {
                            // Tag seen but the code has not arrived yet.
                            return CalibrationProgress::Continue;
                        }
                        let outcome = match code_text.parse::<i64>() {
                            Ok(code) => CalibrationResult::from_code(code),
                            Err(_) => Err(LaserError::Malformed(format!(
                                "calibration result code is not an integer: {code_text:?}"
                            ))),
                        };
                        self.state = CalibrationState::Complete;
                        CalibrationProgress::Finished(outcome)
                    }
                }
            }
            CalibrationState::Complete => {
                CalibrationProgress::Finished(Ok(CalibrationResult::UnknownError))
            }
        }
    }
}
