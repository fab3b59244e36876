//! Wire frame codec.
//!
//! Every outbound frame is `?` + 3-character mnemonic + optional value +
//! `|` + carriage-return. Every inbound frame is terminated by a
//! carriage-return and echoes a 4-character prefix (a status character
//! plus the responding mnemonic) ahead of the payload. Text replies carry
//! `|`-delimited fields; binary replies carry packed register bytes with
//! no delimiters.
//!
//! The codec never assumes a length-prefixed frame: delimiter scanning is
//! the transport's job. It is however robust to replies carrying fewer
//! payload bytes than expected; interpreting short payloads is left to
//! the register decoders' callers.

use crate::error::{LaserError, Result};

/// Frame terminator on both directions of the wire.
pub const TERMINATOR: u8 = b'\r';

/// Field separator in text replies and outbound frames.
pub const SEPARATOR: u8 = b'|';

/// Length of the echoed reply prefix (status character + mnemonic).
const PREFIX_LEN: usize = 4;

/// Minimum parsable reply: 4-character prefix plus terminator.
const MIN_REPLY_LEN: usize = PREFIX_LEN + 1;

/// Build a query frame for a 3-character mnemonic: `?GFw|\r`.
pub fn build_query(mnemonic: &[u8; 3]) -> Vec<u8> {
    build_set(mnemonic, b"")
}

/// Build a set frame carrying a value payload: `?SLP64|\r`.
pub fn build_set(mnemonic: &[u8; 3], value: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(3 + value.len() + 3);
    frame.push(b'?');
    frame.extend_from_slice(mnemonic);
    frame.extend_from_slice(value);
    frame.push(SEPARATOR);
    frame.push(TERMINATOR);
    frame
}

/// Parse a text reply into its ordered `|`-delimited fields.
///
/// Strips the trailing carriage-return, decodes the frame as Latin-1
/// (one byte per character, always valid) and discards the 4-character
/// echoed prefix before splitting.
pub fn parse_text_reply(raw: &[u8]) -> Result<Vec<String>> {
    let payload = reply_payload(raw)?;
    let text: String = payload.iter().map(|&b| b as char).collect();
    Ok(text.split(SEPARATOR as char).map(str::to_string).collect())
}

/// Parse a binary reply, returning the payload bytes unconverted.
///
/// Used when the reply carries packed register bytes rather than
/// delimited text fields.
pub fn parse_binary_reply(raw: &[u8]) -> Result<Vec<u8>> {
    Ok(reply_payload(raw)?.to_vec())
}

/// Payload between the echoed prefix and the trailing terminator.
fn reply_payload(raw: &[u8]) -> Result<&[u8]> {
    if raw.len() < MIN_REPLY_LEN {
        return Err(LaserError::Malformed(format!(
            "reply of {} bytes is shorter than the {}-byte minimum",
            raw.len(),
            MIN_REPLY_LEN
        )));
    }
    Ok(&raw[PREFIX_LEN..raw.len() - 1])
}
