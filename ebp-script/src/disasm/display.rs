//! Text form of code bytes as shown in the row editor.
//!
//! Row text always carries every byte; [`display_row_text`] is the only
//! lossy view and is never stored.

use crate::error::HexError;

/// Shortest run of fill bytes that gets collapsed in row text.
pub const COLLAPSE_MIN_RUN: usize = 11;

/// Hex digits per display cluster (three bytes).
const CLUSTER_DIGITS: usize = 6;

/// Decodes row text, ignoring all whitespace.
pub fn decode_hex(text: &str) -> Result<Vec<u8>, HexError> {
    let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(digits).map_err(|err| HexError {
        text: text.to_string(),
        err,
    })
}

/// Byte length of a row for offset bookkeeping: hex digits without spaces,
/// halved and rounded up. An odd digit count is accepted here even though
/// [`decode_hex`] rejects it.
pub fn estimate_len(text: &str) -> u32 {
    let digits = text.chars().filter(|c| *c != ' ').count() as u32;
    digits.div_ceil(2)
}

pub fn hex_upper(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

/// Splits a hex string into three-byte clusters counted from the right:
/// `A1B2C3D4` becomes `A1 B2C3D4`.
pub fn group_hex(hex: &str) -> String {
    let len = hex.len();
    let mut out = String::with_capacity(len + len / CLUSTER_DIGITS);
    for (i, ch) in hex.chars().enumerate() {
        if i > 0 && (len - i) % CLUSTER_DIGITS == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

/// Replaces every run of at least [`COLLAPSE_MIN_RUN`] `fill` bytes with a
/// single `fill` byte. Lossy; display only.
pub fn collapse_padding(bytes: &[u8], fill: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != fill {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let run = bytes[i..].iter().take_while(|b| **b == fill).count();
        if run >= COLLAPSE_MIN_RUN {
            out.push(fill);
        } else {
            out.extend_from_slice(&bytes[i..i + run]);
        }
        i += run;
    }
    out
}

/// Row text for `bytes`: every byte kept, grouped into clusters.
pub fn format_row_bytes(bytes: &[u8]) -> String {
    group_hex(&hex_upper(bytes))
}

/// Row text as shown in listings, with long `fill` runs collapsed. Text that
/// is not valid hex is shown unchanged.
pub fn display_row_text(text: &str, fill: u8) -> String {
    match decode_hex(text) {
        Ok(bytes) => format_row_bytes(&collapse_padding(&bytes, fill)),
        Err(_) => text.to_string(),
    }
}
