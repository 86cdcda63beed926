use std::fs;
use std::path::Path;

use crate::error::ObjectResult;

use super::codec::{decode, DecodedObject};
use super::layout::{OBJECT_SIZE, SIGNATURE, SIGNATURE_OFFSET};

/// A 500-byte window ending in the object signature.
///
/// Nothing beyond the signature is checked, so a candidate may be a false
/// positive and candidates may overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Offset of the object's first byte in the scanned buffer.
    pub offset: u64,
    pub bytes: Vec<u8>,
}

impl Candidate {
    pub fn decode(&self) -> ObjectResult<DecodedObject> {
        decode(&self.bytes)
    }
}

/// Every signature occurrence whose object would start inside the buffer,
/// in file order.
pub fn scan(buffer: &[u8]) -> Vec<Candidate> {
    let mut found = Vec::new();
    let mut from = 0;

    while let Some(pos) = find(&buffer[from..], &SIGNATURE) {
        let signature_at = from + pos;
        from = signature_at + 1;

        let Some(start) = signature_at.checked_sub(SIGNATURE_OFFSET) else {
            log::debug!("signature at 0x{signature_at:X} is too close to the start, skipping");
            continue;
        };
        found.push(Candidate {
            offset: start as u64,
            bytes: buffer[start..start + OBJECT_SIZE].to_vec(),
        });
    }

    log::debug!("{} candidate object(s) found", found.len());
    found
}

pub fn scan_file(path: impl AsRef<Path>) -> std::io::Result<Vec<Candidate>> {
    let buffer = fs::read(path)?;
    Ok(scan(&buffer))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
