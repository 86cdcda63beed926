#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const RECORD: usize = 52;
pub const TABLE: usize = 0x78;
pub const BIAS: u32 = 0x40;

/// A synthetic container: header, pointer table, `slack` free bytes, the
/// worker records, `body`, then a 64-byte tail for the footer pointers.
pub struct Fixture {
    pub bytes: Vec<u8>,
    pub body_off: usize,
}

pub fn record_bytes(id: usize) -> Vec<u8> {
    (0..RECORD).map(|i| 0x20 + ((id * 7 + i) % 0x40) as u8).collect()
}

pub fn build(total: u16, nonsub: u16, slack: usize, body: &[u8]) -> Fixture {
    let table_end = TABLE + total as usize * 4;
    let mut bytes = vec![0x11u8; TABLE];
    bytes[0x70..0x74].copy_from_slice(&0x100u32.to_le_bytes());
    bytes[0x74..0x76].copy_from_slice(&total.to_le_bytes());
    bytes[0x76..0x78].copy_from_slice(&nonsub.to_le_bytes());

    let first_record = table_end + slack;
    for i in 0..total as usize {
        let loc = (first_record + i * RECORD) as u32;
        bytes.extend((loc - BIAS).to_le_bytes());
    }
    bytes.resize(first_record, 0);
    for i in 0..total as usize {
        bytes.extend(record_bytes(i));
    }
    let body_off = bytes.len();
    bytes.extend_from_slice(body);
    bytes.extend([0u8; 64]);
    Fixture { bytes, body_off }
}

pub fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

pub fn counts(bytes: &[u8]) -> (u16, u16) {
    (
        u16::from_le_bytes([bytes[0x74], bytes[0x75]]),
        u16::from_le_bytes([bytes[0x76], bytes[0x77]]),
    )
}

pub fn pointers(bytes: &[u8]) -> Vec<u32> {
    let (total, _) = counts(bytes);
    (0..total as usize)
        .map(|i| u32::from_le_bytes(bytes[TABLE + i * 4..TABLE + i * 4 + 4].try_into().unwrap()))
        .collect()
}

pub fn record_at(bytes: &[u8], pointer: u32) -> &[u8] {
    let at = (pointer + BIAS) as usize;
    &bytes[at..at + RECORD]
}
