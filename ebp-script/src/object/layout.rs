//! Fixed layout of a worker script object.
//!
//! ```text
//! 0x000  entry pointers   8 x u32
//! 0x020  jump pointers   12 x u32
//! 0x050  code            404 bytes, unused tail filled with 0x3C
//! 0x1E4  anchor          u32
//! 0x1E8  signature       12 bytes
//! ```

use binrw::binrw;

use crate::fields::{FIELD_COUNT, JUMP_TAG_COUNT};

pub const OBJECT_SIZE: usize = 500;

pub const ENTRY_TABLE_OFFSET: usize = 0x00;
pub const JUMP_TABLE_OFFSET: usize = 0x20;
pub const CODE_OFFSET: usize = 0x50;
pub const FOOTER_OFFSET: usize = OBJECT_SIZE - 16;
pub const SIGNATURE_OFFSET: usize = FOOTER_OFFSET + 4;

pub const CODE_CAPACITY: usize = FOOTER_OFFSET - CODE_OFFSET;

pub const FILL_BYTE: u8 = 0x3C;

pub const SIGNATURE_LEN: usize = 12;
pub const SIGNATURE: [u8; SIGNATURE_LEN] = [
    0x81, 0x82, 0x83, 0x80, 0x71, 0x72, 0x73, 0x70, 0x61, 0x62, 0x63, 0x60,
];

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawWorkerObject {
    pub entries: [u32; FIELD_COUNT],
    pub jumps: [u32; JUMP_TAG_COUNT],
    pub code: [u8; CODE_CAPACITY],
    pub anchor: u32,
    #[br(assert(signature == SIGNATURE))]
    pub signature: [u8; SIGNATURE_LEN],
}

impl RawWorkerObject {
    /// All pointers zero, code filled, signature in place.
    pub fn blank() -> Self {
        Self {
            entries: [0; FIELD_COUNT],
            jumps: [0; JUMP_TAG_COUNT],
            code: [FILL_BYTE; CODE_CAPACITY],
            anchor: 0,
            signature: SIGNATURE,
        }
    }
}
