use std::collections::BTreeMap;
use std::io::Cursor;
use std::ops::Range;

use binrw::{BinRead, BinWrite};

use crate::disasm::{disassemble, CommandDictionary};
use crate::error::{ObjectError, ObjectResult};
use crate::fields::{le_table, AssembledCode, FieldGroup, FieldSet, JumpTag, FIELD_COUNT, JUMP_TAG_COUNT};

use super::layout::{RawWorkerObject, CODE_CAPACITY, FILL_BYTE, OBJECT_SIZE};
use super::pointer::PointerPolicy;

/// Packs a field set into a 500-byte object.
///
/// Fails without producing anything if a row holds invalid hex or the code
/// does not fit the code segment.
pub fn encode(fields: &FieldSet, policy: &PointerPolicy) -> ObjectResult<Vec<u8>> {
    let assembled = fields.assemble()?;
    encode_assembled(&assembled, policy)
}

pub fn encode_assembled(assembled: &AssembledCode, policy: &PointerPolicy) -> ObjectResult<Vec<u8>> {
    let len = assembled.code.len();
    if len > CODE_CAPACITY {
        return Err(ObjectError::Overflow {
            len,
            max: CODE_CAPACITY,
        });
    }

    let mut raw = RawWorkerObject::blank();
    raw.entries = assembled.entry_offsets.map(|off| policy.pointer(off));
    raw.jumps = assembled
        .jump_offsets
        .map(|off| off.map_or(0, |off| policy.pointer(off)));
    raw.code[..len].copy_from_slice(&assembled.code);
    raw.anchor = policy.footer_anchor(raw.entries[0]);

    let mut out = Cursor::new(Vec::with_capacity(OBJECT_SIZE));
    raw.write(&mut out)?;
    Ok(out.into_inner())
}

/// An object unpacked into code-relative terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedObject {
    pub anchor: u32,
    pub entry_pointers: [u32; FIELD_COUNT],
    pub jump_pointers: [u32; JUMP_TAG_COUNT],
    /// Start of each field inside the code segment.
    pub entry_offsets: [u32; FIELD_COUNT],
    /// Jump targets keyed by code segment offset. Zero pointers are unset.
    pub tags: BTreeMap<u32, JumpTag>,
    /// The whole code segment, fill included.
    pub code: Vec<u8>,
    /// End of the code proper. The object does not store it; it is the
    /// segment length minus the trailing fill, but never less than the last
    /// field start.
    pub code_len: usize,
}

impl DecodedObject {
    pub fn chunk_range(&self, field: FieldGroup) -> Range<usize> {
        let i = field.index();
        let start = self.entry_offsets[i] as usize;
        let end = match self.entry_offsets.get(i + 1) {
            Some(next) => *next as usize,
            None => self.code_len,
        };
        start..end.max(start)
    }

    pub fn chunk(&self, field: FieldGroup) -> &[u8] {
        &self.code[self.chunk_range(field)]
    }

    /// Disassembles every field into editor rows.
    ///
    /// A jump target at the very end of the code lands on a tagged empty row
    /// of the last field.
    pub fn to_field_set(&self, dictionary: &CommandDictionary) -> FieldSet {
        let mut fields = FieldSet::new();
        for field in FieldGroup::all() {
            let range = self.chunk_range(field);
            let last = field.index() == FIELD_COUNT - 1;
            let rows = disassemble(&self.code[range.clone()], range.start as u32, last, &self.tags, dictionary);
            fields.set_rows(field, rows);
        }
        fields
    }

    pub fn entry_table(&self) -> String {
        le_table(&self.entry_pointers)
    }

    pub fn jump_table(&self) -> String {
        le_table(&self.jump_pointers)
    }
}

/// Unpacks a 500-byte object.
///
/// Entry pointers must resolve, relative to the footer anchor, to
/// non-decreasing offsets inside the code segment.
pub fn decode(buffer: &[u8]) -> ObjectResult<DecodedObject> {
    if buffer.len() != OBJECT_SIZE {
        return Err(ObjectError::Size {
            len: buffer.len(),
            expected: OBJECT_SIZE,
        });
    }
    let raw = RawWorkerObject::read(&mut Cursor::new(buffer))?;
    let anchor = raw.anchor;

    let mut entry_offsets = [0u32; FIELD_COUNT];
    let mut previous = 0u32;
    for field in FieldGroup::all() {
        let offset = raw.entries[field.index()].wrapping_sub(anchor);
        if offset as usize > CODE_CAPACITY {
            return Err(ObjectError::EntryOutOfRange { field, offset });
        }
        if offset < previous {
            return Err(ObjectError::EntryOrder {
                field,
                offset,
                previous,
            });
        }
        entry_offsets[field.index()] = offset;
        previous = offset;
    }

    let mut tags = BTreeMap::new();
    for (tag, pointer) in JumpTag::all().zip(raw.jumps) {
        if pointer != 0 {
            tags.insert(pointer.wrapping_sub(anchor), tag);
        }
    }

    let fill = raw.code.iter().rev().take_while(|b| **b == FILL_BYTE).count();
    let code_len = (CODE_CAPACITY - fill).max(previous as usize);

    Ok(DecodedObject {
        anchor,
        entry_pointers: raw.entries,
        jump_pointers: raw.jumps,
        entry_offsets,
        tags,
        code: raw.code.to_vec(),
        code_len,
    })
}
