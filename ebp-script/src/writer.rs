//! Putting encoded worker objects into a container.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::container::{self, ContainerLayout, GrowReport, HeaderIo};
use crate::error::{ContainerError, ObjectError, ObjectResult};
use crate::fields::FieldSet;
use crate::object::layout::JUMP_TABLE_OFFSET;
use crate::object::{encode, PointerPolicy};

/// The footer entry pointer is this far before the pre-append EOF.
pub const FOOTER_ENTRY_BACK: u64 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendReport {
    /// Where the object landed.
    pub offset: u64,
    pub entry_value: u32,
    pub jump_value: u32,
    pub policy: PointerPolicy,
}

/// Appends a freshly encoded object to the end of `stream`.
///
/// The object is encoded before anything is written. The two footer pointers
/// at `EOF - footer_back` are rewritten first, then the object is appended.
pub fn append_object_stream<S: Read + Write + Seek>(
    stream: &mut S,
    fields: &FieldSet,
    layout: &ContainerLayout,
) -> ObjectResult<AppendReport> {
    let mut io = HeaderIo::new(stream, layout);
    let len = io.stream_len()?;
    let needed = (layout.base_value_off + 4)
        .max(layout.footer_back)
        .max(FOOTER_ENTRY_BACK);
    if len < needed {
        return Err(ContainerError::Truncated { len, needed }.into());
    }

    let entry_value = u32::try_from(len - FOOTER_ENTRY_BACK).map_err(|_| ContainerError::AddressOutOfRange {
        addr: len,
        bias: FOOTER_ENTRY_BACK as u32,
    })?;
    let jump_value = entry_value.wrapping_add(JUMP_TABLE_OFFSET as u32);
    let file_base_offset = io.read_base_value()?.wrapping_add(layout.code_base_bias);

    let policy = PointerPolicy::Append {
        entry_base: entry_value,
        file_base_offset,
    };
    let object = encode(fields, &policy)?;

    stream.seek(SeekFrom::Start(len - layout.footer_back))?;
    stream.write_u32::<LittleEndian>(entry_value)?;
    stream.write_u32::<LittleEndian>(jump_value)?;

    let offset = stream.seek(SeekFrom::End(0))?;
    stream.write_all(&object)?;
    stream.flush()?;

    log::info!(
        "appended object at 0x{:X} (entry 0x{:08X}, jump 0x{:08X}, base 0x{:08X})",
        offset,
        entry_value,
        jump_value,
        file_base_offset
    );

    Ok(AppendReport {
        offset,
        entry_value,
        jump_value,
        policy,
    })
}

pub fn append_object(path: impl AsRef<Path>, fields: &FieldSet, layout: &ContainerLayout) -> ObjectResult<AppendReport> {
    let mut file = OpenOptions::new().read(true).write(true).open(path.as_ref())?;
    append_object_stream(&mut file, fields, layout)
}

/// First four bytes of the object at `offset`.
pub fn read_anchor_stream<S: Read + Seek>(stream: &mut S, offset: u64) -> ObjectResult<u32> {
    stream.seek(SeekFrom::Start(offset))?;
    stream.read_u32::<LittleEndian>().map_err(|err| match err.kind() {
        ErrorKind::UnexpectedEof => ObjectError::ShortAnchor { offset },
        _ => ObjectError::Io(err),
    })
}

pub fn read_anchor(path: impl AsRef<Path>, offset: u64) -> ObjectResult<u32> {
    let mut file = File::open(path.as_ref())?;
    read_anchor_stream(&mut file, offset)
}

/// Re-encodes the object at `offset` against its own anchor and writes it
/// back.
///
/// Reading the anchor and writing the object happen in two separate file
/// sessions; the file must not change in between. Returns the anchor used.
pub fn update_object(path: impl AsRef<Path>, offset: u64, fields: &FieldSet) -> ObjectResult<u32> {
    let path = path.as_ref();
    let anchor = read_anchor(path, offset)?;
    log::debug!("anchor at 0x{offset:X} is 0x{anchor:08X}");

    let object = encode(fields, &PointerPolicy::Update { anchor })?;

    let mut file = OpenOptions::new().write(true).open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(&object)?;
    file.flush()?;

    log::info!("updated object at 0x{offset:X} in {}", path.display());
    Ok(anchor)
}

/// Growth to run before appending a new worker's object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrowRequest {
    pub clones: u16,
    pub source_id: u16,
    pub backup: bool,
}

impl Default for GrowRequest {
    fn default() -> Self {
        Self {
            clones: 1,
            source_id: 1,
            backup: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddReport {
    pub grow: Option<GrowReport>,
    pub append: AppendReport,
}

/// Adds a new worker: optionally grows the worker table, then appends the
/// object for `fields`.
///
/// The object is encoded up front so bad rows fail before the table grows.
pub fn add_worker(
    path: impl AsRef<Path>,
    fields: &FieldSet,
    layout: &ContainerLayout,
    grow: Option<GrowRequest>,
) -> ObjectResult<AddReport> {
    let path = path.as_ref();
    encode(fields, &PointerPolicy::Update { anchor: 0 })?;

    let grow = match grow {
        Some(req) => Some(container::grow(path, req.clones, req.source_id, layout, req.backup)?),
        None => None,
    };
    let append = append_object(path, fields, layout)?;
    Ok(AddReport { grow, append })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{FieldGroup, Row};
    use crate::object::{decode, OBJECT_SIZE};
    use std::io::Cursor;

    fn container(len: usize, base_value: u32) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        buf[0x70..0x74].copy_from_slice(&base_value.to_le_bytes());
        buf
    }

    fn fields() -> FieldSet {
        FieldSet::new().with_rows(FieldGroup::Init, vec![Row::code("01 02"), Row::code("03")])
    }

    #[test]
    fn append_writes_footer_then_object() {
        let layout = ContainerLayout::default();
        let mut stream = Cursor::new(container(0x200, 0x1000));
        let report = append_object_stream(&mut stream, &fields(), &layout).unwrap();
        let buf = stream.into_inner();

        assert_eq!(report.offset, 0x200);
        assert_eq!(report.entry_value, 0x200 - 64);
        assert_eq!(report.jump_value, 0x200 - 64 + 0x20);
        assert_eq!(buf.len(), 0x200 + OBJECT_SIZE);
        assert_eq!(&buf[0x200 - 20..0x200 - 16], &report.entry_value.to_le_bytes());
        assert_eq!(&buf[0x200 - 16..0x200 - 12], &report.jump_value.to_le_bytes());

        let expected_first = (0x50u32 + (0x200 - 64) + 0x40).wrapping_sub(0x1040);
        assert_eq!(&buf[0x200..0x204], &expected_first.to_le_bytes());

        let decoded = decode(&buf[0x200..]).unwrap();
        assert_eq!(decoded.anchor, expected_first);
        assert_eq!(decoded.chunk(FieldGroup::Init), &[1, 2, 3]);
    }

    #[test]
    fn pointer_bias_does_not_move_append_pointers() {
        let layout = ContainerLayout {
            pointer_bias: 0x80,
            ..ContainerLayout::default()
        };
        let mut stream = Cursor::new(container(0x200, 0x1000));
        let report = append_object_stream(&mut stream, &fields(), &layout).unwrap();
        assert_eq!(
            report.policy,
            PointerPolicy::Append {
                entry_base: 0x200 - 64,
                file_base_offset: 0x1040,
            }
        );

        let layout = ContainerLayout {
            code_base_bias: 0x20,
            ..ContainerLayout::default()
        };
        let mut stream = Cursor::new(container(0x200, 0x1000));
        let report = append_object_stream(&mut stream, &fields(), &layout).unwrap();
        assert!(matches!(
            report.policy,
            PointerPolicy::Append {
                file_base_offset: 0x1020,
                ..
            }
        ));
    }

    #[test]
    fn append_overflow_writes_nothing() {
        let layout = ContainerLayout::default();
        let original = container(0x200, 0);
        let mut stream = Cursor::new(original.clone());
        let big = FieldSet::new().with_rows(FieldGroup::Main, vec![Row::code("00".repeat(405))]);
        assert!(matches!(
            append_object_stream(&mut stream, &big, &layout),
            Err(ObjectError::Overflow { len: 405, .. })
        ));
        assert_eq!(stream.into_inner(), original);
    }

    #[test]
    fn append_to_tiny_file_is_rejected() {
        let mut stream = Cursor::new(vec![0u8; 0x40]);
        assert!(matches!(
            append_object_stream(&mut stream, &fields(), &ContainerLayout::default()),
            Err(ObjectError::Container(ContainerError::Truncated { .. }))
        ));
    }

    #[test]
    fn anchor_past_eof() {
        let mut stream = Cursor::new(vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(read_anchor_stream(&mut stream, 2).unwrap(), 0x06050403);
        assert!(matches!(
            read_anchor_stream(&mut stream, 4),
            Err(ObjectError::ShortAnchor { offset: 4 })
        ));
    }
}
