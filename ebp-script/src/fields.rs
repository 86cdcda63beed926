//! Editable form of a worker script: eight named field groups, each an ordered
//! list of `(tag, hex text)` rows.

use std::fmt;
use std::str::FromStr;

use enum_map::{Enum, EnumMap};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::disasm::display::{decode_hex, estimate_len};
use crate::error::{HexError, InvalidJumpTag, ObjectError, ObjectResult};

/// Rows a single field group can hold.
pub const ROW_CAPACITY: usize = 24;

pub const FIELD_COUNT: usize = 8;

/// Named jump targets, `j00` through `j0B`.
pub const JUMP_TAG_COUNT: usize = 12;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Enum,
    EnumIter,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldGroup {
    Init,
    Main,
    Talk,
    Scout,
    Cross,
    Touch,
    E06,
    E07,
}

impl FieldGroup {
    /// Position in the entry pointer table.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// All groups in on-disk order.
    pub fn all() -> impl Iterator<Item = FieldGroup> {
        FieldGroup::iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JumpTag(u8);

impl JumpTag {
    pub fn new(index: usize) -> Option<Self> {
        (index < JUMP_TAG_COUNT).then_some(Self(index as u8))
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn all() -> impl Iterator<Item = JumpTag> {
        (0..JUMP_TAG_COUNT as u8).map(JumpTag)
    }
}

impl fmt::Display for JumpTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "j{:02X}", self.0)
    }
}

impl FromStr for JumpTag {
    type Err = InvalidJumpTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidJumpTag(s.to_string());
        let digits = s
            .strip_prefix('j')
            .or_else(|| s.strip_prefix('J'))
            .ok_or_else(invalid)?;
        if digits.len() != 2 {
            return Err(invalid());
        }
        let index = u8::from_str_radix(digits, 16).map_err(|_| invalid())?;
        JumpTag::new(index as usize).ok_or_else(invalid)
    }
}

impl TryFrom<String> for JumpTag {
    type Error = InvalidJumpTag;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<JumpTag> for String {
    fn from(tag: JumpTag) -> Self {
        tag.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<JumpTag>,
    #[serde(default)]
    pub text: String,
}

impl Row {
    pub fn new(tag: Option<JumpTag>, text: impl Into<String>) -> Self {
        Self {
            tag,
            text: text.into(),
        }
    }

    pub fn code(text: impl Into<String>) -> Self {
        Self::new(None, text)
    }

    pub fn tagged(tag: JumpTag, text: impl Into<String>) -> Self {
        Self::new(Some(tag), text)
    }

    pub fn is_empty(&self) -> bool {
        self.tag.is_none() && self.text.trim().is_empty()
    }

    /// Byte contribution used for offset bookkeeping (`ceil(hex chars / 2)`).
    pub fn estimated_len(&self) -> u32 {
        estimate_len(&self.text)
    }

    /// Strictly decoded bytes.
    pub fn bytes(&self) -> Result<Vec<u8>, HexError> {
        decode_hex(&self.text)
    }
}

/// Code bytes of every field concatenated in field order, with the offsets
/// the pointer tables are built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledCode {
    pub code: Vec<u8>,
    pub entry_offsets: [u32; FIELD_COUNT],
    /// First row carrying each tag; `None` when no row uses it.
    pub jump_offsets: [Option<u32>; JUMP_TAG_COUNT],
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    groups: EnumMap<FieldGroup, Vec<Row>>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self, field: FieldGroup) -> &[Row] {
        &self.groups[field]
    }

    /// Replaces a field's rows. Rows past [`ROW_CAPACITY`] are dropped; the
    /// number dropped is returned.
    pub fn set_rows(&mut self, field: FieldGroup, mut rows: Vec<Row>) -> usize {
        let dropped = rows.len().saturating_sub(ROW_CAPACITY);
        if dropped > 0 {
            log::warn!(
                "{}: {} rows exceed the capacity of {}, dropping {}",
                field,
                rows.len(),
                ROW_CAPACITY,
                dropped
            );
            rows.truncate(ROW_CAPACITY);
        }
        self.groups[field] = rows;
        dropped
    }

    pub fn with_rows(mut self, field: FieldGroup, rows: Vec<Row>) -> Self {
        self.set_rows(field, rows);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldGroup, &[Row])> {
        self.groups.iter().map(|(field, rows)| (field, rows.as_slice()))
    }

    /// Strictly decodes every row and concatenates the result in field order.
    pub fn assemble(&self) -> ObjectResult<AssembledCode> {
        let mut code = Vec::new();
        let mut entry_offsets = [0u32; FIELD_COUNT];
        let mut jump_offsets = [None; JUMP_TAG_COUNT];

        for (field, rows) in self.iter() {
            entry_offsets[field.index()] = code.len() as u32;
            for row in rows {
                if let Some(tag) = row.tag {
                    let slot = &mut jump_offsets[tag.index()];
                    if slot.is_none() {
                        *slot = Some(code.len() as u32);
                    }
                }
                let bytes = row
                    .bytes()
                    .map_err(|source| ObjectError::Hex { field, source })?;
                code.extend_from_slice(&bytes);
            }
        }

        Ok(AssembledCode {
            code,
            entry_offsets,
            jump_offsets,
        })
    }
}

/// Start offset of every row, cumulative across all fields in field order,
/// using the row-length estimator.
pub fn compute_offsets(fields: &FieldSet) -> EnumMap<FieldGroup, Vec<u32>> {
    let mut offsets: EnumMap<FieldGroup, Vec<u32>> = EnumMap::default();
    let mut running = 0u32;
    for (field, rows) in fields.iter() {
        for row in rows {
            offsets[field].push(running);
            running = running.wrapping_add(row.estimated_len());
        }
    }
    offsets
}

/// Relative entry and jump offsets as shown in the editor footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSummary {
    pub entry_offsets: [u32; FIELD_COUNT],
    /// Unused tags report zero.
    pub jump_offsets: [u32; JUMP_TAG_COUNT],
}

impl TableSummary {
    pub fn compute(fields: &FieldSet) -> Self {
        let mut entry_offsets = [0u32; FIELD_COUNT];
        let mut jump_offsets: [Option<u32>; JUMP_TAG_COUNT] = [None; JUMP_TAG_COUNT];
        let mut running = 0u32;

        for (field, rows) in fields.iter() {
            entry_offsets[field.index()] = running;
            for row in rows {
                if let Some(tag) = row.tag {
                    jump_offsets[tag.index()].get_or_insert(running);
                }
                running = running.wrapping_add(row.estimated_len());
            }
        }

        Self {
            entry_offsets,
            jump_offsets: jump_offsets.map(|off| off.unwrap_or(0)),
        }
    }

    pub fn entry_table(&self) -> String {
        le_table(&self.entry_offsets)
    }

    pub fn jump_table(&self) -> String {
        le_table(&self.jump_offsets)
    }
}

pub(crate) fn le_table(values: &[u32]) -> String {
    values
        .iter()
        .map(|v| hex::encode_upper(v.to_le_bytes()))
        .join("  ")
}

/// Row offset label: big-endian hex, at least two bytes wide.
pub fn format_row_offset(offset: u32) -> String {
    let significant = (32 - offset.leading_zeros()).div_ceil(8) as usize;
    let width = significant.max(2);
    offset.to_be_bytes()[4 - width..]
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tag(i: usize) -> JumpTag {
        JumpTag::new(i).unwrap()
    }

    #[test]
    fn field_names_follow_disk_order() {
        let names: Vec<String> = FieldGroup::all().map(|f| f.to_string()).collect();
        assert_eq!(names, ["INIT", "MAIN", "TALK", "SCOUT", "CROSS", "TOUCH", "E06", "E07"]);
        assert_eq!("scout".parse::<FieldGroup>().unwrap(), FieldGroup::Scout);
        assert_eq!(FieldGroup::E07.index(), 7);
    }

    #[test]
    fn jump_tag_text_form() {
        assert_eq!(tag(11).to_string(), "j0B");
        assert_eq!("j0a".parse::<JumpTag>().unwrap(), tag(10));
        assert!("j0C".parse::<JumpTag>().is_err());
        assert!("x01".parse::<JumpTag>().is_err());
        assert!("j1".parse::<JumpTag>().is_err());
    }

    #[test]
    fn assemble_tracks_entries_and_first_tag() {
        let fields = FieldSet::new()
            .with_rows(
                FieldGroup::Init,
                vec![Row::code("01 0203"), Row::tagged(tag(0), "04")],
            )
            .with_rows(
                FieldGroup::Talk,
                vec![Row::tagged(tag(0), "05"), Row::tagged(tag(3), "0607")],
            );
        let asm = fields.assemble().unwrap();
        assert_eq!(asm.code, vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(asm.entry_offsets, [0, 4, 4, 7, 7, 7, 7, 7]);
        assert_eq!(asm.jump_offsets[0], Some(3));
        assert_eq!(asm.jump_offsets[3], Some(5));
        assert_eq!(asm.jump_offsets[1], None);
    }

    #[test]
    fn assemble_rejects_odd_hex_with_field_name() {
        let fields = FieldSet::new().with_rows(FieldGroup::Main, vec![Row::code("ABC")]);
        match fields.assemble() {
            Err(ObjectError::Hex { field, .. }) => assert_eq!(field, FieldGroup::Main),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn set_rows_truncates_to_capacity() {
        let mut fields = FieldSet::new();
        let dropped = fields.set_rows(FieldGroup::Init, vec![Row::code("00"); 30]);
        assert_eq!(dropped, 6);
        assert_eq!(fields.rows(FieldGroup::Init).len(), ROW_CAPACITY);
    }

    #[test]
    fn offsets_use_rounded_up_estimate() {
        let fields = FieldSet::new()
            .with_rows(FieldGroup::Init, vec![Row::code("ABC"), Row::code("01 02")])
            .with_rows(FieldGroup::Main, vec![Row::code("FF")]);
        let offsets = compute_offsets(&fields);
        assert_eq!(offsets[FieldGroup::Init], vec![0, 2]);
        assert_eq!(offsets[FieldGroup::Main], vec![4]);
        assert!(offsets[FieldGroup::Talk].is_empty());
    }

    #[test]
    fn table_summary_is_little_endian_hex() {
        let fields = FieldSet::new()
            .with_rows(FieldGroup::Init, vec![Row::code("00".repeat(0x12))])
            .with_rows(FieldGroup::Main, vec![Row::tagged(tag(1), "AA")]);
        let summary = TableSummary::compute(&fields);
        let entries = summary.entry_table();
        assert!(entries.starts_with("00000000  12000000  13000000"));
        let table = summary.jump_table();
        let jumps: Vec<&str> = table.split("  ").collect();
        assert_eq!(jumps.len(), JUMP_TAG_COUNT);
        assert_eq!(jumps[0], "00000000");
        assert_eq!(jumps[1], "12000000");
    }

    #[test]
    fn row_offset_label_width() {
        assert_eq!(format_row_offset(0), "0000");
        assert_eq!(format_row_offset(0x1F), "001F");
        assert_eq!(format_row_offset(0x12345), "012345");
    }

    #[test]
    fn rows_round_trip_through_yaml() {
        let rows = vec![Row::tagged(tag(2), "A0 01"), Row::code("")];
        let text = serde_yaml::to_string(&rows).unwrap();
        assert!(text.contains("j02"));
        let back: Vec<Row> = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back, rows);
    }
}
