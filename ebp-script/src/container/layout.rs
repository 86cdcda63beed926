use serde::{Deserialize, Serialize};

/// Byte positions of the container header fields.
///
/// The defaults describe the shipped `.ebp` format; a config file may
/// override any of them for variants of the format.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerLayout {
    /// Total worker count (u16). The non-subroutine count (u16) follows it.
    pub worker_count_off: u64,

    /// Added to a pointer table entry to get the record's file offset.
    pub pointer_bias: u32,

    /// Size of one worker data record.
    pub record_size: u32,

    /// Header fields cleared after the pointer table grows, as
    /// `(offset, width)` pairs.
    pub aux_fields: Vec<(u64, u8)>,

    /// u32 base value the append policy derives `file_base_offset` from.
    pub base_value_off: u64,

    /// Added to the base value to get `file_base_offset`.
    pub code_base_bias: u32,

    /// Distance from EOF to the two footer pointers.
    pub footer_back: u64,

    /// Byte preceding every encoded worker id in the file body.
    pub id_marker: u8,
}

impl Default for ContainerLayout {
    fn default() -> Self {
        Self {
            worker_count_off: 0x74,
            pointer_bias: 0x40,
            record_size: 52,
            aux_fields: vec![(0x52, 4), (0x56, 2), (0x5A, 4)],
            base_value_off: 0x70,
            code_base_bias: 0x40,
            footer_back: 20,
            id_marker: 0xB3,
        }
    }
}

impl ContainerLayout {
    #[inline]
    pub fn nonsub_count_off(&self) -> u64 {
        self.worker_count_off + 2
    }

    #[inline]
    pub fn pointer_table_off(&self) -> u64 {
        self.worker_count_off + 4
    }

    #[inline]
    pub fn pointer_slot(&self, index: u16) -> u64 {
        self.pointer_table_off() + index as u64 * 4
    }

    /// First byte past a pointer table of `count` entries.
    #[inline]
    pub fn pointer_table_end(&self, count: u16) -> u64 {
        self.pointer_slot(count)
    }

    /// File offset a pointer value refers to.
    #[inline]
    pub fn record_location(&self, pointer: u32) -> u64 {
        pointer as u64 + self.pointer_bias as u64
    }

    /// Smallest file size that holds the header and its pointer table.
    pub fn header_len(&self, count: u16) -> u64 {
        let aux_end = self
            .aux_fields
            .iter()
            .map(|(off, width)| off + *width as u64)
            .max()
            .unwrap_or(0);
        self.pointer_table_end(count)
            .max(aux_end)
            .max(self.base_value_off + 4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_offsets() {
        let layout = ContainerLayout::default();
        assert_eq!(layout.nonsub_count_off(), 0x76);
        assert_eq!(layout.pointer_table_off(), 0x78);
        assert_eq!(layout.pointer_slot(3), 0x84);
        assert_eq!(layout.record_location(0x100), 0x140);
        assert_eq!(layout.header_len(0), 0x78);
        assert_eq!(layout.header_len(2), 0x80);
    }

    #[test]
    fn partial_override_keeps_defaults() {
        let layout: ContainerLayout = toml::from_str("record_size = 64\nid_marker = 0xB4\n").unwrap();
        assert_eq!(layout.record_size, 64);
        assert_eq!(layout.id_marker, 0xB4);
        assert_eq!(layout.worker_count_off, 0x74);
    }
}
