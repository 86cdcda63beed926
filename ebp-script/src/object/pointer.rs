use super::layout::CODE_OFFSET;

/// Distance between a container's footer entry pointer and the object
/// appended after it.
pub const APPEND_ENTRY_BIAS: u32 = 0x40;

/// How code-relative offsets become the absolute pointers stored in an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPolicy {
    /// For an object appended at the end of a container. `entry_base` is
    /// derived from the container size and `file_base_offset` from the
    /// header-resident base value. The footer anchor repeats the first entry.
    Append { entry_base: u32, file_base_offset: u32 },

    /// For rewriting an object in place: every pointer is `anchor + offset`,
    /// keeping the base the engine already resolved.
    Update { anchor: u32 },
}

impl PointerPolicy {
    pub fn pointer(&self, relative: u32) -> u32 {
        match *self {
            PointerPolicy::Append {
                entry_base,
                file_base_offset,
            } => relative
                .wrapping_add(CODE_OFFSET as u32)
                .wrapping_add(entry_base)
                .wrapping_add(APPEND_ENTRY_BIAS)
                .wrapping_sub(file_base_offset),
            PointerPolicy::Update { anchor } => anchor.wrapping_add(relative),
        }
    }

    /// Value stored in the footer, given the already computed first entry.
    pub fn footer_anchor(&self, first_entry: u32) -> u32 {
        match *self {
            PointerPolicy::Append { .. } => first_entry,
            PointerPolicy::Update { anchor } => anchor,
        }
    }
}
