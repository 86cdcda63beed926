use std::path::PathBuf;

use thiserror::Error;

use crate::fields::FieldGroup;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid hex {text:?}: {err}")]
pub struct HexError {
    pub text: String,
    #[source]
    pub err: hex::FromHexError,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid jump tag {0:?} (expected j00..j0B)")]
pub struct InvalidJumpTag(pub String);

/// Failures while growing the worker pointer table.
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to back up {path:?}: {err}")]
    Backup { path: PathBuf, err: std::io::Error },

    #[error("container is {len} bytes, expected at least {needed}")]
    Truncated { len: u64, needed: u64 },

    #[error("source worker {source_id} out of range (total workers = {total})")]
    SourceOutOfRange { source_id: u16, total: u16 },

    #[error("non-subroutine count {nonsub} exceeds total worker count {total}")]
    InconsistentCounts { total: u16, nonsub: u16 },

    #[error("clone count must be greater than zero")]
    ZeroClones,

    #[error("worker count overflow: {total} + {clones} does not fit in u16")]
    CountOverflow { total: u16, clones: u16 },

    #[error("every worker record was planned for relocation but the gap after the pointer table is still short of {needed} bytes")]
    GapExhausted { needed: u64 },

    #[error("address 0x{addr:X} cannot be expressed as a worker pointer (bias 0x{bias:X})")]
    AddressOutOfRange { addr: u64, bias: u32 },
}

pub type ContainerResult<T> = std::result::Result<T, ContainerError>;

/// Failures while encoding, decoding or writing a worker script object.
#[derive(Error, Debug)]
pub enum ObjectError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("code segment is {len} bytes, maximum is {max}")]
    Overflow { len: usize, max: usize },

    #[error("invalid hex in {field}: {source}")]
    Hex {
        field: FieldGroup,
        #[source]
        source: HexError,
    },

    #[error("worker object must be {expected} bytes, got {len}")]
    Size { len: usize, expected: usize },

    #[error("layout error: {0}")]
    Layout(#[from] binrw::Error),

    #[error("entry pointer for {field} resolves to relative offset 0x{offset:X}, outside the code segment")]
    EntryOutOfRange { field: FieldGroup, offset: u32 },

    #[error("entry pointer for {field} (0x{offset:X}) precedes the previous field start (0x{previous:X})")]
    EntryOrder {
        field: FieldGroup,
        offset: u32,
        previous: u32,
    },

    #[error("unexpected end of file reading the anchor at 0x{offset:X}")]
    ShortAnchor { offset: u64 },

    #[error("container error: {0}")]
    Container(#[from] ContainerError),
}

pub type ObjectResult<T> = std::result::Result<T, ObjectError>;

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("I/O error on {path:?}: {err}")]
    Io { path: PathBuf, err: std::io::Error },

    #[error("malformed profile {path:?}: {err}")]
    Yaml { path: PathBuf, err: serde_yaml::Error },
}
