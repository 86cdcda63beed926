//! ebp-script
//!
//! Structural editing of `.ebp` worker containers: growing the worker pointer
//! table in place, and packing/unpacking the 500-byte worker script objects
//! stored in the container.
//!
//! Offsets default to the shipped format; see [`container::ContainerLayout`]
//! for overriding them.

pub mod container;
pub mod disasm;
pub mod error;
pub mod fields;
pub mod object;
pub mod profile;
pub mod writer;

pub use container::{grow, ContainerLayout, GrowReport};
pub use disasm::{disassemble, CommandDictionary};
pub use error::{ContainerError, ContainerResult, HexError, ObjectError, ObjectResult, ProfileError};
pub use fields::{compute_offsets, FieldGroup, FieldSet, JumpTag, Row, TableSummary};
pub use object::{decode, encode, scan, Candidate, DecodedObject, PointerPolicy};
pub use writer::{add_worker, append_object, read_anchor, update_object, AddReport, AppendReport, GrowRequest};
