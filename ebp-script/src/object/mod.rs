//! The 500-byte worker script object: layout, pointer policies, packing and
//! locating objects inside a container.

pub mod codec;
pub mod layout;
pub mod pointer;
pub mod scanner;

pub use codec::{decode, encode, DecodedObject};
pub use layout::{RawWorkerObject, OBJECT_SIZE};
pub use pointer::PointerPolicy;
pub use scanner::{scan, scan_file, Candidate};
