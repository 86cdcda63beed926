//! Raw code bytes to editor rows and back to display text.

pub mod chunk;
pub mod dictionary;
pub mod display;

pub use chunk::{disassemble, ChunkDisassembler};
pub use dictionary::{Command, CommandDictionary, DictionaryFile, QuickInput};
