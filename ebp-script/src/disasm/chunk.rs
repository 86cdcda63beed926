use std::collections::BTreeMap;

use crate::fields::{JumpTag, Row, ROW_CAPACITY};

use super::dictionary::CommandDictionary;
use super::display::format_row_bytes;

/// Splits one field's code bytes into editor rows.
///
/// A row boundary is placed before every jump target and around every
/// recognised command; everything else accumulates into plain rows.
pub struct ChunkDisassembler<'a> {
    dictionary: &'a CommandDictionary,
    tags: &'a BTreeMap<u32, JumpTag>,
    base: u32,
    cursor: usize,
    pending: Vec<u8>,
    pending_tag: Option<JumpTag>,
    claim_end: bool,
    rows: Vec<Row>,
}

impl<'a> ChunkDisassembler<'a> {
    /// `base` is the chunk's offset inside the object's code segment; `tags`
    /// is keyed by code segment offset.
    pub fn new(dictionary: &'a CommandDictionary, tags: &'a BTreeMap<u32, JumpTag>, base: u32) -> Self {
        Self {
            dictionary,
            tags,
            base,
            cursor: 0,
            pending: Vec::new(),
            pending_tag: None,
            claim_end: false,
            rows: Vec::new(),
        }
    }

    /// Also emit a tagged empty row for a jump target right past the chunk.
    /// Only the last chunk of an object may claim it.
    pub fn claim_end_tag(mut self, claim: bool) -> Self {
        self.claim_end = claim;
        self
    }

    fn take_tag_at_pc(&mut self) {
        if let Some(tag) = self.tags.get(&self.get_pc()).copied() {
            self.flush();
            self.pending_tag = Some(tag);
        }
    }

    fn get_pc(&self) -> u32 {
        self.base.wrapping_add(self.cursor as u32)
    }

    fn flush(&mut self) {
        if !self.pending.is_empty() || self.pending_tag.is_some() {
            let text = format_row_bytes(&self.pending);
            self.rows.push(Row::new(self.pending_tag.take(), text));
        }
        self.pending.clear();
        self.pending_tag = None;
    }

    fn step(&mut self, code: &[u8], hex: &str) {
        self.take_tag_at_pc();

        let dictionary = self.dictionary;
        if let Some(cmd) = dictionary.match_prefix(&hex[self.cursor * 2..]) {
            let len = cmd.code.len() / 2;
            if !self.pending.is_empty() {
                self.flush();
            }
            let bytes = &code[self.cursor..self.cursor + len];
            self.rows
                .push(Row::new(self.pending_tag.take(), format_row_bytes(bytes)));
            self.cursor += len;
            return;
        }

        self.pending.push(code[self.cursor]);
        self.cursor += 1;
    }

    /// Rows in natural order, before capacity handling.
    pub fn run(mut self, code: &[u8]) -> Vec<Row> {
        let hex = hex::encode(code);
        while self.cursor < code.len() {
            self.step(code, &hex);
        }
        if self.claim_end {
            self.take_tag_at_pc();
        }
        self.flush();
        self.rows
    }
}

/// Disassembles a chunk into exactly [`ROW_CAPACITY`] rows.
///
/// Short results are padded with empty rows. Rows past the capacity are
/// dropped, which loses code; the loss is logged. `last` marks the final
/// chunk of an object, which also takes a jump target at its end.
pub fn disassemble(
    code: &[u8],
    chunk_base: u32,
    last: bool,
    tags: &BTreeMap<u32, JumpTag>,
    dictionary: &CommandDictionary,
) -> Vec<Row> {
    let mut rows = ChunkDisassembler::new(dictionary, tags, chunk_base)
        .claim_end_tag(last)
        .run(code);
    if rows.len() > ROW_CAPACITY {
        log::warn!(
            "chunk at 0x{:X}: {} rows exceed the capacity of {}, dropping {}",
            chunk_base,
            rows.len(),
            ROW_CAPACITY,
            rows.len() - ROW_CAPACITY
        );
    }
    rows.resize_with(ROW_CAPACITY, Row::default);
    rows
}
