//! Growing the worker pointer table in place.
//!
//! The pointer table sits between the header and the worker records, so
//! adding entries first has to clear room behind it:
//!
//! 1. records overlapping the room the table needs are moved to EOF
//! 2. the source worker's record is cloned to EOF
//! 3. subroutine pointers shift back and the clone pointers go in front of them
//! 4. the counts grow and the auxiliary header fields are cleared
//! 5. subroutine ids encoded in the body are renumbered

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::error::{ContainerError, ContainerResult};

use super::header::{HeaderIo, WorkerCounts};
use super::layout::ContainerLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerLocation {
    pub id: u16,
    /// File offset of the record.
    pub location: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrowReport {
    pub before: WorkerCounts,
    pub after: WorkerCounts,
    /// Workers whose records were moved to EOF, nearest first.
    pub relocated: Vec<u16>,
    pub clone_location: u64,
    pub clone_pointer: u32,
    /// Marker and id occurrences rewritten in the body.
    pub renumbered: usize,
    pub backup: Option<PathBuf>,
}

/// Picks the records to move so that `needed` bytes after `table_end` hold no
/// record start.
///
/// Records are taken nearest first until the nearest remaining one leaves
/// enough room. Running out of records is an error; the caller has not
/// touched the file at that point.
pub fn plan_relocations(
    mut workers: Vec<WorkerLocation>,
    table_end: u64,
    needed: u64,
) -> ContainerResult<Vec<WorkerLocation>> {
    workers.sort_by_key(|w| w.location);
    let keep = workers
        .iter()
        .position(|w| w.location.saturating_sub(table_end) >= needed)
        .ok_or(ContainerError::GapExhausted { needed })?;
    workers.truncate(keep);
    Ok(workers)
}

/// Rewrites `marker, id` to `marker, id + shift` for every id in `ids`,
/// highest id first so a rewritten id is never picked up again.
///
/// Occurrences are matched left to right without overlap. Returns the number
/// of rewrites.
pub fn renumber_ids(content: &mut [u8], marker: u8, ids: Range<u16>, shift: u16) -> usize {
    let mut replaced = 0;
    for id in ids.rev() {
        let Some(new_id) = id.checked_add(shift) else {
            log::warn!("id {id} + {shift} does not fit in 16 bits, leaving it");
            continue;
        };
        let old = id_pattern(marker, id);
        let new = id_pattern(marker, new_id);

        let mut hits = 0;
        let mut i = 0;
        while i + old.len() <= content.len() {
            if content[i..i + old.len()] == old {
                content[i..i + old.len()].copy_from_slice(&new);
                i += old.len();
                hits += 1;
            } else {
                i += 1;
            }
        }
        if hits > 0 {
            log::debug!("id {id} -> {new_id}: {hits} occurrence(s)");
        }
        replaced += hits;
    }
    replaced
}

fn id_pattern(marker: u8, id: u16) -> [u8; 3] {
    let [lo, hi] = id.to_le_bytes();
    [marker, lo, hi]
}

fn pointer_for(location: u64, layout: &ContainerLayout) -> ContainerResult<u32> {
    location
        .checked_sub(layout.pointer_bias as u64)
        .and_then(|p| u32::try_from(p).ok())
        .ok_or(ContainerError::AddressOutOfRange {
            addr: location,
            bias: layout.pointer_bias,
        })
}

/// Adds `clones` copies of worker `source_id` to the container held by
/// `stream`.
///
/// Every precondition and the relocation plan are checked before the first
/// write. A failure after that leaves the stream partly modified.
pub fn grow_stream<S: Read + Write + Seek>(
    stream: &mut S,
    clones: u16,
    source_id: u16,
    layout: &ContainerLayout,
) -> ContainerResult<GrowReport> {
    if clones == 0 {
        return Err(ContainerError::ZeroClones);
    }

    let mut io = HeaderIo::new(stream, layout);
    let before = io.read_counts()?;
    let WorkerCounts { total, nonsub } = before;

    if source_id >= total {
        return Err(ContainerError::SourceOutOfRange { source_id, total });
    }
    if nonsub > total {
        return Err(ContainerError::InconsistentCounts { total, nonsub });
    }
    let after = WorkerCounts {
        total: total
            .checked_add(clones)
            .ok_or(ContainerError::CountOverflow { total, clones })?,
        nonsub: nonsub
            .checked_add(clones)
            .ok_or(ContainerError::CountOverflow { total: nonsub, clones })?,
    };

    let len = io.stream_len()?;
    let needed = layout.header_len(total);
    if len < needed {
        return Err(ContainerError::Truncated { len, needed });
    }

    // Phase 1
    let table_end = layout.pointer_table_end(total);
    let workers = io
        .read_pointers(total)?
        .into_iter()
        .enumerate()
        .map(|(id, pointer)| WorkerLocation {
            id: id as u16,
            location: layout.record_location(pointer),
        })
        .collect();
    let victims = plan_relocations(workers, table_end, clones as u64 * 4)?;

    for victim in &victims {
        let record = io.read_record(victim.location)?;
        let moved_to = io.append(&record)?;
        io.write_pointer(victim.id, pointer_for(moved_to, layout)?)?;
        log::debug!(
            "worker {} relocated 0x{:X} -> 0x{:X}",
            victim.id,
            victim.location,
            moved_to
        );
    }

    // Phase 2
    let source_location = layout.record_location(io.read_pointer(source_id)?);
    let template = io.read_record(source_location)?;
    let clone_location = io.append(&template)?;
    let clone_pointer = pointer_for(clone_location, layout)?;
    log::debug!("worker {source_id} cloned to 0x{clone_location:X}");

    // Phase 3
    let insert_at = layout.pointer_slot(nonsub);
    let shift = clones as u64 * 4;
    let subroutine_ptrs = io.read_at(insert_at, (table_end - insert_at) as usize)?;
    if !subroutine_ptrs.is_empty() {
        io.write_at(insert_at + shift, &subroutine_ptrs)?;
    }
    let new_ptrs: Vec<u8> = clone_pointer
        .to_le_bytes()
        .iter()
        .copied()
        .cycle()
        .take(shift as usize)
        .collect();
    io.write_at(insert_at, &new_ptrs)?;

    // Phase 4
    io.write_counts(after)?;
    io.zero_aux_fields()?;

    // Phase 5
    stream.seek(SeekFrom::Start(0))?;
    let mut content = Vec::new();
    stream.read_to_end(&mut content)?;
    let renumbered = renumber_ids(&mut content, layout.id_marker, nonsub..total, clones);
    if renumbered > 0 {
        stream.seek(SeekFrom::Start(0))?;
        stream.write_all(&content)?;
    }
    stream.flush()?;

    log::info!(
        "grew worker table {} -> {} (nonsub {} -> {}), {} record(s) relocated, {} id(s) renumbered",
        total,
        after.total,
        nonsub,
        after.nonsub,
        victims.len(),
        renumbered
    );

    Ok(GrowReport {
        before,
        after,
        relocated: victims.iter().map(|v| v.id).collect(),
        clone_location,
        clone_pointer,
        renumbered,
        backup: None,
    })
}

/// `<path>.bak`, next to the container.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".bak");
    PathBuf::from(name)
}

/// Grows the container at `path`, copying it to `<path>.bak` first when
/// `backup` is set. Restoring from the backup after a failure is up to the
/// caller.
pub fn grow(
    path: impl AsRef<Path>,
    clones: u16,
    source_id: u16,
    layout: &ContainerLayout,
    backup: bool,
) -> ContainerResult<GrowReport> {
    let path = path.as_ref();
    log::info!(
        "growing {}: {} clone(s) of worker {}",
        path.display(),
        clones,
        source_id
    );

    let backup_file = if backup {
        let bak = backup_path(path);
        fs::copy(path, &bak).map_err(|err| ContainerError::Backup {
            path: bak.clone(),
            err,
        })?;
        Some(bak)
    } else {
        None
    };

    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    let mut report = grow_stream(&mut file, clones, source_id, layout)?;
    report.backup = backup_file;
    Ok(report)
}
