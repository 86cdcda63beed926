use std::fmt::Write as _;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use ebp_script::disasm::display::display_row_text;
use ebp_script::disasm::CommandDictionary;
use ebp_script::fields::format_row_offset;
use ebp_script::object::layout::FILL_BYTE;
use ebp_script::object::scan_file;
use ebp_script::profile::{load_page, load_profile, save_page, save_profile};
use ebp_script::{
    add_worker, compute_offsets, grow, update_object, Candidate, ContainerLayout, FieldGroup, FieldSet, GrowRequest,
    TableSummary,
};

/// Picks the object to work on. Several candidates without an explicit
/// index is an error listing them.
pub fn select_candidate(candidates: Vec<Candidate>, index: Option<usize>) -> Result<Candidate> {
    let count = candidates.len();
    if count == 0 {
        bail!("no worker object signature found");
    }
    match index {
        Some(i) => candidates
            .into_iter()
            .nth(i)
            .ok_or_else(|| anyhow!("candidate index {i} out of range ({count} found)")),
        None if count == 1 => candidates.into_iter().next().ok_or_else(|| anyhow!("no candidate")),
        None => bail!(
            "{count} candidate objects found, choose one with --index:\n{}",
            list_candidates(&candidates)
        ),
    }
}

pub fn list_candidates(candidates: &[Candidate]) -> String {
    let mut out = String::new();
    for (i, candidate) in candidates.iter().enumerate() {
        let status = match candidate.decode() {
            Ok(decoded) => format!("anchor 0x{:08X}", decoded.anchor),
            Err(e) => format!("undecodable: {e}"),
        };
        let _ = writeln!(out, "[{i}] 0x{:08X}  {status}", candidate.offset);
    }
    out
}

/// Field listing: row offset, tag, hex text and the matching command label.
/// Long fill runs are collapsed here only; the rows keep every byte.
pub fn render_fields(fields: &FieldSet, dictionary: &CommandDictionary) -> String {
    let offsets = compute_offsets(fields);
    let mut out = String::new();
    for (field, rows) in fields.iter() {
        let _ = writeln!(out, "[{field}]");
        for (row, offset) in rows.iter().zip(&offsets[field]) {
            if row.is_empty() {
                continue;
            }
            let tag = row.tag.map(|t| t.to_string()).unwrap_or_default();
            let text = display_row_text(&row.text, FILL_BYTE);
            let _ = write!(out, "  {:>6}  {:<3}  {}", format_row_offset(*offset), tag, text);
            if let Some(label) = dictionary.annotate(&row.text) {
                let _ = write!(out, "  ; {label}");
            }
            out.push('\n');
        }
    }
    out
}

pub fn render_tables(fields: &FieldSet) -> String {
    let summary = TableSummary::compute(fields);
    format!(
        "entries: {}\njumps:   {}\n",
        summary.entry_table(),
        summary.jump_table()
    )
}

pub fn run_grow(path: &Path, clones: u16, source_id: u16, layout: &ContainerLayout, backup: bool) -> Result<()> {
    let report = grow(path, clones, source_id, layout, backup)
        .with_context(|| format!("growing {}", path.display()))?;
    println!(
        "workers {} -> {} (non-subroutine {} -> {})",
        report.before.total, report.after.total, report.before.nonsub, report.after.nonsub
    );
    println!("relocated: {:?}", report.relocated);
    println!("clone pointer 0x{:08X} at 0x{:X}", report.clone_pointer, report.clone_location);
    if let Some(backup) = report.backup {
        println!("backup: {}", backup.display());
    }
    Ok(())
}

pub fn run_scan(path: &Path) -> Result<()> {
    let candidates = scan_file(path).with_context(|| format!("reading {}", path.display()))?;
    if candidates.is_empty() {
        println!("no worker objects found");
    } else {
        print!("{}", list_candidates(&candidates));
    }
    Ok(())
}

pub fn import(path: &Path, index: Option<usize>, dictionary: &CommandDictionary) -> Result<FieldSet> {
    let candidates = scan_file(path).with_context(|| format!("reading {}", path.display()))?;
    let candidate = select_candidate(candidates, index)?;
    let decoded = candidate
        .decode()
        .with_context(|| format!("decoding object at 0x{:08X}", candidate.offset))?;
    log::info!("imported object at 0x{:08X} (anchor 0x{:08X})", candidate.offset, decoded.anchor);
    Ok(decoded.to_field_set(dictionary))
}

pub fn run_import(path: &Path, index: Option<usize>, output: Option<&Path>, dictionary: &CommandDictionary) -> Result<()> {
    let fields = import(path, index, dictionary)?;
    print!("{}", render_fields(&fields, dictionary));
    print!("{}", render_tables(&fields));
    if let Some(output) = output {
        save_profile(output, &fields)?;
    }
    Ok(())
}

pub fn run_append(path: &Path, profile: &Path, layout: &ContainerLayout, grow_first: Option<GrowRequest>) -> Result<()> {
    let fields = load_profile(profile)?;
    let report = add_worker(path, &fields, layout, grow_first)
        .with_context(|| format!("adding worker to {}", path.display()))?;
    if let Some(grown) = &report.grow {
        println!("workers {} -> {}", grown.before.total, grown.after.total);
    }
    println!(
        "object appended at 0x{:08X} (footer entry 0x{:08X}, jump 0x{:08X})",
        report.append.offset, report.append.entry_value, report.append.jump_value
    );
    Ok(())
}

pub fn run_update(path: &Path, profile: &Path, index: Option<usize>) -> Result<()> {
    let fields = load_profile(profile)?;
    let candidates = scan_file(path).with_context(|| format!("reading {}", path.display()))?;
    let candidate = select_candidate(candidates, index)?;
    let anchor = update_object(path, candidate.offset, &fields)
        .with_context(|| format!("updating object at 0x{:08X}", candidate.offset))?;
    println!("object at 0x{:08X} rewritten against anchor 0x{anchor:08X}", candidate.offset);
    Ok(())
}

pub fn run_tables(profile: &Path, dictionary: &CommandDictionary) -> Result<()> {
    let fields = load_profile(profile)?;
    print!("{}", render_fields(&fields, dictionary));
    print!("{}", render_tables(&fields));
    Ok(())
}

pub fn extract_page(profile: &Path, field: FieldGroup, output: &Path) -> Result<()> {
    let fields = load_profile(profile)?;
    save_page(output, field, fields.rows(field))?;
    Ok(())
}

/// Replaces one field of a profile with the rows of a saved page.
pub fn insert_page(profile: &Path, field: FieldGroup, page: &Path) -> Result<()> {
    let mut fields = load_profile(profile)?;
    let page = load_page(page)?;
    let dropped = fields.set_rows(field, page.rows);
    if dropped > 0 {
        log::warn!("{dropped} row(s) of the page did not fit in {field}");
    }
    save_profile(profile, &fields)?;
    Ok(())
}
