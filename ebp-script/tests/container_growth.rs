mod common;

use std::fs;

use anyhow::Result;
use pretty_assertions::assert_eq;

use common::{build, counts, pointers, record_at, record_bytes, write, RECORD, TABLE};
use ebp_script::{grow, ContainerError, ContainerLayout};

#[test]
fn grow_adds_clones_and_keeps_every_record() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let fixture = build(6, 4, 0, &[]);
    let path = write(dir.path(), "w.ebp", &fixture.bytes);

    let report = grow(&path, 3, 2, &ContainerLayout::default(), true)?;
    let bytes = fs::read(&path)?;

    assert_eq!(counts(&bytes), (9, 7));
    assert_eq!(report.before.total, 6);
    assert_eq!(report.after.total, 9);

    let ptrs = pointers(&bytes);
    for old in 0..6usize {
        let new = if old < 4 { old } else { old + 3 };
        assert_eq!(record_at(&bytes, ptrs[new]), record_bytes(old).as_slice(), "worker {old}");
    }
    for clone in 4..7 {
        assert_eq!(ptrs[clone], report.clone_pointer);
        assert_eq!(record_at(&bytes, ptrs[clone]), record_bytes(2).as_slice());
    }

    let backup = report.backup.expect("backup requested");
    assert_eq!(fs::read(backup)?, fixture.bytes);
    Ok(())
}

#[test]
fn grown_table_never_overlaps_a_record() -> Result<()> {
    let dir = tempfile::tempdir()?;
    for clones in [1u16, 5, 13, 14, 30] {
        let fixture = build(10, 7, 8, &[]);
        let path = write(dir.path(), &format!("gap{clones}.ebp"), &fixture.bytes);

        let report = grow(&path, clones, 0, &ContainerLayout::default(), false)?;
        let bytes = fs::read(&path)?;
        let table_end = TABLE as u64 + report.after.total as u64 * 4;
        for p in pointers(&bytes) {
            assert!(p as u64 + 0x40 >= table_end, "{clones} clones: record at 0x{:X}", p + 0x40);
        }
        // 8 bytes of slack hold two pointers; every 52-byte record moved
        // makes room for 13 more
        let expected_moves = (clones as usize * 4).saturating_sub(8).div_ceil(RECORD);
        assert_eq!(report.relocated.len(), expected_moves, "{clones} clones");
    }
    Ok(())
}

#[test]
fn subroutine_ids_shift_exactly_once() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let body = [0xB3, 5, 0, 0x01, 0xB3, 6, 0, 0x02, 0xB3, 7, 0, 0xB3, 4, 0];
    let fixture = build(8, 5, 16, &body);
    let path = write(dir.path(), "ids.ebp", &fixture.bytes);

    let report = grow(&path, 2, 1, &ContainerLayout::default(), false)?;
    let bytes = fs::read(&path)?;

    let region = &bytes[fixture.body_off..fixture.body_off + body.len()];
    assert_eq!(region, &[0xB3, 7, 0, 0x01, 0xB3, 8, 0, 0x02, 0xB3, 9, 0, 0xB3, 4, 0]);
    assert_eq!(report.renumbered, 3);
    Ok(())
}

#[test]
fn exhausted_relocation_fails_before_writing() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let fixture = build(2, 2, 0, &[]);
    let path = write(dir.path(), "tight.ebp", &fixture.bytes);

    let err = grow(&path, 40, 0, &ContainerLayout::default(), true).unwrap_err();
    assert!(matches!(err, ContainerError::GapExhausted { needed: 160 }));
    assert_eq!(fs::read(&path)?, fixture.bytes);
    Ok(())
}

#[test]
fn bad_source_is_rejected() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let fixture = build(3, 3, 0, &[]);
    let path = write(dir.path(), "src.ebp", &fixture.bytes);

    let err = grow(&path, 1, 3, &ContainerLayout::default(), false).unwrap_err();
    assert!(matches!(err, ContainerError::SourceOutOfRange { source_id: 3, total: 3 }));
    assert_eq!(fs::read(&path)?, fixture.bytes);
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = grow(dir.path().join("nope.ebp"), 1, 0, &ContainerLayout::default(), false).unwrap_err();
    assert!(matches!(err, ContainerError::Io(_)));
}
