#![cfg(feature = "testing")]

use anyhow::Result;
use parquet_loader::testing::write_rows;
use parquet_loader::{CursorState, LoaderError, LoaderOptions, ParquetLoader, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::{Cursor, Seek, SeekFrom};
use std::path::Path;

#[derive(Serialize, Deserialize)]
struct Row {
    id: i64,
    name: String,
    maybe: Option<i64>,
}

const ROWS: i64 = 45;
const ROW_GROUP: usize = 7;
const BLOCK: u64 = 10;

fn write_fixture(path: &Path) -> Result<()> {
    let rows: Vec<Row> = (0..ROWS)
        .map(|id| Row {
            id,
            name: format!("row-{id}"),
            maybe: (id % 2 == 0).then_some(id),
        })
        .collect();
    write_rows(path, &rows, ROW_GROUP)?;
    Ok(())
}

fn open(path: &Path) -> Result<ParquetLoader<std::fs::File>> {
    Ok(ParquetLoader::open(
        path,
        LoaderOptions::default().with_block_size(BLOCK),
    )?)
}

fn visit_ids(loader: &ParquetLoader<std::fs::File>, seed: Option<u64>) -> Result<Vec<i64>> {
    let mut cursor = loader.cursor(&[0], seed)?;
    let mut ids = Vec::new();
    while cursor.move_next()? {
        let id = cursor.value(0)?.as_i64().unwrap();
        assert_eq!(cursor.row_id()?.low, u64::try_from(id)?);
        ids.push(id);
    }
    Ok(ids)
}

#[test]
fn sequential_cursor_visits_rows_in_file_order() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("rows.parquet");
    write_fixture(&path)?;
    let loader = open(&path)?;

    assert_eq!(loader.row_count(), Some(45));
    assert_eq!(loader.block_count()?, 5);
    assert_eq!(visit_ids(&loader, None)?, (0..ROWS).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn shuffled_cursor_visits_every_row_once() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("rows.parquet");
    write_fixture(&path)?;
    let loader = open(&path)?;

    let ids = visit_ids(&loader, Some(17))?;
    assert_eq!(ids.len(), 45);
    let unique: HashSet<i64> = ids.iter().copied().collect();
    assert_eq!(unique.len(), 45);
    assert!(unique.iter().all(|id| (0..ROWS).contains(id)));
    assert_ne!(ids, (0..ROWS).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn shuffle_is_reproducible_per_seed() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("rows.parquet");
    write_fixture(&path)?;
    let loader = open(&path)?;

    let a = visit_ids(&loader, Some(5))?;
    let b = visit_ids(&loader, Some(5))?;
    let c = visit_ids(&loader, Some(6))?;
    assert_eq!(a, b);
    assert_ne!(a, c);
    Ok(())
}

#[test]
fn shuffled_rows_stay_within_their_block() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("rows.parquet");
    write_fixture(&path)?;
    let loader = open(&path)?;

    let ids = visit_ids(&loader, Some(99))?;
    let block_of = |id: i64| id / 10;
    let mut runs: Vec<(i64, usize)> = Vec::new();
    for id in ids {
        match runs.last_mut() {
            Some((block, len)) if *block == block_of(id) => *len += 1,
            _ => runs.push((block_of(id), 1)),
        }
    }
    assert_eq!(runs.len(), 5);
    for (block, len) in runs {
        let expected = if block == 4 { 5 } else { 10 };
        assert_eq!(len, expected, "block {block}");
    }
    Ok(())
}

#[test]
fn reads_text_and_whole_rows() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("rows.parquet");
    write_fixture(&path)?;
    let loader = open(&path)?;

    let mut cursor = loader.cursor(&[1, 0], None)?;
    for _ in 0..13 {
        assert!(cursor.move_next()?);
    }
    assert_eq!(cursor.str_value(1)?, Some("row-12"));
    assert_eq!(cursor.str_value(0)?, None);
    assert_eq!(
        cursor.row()?,
        vec![Value::Int64(12), Value::Text("row-12".into())]
    );
    assert_eq!(cursor.rows_visited(), 13);
    Ok(())
}

#[test]
fn caller_contract_errors() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("rows.parquet");
    write_fixture(&path)?;
    let loader = open(&path)?;

    assert!(matches!(
        loader.cursor(&[3], None),
        Err(LoaderError::UnknownColumn { index: 3, len: 3 })
    ));

    let mut cursor = loader.cursor(&[0, 2], None)?;
    assert_eq!(cursor.state(), CursorState::Initial);
    assert!(matches!(cursor.value(0), Err(LoaderError::InvalidState)));
    assert!(matches!(cursor.row_id(), Err(LoaderError::InvalidState)));

    assert!(cursor.move_next()?);
    assert!(cursor.is_column_active(0));
    assert!(!cursor.is_column_active(1));
    assert!(matches!(cursor.value(1), Err(LoaderError::ColumnNotActive(1))));
    assert_eq!(cursor.value(2)?, Value::Int64(0));

    assert!(cursor.move_next()?);
    assert!(matches!(
        cursor.value(2),
        Err(LoaderError::NullValue { ref column }) if column == "maybe"
    ));

    while cursor.move_next()? {}
    assert_eq!(cursor.state(), CursorState::Exhausted);
    assert!(!cursor.move_next()?);
    assert!(matches!(cursor.value(0), Err(LoaderError::InvalidState)));
    Ok(())
}

#[test]
fn cursor_without_columns_still_counts_rows() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("rows.parquet");
    write_fixture(&path)?;
    let loader = open(&path)?;

    let mut cursor = loader.cursor(&[], None)?;
    let mut last = None;
    while cursor.move_next()? {
        last = Some(cursor.row_id()?.low);
    }
    assert_eq!(cursor.rows_visited(), 45);
    assert_eq!(last, Some(44));
    Ok(())
}

#[test]
fn cursor_set_returns_one_cursor() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("rows.parquet");
    write_fixture(&path)?;
    let loader = open(&path)?;

    let cursors = loader.cursor_set(&[0], 4, Some(1))?;
    assert_eq!(cursors.len(), 1);
    Ok(())
}

#[test]
fn cursors_of_one_loader_iterate_independently() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("rows.parquet");
    write_fixture(&path)?;
    let loader = open(&path)?;

    let mut a = loader.cursor(&[0], None)?;
    let mut b = loader.cursor(&[0], None)?;
    let mut seen = Vec::new();
    while a.move_next()? {
        assert!(b.move_next()?);
        seen.push((a.value(0)?, b.value(0)?));
    }
    assert_eq!(seen.len(), 45);
    assert!(seen.iter().all(|(x, y)| x == y));
    Ok(())
}

#[test]
fn in_memory_and_stream_inputs() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("rows.parquet");
    write_fixture(&path)?;
    let bytes = std::fs::read(&path)?;

    let from_bytes = ParquetLoader::from_bytes(bytes.clone(), LoaderOptions::default())?;
    assert_eq!(from_bytes.row_count(), Some(45));

    let stream = ParquetLoader::from_stream(Cursor::new(bytes.clone()), LoaderOptions::default())?;
    let mut cursor = stream.cursor(&[1], None)?;
    let mut n = 0;
    while cursor.move_next()? {
        n += 1;
    }
    assert_eq!(n, 45);

    let mut advanced = Cursor::new(bytes);
    advanced.seek(SeekFrom::Start(4))?;
    assert!(matches!(
        ParquetLoader::from_stream(advanced, LoaderOptions::default()),
        Err(LoaderError::StreamNotAtStart { position: 4 })
    ));
    Ok(())
}

#[test]
fn rejects_zero_block_size() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("rows.parquet");
    write_fixture(&path)?;
    assert!(matches!(
        ParquetLoader::open(&path, LoaderOptions::default().with_block_size(0)),
        Err(LoaderError::Config(_))
    ));
    Ok(())
}

#[test]
fn corrupt_page_data_fails_the_block_and_exhausts() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("rows.parquet");
    write_fixture(&path)?;
    let mut bytes = std::fs::read(&path)?;
    // The footer stays intact, so the file opens; the first page headers do not.
    bytes[8..200].fill(0);

    let loader = ParquetLoader::from_bytes(bytes, LoaderOptions::default())?;
    let mut cursor = loader.cursor(&[0, 1], None)?;
    let err = cursor.move_next().unwrap_err();
    assert!(
        matches!(err, LoaderError::Decode { ref column, .. } if column == "id"),
        "unexpected error: {err}"
    );
    assert_eq!(cursor.state(), CursorState::Exhausted);
    assert!(!cursor.move_next()?);
    Ok(())
}
