#![cfg(feature = "testing")]

use anyhow::Result;
use parquet_loader::io::block_window;
use parquet_loader::testing::write_rows;
use parquet_loader::{LoaderOptions, ParquetLoader};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Serialize, Deserialize)]
struct Row {
    id: i64,
}

fn write_ids(path: &Path, total: i64, row_group: usize) -> Result<()> {
    let rows: Vec<Row> = (0..total).map(|id| Row { id }).collect();
    write_rows(path, &rows, row_group)?;
    Ok(())
}

fn assert_sequential(loader: &ParquetLoader<std::fs::File>, total: i64) -> Result<()> {
    let mut cursor = loader.cursor(&[0], None)?;
    let mut expected = 0i64;
    while cursor.move_next()? {
        assert_eq!(cursor.value(0)?.as_i64(), Some(expected));
        expected += 1;
    }
    assert_eq!(expected, total);
    Ok(())
}

#[test]
fn three_row_groups_in_three_blocks() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("ids.parquet");
    write_ids(&path, 1_200_000, 400_000)?;

    let loader = ParquetLoader::open(&path, LoaderOptions::default().with_block_size(500_000))?;
    assert_eq!(loader.row_count(), Some(1_200_000));
    assert_eq!(loader.block_count()?, 3);
    let windows: Vec<(u64, u64)> = (0..3)
        .map(|b| block_window(1_200_000, 500_000, b))
        .collect();
    assert_eq!(
        windows,
        vec![(0, 500_000), (500_000, 500_000), (1_000_000, 200_000)]
    );
    assert_sequential(&loader, 1_200_000)
}

#[test]
fn scaled_down_layout_with_shuffle() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("ids.parquet");
    write_ids(&path, 1_200, 400)?;

    let loader = ParquetLoader::open(&path, LoaderOptions::default().with_block_size(500))?;
    assert_sequential(&loader, 1_200)?;

    let mut cursor = loader.cursor(&[0], Some(2024))?;
    let mut seen = vec![false; 1_200];
    while cursor.move_next()? {
        let id = usize::try_from(cursor.value(0)?.as_i64().unwrap())?;
        assert!(!seen[id], "row {id} visited twice");
        seen[id] = true;
    }
    assert!(seen.iter().all(|&s| s));
    Ok(())
}
