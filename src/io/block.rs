//! Block Reader.
//!
//! A block is the unit of physical read: a window of up to `block_size` rows that
//! may span several row groups. Reading a window walks the row groups in file
//! order, decodes the contributing slice of every requested column, and
//! materializes one [`RawValue`] per row per column.
//!
//! The underlying [`SerializedFileReader`] is shared by every cursor of a loader;
//! each physical read holds its mutex for the whole window.

use crate::error::{LoaderError, Result};
use crate::io::levels::{LevelInfo, assemble};
use crate::schema::Column;
use crate::value::RawValue;
use bytes::Bytes;
use parquet::column::reader::{ColumnReader, ColumnReaderImpl};
use parquet::data_type::{ByteArray, DataType, FixedLenByteArray, Int96};
use parquet::errors::ParquetError;
use parquet::file::reader::{ChunkReader, FileReader, RowGroupReader, SerializedFileReader};
use std::collections::HashMap;
use std::sync::Mutex;

/// The materialized result of one physical read.
#[derive(Clone, Debug, Default)]
pub struct Block {
    offset: u64,
    row_count: usize,
    total_row_count: u64,
    columns: HashMap<String, Vec<RawValue>>,
}

impl Block {
    /// First file row covered by this block.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Rows actually materialized; below the requested count only at end of file.
    #[must_use]
    pub const fn row_count(&self) -> usize {
        self.row_count
    }

    /// Row count of the whole file, copied from the file metadata.
    #[must_use]
    pub const fn total_row_count(&self) -> u64 {
        self.total_row_count
    }

    #[must_use]
    pub fn column(&self, path: &str) -> Option<&[RawValue]> {
        self.columns.get(path).map(Vec::as_slice)
    }

    /// Move a column's values out of the block.
    pub fn take_column(&mut self, path: &str) -> Option<Vec<RawValue>> {
        self.columns.remove(path)
    }
}

/// The part of one row group that falls inside a requested window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowGroupSlice {
    pub row_group: usize,
    /// First row to read, relative to the row group.
    pub local_offset: u64,
    pub rows: u64,
}

/// Select the row-group slices covering `count` rows starting at file row `offset`.
#[must_use]
pub fn plan_window(row_group_rows: &[u64], offset: u64, count: u64) -> Vec<RowGroupSlice> {
    let mut plan = Vec::new();
    let mut pos = 0u64;
    let mut rows_read = 0u64;
    for (row_group, &group_rows) in row_group_rows.iter().enumerate() {
        let group_start = pos;
        pos += group_rows;
        if rows_read >= count || group_rows == 0 || offset > group_start + group_rows - 1 {
            continue;
        }
        let local_offset = offset.saturating_sub(group_start);
        let rows = (count - rows_read).min(group_rows - local_offset);
        plan.push(RowGroupSlice {
            row_group,
            local_offset,
            rows,
        });
        rows_read += rows;
    }
    plan
}

/// Row window `(offset, count)` of block `index`.
#[must_use]
pub fn block_window(total_rows: u64, block_size: u64, index: usize) -> (u64, u64) {
    let offset = (index as u64).saturating_mul(block_size).min(total_rows);
    (offset, block_size.min(total_rows - offset))
}

/// Number of blocks needed to cover `total_rows`, `ceil(total_rows / block_size)`.
///
/// # Errors
/// [`LoaderError::Config`] if the count does not fit the block index range.
pub fn block_count(total_rows: u64, block_size: u64) -> Result<usize> {
    let blocks = total_rows.div_ceil(block_size.max(1));
    u32::try_from(blocks)
        .ok()
        .and_then(|b| usize::try_from(b).ok())
        .ok_or_else(|| {
            LoaderError::Config(format!(
                "{blocks} blocks of {block_size} rows exceed the block index range; \
                 increase block_size"
            ))
        })
}

/// Reads row windows from a shared Parquet file.
pub struct BlockReader<R: ChunkReader + 'static> {
    file: Mutex<SerializedFileReader<R>>,
    row_group_rows: Vec<u64>,
    total_rows: u64,
    block_size: u64,
}

impl<R: ChunkReader + 'static> BlockReader<R> {
    #[must_use]
    pub fn new(file: SerializedFileReader<R>, block_size: u64) -> Self {
        let meta = file.metadata();
        let row_group_rows = meta
            .row_groups()
            .iter()
            .map(|rg| rg.num_rows().max(0).cast_unsigned())
            .collect();
        let total_rows = meta.file_metadata().num_rows().max(0).cast_unsigned();
        Self {
            file: Mutex::new(file),
            row_group_rows,
            total_rows,
            block_size: block_size.max(1),
        }
    }

    #[must_use]
    pub const fn total_rows(&self) -> u64 {
        self.total_rows
    }

    #[must_use]
    pub fn row_group_rows(&self) -> &[u64] {
        &self.row_group_rows
    }

    #[must_use]
    pub const fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Number of blocks, `ceil(total_rows / block_size)`.
    ///
    /// # Errors
    /// [`LoaderError::Config`] if the count does not fit the block index range.
    pub fn block_count(&self) -> Result<usize> {
        block_count(self.total_rows, self.block_size)
    }

    #[must_use]
    pub fn window(&self, index: usize) -> (u64, u64) {
        block_window(self.total_rows, self.block_size, index)
    }

    /// Materialize `count` rows starting at `offset` for `columns`.
    ///
    /// # Errors
    /// [`LoaderError::Decode`] naming the first column that fails to decode, or
    /// [`LoaderError::ColumnLengthMismatch`] if columns of one row group disagree
    /// on how many rows they produced.
    pub fn read(&self, offset: u64, count: u64, columns: &[&Column]) -> Result<Block> {
        let plan = plan_window(&self.row_group_rows, offset, count);
        let file = self.file.lock().map_err(|_| LoaderError::LockPoisoned)?;

        let mut values: HashMap<String, Vec<RawValue>> = HashMap::with_capacity(columns.len());
        let mut rows_read = 0usize;
        for slice in &plan {
            let row_group = file
                .get_row_group(slice.row_group)
                .map_err(LoaderError::Metadata)?;
            let skip = to_usize(slice.local_offset)?;
            let take = to_usize(slice.rows)?;

            let mut contributed: Option<usize> = None;
            for column in columns {
                let rows = read_column_slice(row_group.as_ref(), column, skip, take)?;
                match contributed {
                    None => contributed = Some(rows.len()),
                    Some(expected) if expected != rows.len() => {
                        return Err(LoaderError::ColumnLengthMismatch {
                            column: column.name().to_string(),
                            row_group: slice.row_group,
                            expected,
                            actual: rows.len(),
                        });
                    }
                    Some(_) => {}
                }
                values
                    .entry(column.name().to_string())
                    .or_default()
                    .extend(rows);
            }
            rows_read += contributed.unwrap_or(take);
        }
        drop(file);

        let row_count = values.values().map(Vec::len).min().unwrap_or(rows_read);
        tracing::debug!(
            offset,
            count,
            row_groups = plan.len(),
            rows = row_count,
            "read block"
        );
        Ok(Block {
            offset,
            row_count,
            total_row_count: self.total_rows,
            columns: values,
        })
    }
}

fn to_usize(v: u64) -> Result<usize> {
    usize::try_from(v)
        .map_err(|_| LoaderError::Config(format!("{v} rows exceed addressable memory")))
}

fn decode_error(column: &Column) -> impl FnOnce(ParquetError) -> LoaderError + '_ {
    move |source| LoaderError::Decode {
        column: column.name().to_string(),
        source,
    }
}

fn read_column_slice(
    row_group: &dyn RowGroupReader,
    column: &Column,
    skip: usize,
    take: usize,
) -> Result<Vec<RawValue>> {
    let reader = row_group
        .get_column_reader(column.leaf_index())
        .map_err(decode_error(column))?;
    let levels = column.levels();
    let (values, def, rep) = match reader {
        ColumnReader::BoolColumnReader(mut r) => {
            read_typed(&mut r, skip, take, levels, RawValue::Boolean)
        }
        ColumnReader::Int32ColumnReader(mut r) => {
            read_typed(&mut r, skip, take, levels, RawValue::Int32)
        }
        ColumnReader::Int64ColumnReader(mut r) => {
            read_typed(&mut r, skip, take, levels, RawValue::Int64)
        }
        ColumnReader::Int96ColumnReader(mut r) => {
            read_typed(&mut r, skip, take, levels, |v: Int96| {
                RawValue::Int96(int96_words(&v))
            })
        }
        ColumnReader::FloatColumnReader(mut r) => {
            read_typed(&mut r, skip, take, levels, RawValue::Float)
        }
        ColumnReader::DoubleColumnReader(mut r) => {
            read_typed(&mut r, skip, take, levels, RawValue::Double)
        }
        ColumnReader::ByteArrayColumnReader(mut r) => {
            read_typed(&mut r, skip, take, levels, |v: ByteArray| {
                RawValue::Bytes(Bytes::copy_from_slice(v.data()))
            })
        }
        ColumnReader::FixedLenByteArrayColumnReader(mut r) => {
            read_typed(&mut r, skip, take, levels, |v: FixedLenByteArray| {
                RawValue::Bytes(Bytes::copy_from_slice(v.data()))
            })
        }
    }
    .map_err(decode_error(column))?;
    Ok(assemble(values, &def, &rep, levels))
}

type Decoded = (Vec<RawValue>, Vec<i16>, Vec<i16>);

fn read_typed<T: DataType>(
    reader: &mut ColumnReaderImpl<T>,
    skip: usize,
    take: usize,
    levels: &LevelInfo,
    wrap: impl Fn(T::T) -> RawValue,
) -> parquet::errors::Result<Decoded> {
    if skip > 0 {
        let skipped = reader.skip_records(skip)?;
        if skipped < skip {
            return Err(ParquetError::EOF(format!(
                "column chunk ended after {skipped} of {skip} skipped rows"
            )));
        }
    }

    let mut values: Vec<T::T> = Vec::new();
    let mut def = Vec::new();
    let mut rep = Vec::new();
    let mut records = 0;
    while records < take {
        let (read, _, _) = reader.read_records(
            take - records,
            (levels.max_def > 0).then_some(&mut def),
            (levels.max_rep > 0).then_some(&mut rep),
            &mut values,
        )?;
        if read == 0 {
            break;
        }
        records += read;
    }
    Ok((values.into_iter().map(wrap).collect(), def, rep))
}

fn int96_words(v: &Int96) -> [u32; 3] {
    let d = v.data();
    [d[0], d[1], d[2]]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice(row_group: usize, local_offset: u64, rows: u64) -> RowGroupSlice {
        RowGroupSlice {
            row_group,
            local_offset,
            rows,
        }
    }

    #[test]
    fn window_spanning_row_groups() {
        let groups = [400_000, 400_000, 400_000];
        assert_eq!(
            plan_window(&groups, 0, 500_000),
            vec![slice(0, 0, 400_000), slice(1, 0, 100_000)]
        );
        assert_eq!(
            plan_window(&groups, 500_000, 500_000),
            vec![slice(1, 100_000, 300_000), slice(2, 0, 200_000)]
        );
        assert_eq!(
            plan_window(&groups, 1_000_000, 200_000),
            vec![slice(2, 200_000, 200_000)]
        );
    }

    #[test]
    fn window_inside_one_group() {
        assert_eq!(plan_window(&[10, 10], 12, 3), vec![slice(1, 2, 3)]);
        assert_eq!(
            plan_window(&[10, 0, 10], 5, 10),
            vec![slice(0, 5, 5), slice(2, 0, 5)]
        );
        assert!(plan_window(&[10], 0, 0).is_empty());
    }

    #[test]
    fn block_count_rounds_up() {
        assert_eq!(block_count(1_200_000, 500_000).unwrap(), 3);
        assert_eq!(block_count(10, 3).unwrap(), 4);
        assert_eq!(block_count(9, 3).unwrap(), 3);
        assert_eq!(block_count(0, 4).unwrap(), 0);
    }

    #[test]
    fn block_count_beyond_index_range_is_a_config_error() {
        assert!(matches!(block_count(u64::MAX, 1), Err(LoaderError::Config(_))));
        let limit = u64::from(u32::MAX);
        let blocks = block_count(limit, 1).unwrap();
        assert_eq!(blocks, usize::try_from(limit).unwrap());
        assert!(matches!(block_count(limit + 1, 1), Err(LoaderError::Config(_))));
    }

    #[test]
    fn block_windows_partition_rows() {
        for (total, block_size) in [(1_200_000u64, 500_000u64), (10, 3), (9, 3), (0, 4), (1, 1)] {
            let blocks = block_count(total, block_size).unwrap();
            let mut next = 0;
            for index in 0..blocks {
                let (offset, count) = block_window(total, block_size, index);
                assert_eq!(offset, next);
                assert!(count > 0 && count <= block_size);
                next = offset + count;
            }
            assert_eq!(next, total);
        }
        assert_eq!(block_window(1_200_000, 500_000, 2), (1_000_000, 200_000));
    }
}
