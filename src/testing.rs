//! Fixture writers for tests and examples.
//!
//! Each writer produces a complete Parquet file and takes a maximum row-group
//! size, so multi-row-group layouts are easy to build:
//!
//! - [`write_rows`]: typed rows through Serde + Arrow (`serde_arrow`).
//! - [`write_batch`]: a ready-made Arrow [`RecordBatch`], for shapes such as maps
//!   that are awkward to derive from a Rust type.
//! - [`write_int96_column`] and [`write_interval_column`]: physical types the
//!   Arrow writer cannot produce, written through the low-level column writer.
//!
//! ```no_run
//! use parquet_loader::testing::write_rows;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Row {
//!     id: i64,
//!     name: String,
//! }
//!
//! # fn main() -> anyhow::Result<()> {
//! let rows = vec![Row { id: 1, name: "a".into() }];
//! write_rows("/tmp/rows.parquet", &rows, 1024)?;
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use arrow::datatypes::FieldRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::data_type::{ByteArray, FixedLenByteArray, FixedLenByteArrayType, Int96, Int96Type};
use parquet::file::properties::{EnabledStatistics, WriterProperties};
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::parser::parse_message_type;
use serde::{Deserialize, Serialize};
use serde_arrow::schema::{SchemaLike, TracingOptions};
use serde_arrow::to_record_batch;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Write typed rows to a Parquet file.
///
/// The Arrow schema is inferred from `T` with `SchemaLike::from_type`, so an empty
/// slice still produces a valid (zero-row) file.
///
/// # Errors
/// Schema inference, conversion, file creation, or writing fails.
pub fn write_rows<T: Serialize + Deserialize<'static>>(
    path: impl AsRef<Path>,
    rows: &[T],
    max_row_group_size: usize,
) -> Result<usize> {
    let fields: Vec<FieldRef> = Vec::<FieldRef>::from_type::<T>(TracingOptions::default())
        .context("infer Arrow schema from row type")?;
    let batch: RecordBatch = to_record_batch(&fields, &rows)
        .context("convert rows to RecordBatch")?;
    write_batch(path, &batch, max_row_group_size)
}

/// Write one Arrow batch to a Parquet file.
///
/// # Errors
/// File creation or writing fails.
pub fn write_batch(
    path: impl AsRef<Path>,
    batch: &RecordBatch,
    max_row_group_size: usize,
) -> Result<usize> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("create {}", path.display()))?;
    let props = WriterProperties::builder()
        .set_max_row_group_row_count(Some(max_row_group_size.max(1)))
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .context("create ArrowWriter")?;
    writer.write(batch).context("write batch to parquet")?;
    writer.close().context("close ArrowWriter")?;
    Ok(batch.num_rows())
}

/// Write a single optional INT96 column; `None` entries are nulls.
///
/// # Errors
/// File creation or writing fails.
pub fn write_int96_column(
    path: impl AsRef<Path>,
    name: &str,
    values: &[Option<[u32; 3]>],
    max_row_group_size: usize,
) -> Result<usize> {
    let message = format!("message schema {{ OPTIONAL INT96 {name}; }}");
    write_optional_column(path, &message, values, max_row_group_size, |col, present, def| {
        let present: Vec<Int96> = present
            .iter()
            .map(|w| {
                let mut v = Int96::new();
                v.set_data(w[0], w[1], w[2]);
                v
            })
            .collect();
        col.typed::<Int96Type>()
            .write_batch(&present, Some(def), None)
            .context("write INT96 values")?;
        Ok(())
    })
}

/// Write a single optional INTERVAL column of `(months, days, millis)` triples.
///
/// # Errors
/// File creation or writing fails.
pub fn write_interval_column(
    path: impl AsRef<Path>,
    name: &str,
    values: &[Option<(u32, u32, u32)>],
    max_row_group_size: usize,
) -> Result<usize> {
    let message =
        format!("message schema {{ OPTIONAL FIXED_LEN_BYTE_ARRAY (12) {name} (INTERVAL); }}");
    write_optional_column(path, &message, values, max_row_group_size, |col, present, def| {
        let present: Vec<FixedLenByteArray> = present
            .iter()
            .map(|&(months, days, millis)| {
                let mut raw = Vec::with_capacity(12);
                raw.extend_from_slice(&months.to_le_bytes());
                raw.extend_from_slice(&days.to_le_bytes());
                raw.extend_from_slice(&millis.to_le_bytes());
                FixedLenByteArray::from(ByteArray::from(raw))
            })
            .collect();
        col.typed::<FixedLenByteArrayType>()
            .write_batch(&present, Some(def), None)
            .context("write INTERVAL values")?;
        Ok(())
    })
}

type ColumnWriter<'a> = parquet::file::writer::SerializedColumnWriter<'a>;

fn write_optional_column<T: Copy>(
    path: impl AsRef<Path>,
    message: &str,
    values: &[Option<T>],
    max_row_group_size: usize,
    mut write: impl FnMut(&mut ColumnWriter<'_>, &[T], &[i16]) -> Result<()>,
) -> Result<usize> {
    let path = path.as_ref();
    let schema = parse_message_type(message).context("parse fixture schema")?;
    let schema = Arc::new(schema);
    let props = WriterProperties::builder()
        .set_statistics_enabled(EnabledStatistics::None)
        .build();
    let file = File::create(path)
        .with_context(|| format!("create {}", path.display()))?;
    let mut writer = SerializedFileWriter::new(file, schema, Arc::new(props))
        .context("create file writer")?;

    for chunk in values.chunks(max_row_group_size.max(1)) {
        let present: Vec<T> = chunk.iter().flatten().copied().collect();
        let def: Vec<i16> = chunk.iter().map(|v| i16::from(v.is_some())).collect();
        let mut row_group = writer.next_row_group().context("start row group")?;
        while let Some(mut col) = row_group.next_column().context("next column")? {
            write(&mut col, &present, &def)?;
            col.close().context("close column")?;
        }
        row_group.close().context("close row group")?;
    }
    writer.close().context("close file writer")?;
    Ok(values.len())
}
