//! `ParquetLoader`: the entry point.
//!
//! Opening a file reads its footer once, flattens the schema, and keeps the file
//! reader behind a mutex so every cursor created from the loader shares it.

use crate::cursor::RowCursor;
use crate::error::{LoaderError, Result};
use crate::io::block::BlockReader;
use crate::io::stream::SeekableStream;
use crate::options::LoaderOptions;
use crate::schema::FlatSchema;
use crate::snapshot::LoaderSnapshot;
use bytes::Bytes;
use parquet::file::reader::{ChunkReader, FileReader, SerializedFileReader};
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

/// An opened Parquet file, ready to hand out row cursors.
pub struct ParquetLoader<R: ChunkReader + 'static> {
    options: LoaderOptions,
    schema: FlatSchema,
    reader: BlockReader<R>,
}

impl ParquetLoader<File> {
    /// Open the file at `path`.
    ///
    /// # Errors
    /// I/O, metadata, schema and configuration errors; see [`ParquetLoader::new`].
    pub fn open(path: impl AsRef<Path>, options: LoaderOptions) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::new(file, options)
    }
}

impl ParquetLoader<Bytes> {
    /// Open an in-memory file.
    ///
    /// # Errors
    /// See [`ParquetLoader::new`].
    pub fn from_bytes(bytes: impl Into<Bytes>, options: LoaderOptions) -> Result<Self> {
        Self::new(bytes.into(), options)
    }
}

impl<S: Read + Seek + Send + 'static> ParquetLoader<SeekableStream<S>> {
    /// Open a seekable stream positioned at offset zero.
    ///
    /// # Errors
    /// [`LoaderError::StreamNotAtStart`] if the stream was already advanced; see
    /// also [`ParquetLoader::new`].
    pub fn from_stream(stream: S, options: LoaderOptions) -> Result<Self> {
        Self::new(SeekableStream::new(stream)?, options)
    }
}

impl<R: ChunkReader + 'static> ParquetLoader<R> {
    /// Read the file footer and flatten its schema.
    ///
    /// # Errors
    /// [`LoaderError::Config`] for invalid options, [`LoaderError::Metadata`] if the
    /// footer cannot be read, and the schema errors of
    /// [`FlatSchema::from_descriptor`].
    pub fn new(reader: R, options: LoaderOptions) -> Result<Self> {
        options.validate()?;
        let file = SerializedFileReader::new(reader)
            .map_err(LoaderError::Metadata)?;
        let schema = FlatSchema::from_descriptor(
            file.metadata().file_metadata().schema_descr(),
            options.treat_large_integers_as_timestamps,
        )?;
        let reader = BlockReader::new(file, options.block_size);
        tracing::info!(
            rows = reader.total_rows(),
            row_groups = reader.row_group_rows().len(),
            columns = schema.len(),
            block_size = options.block_size,
            "opened parquet file"
        );
        Ok(Self {
            options,
            schema,
            reader,
        })
    }

    /// Reopen a file with saved options, checking that its schema is unchanged.
    ///
    /// # Errors
    /// [`LoaderError::SchemaMismatch`] if the file's flat schema differs from the
    /// saved one, plus any error of [`ParquetLoader::new`].
    pub fn with_snapshot(reader: R, snapshot: &LoaderSnapshot) -> Result<Self> {
        let loader = Self::new(reader, snapshot.options)?;
        if let Some(diff) = snapshot.schema_difference(&loader.schema.fields()) {
            return Err(LoaderError::SchemaMismatch(diff));
        }
        Ok(loader)
    }

    #[must_use]
    pub const fn options(&self) -> &LoaderOptions {
        &self.options
    }

    #[must_use]
    pub const fn schema(&self) -> &FlatSchema {
        &self.schema
    }

    /// Total row count, or `None` if the file reports no row groups.
    #[must_use]
    pub fn row_count(&self) -> Option<u64> {
        if self.reader.row_group_rows().is_empty() {
            None
        } else {
            Some(self.reader.total_rows())
        }
    }

    /// Number of physical read windows the file is split into.
    ///
    /// # Errors
    /// [`LoaderError::Config`] if the block count exceeds the index range.
    pub fn block_count(&self) -> Result<usize> {
        self.reader.block_count()
    }

    /// A cursor over `columns` (schema indices). With a `seed`, blocks and the rows
    /// inside each block are visited in a reproducible shuffled order.
    ///
    /// # Errors
    /// [`LoaderError::UnknownColumn`] for an index outside the schema and
    /// [`LoaderError::Config`] if the file has too many blocks.
    pub fn cursor(&self, columns: &[usize], seed: Option<u64>) -> Result<RowCursor<'_, R>> {
        RowCursor::new(&self.reader, &self.schema, columns, seed)
    }

    /// Cursors for parallel consumption.
    ///
    /// All cursors would share one underlying file handle and serialize on every
    /// read, so a single cursor is returned whatever `n` is.
    ///
    /// # Errors
    /// As [`cursor`](Self::cursor).
    pub fn cursor_set(
        &self,
        columns: &[usize],
        n: usize,
        seed: Option<u64>,
    ) -> Result<Vec<RowCursor<'_, R>>> {
        tracing::debug!(requested = n, "cursor set collapsed to a single cursor");
        Ok(vec![self.cursor(columns, seed)?])
    }

    /// The payload a host persists to reopen this source later.
    #[must_use]
    pub fn snapshot(&self) -> LoaderSnapshot {
        LoaderSnapshot {
            options: self.options,
            fields: self.schema.fields(),
        }
    }
}

impl<R: ChunkReader + 'static> std::fmt::Debug for ParquetLoader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParquetLoader")
            .field("options", &self.options)
            .field("columns", &self.schema.len())
            .field("rows", &self.reader.total_rows())
            .finish_non_exhaustive()
    }
}
