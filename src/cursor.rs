//! Row Cursor.
//!
//! A cursor walks the rows of a file one at a time through a two-level order: an
//! outer order over blocks and, for each loaded block, an inner order over its
//! rows. Without a seed both orders are sequential, so rows come out in file
//! order. With a seed both levels are shuffled from the same random source; rows
//! never cross block boundaries.
//!
//! ```text
//! Initial --move_next--> InBlock --move_next--> InBlock ... --> Exhausted
//! ```
//!
//! Only the advance that crosses into a new block touches the file.

use crate::convert::{ConvertFn, converter_for};
use crate::error::{LoaderError, Result};
use crate::io::block::BlockReader;
use crate::order::OrderSequence;
use crate::schema::{Column, FlatSchema};
use crate::types::RawType;
use crate::value::{RawValue, RowId, Value};
use parquet::file::reader::ChunkReader;
use rand::SeedableRng;
use rand::rngs::StdRng;

static NULL_RAW: RawValue = RawValue::Null;

/// Where a cursor is in its iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorState {
    /// Created, not yet advanced.
    Initial,
    /// Positioned on a row.
    InBlock,
    /// No rows left. Terminal.
    Exhausted,
}

struct ActiveColumn<'a> {
    column: &'a Column,
    convert: ConvertFn,
    /// Values of the current block; empty if the block carried none for this column.
    values: Vec<RawValue>,
}

/// Iterator over the rows of a file, restricted to a subset of active columns.
pub struct RowCursor<'a, R: ChunkReader + 'static> {
    reader: &'a BlockReader<R>,
    /// Indexed by schema position; `None` for inactive columns.
    active: Vec<Option<ActiveColumn<'a>>>,
    rng: Option<StdRng>,
    block_order: OrderSequence,
    row_order: OrderSequence,
    state: CursorState,
    block_offset: u64,
    row_index: usize,
    rows_visited: u64,
}

impl<'a, R: ChunkReader + 'static> RowCursor<'a, R> {
    /// Create a cursor over `columns` (schema indices).
    ///
    /// # Errors
    /// [`LoaderError::UnknownColumn`] for an index outside the schema, and
    /// [`LoaderError::Config`] if the file holds more blocks than can be indexed.
    pub fn new(
        reader: &'a BlockReader<R>,
        schema: &'a FlatSchema,
        columns: &[usize],
        seed: Option<u64>,
    ) -> Result<Self> {
        let mut active: Vec<Option<ActiveColumn<'a>>> =
            std::iter::repeat_with(|| None).take(schema.len()).collect();
        for &index in columns {
            let column = schema.column(index).ok_or(LoaderError::UnknownColumn {
                index,
                len: schema.len(),
            })?;
            active[index] = Some(ActiveColumn {
                column,
                convert: converter_for(column.raw_type()),
                values: Vec::new(),
            });
        }

        let mut rng = seed.map(StdRng::seed_from_u64);
        let block_order = OrderSequence::new(reader.block_count()?, rng.as_mut());
        Ok(Self {
            reader,
            active,
            rng,
            block_order,
            row_order: OrderSequence::identity(0),
            state: CursorState::Initial,
            block_offset: 0,
            row_index: 0,
            rows_visited: 0,
        })
    }

    #[must_use]
    pub const fn state(&self) -> CursorState {
        self.state
    }

    /// Advance to the next row.
    ///
    /// Returns `Ok(false)` once every row has been visited. Crossing into a new
    /// block performs a physical read; a failing read ends the iteration.
    ///
    /// # Errors
    /// Any error of [`BlockReader::read`].
    pub fn move_next(&mut self) -> Result<bool> {
        if self.state == CursorState::Exhausted {
            return Ok(false);
        }
        loop {
            if self.state == CursorState::InBlock
                && let Some(row) = self.row_order.next()
            {
                self.row_index = row;
                self.rows_visited += 1;
                return Ok(true);
            }
            let Some(block) = self.block_order.next() else {
                self.finish();
                return Ok(false);
            };
            if let Err(e) = self.load_block(block) {
                self.finish();
                return Err(e);
            }
            self.state = CursorState::InBlock;
        }
    }

    fn load_block(&mut self, index: usize) -> Result<()> {
        let (offset, count) = self.reader.window(index);
        let columns: Vec<&Column> = self
            .active
            .iter()
            .flatten()
            .map(|a| a.column)
            .collect();
        let mut block = self.reader.read(offset, count, &columns)?;
        for active in self.active.iter_mut().flatten() {
            active.values = block.take_column(active.column.name()).unwrap_or_default();
        }
        self.block_offset = block.offset();
        self.row_order = OrderSequence::new(block.row_count(), self.rng.as_mut());
        Ok(())
    }

    fn finish(&mut self) {
        self.state = CursorState::Exhausted;
        self.row_order = OrderSequence::identity(0);
        for active in self.active.iter_mut().flatten() {
            active.values = Vec::new();
        }
    }

    /// Whether `column` was requested when the cursor was created.
    #[must_use]
    pub fn is_column_active(&self, column: usize) -> bool {
        matches!(self.active.get(column), Some(Some(_)))
    }

    fn current(&self, column: usize) -> Result<(&ActiveColumn<'a>, &RawValue)> {
        let slot = self.active.get(column).ok_or(LoaderError::UnknownColumn {
            index: column,
            len: self.active.len(),
        })?;
        let active = slot.as_ref().ok_or(LoaderError::ColumnNotActive(column))?;
        if self.state != CursorState::InBlock {
            return Err(LoaderError::InvalidState);
        }
        let raw = active.values.get(self.row_index).unwrap_or(&NULL_RAW);
        Ok((active, raw))
    }

    /// Value of `column` in the current row, converted to its semantic type.
    ///
    /// # Errors
    /// [`LoaderError::InvalidState`] when not positioned on a row,
    /// [`LoaderError::ColumnNotActive`] for a column outside the active set, and
    /// [`LoaderError::NullValue`] for a null in a strict integer column.
    pub fn value(&self, column: usize) -> Result<Value> {
        let (active, raw) = self.current(column)?;
        let value = (active.convert)(raw, active.column.context());
        value.ok_or_else(|| LoaderError::NullValue {
            column: active.column.name().to_string(),
        })
    }

    /// Borrow the current value of a string column without copying.
    ///
    /// `None` for nulls, for values that are not valid UTF-8, and for columns
    /// whose raw type is not [`RawType::String`].
    ///
    /// # Errors
    /// Same caller-contract errors as [`value`](Self::value).
    pub fn str_value(&self, column: usize) -> Result<Option<&str>> {
        let (active, raw) = self.current(column)?;
        if active.column.raw_type() != RawType::String {
            return Ok(None);
        }
        Ok(match raw {
            RawValue::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        })
    }

    /// Identifier of the current row: its physical position in the file.
    ///
    /// The id is `block offset + row index within the block`, independent of the
    /// shuffle, so the same row always gets the same id.
    ///
    /// # Errors
    /// [`LoaderError::InvalidState`] when not positioned on a row.
    pub fn row_id(&self) -> Result<RowId> {
        if self.state != CursorState::InBlock {
            return Err(LoaderError::InvalidState);
        }
        Ok(RowId::new(self.block_offset + self.row_index as u64, 0))
    }

    /// All active values of the current row, in schema order.
    ///
    /// # Errors
    /// As [`value`](Self::value).
    pub fn row(&self) -> Result<Vec<Value>> {
        self.active
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_some())
            .map(|(i, _)| self.value(i))
            .collect()
    }

    /// Rows visited so far.
    #[must_use]
    pub const fn rows_visited(&self) -> u64 {
        self.rows_visited
    }
}

impl<R: ChunkReader + 'static> std::fmt::Debug for RowCursor<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowCursor")
            .field("state", &self.state)
            .field("block_offset", &self.block_offset)
            .field("row_index", &self.row_index)
            .field("rows_visited", &self.rows_visited)
            .finish_non_exhaustive()
    }
}
