//! # parquet-loader
//!
//! A **row-oriented reader** for nested Parquet files. It flattens the file's
//! schema into a fixed list of typed columns and hands out cursors that walk the
//! rows one at a time, reading the file in large blocks and optionally shuffling
//! the visitation order.
//!
//! ## Key Features
//!
//! - **Flat schema** - nested structs, lists and maps become one column per leaf,
//!   named by its dotted path and typed by a fixed mapping table
//! - **Block-buffered reads** - rows are materialized a block (default one million
//!   rows) at a time, across row-group boundaries
//! - **Two-level shuffle** - with a seed, blocks and the rows inside each block are
//!   visited in a reproducible random order
//! - **Column subsets** - only the requested columns are decoded
//! - **Stable row ids** - every row has an id derived from its physical position
//!
//! ## Quick Start
//!
//! ```no_run
//! use parquet_loader::{LoaderOptions, ParquetLoader};
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let loader = ParquetLoader::open("data.parquet", LoaderOptions::default())?;
//! for (name, ty) in loader.schema().fields() {
//!     println!("{name}: {ty}");
//! }
//!
//! let mut cursor = loader.cursor(&[0, 1], Some(42))?;
//! while cursor.move_next()? {
//!     let id = cursor.row_id()?;
//!     let first = cursor.value(0)?;
//!     println!("{id} {first}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Flat schema
//!
//! [`FlatSchema`] is built once when the file is opened. Every physical leaf
//! becomes a [`Column`] with a [`RawType`] (the stored type after interpreting
//! annotations) and a [`SemanticType`] (the type of values a cursor returns).
//! Leaves under a list or map are read generically and rendered as text.
//!
//! ### Blocks
//!
//! A [`Block`] is a window of up to `block_size` rows. Windows tile the file
//! without gaps or overlaps and may span several row groups.
//!
//! ### Cursors
//!
//! A [`RowCursor`] moves through `Initial`, `InBlock` and `Exhausted` states. Only
//! the advance that enters a new block reads from the file; all cursors of one
//! loader share the file handle and take turns reading.
//!
//! ## Module Overview
//!
//! - [`loader`] - Opening files and creating cursors
//! - [`schema`] - Schema flattening
//! - [`types`] - Raw and semantic types and the mapping between them
//! - [`convert`] - Per-type value conversions
//! - [`cursor`] - The row cursor state machine
//! - [`io`] - Stream adapters, level reassembly and the block reader
//! - [`order`] - Sequential and shuffled index orders
//! - [`snapshot`] - Saved loader configuration
//! - [`testing`] - Fixture writers

pub mod convert;
pub mod cursor;
pub mod error;
pub mod io;
pub mod loader;
pub mod options;
pub mod order;
pub mod schema;
pub mod snapshot;
#[cfg(feature = "testing")]
pub mod testing;
pub mod types;
pub mod value;

pub use cursor::{CursorState, RowCursor};
pub use error::{LoaderError, Result};
pub use io::block::Block;
pub use loader::ParquetLoader;
pub use options::{DEFAULT_BLOCK_SIZE, LoaderOptions};
pub use order::OrderSequence;
pub use schema::{Column, FlatSchema, SchemaField};
pub use snapshot::LoaderSnapshot;
pub use types::{RawType, SemanticType};
pub use value::{RawValue, RowId, Value};
