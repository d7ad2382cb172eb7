//! Physical access to Parquet data: byte-stream adapters, per-row reassembly of
//! leaf columns, and the windowed Block Reader.

pub mod block;
pub mod levels;
pub mod stream;

pub use block::{Block, BlockReader, RowGroupSlice, block_count, block_window, plan_window};
pub use levels::LevelInfo;
pub use stream::SeekableStream;
