//! Adapter from a plain `Read + Seek` byte stream to the `parquet` crate's
//! [`ChunkReader`].
//!
//! The stream is owned once behind a mutex; every positioned read locks it, seeks
//! and reads, so any number of readers derived from it can share the handle.

use crate::error::{LoaderError, Result};
use bytes::Bytes;
use parquet::errors::ParquetError;
use parquet::file::reader::{ChunkReader, Length};
use std::io::{Read, Seek, SeekFrom};
use std::sync::{Arc, Mutex, MutexGuard};

/// A seekable stream shared behind a mutex.
pub struct SeekableStream<R> {
    inner: Arc<Mutex<R>>,
    len: u64,
}

impl<R: Read + Seek> SeekableStream<R> {
    /// Wrap `inner`, which must be positioned at offset zero.
    ///
    /// # Errors
    /// [`LoaderError::StreamNotAtStart`] if the stream was already advanced, or
    /// [`LoaderError::Io`] if it cannot be seeked.
    pub fn new(mut inner: R) -> Result<Self> {
        let position = inner.stream_position()?;
        if position != 0 {
            return Err(LoaderError::StreamNotAtStart { position });
        }
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self {
            inner: Arc::new(Mutex::new(inner)),
            len,
        })
    }
}

fn lock<R>(inner: &Mutex<R>) -> std::io::Result<MutexGuard<'_, R>> {
    inner
        .lock()
        .map_err(|_| std::io::Error::other("shared stream lock poisoned"))
}

impl<R> Length for SeekableStream<R> {
    fn len(&self) -> u64 {
        self.len
    }
}

impl<R: Read + Seek + Send + 'static> ChunkReader for SeekableStream<R> {
    type T = StreamSlice<R>;

    fn get_read(&self, start: u64) -> parquet::errors::Result<Self::T> {
        Ok(StreamSlice {
            inner: Arc::clone(&self.inner),
            pos: start,
            end: self.len,
        })
    }

    fn get_bytes(&self, start: u64, length: usize) -> parquet::errors::Result<Bytes> {
        let mut stream = lock(&self.inner)?;
        stream.seek(SeekFrom::Start(start))?;
        let mut buf = vec![0u8; length];
        stream.read_exact(&mut buf).map_err(|e| {
            ParquetError::General(format!("read {length} bytes at offset {start}: {e}"))
        })?;
        Ok(Bytes::from(buf))
    }
}

/// Reader over `[pos, end)` of a [`SeekableStream`].
pub struct StreamSlice<R> {
    inner: Arc<Mutex<R>>,
    pos: u64,
    end: u64,
}

impl<R: Read + Seek> Read for StreamSlice<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let remaining = self.end.saturating_sub(self.pos);
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = usize::try_from(remaining)
            .map_or(buf.len(), |r| r.min(buf.len()));
        let mut stream = lock(&self.inner)?;
        stream.seek(SeekFrom::Start(self.pos))?;
        let n = stream.read(&mut buf[..want])?;
        self.pos += n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn rejects_advanced_stream() {
        let mut cur = Cursor::new(vec![1u8, 2, 3, 4]);
        cur.set_position(2);
        let err = SeekableStream::new(cur).err();
        assert!(matches!(err, Some(LoaderError::StreamNotAtStart { position: 2 })));
    }

    #[test]
    fn positioned_reads() {
        let data: Vec<u8> = (0..10).collect();
        let stream = SeekableStream::new(Cursor::new(data)).unwrap();
        assert_eq!(stream.len(), 10);
        assert_eq!(stream.get_bytes(3, 4).unwrap().as_ref(), &[3, 4, 5, 6]);

        let mut slice = stream.get_read(7).unwrap();
        let mut out = Vec::new();
        slice.read_to_end(&mut out).unwrap();
        assert_eq!(out, vec![7, 8, 9]);

        assert!(stream.get_bytes(8, 5).is_err());
    }
}
