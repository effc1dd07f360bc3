//! Polymorphic byte streams.
//!
//! A [`Stream`] is the minimal contract the VFS needs from a byte source:
//! positioned reads and writes plus duplication. Open files are streams, the
//! in-memory buffer is a stream, and archive backends read their container
//! through one.

mod memory;

pub use memory::MemoryStream;

use crate::error::{FsError, FsResult};

/// Reference point for [`Stream::seek`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SeekOrigin {
    Start,
    Current,
    End,
}

/// A readable, writable, seekable byte source with duplication.
///
/// Duplication yields a fully independent cursor over the same underlying
/// data; the duplicate is owned by the caller and released by dropping it.
pub trait Stream: Send {
    /// Reads up to `dst.len()` bytes at the cursor.
    ///
    /// Returns `Err(FsError::AtEnd)` only when the cursor is at the end and
    /// zero bytes are available; a short read before the end returns
    /// `Ok(n)` with `n > 0`.
    fn read(&mut self, dst: &mut [u8]) -> FsResult<usize>;

    /// Writes up to `src.len()` bytes at the cursor.
    fn write(&mut self, src: &[u8]) -> FsResult<usize>;

    /// Moves the cursor. Seeking to a negative position is a
    /// [`FsError::BadSeek`]; backends define whether seeking past the end is
    /// permitted.
    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> FsResult<()>;

    /// Current cursor position in bytes from the start.
    fn tell(&mut self) -> FsResult<u64>;

    /// Creates an independent stream over the same data.
    fn duplicate(&self) -> FsResult<Box<dyn Stream>>;
}

/// Fills `dst` completely or fails.
///
/// A stream that ends before `dst` is full produces
/// `Err(FsError::InvalidFile)`; partial data is discarded by the caller.
pub fn read_exact(stream: &mut dyn Stream, dst: &mut [u8]) -> FsResult<()> {
    let mut filled = 0;
    while filled < dst.len() {
        match stream.read(&mut dst[filled..]) {
            Ok(0) | Err(FsError::AtEnd) => return Err(FsError::InvalidFile),
            Ok(n) => filled += n,
            Err(err) => return Err(err),
        }
    }

    Ok(())
}

/// Writes the whole of `src` or fails.
pub fn write_all(stream: &mut dyn Stream, src: &[u8]) -> FsResult<()> {
    let mut written = 0;
    while written < src.len() {
        match stream.write(&src[written..]) {
            Ok(0) => return Err(FsError::Other),
            Ok(n) => written += n,
            Err(err) => return Err(err),
        }
    }

    Ok(())
}
