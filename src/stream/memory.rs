//! In-memory byte buffer exposing the stream contract.

use std::sync::Arc;

use crate::error::{FsError, FsResult};
use crate::stream::{SeekOrigin, Stream};

enum Storage {
    /// Shared immutable bytes. Duplicates alias the same allocation.
    Shared(Arc<[u8]>),
    /// Growable private buffer. Duplicates copy.
    Owned(Vec<u8>),
}

/// An in-memory stream.
///
/// Created read-only over shared bytes with [`MemoryStream::read_only`], or
/// growable with [`MemoryStream::writable`]. Writes past the current end
/// zero-fill the gap, matching the memory backend's file semantics.
pub struct MemoryStream {
    storage: Storage,
    cursor: u64,
}

impl MemoryStream {
    /// Creates a read-only stream over `data`. Duplication is zero-copy.
    pub fn read_only(data: impl Into<Arc<[u8]>>) -> Self {
        Self { storage: Storage::Shared(data.into()), cursor: 0 }
    }

    /// Creates an empty growable stream.
    pub fn writable() -> Self {
        Self { storage: Storage::Owned(Vec::new()), cursor: 0 }
    }

    /// Total number of bytes held by the stream.
    pub fn len(&self) -> usize {
        match &self.storage {
            Storage::Shared(data) => data.len(),
            Storage::Owned(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consumes the stream and returns its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        match self.storage {
            Storage::Shared(data) => data.to_vec(),
            Storage::Owned(data) => data,
        }
    }

    fn bytes(&self) -> &[u8] {
        match &self.storage {
            Storage::Shared(data) => data,
            Storage::Owned(data) => data,
        }
    }
}

impl Stream for MemoryStream {
    fn read(&mut self, dst: &mut [u8]) -> FsResult<usize> {
        if dst.is_empty() {
            return Ok(0);
        }

        let data = self.bytes();
        if self.cursor >= data.len() as u64 {
            return Err(FsError::AtEnd);
        }

        let start = self.cursor as usize;
        let count = dst.len().min(data.len() - start);
        dst[..count].copy_from_slice(&data[start..start + count]);
        self.cursor += count as u64;

        Ok(count)
    }

    fn write(&mut self, src: &[u8]) -> FsResult<usize> {
        let data = match &mut self.storage {
            Storage::Shared(_) => return Err(FsError::AccessDenied),
            Storage::Owned(data) => data,
        };

        if src.is_empty() {
            return Ok(0);
        }

        let end = self
            .cursor
            .checked_add(src.len() as u64)
            .filter(|end| *end <= usize::MAX as u64)
            .ok_or(FsError::TooBig)? as usize;

        if data.len() < end {
            data.resize(self.cursor as usize, 0);
            data.resize(end, 0);
        }

        let start = self.cursor as usize;
        data[start..end].copy_from_slice(src);
        self.cursor = end as u64;

        Ok(src.len())
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> FsResult<()> {
        let base = match origin {
            SeekOrigin::Start => 0,
            SeekOrigin::Current => self.cursor as i64,
            SeekOrigin::End => self.len() as i64,
        };

        let target = base.checked_add(offset).ok_or(FsError::BadSeek)?;
        if target < 0 {
            return Err(FsError::BadSeek);
        }

        self.cursor = target as u64;
        Ok(())
    }

    fn tell(&mut self) -> FsResult<u64> {
        Ok(self.cursor)
    }

    fn duplicate(&self) -> FsResult<Box<dyn Stream>> {
        let storage = match &self.storage {
            Storage::Shared(data) => Storage::Shared(Arc::clone(data)),
            Storage::Owned(data) => Storage::Owned(data.clone()),
        };

        Ok(Box::new(MemoryStream { storage, cursor: self.cursor }))
    }
}
