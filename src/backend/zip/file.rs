//! Read path for one opened ZIP entry.
//!
//! Every handle owns a duplicate of the archive stream, so concurrent
//! handles never fight over a shared cursor. Stored entries read through a
//! single cache with a bulk bypass for large requests; deflated entries
//! stream through a compressed input cache into an uncompressed output
//! cache. There is no seek table: backward seeks in deflated entries reset
//! the decompressor and read forward from the start.

use crate::backend::zip::inflate::{InflateStatus, InflateStream};
use crate::backend::zip::CompressionMethod;
use crate::backend::{FileHandle, FileInfo};
use crate::error::{FsError, FsResult};
use crate::stream::{SeekOrigin, Stream};

/// Uncompressed output cache size.
const CACHE_SIZE: usize = 32768;
/// Compressed input cache size.
const COMPRESSED_CACHE_SIZE: usize = 4096;

/// Shape of one entry as needed by the read path.
#[derive(Debug, Copy, Clone)]
pub(crate) struct EntryShape {
    pub method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    /// Absolute offset of the first payload byte, past the local header.
    pub payload_offset: u64,
}

pub(crate) struct ZipFile {
    stream: Box<dyn Stream>,
    entry: EntryShape,
    cursor_uncompressed: u64,
    cursor_compressed: u64,
    inflater: Option<InflateStream>,

    cache: Vec<u8>,
    cache_size: usize,
    cache_cursor: usize,

    compressed_cache: Vec<u8>,
    compressed_cache_size: usize,
    compressed_cache_cursor: usize,
}

impl std::fmt::Debug for ZipFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipFile")
            .field("entry", &self.entry)
            .field("cursor_uncompressed", &self.cursor_uncompressed)
            .field("cursor_compressed", &self.cursor_compressed)
            .finish()
    }
}

impl ZipFile {
    pub fn new(stream: Box<dyn Stream>, entry: EntryShape) -> Self {
        // Stored entries have no use for a separate compressed cache, so its
        // budget is folded into the main cache.
        let (cache_capacity, compressed_capacity, inflater) = match entry.method {
            CompressionMethod::Store => (CACHE_SIZE + COMPRESSED_CACHE_SIZE, 0, None),
            CompressionMethod::Deflate => {
                (CACHE_SIZE, COMPRESSED_CACHE_SIZE, Some(InflateStream::new(false)))
            }
        };

        Self {
            stream,
            entry,
            cursor_uncompressed: 0,
            cursor_compressed: 0,
            inflater,
            cache: vec![0u8; cache_capacity],
            cache_size: 0,
            cache_cursor: 0,
            compressed_cache: vec![0u8; compressed_capacity],
            compressed_cache_size: 0,
            compressed_cache_cursor: 0,
        }
    }

    fn read_store(&mut self, dst: &mut [u8]) -> FsResult<usize> {
        let remaining = self.entry.uncompressed_size - self.cursor_uncompressed;
        if remaining == 0 {
            return Err(FsError::AtEnd);
        }

        let to_read = (dst.len() as u64).min(remaining) as usize;

        // Serve what the cache holds.
        let cached = self.cache_size - self.cache_cursor;
        let from_cache = to_read.min(cached);
        dst[..from_cache]
            .copy_from_slice(&self.cache[self.cache_cursor..self.cache_cursor + from_cache]);
        self.cache_cursor += from_cache;
        let mut read = from_cache;

        if read < to_read {
            let mut remaining_to_read = to_read - read;

            self.stream.seek(
                (self.entry.payload_offset + self.cursor_uncompressed + read as u64) as i64,
                SeekOrigin::Start,
            )?;

            // Large remainders bypass the cache entirely, rounded down to a
            // multiple of the cache capacity.
            if remaining_to_read > self.cache.len() {
                let bulk = (remaining_to_read / self.cache.len()) * self.cache.len();
                let got = read_fully(self.stream.as_mut(), &mut dst[read..read + bulk])?;
                read += got;
                remaining_to_read -= got;

                if got < bulk {
                    // The stream ended early; report what we have.
                    self.cursor_uncompressed += read as u64;
                    return if read > 0 { Ok(read) } else { Err(FsError::AtEnd) };
                }
            }

            if remaining_to_read > 0 {
                let refill = (self.cache.len() as u64)
                    .min(self.entry.uncompressed_size - (self.cursor_uncompressed + read as u64))
                    as usize;
                self.cache_size = read_fully(self.stream.as_mut(), &mut self.cache[..refill])?;
                self.cache_cursor = 0;

                let from_cache = remaining_to_read.min(self.cache_size);
                dst[read..read + from_cache].copy_from_slice(&self.cache[..from_cache]);
                self.cache_cursor = from_cache;
                read += from_cache;
            }
        }

        self.cursor_uncompressed += read as u64;
        Ok(read)
    }

    fn read_deflate(&mut self, dst: &mut [u8]) -> FsResult<usize> {
        let remaining = self.entry.uncompressed_size - self.cursor_uncompressed;
        if remaining == 0 {
            return Err(FsError::AtEnd);
        }

        let to_read = (dst.len() as u64).min(remaining) as usize;
        let mut read = 0usize;

        loop {
            // Serve from the uncompressed cache first.
            let cached = self.cache_size - self.cache_cursor;
            let from_cache = (to_read - read).min(cached);
            dst[read..read + from_cache]
                .copy_from_slice(&self.cache[self.cache_cursor..self.cache_cursor + from_cache]);
            self.cache_cursor += from_cache;
            read += from_cache;

            if read == to_read {
                break;
            }

            // The cache ran dry; refill it from the decompressor. This inner
            // loop may need several rounds of compressed input to produce
            // any output.
            self.cache_cursor = 0;
            self.cache_size = 0;

            loop {
                let mut has_more_input = self.cursor_compressed < self.entry.compressed_size;

                if self.compressed_cache_size == 0 && has_more_input {
                    self.stream.seek(
                        (self.entry.payload_offset + self.cursor_compressed) as i64,
                        SeekOrigin::Start,
                    )?;

                    let budget = (self.compressed_cache.len() as u64)
                        .min(self.entry.compressed_size - self.cursor_compressed)
                        as usize;
                    let got =
                        read_fully(self.stream.as_mut(), &mut self.compressed_cache[..budget])?;
                    if got < budget {
                        has_more_input = false;
                    }

                    self.cursor_compressed += got as u64;
                    self.compressed_cache_size = got;
                    self.compressed_cache_cursor = 0;

                    if self.cursor_compressed >= self.entry.compressed_size {
                        has_more_input = false;
                    }
                }

                let inflater = self.inflater.as_mut().ok_or(FsError::InvalidFile)?;
                let input =
                    &self.compressed_cache[self.compressed_cache_cursor..self.compressed_cache_size];
                let output = &mut self.cache[self.cache_size..];

                let progress = inflater.inflate(input, output, has_more_input)?;

                self.compressed_cache_cursor += progress.consumed;
                self.cache_size += progress.produced;

                if self.compressed_cache_cursor == self.compressed_cache_size {
                    self.compressed_cache_cursor = 0;
                    self.compressed_cache_size = 0;
                }

                match progress.status {
                    InflateStatus::NeedsMoreInput => continue,
                    InflateStatus::Done | InflateStatus::HasMoreOutput => break,
                }
            }

            if self.cache_size == 0 {
                // The decompressor finished early; surface what was read.
                break;
            }
        }

        self.cursor_uncompressed += read as u64;

        if read == 0 {
            Err(FsError::AtEnd)
        } else {
            Ok(read)
        }
    }
}

/// Reads until `dst` is full or the stream ends; a clean end is not an
/// error here, short counts are reported to the caller.
fn read_fully(stream: &mut dyn Stream, dst: &mut [u8]) -> FsResult<usize> {
    let mut filled = 0usize;
    while filled < dst.len() {
        match stream.read(&mut dst[filled..]) {
            Ok(count) => filled += count,
            Err(FsError::AtEnd) => break,
            Err(err) => return Err(err),
        }
    }

    Ok(filled)
}

impl FileHandle for ZipFile {
    fn read(&mut self, dst: &mut [u8]) -> FsResult<usize> {
        if dst.is_empty() {
            return Ok(0);
        }

        match self.entry.method {
            CompressionMethod::Store => self.read_store(dst),
            CompressionMethod::Deflate => self.read_deflate(dst),
        }
    }

    fn write(&mut self, _src: &[u8]) -> FsResult<usize> {
        Err(FsError::NotImplemented)
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> FsResult<()> {
        let base = match origin {
            SeekOrigin::Start => 0i64,
            SeekOrigin::Current => self.cursor_uncompressed as i64,
            SeekOrigin::End => self.entry.uncompressed_size as i64,
        };

        let target = base.checked_add(offset).ok_or(FsError::BadSeek)?;
        if target < 0 || target as u64 > self.entry.uncompressed_size {
            return Err(FsError::BadSeek);
        }
        let target = target as u64;

        // Seeks that stay within the cached window are cursor arithmetic.
        if target > self.cursor_uncompressed {
            let delta = target - self.cursor_uncompressed;
            if delta <= (self.cache_size - self.cache_cursor) as u64 {
                self.cache_cursor += delta as usize;
                self.cursor_uncompressed = target;
                return Ok(());
            }
        } else {
            let delta = self.cursor_uncompressed - target;
            if delta <= self.cache_cursor as u64 {
                self.cache_cursor -= delta as usize;
                self.cursor_uncompressed = target;
                return Ok(());
            }
        }

        // The decompressor sits at the end of whatever the cache held; any
        // forward discard must start from there, not from the consumer
        // cursor, or the cached span would be skipped twice.
        let produced = self.cursor_uncompressed + (self.cache_size - self.cache_cursor) as u64;

        self.cache_size = 0;
        self.cache_cursor = 0;

        if self.entry.method != CompressionMethod::Store {
            self.compressed_cache_cursor = 0;
            self.compressed_cache_size = 0;

            // Backward seeks restart the stream; forward seeks read-discard
            // from the decompressor's position.
            if target < produced {
                self.cursor_uncompressed = 0;
                self.cursor_compressed = 0;

                if let Some(inflater) = self.inflater.as_mut() {
                    inflater.reset();
                }
            } else {
                self.cursor_uncompressed = produced;
            }

            let mut scratch = [0u8; 4096];
            while self.cursor_uncompressed < target {
                let step = (target - self.cursor_uncompressed).min(scratch.len() as u64) as usize;
                let got = self.read_deflate(&mut scratch[..step]).map_err(|err| {
                    if err == FsError::AtEnd {
                        FsError::BadSeek
                    } else {
                        err
                    }
                })?;

                if got == 0 {
                    return Err(FsError::BadSeek);
                }
            }
        }

        self.cursor_uncompressed = target;
        Ok(())
    }

    fn tell(&mut self) -> FsResult<u64> {
        Ok(self.cursor_uncompressed)
    }

    fn flush(&mut self) -> FsResult<()> {
        Ok(())
    }

    fn info(&self) -> FsResult<FileInfo> {
        Ok(FileInfo {
            size: self.entry.uncompressed_size,
            directory: false,
            ..FileInfo::default()
        })
    }

    fn duplicate(&self) -> FsResult<Box<dyn FileHandle>> {
        // The caches intentionally start cold; only the cursor carries over.
        let mut duplicated = ZipFile::new(self.stream.duplicate()?, self.entry);
        duplicated.seek(self.cursor_uncompressed as i64, SeekOrigin::Start)?;

        Ok(Box::new(duplicated))
    }
}
