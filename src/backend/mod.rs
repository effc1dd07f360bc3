//! Storage backend abstraction.
//!
//! A [`Backend`] is one storage provider: the native filesystem, an
//! in-memory tree, or a read-only archive. The VFS core owns exactly one
//! backend per [`crate::Fs`] and routes every resolved path to it. Optional
//! operations default to [`FsError::NotImplemented`].

pub mod mem;
pub mod os;
pub mod zip;

pub use mem::MemBackend;
pub use os::OsBackend;
pub use zip::ZipBackend;

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{FsError, FsResult};
use crate::mode::OpenMode;
use crate::stream::SeekOrigin;

/// Timestamp with nanosecond precision, seconds since the Unix epoch.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FileTime {
    pub seconds: i64,
    pub nanos: u32,
}

impl FileTime {
    /// The current wall-clock time.
    pub fn now() -> Self {
        Self::from(SystemTime::now())
    }
}

impl From<SystemTime> for FileTime {
    fn from(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(since) => {
                FileTime { seconds: since.as_secs() as i64, nanos: since.subsec_nanos() }
            }
            Err(before) => {
                let duration = before.duration();
                FileTime { seconds: -(duration.as_secs() as i64), nanos: duration.subsec_nanos() }
            }
        }
    }
}

/// Metadata for one file or directory.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub size: u64,
    pub directory: bool,
    pub symlink: bool,
    pub access_time: FileTime,
    pub modified_time: FileTime,
}

/// One entry yielded by directory iteration: a bare name plus its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct DirEntry {
    pub name: String,
    pub info: FileInfo,
}

/// Directory iteration handle returned by [`Backend::read_dir`].
pub type DirIter = Box<dyn Iterator<Item = FsResult<DirEntry>> + Send>;

/// An open file owned by a backend. A file handle is itself a stream.
pub trait FileHandle: Send + std::fmt::Debug {
    /// See [`Stream::read`]: `Err(AtEnd)` only on a zero-byte read at the
    /// end of the file.
    fn read(&mut self, dst: &mut [u8]) -> FsResult<usize>;

    fn write(&mut self, src: &[u8]) -> FsResult<usize>;

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> FsResult<()>;

    fn tell(&mut self) -> FsResult<u64>;

    fn flush(&mut self) -> FsResult<()>;

    /// Truncates the file at the current cursor.
    fn truncate(&mut self) -> FsResult<()> {
        Err(FsError::NotImplemented)
    }

    /// Metadata for the open file.
    fn info(&self) -> FsResult<FileInfo>;

    /// An independent handle over the same file with its own cursor,
    /// positioned where this handle's cursor currently sits.
    fn duplicate(&self) -> FsResult<Box<dyn FileHandle>>;
}

/// A storage provider.
///
/// Implementations are stateless from the VFS's point of view; whatever
/// per-instance state they need lives in the implementing struct. All
/// methods take `&self` and must be safe to call from multiple threads.
pub trait Backend: Send + Sync {
    /// Opens or creates a file according to `mode`.
    fn open(&self, path: &str, mode: OpenMode) -> FsResult<Box<dyn FileHandle>>;

    /// Metadata for the file or directory at `path`.
    fn info(&self, path: &str) -> FsResult<FileInfo>;

    /// Deletes a file or an empty directory.
    fn remove(&self, _path: &str) -> FsResult<()> {
        Err(FsError::NotImplemented)
    }

    /// Renames a file or directory. Fails with
    /// [`FsError::AlreadyExists`] when the destination exists.
    fn rename(&self, _old_path: &str, _new_path: &str) -> FsResult<()> {
        Err(FsError::NotImplemented)
    }

    /// Creates a single directory level. Reports
    /// [`FsError::AlreadyExists`] when the directory is present.
    fn make_dir(&self, _path: &str) -> FsResult<()> {
        Err(FsError::NotImplemented)
    }

    /// Iterates the entries of a directory. Entry names are bare names, not
    /// full paths. Order is unspecified; the VFS core sorts merged results.
    fn read_dir(&self, path: &str) -> FsResult<DirIter>;
}

/// Wraps a snapshot of directory entries as a [`DirIter`].
pub(crate) fn dir_iter_from_vec(entries: Vec<DirEntry>) -> DirIter {
    Box::new(entries.into_iter().map(Ok))
}
