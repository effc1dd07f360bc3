//! Result codes shared by every filesystem operation.

use std::fmt;
use std::io;

/// Convenient result alias used by all filesystem operations.
pub type FsResult<T> = Result<T, FsError>;

/// Status codes returned by filesystem and stream operations.
///
/// The taxonomy splits into invalid usage (`InvalidArgs`, `InvalidOperation`,
/// `BadSeek`), resource state (`DoesNotExist` through `AtEnd`), capacity
/// (`OutOfMemory`, `TooBig`), integrity (`InvalidFile`, `ChecksumMismatch`)
/// and capability (`NotImplemented`, `NoBackend`). `NeedsMoreInput` and
/// `HasMoreOutput` are progress signals used by the streaming decompressor
/// rather than failures.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FsError {
    /// Unspecified failure.
    Other,
    /// An argument was out of range or otherwise unusable.
    InvalidArgs,
    /// The operation is not valid for the target (e.g. writing to an archive).
    InvalidOperation,
    /// The file contents are malformed.
    InvalidFile,
    /// The backend does not implement this operation.
    NotImplemented,
    /// An allocation failed.
    OutOfMemory,
    /// Permission was denied by the backend.
    AccessDenied,
    /// No file or directory exists at the path.
    DoesNotExist,
    /// A file or directory already exists at the path.
    AlreadyExists,
    /// A non-directory was found where a directory was required.
    NotDirectory,
    /// A directory was found where a file was required.
    IsDirectory,
    /// The directory still has entries.
    DirectoryNotEmpty,
    /// The cursor sits at the end of the stream and zero bytes were read.
    AtEnd,
    /// The seek target is not reachable.
    BadSeek,
    /// The object is too large to process.
    TooBig,
    /// The decoder consumed all input without reaching the end of the stream.
    NeedsMoreInput,
    /// The decoder filled the output buffer with data still pending.
    HasMoreOutput,
    /// A checksum over decoded data did not match the stored value.
    ChecksumMismatch,
    /// No backend is registered that can service the request.
    NoBackend,
}

impl FsError {
    /// `true` for the non-error progress signals of the streaming decoder.
    pub fn is_progress(self) -> bool {
        matches!(self, FsError::NeedsMoreInput | FsError::HasMoreOutput)
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            FsError::Other => "operation failed",
            FsError::InvalidArgs => "invalid arguments",
            FsError::InvalidOperation => "invalid operation",
            FsError::InvalidFile => "invalid file",
            FsError::NotImplemented => "not implemented",
            FsError::OutOfMemory => "out of memory",
            FsError::AccessDenied => "access denied",
            FsError::DoesNotExist => "does not exist",
            FsError::AlreadyExists => "already exists",
            FsError::NotDirectory => "not a directory",
            FsError::IsDirectory => "is a directory",
            FsError::DirectoryNotEmpty => "directory not empty",
            FsError::AtEnd => "end of stream",
            FsError::BadSeek => "bad seek",
            FsError::TooBig => "too big",
            FsError::NeedsMoreInput => "needs more input",
            FsError::HasMoreOutput => "has more output",
            FsError::ChecksumMismatch => "checksum mismatch",
            FsError::NoBackend => "no backend",
        };

        f.write_str(message)
    }
}

impl std::error::Error for FsError {}

impl From<io::Error> for FsError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => FsError::DoesNotExist,
            io::ErrorKind::PermissionDenied => FsError::AccessDenied,
            io::ErrorKind::AlreadyExists => FsError::AlreadyExists,
            io::ErrorKind::NotADirectory => FsError::NotDirectory,
            io::ErrorKind::IsADirectory => FsError::IsDirectory,
            io::ErrorKind::DirectoryNotEmpty => FsError::DirectoryNotEmpty,
            io::ErrorKind::InvalidInput => FsError::InvalidArgs,
            io::ErrorKind::UnexpectedEof => FsError::AtEnd,
            io::ErrorKind::OutOfMemory => FsError::OutOfMemory,
            io::ErrorKind::Unsupported => FsError::NotImplemented,
            _ => FsError::Other,
        }
    }
}

impl From<FsError> for io::Error {
    fn from(err: FsError) -> Self {
        let kind = match err {
            FsError::InvalidArgs => io::ErrorKind::InvalidInput,
            FsError::AccessDenied => io::ErrorKind::PermissionDenied,
            FsError::DoesNotExist => io::ErrorKind::NotFound,
            FsError::AlreadyExists => io::ErrorKind::AlreadyExists,
            FsError::NotDirectory => io::ErrorKind::NotADirectory,
            FsError::IsDirectory => io::ErrorKind::IsADirectory,
            FsError::DirectoryNotEmpty => io::ErrorKind::DirectoryNotEmpty,
            FsError::AtEnd => io::ErrorKind::UnexpectedEof,
            FsError::OutOfMemory => io::ErrorKind::OutOfMemory,
            FsError::NotImplemented => io::ErrorKind::Unsupported,
            FsError::InvalidFile | FsError::ChecksumMismatch => io::ErrorKind::InvalidData,
            _ => io::ErrorKind::Other,
        };

        io::Error::new(kind, err)
    }
}
