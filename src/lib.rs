//! stratafs - a mountable virtual filesystem with transparent archive
//! access.
//!
//! One [`Fs`] presents a unified view over a storage backend — the native
//! filesystem, an in-memory tree, or a read-only archive — composed through
//! prioritised mount points. Paths that pass through an archive file are
//! resolved by descending into the archive, with opened archives cached and
//! reference counted behind the scenes.
//!
//! ```no_run
//! use stratafs::{ArchiveTypes, Fs, OpenMode};
//! use stratafs::backend::OsBackend;
//!
//! let fs = Fs::with_archive_types(OsBackend::new(), ArchiveTypes::zip_only());
//!
//! // Resolves from disk, or from any archive along the way.
//! let mut file = fs.open("assets/textures/grass.png", OpenMode::READ)?;
//! let bytes = file.read_to_end()?;
//! # Ok::<(), stratafs::FsError>(())
//! ```

pub mod backend;
pub mod config;
mod error;
mod mode;
pub mod path;
mod stream;
mod vfs;

pub use backend::{DirEntry, FileInfo, FileTime};
pub use config::MountProfile;
pub use error::{FsError, FsResult};
pub use mode::OpenMode;
pub use stream::{read_exact, write_all, MemoryStream, SeekOrigin, Stream};
pub use vfs::{
    Archive, ArchiveOpener, ArchiveTypes, File, Fs, GcPolicy, MountPriority, ReadDir, ZipOpener,
};
