//! Archive type registry, the opened-archive cache and its garbage
//! collection.
//!
//! Archives opened during path resolution are cached per [`Fs`] and
//! reference counted. A file opened out of an archive holds an
//! [`ArchiveRef`]; dropping the file releases the reference and prompts a
//! threshold sweep. Entries whose count reaches zero stay cached — reopening
//! an archive means re-reading its whole central directory — until the
//! number of idle archives exceeds the configured threshold.

use std::sync::{Arc, Weak};

use tracing::{debug, trace};

use crate::backend::{Backend, ZipBackend};
use crate::error::FsResult;
use crate::path;
use crate::stream::Stream;
use crate::vfs::{Fs, FsShared};

/// Garbage-collection policy for the opened-archive cache.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GcPolicy {
    /// Unload idle archives, oldest first, until at most the configured
    /// threshold remain.
    Threshold,
    /// Unload every idle archive.
    Full,
}

/// Opens an archive backend over a byte stream. One implementation exists
/// per supported container format.
pub trait ArchiveOpener: Send + Sync {
    fn open_backend(&self, stream: Box<dyn Stream>) -> FsResult<Box<dyn Backend>>;
}

/// Opener for ZIP containers.
pub struct ZipOpener;

impl ArchiveOpener for ZipOpener {
    fn open_backend(&self, stream: Box<dyn Stream>) -> FsResult<Box<dyn Backend>> {
        Ok(Box::new(ZipBackend::open(stream)?))
    }
}

struct ArchiveType {
    opener: Arc<dyn ArchiveOpener>,
    extensions: Vec<String>,
}

/// Maps file extensions to archive backends.
///
/// The registry is fixed at [`Fs`] construction; archives opened through a
/// filesystem share its registry so nested archives are recognised.
#[derive(Default)]
pub struct ArchiveTypes {
    types: Vec<ArchiveType>,
}

impl ArchiveTypes {
    pub fn new() -> Self {
        Self { types: Vec::new() }
    }

    /// Registers `opener` for the given extensions (without the dot).
    pub fn register(
        mut self,
        opener: impl ArchiveOpener + 'static,
        extensions: &[&str],
    ) -> Self {
        self.types.push(ArchiveType {
            opener: Arc::new(opener),
            extensions: extensions.iter().map(|e| (*e).to_owned()).collect(),
        });
        self
    }

    /// A registry recognising `.zip` only.
    pub fn zip_only() -> Self {
        Self::new().register(ZipOpener, &["zip"])
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// The opener whose extension matches the final extension of `name`.
    pub(crate) fn match_name(&self, name: &str) -> Option<&Arc<dyn ArchiveOpener>> {
        for archive_type in &self.types {
            for extension in &archive_type.extensions {
                if path::extension_equal(name, extension) {
                    return Some(&archive_type.opener);
                }
            }
        }

        None
    }
}

/// One cached archive: `(filesystem, reference count, source path)`.
pub(crate) struct ArchiveEntry {
    pub path: String,
    pub fs: Fs,
    pub refcount: usize,
}

/// The opened-archive cache of one [`Fs`]. Lookup is by exact byte match on
/// the source path; the same archive reached through two spellings occupies
/// two entries.
#[derive(Default)]
pub(crate) struct ArchiveCache {
    entries: Vec<ArchiveEntry>,
}

impl ArchiveCache {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn find(&mut self, archive_path: &str) -> Option<&mut ArchiveEntry> {
        self.entries.iter_mut().find(|entry| entry.path == archive_path)
    }

    pub fn insert(&mut self, entry: ArchiveEntry) {
        trace!(path = %entry.path, "caching opened archive");
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn refcount(&self, archive_path: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|entry| entry.path == archive_path)
            .map(|entry| entry.refcount)
    }

    /// Removes entries according to `policy` and returns them so the caller
    /// can drop them outside the archive lock.
    pub fn collect(&mut self, policy: GcPolicy, threshold: usize) -> Vec<ArchiveEntry> {
        let idle = self.entries.iter().filter(|entry| entry.refcount == 0).count();

        let mut to_collect = match policy {
            GcPolicy::Threshold => idle.saturating_sub(threshold),
            GcPolicy::Full => idle,
        };

        if to_collect == 0 {
            return Vec::new();
        }

        debug!(idle, collecting = to_collect, "collecting idle archives");

        let mut collected = Vec::with_capacity(to_collect);
        let mut index = 0;
        while to_collect > 0 && index < self.entries.len() {
            if self.entries[index].refcount == 0 {
                collected.push(self.entries.remove(index));
                to_collect -= 1;
            } else {
                index += 1;
            }
        }

        collected
    }
}

/// A live reference into an owner filesystem's archive cache.
///
/// Dropping the reference decrements the cache entry's count and runs a
/// threshold sweep, mirroring what closing a file opened out of an archive
/// does implicitly.
pub(crate) struct ArchiveRef {
    owner: Weak<FsShared>,
    archive_path: String,
}

impl ArchiveRef {
    pub fn new(owner: &Arc<FsShared>, archive_path: String) -> Self {
        Self { owner: Arc::downgrade(owner), archive_path }
    }

    /// Takes another reference on the same cache entry.
    pub fn duplicate(&self) -> ArchiveRef {
        if let Some(shared) = self.owner.upgrade() {
            crate::vfs::retain_archive(&shared, &self.archive_path);
        }

        Self { owner: Weak::clone(&self.owner), archive_path: self.archive_path.clone() }
    }
}

impl Drop for ArchiveRef {
    fn drop(&mut self) {
        if let Some(shared) = self.owner.upgrade() {
            crate::vfs::release_archive(&shared, &self.archive_path);
        }
    }
}
