//! Mount-point records and the priority-ordered mount lists.

use crate::vfs::archive::ArchiveRef;
use crate::vfs::Fs;

/// Insertion priority for a new mount. The mount lists are walked head
/// first, so `Highest` mounts win ties during read resolution.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MountPriority {
    Highest,
    Lowest,
}

/// One registered mount. Immutable once inserted.
pub(crate) struct MountPoint {
    /// Path on the underlying filesystem, or `""` for a mounted archive.
    pub source: String,
    /// Virtual-path prefix this mount contributes under.
    pub prefix: String,
    /// Filesystem of a mounted archive; `None` for directory mounts.
    pub archive: Option<Fs>,
    /// Cache reference released when the mount is removed. Present only
    /// when the mount itself opened the archive.
    pub archive_ref: Option<ArchiveRef>,
}

/// A packed list of mounts in priority order (head = highest).
#[derive(Default)]
pub(crate) struct MountList {
    points: Vec<MountPoint>,
}

impl MountList {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn insert(&mut self, point: MountPoint, priority: MountPriority) {
        match priority {
            MountPriority::Highest => self.points.insert(0, point),
            MountPriority::Lowest => self.points.push(point),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &MountPoint> {
        self.points.iter()
    }

    /// `true` when a mount with this exact source and prefix already exists.
    pub fn is_duplicate(&self, source: &str, prefix: &str) -> bool {
        self.points.iter().any(|p| p.source == source && p.prefix == prefix)
    }

    /// `true` when `archive` is already mounted at `prefix`.
    pub fn is_duplicate_archive(&self, archive: &Fs, prefix: &str) -> bool {
        self.points.iter().any(|p| {
            p.prefix == prefix && p.archive.as_ref().is_some_and(|a| a.same_as(archive))
        })
    }

    /// Removes every mount whose source path equals `source`, returning the
    /// removed records so archive references release outside any lock.
    pub fn remove_by_source(&mut self, source: &str) -> Vec<MountPoint> {
        let mut removed = Vec::new();
        let mut index = 0;

        while index < self.points.len() {
            if self.points[index].source == source {
                removed.push(self.points.remove(index));
            } else {
                index += 1;
            }
        }

        removed
    }

    /// Removes every mount bound to `archive`.
    pub fn remove_by_archive(&mut self, archive: &Fs) -> Vec<MountPoint> {
        let mut removed = Vec::new();
        let mut index = 0;

        while index < self.points.len() {
            let matches = self.points[index]
                .archive
                .as_ref()
                .is_some_and(|a| a.same_as(archive));

            if matches {
                removed.push(self.points.remove(index));
            } else {
                index += 1;
            }
        }

        removed
    }
}
