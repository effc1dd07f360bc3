//! The virtual filesystem core.
//!
//! An [`Fs`] owns one backend and composes it with prioritised mounts and
//! an opened-archive cache. Opening a path walks the read mounts in
//! priority order, falls back to the raw backend, and finally attempts
//! archive descent: recognising that a path segment (or a sibling of one)
//! names an archive and continuing resolution inside it.

pub(crate) mod archive;
mod iter;
mod mount;

pub use archive::{ArchiveOpener, ArchiveTypes, GcPolicy, ZipOpener};
pub use iter::ReadDir;
pub use mount::MountPriority;

use std::io;
use std::ops::Deref;
use std::sync::{Arc, Mutex};

use tracing::{debug, trace};

use crate::backend::{Backend, FileHandle, FileInfo};
use crate::error::{FsError, FsResult};
use crate::mode::OpenMode;
use crate::path;
use crate::stream::{SeekOrigin, Stream};
use crate::vfs::archive::{ArchiveCache, ArchiveEntry, ArchiveRef};
use crate::vfs::mount::{MountList, MountPoint};

/// Number of idle cached archives tolerated before threshold GC unloads.
const DEFAULT_GC_THRESHOLD: usize = 10;

pub(crate) struct FsShared {
    backend: Box<dyn Backend>,
    archive_types: Arc<ArchiveTypes>,
    state: Mutex<FsState>,
}

struct FsState {
    read_mounts: MountList,
    write_mounts: MountList,
    archives: ArchiveCache,
    gc_threshold: usize,
}

/// A virtual filesystem handle.
///
/// Cloning is cheap and clones observe the same mounts and archive cache.
/// Dropping the last clone releases the backend and everything cached.
#[derive(Clone)]
pub struct Fs {
    shared: Arc<FsShared>,
}

/// Resolution target: an open handle or just metadata.
enum Opened {
    File(File),
    Info(FileInfo),
}

impl Fs {
    /// Creates a filesystem over `backend` with no archive types registered.
    pub fn new(backend: impl Backend + 'static) -> Self {
        Self::with_archive_types(backend, ArchiveTypes::new())
    }

    /// Creates a filesystem over `backend` recognising the given archive
    /// types during descent.
    pub fn with_archive_types(backend: impl Backend + 'static, types: ArchiveTypes) -> Self {
        Self::build(Box::new(backend), Arc::new(types))
    }

    /// Internal constructor for archive filesystems: the registry is
    /// borrowed from the parent so nested archives keep resolving.
    fn for_archive(backend: Box<dyn Backend>, types: Arc<ArchiveTypes>) -> Self {
        Self::build(backend, types)
    }

    fn build(backend: Box<dyn Backend>, archive_types: Arc<ArchiveTypes>) -> Self {
        Self {
            shared: Arc::new(FsShared {
                backend,
                archive_types,
                state: Mutex::new(FsState {
                    read_mounts: MountList::new(),
                    write_mounts: MountList::new(),
                    archives: ArchiveCache::new(),
                    gc_threshold: DEFAULT_GC_THRESHOLD,
                }),
            }),
        }
    }

    /// `true` when both handles refer to the same filesystem instance.
    pub fn same_as(&self, other: &Fs) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Direct access to the backend, bypassing mounts and descent.
    pub fn backend(&self) -> &dyn Backend {
        self.shared.backend.as_ref()
    }

    // ---------------------------------------------------------------------
    // Open / stat
    // ---------------------------------------------------------------------

    /// Opens a file. See [`OpenMode`] for resolution behaviour.
    pub fn open(&self, file_path: &str, mode: OpenMode) -> FsResult<File> {
        match self.open_or_info(file_path, mode, true)? {
            Opened::File(file) => Ok(file),
            Opened::Info(_) => Err(FsError::Other),
        }
    }

    /// Metadata for a path, resolved exactly like [`Fs::open`].
    pub fn info(&self, file_path: &str, mode: OpenMode) -> FsResult<FileInfo> {
        match self.open_or_info(file_path, mode, false)? {
            Opened::Info(info) => Ok(info),
            Opened::File(_) => Err(FsError::Other),
        }
    }

    fn validate_path(&self, file_path: &str, mode: OpenMode) -> FsResult<()> {
        if mode.contains(OpenMode::NO_SPECIAL_DIRS) {
            for segment in path::segments(file_path) {
                if segment.text == "." || segment.text == ".." {
                    return Err(FsError::InvalidArgs);
                }
            }
        }

        if mode.contains(OpenMode::NO_ABOVE_ROOT_NAVIGATION)
            && path::normalize(file_path, false).is_none()
        {
            return Err(FsError::InvalidArgs);
        }

        Ok(())
    }

    fn open_or_info(&self, file_path: &str, mode: OpenMode, want_file: bool) -> FsResult<Opened> {
        if mode.is_empty() {
            return Err(FsError::InvalidArgs);
        }

        self.validate_path(file_path, mode)?;

        if mode.is_write() {
            if mode.contains(OpenMode::IGNORE_MOUNTS) {
                return self.open_direct(file_path, mode, want_file);
            }

            return self.open_for_write(file_path, mode, want_file);
        }

        if !mode.contains(OpenMode::IGNORE_MOUNTS) {
            for (prefix, source, archive) in self.read_mount_snapshot() {
                let Some(rest) = path::trim_base(file_path, &prefix) else {
                    continue;
                };

                // A rooted mount prefix pins resolution below the mount.
                if prefix.starts_with('/') && path::normalize(rest, false).is_none() {
                    continue;
                }

                let attempt = match archive {
                    // Mount restrictions apply to this filesystem; inside the
                    // archive its whole tree is the mounted content.
                    Some(archive) => {
                        archive.open_or_info(rest, mode.without(OpenMode::ONLY_MOUNTS), want_file)
                    }
                    None => {
                        let actual = path::append(&source, rest);
                        self.open_direct(&actual, mode, want_file)
                    }
                };

                if let Ok(opened) = attempt {
                    return Ok(opened);
                }
            }
        }

        if !mode.contains(OpenMode::ONLY_MOUNTS) {
            return self.open_direct(file_path, mode, want_file);
        }

        Err(FsError::DoesNotExist)
    }

    /// Write-mode resolution: the write mount leaving the shortest
    /// remaining sub-path wins, so more specific mounts beat broader ones.
    fn open_for_write(&self, file_path: &str, mode: OpenMode, want_file: bool) -> FsResult<Opened> {
        let mut best: Option<(String, String)> = None;

        {
            let state = self.shared.state.lock().unwrap();
            for point in state.write_mounts.iter() {
                let Some(rest) = path::trim_base(file_path, &point.prefix) else {
                    continue;
                };

                if point.prefix.starts_with('/') && path::normalize(rest, false).is_none() {
                    continue;
                }

                let better = match &best {
                    None => true,
                    Some((_, best_rest)) => rest.len() < best_rest.len(),
                };

                if better {
                    best = Some((point.source.clone(), rest.to_owned()));
                }
            }
        }

        let Some((source, rest)) = best else {
            return Err(FsError::DoesNotExist);
        };

        let actual = path::append(&source, &rest);
        match self.open_direct(&actual, mode, want_file) {
            Ok(opened) => Ok(opened),
            Err(_) => Err(FsError::DoesNotExist),
        }
    }

    /// Lowest-level open: straight at the backend, with directory
    /// auto-creation for writes and archive descent on a read miss.
    fn open_direct(&self, file_path: &str, mode: OpenMode, want_file: bool) -> FsResult<Opened> {
        let result = if want_file {
            if mode.is_write() && !mode.contains(OpenMode::NO_CREATE_DIRS) {
                let dir = path::directory(file_path);
                if !dir.is_empty() && dir != "/" {
                    self.create_dirs(dir)?;
                }
            }

            self.shared.backend.open(file_path, mode).map(|handle| {
                Opened::File(File { handle, fs: self.clone(), archive_refs: Vec::new() })
            })
        } else {
            self.shared.backend.info(file_path).map(Opened::Info)
        };

        match result {
            Err(FsError::DoesNotExist | FsError::NotDirectory)
                if !mode.is_opaque() && !mode.is_write() =>
            {
                self.open_from_archive(file_path, mode, want_file)
            }
            other => other,
        }
    }

    // ---------------------------------------------------------------------
    // Archive descent
    // ---------------------------------------------------------------------

    /// Walks the path left to right looking for a way into an archive.
    ///
    /// A segment with a registered archive extension is an explicit archive
    /// reference and must resolve through that archive. Otherwise, in
    /// transparent mode, every archive found in the directory formed by the
    /// path up to the current segment is tried with the remaining sub-path.
    fn open_from_archive(
        &self,
        file_path: &str,
        mode: OpenMode,
        want_file: bool,
    ) -> FsResult<Opened> {
        if self.shared.archive_types.is_empty() {
            return Err(FsError::DoesNotExist);
        }

        let segments: Vec<path::Segment<'_>> = path::segments(file_path).collect();

        for (index, segment) in segments.iter().enumerate() {
            if segment.text == "." || segment.text == ".." {
                continue;
            }

            let remaining = segments.get(index + 1).map(|next| &file_path[next.offset..]);

            if self.shared.archive_types.match_name(segment.text).is_some() {
                // The archive is named explicitly; it is the only candidate.
                let Some(remaining) = remaining else {
                    // The archive itself is the target and a direct open
                    // already failed at a higher level.
                    return Err(FsError::DoesNotExist);
                };

                let archive_path = &file_path[..segment.end()];
                let (archive, guard) =
                    match self.open_archive_cached(archive_path, mode | OpenMode::OPAQUE) {
                        Ok(opened) => opened,
                        Err(FsError::DoesNotExist) => continue,
                        Err(err) => return Err(err),
                    };

                return match archive.open_or_info(
                    remaining,
                    mode.without(OpenMode::ONLY_MOUNTS),
                    want_file,
                ) {
                    Ok(Opened::File(mut file)) => {
                        file.archive_refs.push(guard);
                        Ok(Opened::File(file))
                    }
                    Ok(info) => Ok(info),
                    Err(err) => Err(err),
                };
            }

            if mode.is_verbose() {
                continue;
            }

            // Transparent mode: scan the directory at this level for any
            // archive and try the remaining sub-path inside each one.
            let level = &file_path[..segment.end()];
            let Ok(entries) = self.shared.backend.read_dir(level) else {
                continue;
            };

            for entry in entries.flatten() {
                if self.shared.archive_types.match_name(&entry.name).is_none() {
                    continue;
                }

                let archive_path = path::append(level, &entry.name);
                let Ok((archive, guard)) =
                    self.open_archive_cached(&archive_path, mode | OpenMode::OPAQUE)
                else {
                    continue;
                };

                let inner_mode = mode.without(OpenMode::ONLY_MOUNTS);
                match archive.open_or_info(remaining.unwrap_or(""), inner_mode, want_file) {
                    Ok(Opened::File(mut file)) => {
                        file.archive_refs.push(guard);
                        return Ok(Opened::File(file));
                    }
                    Ok(info) => return Ok(info),
                    Err(_) => continue,
                }
            }
        }

        Err(FsError::DoesNotExist)
    }

    /// Opens an archive through the cache, incrementing its reference count
    /// on a hit and inserting with a count of one on a miss.
    pub(crate) fn open_archive_cached(
        &self,
        archive_path: &str,
        mode: OpenMode,
    ) -> FsResult<(Fs, ArchiveRef)> {
        {
            let mut state = self.shared.state.lock().unwrap();
            if let Some(entry) = state.archives.find(archive_path) {
                entry.refcount += 1;
                trace!(path = archive_path, refcount = entry.refcount, "archive cache hit");
                let fs = entry.fs.clone();
                return Ok((fs, ArchiveRef::new(&self.shared, archive_path.to_owned())));
            }
        }

        // Cache miss. Open the archive file through full resolution — this
        // is itself a VFS open, so archives inside archives work — without
        // holding the archive lock.
        let opener = self
            .shared
            .archive_types
            .match_name(archive_path)
            .ok_or(FsError::NoBackend)?
            .clone();

        let archive_file = self.open(archive_path, mode)?;
        let backend = opener.open_backend(archive_file.into_stream())?;
        let child = Fs::for_archive(backend, Arc::clone(&self.shared.archive_types));

        debug!(path = archive_path, "opened archive");

        // Another thread may have inserted the same path while we were
        // parsing; their entry wins and ours is dropped outside the lock.
        let mut loser: Option<Fs> = None;
        let result = {
            let mut state = self.shared.state.lock().unwrap();
            if let Some(entry) = state.archives.find(archive_path) {
                entry.refcount += 1;
                loser = Some(child);
                entry.fs.clone()
            } else {
                state.archives.insert(ArchiveEntry {
                    path: archive_path.to_owned(),
                    fs: child.clone(),
                    refcount: 1,
                });
                child
            }
        };
        drop(loser);

        Ok((result, ArchiveRef::new(&self.shared, archive_path.to_owned())))
    }

    // ---------------------------------------------------------------------
    // Archive cache management
    // ---------------------------------------------------------------------

    /// Opens an archive by path for direct use. The archive stays cached;
    /// dropping the returned handle releases its reference.
    pub fn open_archive(&self, archive_path: &str, mode: OpenMode) -> FsResult<Archive> {
        let (fs, guard) = self.open_archive_cached(archive_path, mode)?;
        Ok(Archive { fs, _guard: guard })
    }

    /// Runs archive garbage collection with the given policy.
    pub fn gc_archives(&self, policy: GcPolicy) {
        let garbage = {
            let mut state = self.shared.state.lock().unwrap();
            let threshold = state.gc_threshold;
            state.archives.collect(policy, threshold)
        };
        drop(garbage);
    }

    /// Sets the number of idle cached archives tolerated before threshold
    /// GC starts unloading.
    pub fn set_archive_gc_threshold(&self, threshold: usize) {
        self.shared.state.lock().unwrap().gc_threshold = threshold;
    }

    pub fn archive_gc_threshold(&self) -> usize {
        self.shared.state.lock().unwrap().gc_threshold
    }

    /// Number of archives currently held by the cache, idle ones included.
    pub fn cached_archive_count(&self) -> usize {
        self.shared.state.lock().unwrap().archives.len()
    }

    /// Reference count of the cached archive at `archive_path`, if cached.
    pub fn archive_refcount(&self, archive_path: &str) -> Option<usize> {
        self.shared.state.lock().unwrap().archives.refcount(archive_path)
    }

    // ---------------------------------------------------------------------
    // Mount management
    // ---------------------------------------------------------------------

    /// Mounts a directory or archive at `prefix` on the read list.
    ///
    /// When `source` is not a directory it is opened as an archive through
    /// the cache and unmounting releases it. Mounting an identical
    /// source/prefix pair twice is a no-op.
    pub fn mount(&self, source: &str, prefix: &str, priority: MountPriority) -> FsResult<()> {
        {
            let state = self.shared.state.lock().unwrap();
            if state.read_mounts.is_duplicate(source, prefix) {
                return Ok(());
            }
        }

        let info = self.shared.backend.info(source)?;

        let point = if info.directory {
            MountPoint {
                source: source.to_owned(),
                prefix: prefix.to_owned(),
                archive: None,
                archive_ref: None,
            }
        } else {
            let (archive, guard) =
                self.open_archive_cached(source, OpenMode::READ | OpenMode::VERBOSE)?;
            MountPoint {
                source: source.to_owned(),
                prefix: prefix.to_owned(),
                archive: Some(archive),
                archive_ref: Some(guard),
            }
        };

        debug!(source, prefix, archive = point.archive.is_some(), "mounting");

        let mut state = self.shared.state.lock().unwrap();
        state.read_mounts.insert(point, priority);
        Ok(())
    }

    /// Removes every read mount whose source path is `source`. Archives the
    /// mount opened are released.
    pub fn unmount(&self, source: &str) -> FsResult<()> {
        let removed = {
            let mut state = self.shared.state.lock().unwrap();
            state.read_mounts.remove_by_source(source)
        };
        drop(removed);
        Ok(())
    }

    /// Mounts an already-open archive filesystem at `prefix` on the read
    /// list. The archive is not closed on unmount.
    pub fn mount_fs(&self, archive: &Fs, prefix: &str, priority: MountPriority) -> FsResult<()> {
        let point = MountPoint {
            source: String::new(),
            prefix: prefix.to_owned(),
            archive: Some(archive.clone()),
            archive_ref: None,
        };

        let mut state = self.shared.state.lock().unwrap();
        if state.read_mounts.is_duplicate_archive(archive, prefix) {
            return Ok(());
        }

        state.read_mounts.insert(point, priority);
        Ok(())
    }

    /// Removes every read mount bound to `archive`.
    pub fn unmount_fs(&self, archive: &Fs) -> FsResult<()> {
        let removed = {
            let mut state = self.shared.state.lock().unwrap();
            state.read_mounts.remove_by_archive(archive)
        };
        drop(removed);
        Ok(())
    }

    /// Registers a write mount. Write resolution picks the mount whose
    /// prefix leaves the shortest remaining sub-path.
    pub fn mount_write(&self, source: &str, prefix: &str, priority: MountPriority) -> FsResult<()> {
        let mut state = self.shared.state.lock().unwrap();
        if state.write_mounts.is_duplicate(source, prefix) {
            return Ok(());
        }

        debug!(source, prefix, "mounting for write");

        state.write_mounts.insert(
            MountPoint {
                source: source.to_owned(),
                prefix: prefix.to_owned(),
                archive: None,
                archive_ref: None,
            },
            priority,
        );
        Ok(())
    }

    /// Removes every write mount whose source path is `source`.
    pub fn unmount_write(&self, source: &str) -> FsResult<()> {
        let removed = {
            let mut state = self.shared.state.lock().unwrap();
            state.write_mounts.remove_by_source(source)
        };
        drop(removed);
        Ok(())
    }

    fn read_mount_snapshot(&self) -> Vec<(String, String, Option<Fs>)> {
        let state = self.shared.state.lock().unwrap();
        state
            .read_mounts
            .iter()
            .map(|point| (point.prefix.clone(), point.source.clone(), point.archive.clone()))
            .collect()
    }

    // ---------------------------------------------------------------------
    // Backend pass-throughs
    // ---------------------------------------------------------------------

    /// Deletes a file or empty directory, straight at the backend.
    pub fn remove(&self, file_path: &str) -> FsResult<()> {
        self.shared.backend.remove(file_path)
    }

    /// Renames a file or directory, straight at the backend. Fails with
    /// [`FsError::AlreadyExists`] when the destination exists.
    pub fn rename(&self, old_path: &str, new_path: &str) -> FsResult<()> {
        self.shared.backend.rename(old_path, new_path)
    }

    /// Creates every missing directory level of `dir_path`, treating levels
    /// that already exist as success.
    pub fn create_dirs(&self, dir_path: &str) -> FsResult<()> {
        for segment in path::segments(dir_path) {
            let running = &dir_path[..segment.end()];
            match self.shared.backend.make_dir(running) {
                Ok(()) | Err(FsError::AlreadyExists) => {}
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }

    /// Creates a single directory level, straight at the backend.
    pub fn make_dir(&self, dir_path: &str) -> FsResult<()> {
        self.shared.backend.make_dir(dir_path)
    }

    /// Merged, sorted, de-duplicated directory iteration across every
    /// contributing mount, the raw backend and descended archives.
    pub fn read_dir(&self, dir_path: &str, mode: OpenMode) -> FsResult<ReadDir> {
        iter::read_dir_merged(self, dir_path, mode)
    }
}

/// Decrements the cache reference for `archive_path` and sweeps idle
/// archives past the threshold. Entries drop outside the lock because a
/// nested archive's teardown re-enters the cache.
pub(crate) fn release_archive(shared: &Arc<FsShared>, archive_path: &str) {
    let garbage = {
        let mut state = shared.state.lock().unwrap();
        if let Some(entry) = state.archives.find(archive_path) {
            entry.refcount = entry.refcount.saturating_sub(1);
            trace!(path = archive_path, refcount = entry.refcount, "released archive reference");
        }

        let threshold = state.gc_threshold;
        state.archives.collect(GcPolicy::Threshold, threshold)
    };
    drop(garbage);
}

/// Re-increments the cache reference for `archive_path`, used when a file
/// holding a reference is duplicated.
pub(crate) fn retain_archive(shared: &Arc<FsShared>, archive_path: &str) {
    let mut state = shared.state.lock().unwrap();
    if let Some(entry) = state.archives.find(archive_path) {
        entry.refcount += 1;
    }
}

/// An archive opened for direct use through [`Fs::open_archive`].
///
/// Dereferences to the archive's [`Fs`]. Dropping the handle releases the
/// cache reference taken at open.
pub struct Archive {
    fs: Fs,
    _guard: ArchiveRef,
}

impl Deref for Archive {
    type Target = Fs;

    fn deref(&self) -> &Fs {
        &self.fs
    }
}

/// An open file.
///
/// A file is a stream: it reads, writes, seeks and duplicates. Files opened
/// out of archives keep the archive referenced until dropped.
pub struct File {
    handle: Box<dyn FileHandle>,
    fs: Fs,
    archive_refs: Vec<ArchiveRef>,
}

impl File {
    /// See [`crate::Stream::read`]: `Err(AtEnd)` only on a zero-byte read
    /// at the end of the file.
    pub fn read(&mut self, dst: &mut [u8]) -> FsResult<usize> {
        self.handle.read(dst)
    }

    pub fn write(&mut self, src: &[u8]) -> FsResult<usize> {
        self.handle.write(src)
    }

    pub fn seek(&mut self, offset: i64, origin: SeekOrigin) -> FsResult<()> {
        self.handle.seek(offset, origin)
    }

    pub fn tell(&mut self) -> FsResult<u64> {
        self.handle.tell()
    }

    pub fn flush(&mut self) -> FsResult<()> {
        self.handle.flush()
    }

    /// Truncates the file at the current cursor.
    pub fn truncate(&mut self) -> FsResult<()> {
        self.handle.truncate()
    }

    pub fn info(&self) -> FsResult<FileInfo> {
        self.handle.info()
    }

    /// The filesystem this file was opened from.
    pub fn fs(&self) -> &Fs {
        &self.fs
    }

    /// Reads the remainder of the file into a vector.
    pub fn read_to_end(&mut self) -> FsResult<Vec<u8>> {
        let mut out = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            match self.handle.read(&mut chunk) {
                Ok(count) => out.extend_from_slice(&chunk[..count]),
                Err(FsError::AtEnd) => break,
                Err(err) => return Err(err),
            }
        }

        Ok(out)
    }

    /// An independent handle over the same file. Archive references carry
    /// over so the archive stays cached while either handle lives.
    pub fn duplicate(&self) -> FsResult<File> {
        let refs = self.archive_refs.iter().map(|r| r.duplicate()).collect();

        Ok(File {
            handle: self.handle.duplicate()?,
            fs: self.fs.clone(),
            archive_refs: refs,
        })
    }

    /// Converts the file into a plain stream with no handle back to its
    /// filesystem. Archives opened over one of their owner's files must use
    /// this form: the cache owns the archive, so a stream that kept the
    /// owning filesystem alive would form a reference cycle.
    pub fn into_stream(self) -> Box<dyn Stream> {
        Box::new(FileStream { handle: self.handle, archive_refs: self.archive_refs })
    }
}

/// A file detached from its filesystem handle, leaving only the stream
/// contract. Archive cache references ride along and release on drop.
struct FileStream {
    handle: Box<dyn FileHandle>,
    archive_refs: Vec<ArchiveRef>,
}

impl Stream for FileStream {
    fn read(&mut self, dst: &mut [u8]) -> FsResult<usize> {
        self.handle.read(dst)
    }

    fn write(&mut self, src: &[u8]) -> FsResult<usize> {
        self.handle.write(src)
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> FsResult<()> {
        self.handle.seek(offset, origin)
    }

    fn tell(&mut self) -> FsResult<u64> {
        self.handle.tell()
    }

    fn duplicate(&self) -> FsResult<Box<dyn Stream>> {
        Ok(Box::new(FileStream {
            handle: self.handle.duplicate()?,
            archive_refs: self.archive_refs.iter().map(|r| r.duplicate()).collect(),
        }))
    }
}

impl Stream for File {
    fn read(&mut self, dst: &mut [u8]) -> FsResult<usize> {
        File::read(self, dst)
    }

    fn write(&mut self, src: &[u8]) -> FsResult<usize> {
        File::write(self, src)
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> FsResult<()> {
        File::seek(self, offset, origin)
    }

    fn tell(&mut self) -> FsResult<u64> {
        File::tell(self)
    }

    fn duplicate(&self) -> FsResult<Box<dyn Stream>> {
        Ok(Box::new(File::duplicate(self)?))
    }
}

impl io::Read for File {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match File::read(self, buf) {
            Ok(count) => Ok(count),
            Err(FsError::AtEnd) => Ok(0),
            Err(err) => Err(err.into()),
        }
    }
}

impl io::Write for File {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(File::write(self, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(File::flush(self)?)
    }
}

impl io::Seek for File {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let (offset, origin) = match pos {
            io::SeekFrom::Start(offset) => (offset as i64, SeekOrigin::Start),
            io::SeekFrom::Current(offset) => (offset, SeekOrigin::Current),
            io::SeekFrom::End(offset) => (offset, SeekOrigin::End),
        };

        File::seek(self, offset, origin)?;
        Ok(File::tell(self)?)
    }
}
