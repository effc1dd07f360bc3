//! Merged directory iteration.
//!
//! Gathers entries from every read mount matching the requested directory,
//! the raw backend, and any archives found along the directory path, into
//! one sorted, de-duplicated listing. Gathering respects the same open-mode
//! flags as file opening so iteration and opening stay consistent.

use crate::backend::DirEntry;
use crate::error::FsResult;
use crate::mode::OpenMode;
use crate::path;
use crate::vfs::Fs;

/// Sorted, de-duplicated directory listing. See [`Fs::read_dir`].
pub struct ReadDir {
    entries: std::vec::IntoIter<DirEntry>,
}

impl Iterator for ReadDir {
    type Item = DirEntry;

    fn next(&mut self) -> Option<DirEntry> {
        self.entries.next()
    }
}

/// Accumulates entries, dropping `.`/`..` and duplicates by name. The first
/// source to contribute a name wins, so mount priority carries into
/// iteration.
#[derive(Default)]
struct Gathered {
    entries: Vec<DirEntry>,
}

impl Gathered {
    fn push(&mut self, entry: DirEntry) {
        if entry.name == "." || entry.name == ".." {
            return;
        }

        if self.entries.iter().any(|existing| existing.name == entry.name) {
            return;
        }

        self.entries.push(entry);
    }

    fn finish(mut self) -> ReadDir {
        // Byte-wise name order, shorter-is-less on a shared prefix.
        self.entries.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
        ReadDir { entries: self.entries.into_iter() }
    }
}

pub(super) fn read_dir_merged(fs: &Fs, dir_path: &str, mode: OpenMode) -> FsResult<ReadDir> {
    fs.validate_path(dir_path, mode)?;

    let mut gathered = Gathered::default();

    if !mode.contains(OpenMode::IGNORE_MOUNTS) {
        for (prefix, source, archive) in fs.read_mount_snapshot() {
            let Some(rest) = path::trim_base(dir_path, &prefix) else {
                continue;
            };

            if prefix.starts_with('/') && path::normalize(rest, false).is_none() {
                continue;
            }

            match archive {
                Some(archive) => {
                    // Inside the archive its whole tree is the mounted
                    // content, so the mount restriction does not carry over.
                    let inner_mode = mode.without(OpenMode::ONLY_MOUNTS);
                    if let Ok(listing) = archive.read_dir(rest, inner_mode) {
                        for entry in listing {
                            gathered.push(entry);
                        }
                    }
                }
                None => {
                    let actual = path::append(&source, rest);
                    gather_level(fs, &actual, mode, &mut gathered);
                }
            }
        }
    }

    if !mode.contains(OpenMode::ONLY_MOUNTS) {
        gather_level(fs, dir_path, mode, &mut gathered);
    }

    Ok(gathered.finish())
}

/// Gathers one resolved directory path: the raw backend listing first, then
/// archive descent along the path when the mode allows it.
fn gather_level(fs: &Fs, dir_path: &str, mode: OpenMode, gathered: &mut Gathered) {
    if let Ok(listing) = fs.backend().read_dir(dir_path) {
        for entry in listing.flatten() {
            gathered.push(entry);
        }
    }

    if mode.is_opaque() || fs.archive_types().is_empty() {
        return;
    }

    let segments: Vec<path::Segment<'_>> = path::segments(dir_path).collect();

    for (index, segment) in segments.iter().enumerate() {
        if segment.text == "." || segment.text == ".." {
            continue;
        }

        let remaining = segments
            .get(index + 1)
            .map(|next| &dir_path[next.offset..])
            .unwrap_or("");

        if fs.archive_types().match_name(segment.text).is_some() {
            // An explicitly named archive: its own filesystem contributes
            // the rest of the directory path and descent stops here.
            let archive_path = &dir_path[..segment.end()];
            let opened = fs.open_archive_cached(
                archive_path,
                OpenMode::READ | OpenMode::IGNORE_MOUNTS | mode,
            );

            if let Ok((archive, guard)) = opened {
                if let Ok(listing) = archive.read_dir(remaining, mode.without(OpenMode::ONLY_MOUNTS)) {
                    for entry in listing {
                        gathered.push(entry);
                    }
                }
                drop(guard);
            }

            return;
        }

        if mode.is_verbose() {
            continue;
        }

        // Transparent mode: every archive found at this directory level
        // overlays the remaining directory path.
        let level = &dir_path[..segment.end()];
        let Ok(level_entries) = fs.backend().read_dir(level) else {
            continue;
        };

        for entry in level_entries.flatten() {
            if fs.archive_types().match_name(&entry.name).is_none() {
                continue;
            }

            let archive_path = path::append(level, &entry.name);
            let opened = fs.open_archive_cached(
                &archive_path,
                OpenMode::READ | OpenMode::IGNORE_MOUNTS | mode,
            );

            let Ok((archive, guard)) = opened else {
                continue;
            };

            if let Ok(listing) = archive.read_dir(remaining, mode.without(OpenMode::ONLY_MOUNTS)) {
                for entry in listing {
                    gathered.push(entry);
                }
            }
            drop(guard);
        }
    }
}

impl Fs {
    pub(crate) fn archive_types(&self) -> &crate::vfs::ArchiveTypes {
        &self.shared.archive_types
    }
}
