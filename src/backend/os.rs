//! Native filesystem backend built on `std::fs`.
//!
//! Paths are passed through to the operating system as UTF-8. Duplicated
//! handles reopen the file by path so each handle owns an independent OS
//! cursor.

use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use crate::backend::{dir_iter_from_vec, Backend, DirEntry, DirIter, FileHandle, FileInfo, FileTime};
use crate::error::{FsError, FsResult};
use crate::mode::OpenMode;
use crate::stream::SeekOrigin;

/// Backend over the host operating system's filesystem.
#[derive(Debug, Default)]
pub struct OsBackend;

impl OsBackend {
    pub fn new() -> Self {
        OsBackend
    }
}

fn info_from_metadata(metadata: &fs::Metadata) -> FileInfo {
    FileInfo {
        size: metadata.len(),
        directory: metadata.is_dir(),
        symlink: metadata.file_type().is_symlink(),
        access_time: metadata.accessed().map(FileTime::from).unwrap_or_default(),
        modified_time: metadata.modified().map(FileTime::from).unwrap_or_default(),
    }
}

fn open_options(mode: OpenMode) -> fs::OpenOptions {
    let mut options = fs::OpenOptions::new();
    options.read(mode.is_read());

    if mode.is_write() {
        options.write(true);
        if mode.contains(OpenMode::EXCLUSIVE) {
            options.create_new(true);
        } else {
            options.create(true);
        }
        if mode.contains(OpenMode::TRUNCATE) {
            options.truncate(true);
        }
    }

    if mode.is_append() {
        options.append(true);
        options.create(true);
    }

    options
}

impl Backend for OsBackend {
    fn open(&self, path: &str, mode: OpenMode) -> FsResult<Box<dyn FileHandle>> {
        let file = open_options(mode).open(path)?;

        // Opening a directory succeeds on some platforms; catch it here so
        // the VFS sees a consistent error.
        if file.metadata()?.is_dir() {
            return Err(FsError::IsDirectory);
        }

        let mut handle = OsFile { file, path: PathBuf::from(path), mode };
        if mode.is_append() {
            handle.seek(0, SeekOrigin::End)?;
        }

        Ok(Box::new(handle))
    }

    fn info(&self, path: &str) -> FsResult<FileInfo> {
        let symlink_metadata = fs::symlink_metadata(path)?;
        if symlink_metadata.file_type().is_symlink() {
            // Report the target's metadata but keep the symlink flag.
            let mut info = match fs::metadata(path) {
                Ok(metadata) => info_from_metadata(&metadata),
                Err(_) => info_from_metadata(&symlink_metadata),
            };
            info.symlink = true;
            return Ok(info);
        }

        Ok(info_from_metadata(&symlink_metadata))
    }

    fn remove(&self, path: &str) -> FsResult<()> {
        let metadata = fs::symlink_metadata(path)?;
        if metadata.is_dir() {
            fs::remove_dir(path)?;
        } else {
            fs::remove_file(path)?;
        }

        Ok(())
    }

    fn rename(&self, old_path: &str, new_path: &str) -> FsResult<()> {
        if fs::symlink_metadata(new_path).is_ok() {
            return Err(FsError::AlreadyExists);
        }

        fs::rename(old_path, new_path)?;
        Ok(())
    }

    fn make_dir(&self, path: &str) -> FsResult<()> {
        fs::create_dir(path)?;
        Ok(())
    }

    fn read_dir(&self, path: &str) -> FsResult<DirIter> {
        let lookup = if path.is_empty() { "." } else { path };
        let mut entries = Vec::new();

        for entry in fs::read_dir(lookup)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let info = match entry.metadata() {
                Ok(metadata) => info_from_metadata(&metadata),
                Err(_) => FileInfo::default(),
            };

            entries.push(DirEntry { name, info });
        }

        Ok(dir_iter_from_vec(entries))
    }
}

struct OsFile {
    file: fs::File,
    path: PathBuf,
    mode: OpenMode,
}

impl std::fmt::Debug for OsFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OsFile")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .finish()
    }
}

impl FileHandle for OsFile {
    fn read(&mut self, dst: &mut [u8]) -> FsResult<usize> {
        if dst.is_empty() {
            return Ok(0);
        }

        let count = self.file.read(dst)?;
        if count == 0 {
            return Err(FsError::AtEnd);
        }

        Ok(count)
    }

    fn write(&mut self, src: &[u8]) -> FsResult<usize> {
        Ok(self.file.write(src)?)
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> FsResult<()> {
        let target = match origin {
            SeekOrigin::Start => {
                if offset < 0 {
                    return Err(FsError::BadSeek);
                }
                SeekFrom::Start(offset as u64)
            }
            SeekOrigin::Current => SeekFrom::Current(offset),
            SeekOrigin::End => SeekFrom::End(offset),
        };

        self.file.seek(target).map_err(|_| FsError::BadSeek)?;
        Ok(())
    }

    fn tell(&mut self) -> FsResult<u64> {
        Ok(self.file.stream_position()?)
    }

    fn flush(&mut self) -> FsResult<()> {
        Ok(self.file.flush()?)
    }

    fn truncate(&mut self) -> FsResult<()> {
        let cursor = self.file.stream_position()?;
        self.file.set_len(cursor)?;
        Ok(())
    }

    fn info(&self) -> FsResult<FileInfo> {
        Ok(info_from_metadata(&self.file.metadata()?))
    }

    fn duplicate(&self) -> FsResult<Box<dyn FileHandle>> {
        // Reopen by path rather than cloning the descriptor; a cloned
        // descriptor would share its cursor with this handle.
        let mut reopen_mode = self.mode;
        if reopen_mode.is_write() {
            // The file exists by now. Never re-truncate or re-fail on it.
            reopen_mode = OpenMode::READ | OpenMode::WRITE;
        }

        let file = open_options(reopen_mode).open(&self.path)?;

        let mut handle = OsFile { file, path: self.path.clone(), mode: reopen_mode };
        let cursor = {
            let mut this = &self.file;
            this.stream_position()?
        };
        handle.seek(cursor as i64, SeekOrigin::Start)?;

        Ok(Box::new(handle))
    }
}
