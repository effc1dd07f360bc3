//! Read-only ZIP archive backend.
//!
//! The backend parses the central directory once at construction and serves
//! every lookup from the in-memory index. File contents are read lazily
//! through per-handle duplicates of the archive stream. Writing and any
//! mutation of the archive report [`FsError::NotImplemented`].

mod directory;
mod file;
pub(crate) mod inflate;

use std::sync::Mutex;

use byteorder::{LittleEndian, ReadBytesExt};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::backend::zip::directory::ZipDirectory;
use crate::backend::zip::file::{EntryShape, ZipFile};
use crate::backend::{dir_iter_from_vec, Backend, DirEntry, DirIter, FileHandle, FileInfo};
use crate::error::{FsError, FsResult};
use crate::mode::OpenMode;
use crate::stream::{read_exact, SeekOrigin, Stream};

/// Compression methods this backend can serve.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
pub enum CompressionMethod {
    Store = 0,
    Deflate = 8,
}

/// Backend over one ZIP archive.
pub struct ZipBackend {
    directory: ZipDirectory,
    /// Base archive stream. Opened files duplicate it under this lock so
    /// every handle gets an independent cursor.
    stream: Mutex<Box<dyn Stream>>,
}

impl ZipBackend {
    /// Parses the central directory of the archive carried by `stream`.
    pub fn open(mut stream: Box<dyn Stream>) -> FsResult<Self> {
        let directory = ZipDirectory::load(stream.as_mut())?;
        Ok(Self { directory, stream: Mutex::new(stream) })
    }

    /// Number of records in the central directory.
    pub fn file_count(&self) -> usize {
        self.directory.file_count()
    }

    fn duplicate_stream(&self) -> FsResult<Box<dyn Stream>> {
        self.stream.lock().unwrap().duplicate()
    }
}

impl Backend for ZipBackend {
    fn open(&self, file_path: &str, mode: OpenMode) -> FsResult<Box<dyn FileHandle>> {
        if mode.is_write() {
            return Err(FsError::InvalidOperation);
        }

        let node_index = self.directory.find_node(file_path)?;
        let node = self.directory.node(node_index);
        if node.children_len > 0 || node_index == 0 {
            return Err(FsError::IsDirectory);
        }

        let entry = self.directory.entry_at(node.file_index)?;
        if entry.directory {
            return Err(FsError::IsDirectory);
        }

        let method = CompressionMethod::from_u16(entry.compression_method)
            .ok_or(FsError::InvalidFile)?;

        let mut stream = self.duplicate_stream()?;

        // The central directory's offset points at the local header, whose
        // name and extra fields may differ in length from the central copy.
        // Read the two length fields at offset 26 and step past the header
        // to the first payload byte.
        let mut lengths = [0u8; 4];
        stream.seek((entry.local_header_offset + 26) as i64, SeekOrigin::Start)?;
        read_exact(stream.as_mut(), &mut lengths)?;

        let mut reader: &[u8] = &lengths;
        let name_len = reader.read_u16::<LittleEndian>().map_err(|_| FsError::InvalidFile)?;
        let extra_len = reader.read_u16::<LittleEndian>().map_err(|_| FsError::InvalidFile)?;

        let payload_offset =
            entry.local_header_offset + 30 + name_len as u64 + extra_len as u64;

        let shape = EntryShape {
            method,
            compressed_size: entry.compressed_size,
            uncompressed_size: entry.uncompressed_size,
            payload_offset,
        };

        Ok(Box::new(ZipFile::new(stream, shape)))
    }

    fn info(&self, file_path: &str) -> FsResult<FileInfo> {
        let node_index = self.directory.find_node(file_path)?;
        let (size, is_directory) = self.directory.node_info(node_index)?;

        Ok(FileInfo { size, directory: is_directory, ..FileInfo::default() })
    }

    fn read_dir(&self, dir_path: &str) -> FsResult<DirIter> {
        let node_index = self.directory.find_node(dir_path)?;
        let node = *self.directory.node(node_index);

        if node.children_len == 0 && node_index != 0 {
            // A leaf: either a plain file or an explicitly listed empty
            // directory. Only the latter may be iterated.
            let (_, is_directory) = self.directory.node_info(node_index)?;
            if !is_directory {
                return Err(FsError::NotDirectory);
            }
        }

        let mut entries = Vec::with_capacity(node.children_len);
        for child_index in node.children_start..node.children_start + node.children_len {
            let child = self.directory.node(child_index);
            let name = String::from_utf8_lossy(self.directory.node_name(child)).into_owned();
            let (size, is_directory) = self.directory.node_info(child_index)?;

            entries.push(DirEntry {
                name,
                info: FileInfo { size, directory: is_directory, ..FileInfo::default() },
            });
        }

        Ok(dir_iter_from_vec(entries))
    }
}
