#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;

use stratafs::backend::OsBackend;
use stratafs::{ArchiveTypes, File, Fs, FsError, OpenMode};

use super::zipgen;

/// A filesystem over a scratch directory, recognising `.zip` archives.
pub struct Fixture {
    pub tempdir: TempDir,
    pub fs: Fs,
}

impl Fixture {
    pub fn new() -> Self {
        let tempdir = TempDir::new().expect("create temp dir");
        let fs = Fs::with_archive_types(OsBackend::new(), ArchiveTypes::zip_only());
        Self { tempdir, fs }
    }

    /// Absolute path of `name` inside the scratch directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.tempdir.path().join(name)
    }

    pub fn path_str(&self, name: &str) -> String {
        self.path(name).to_string_lossy().into_owned()
    }

    pub fn root_str(&self) -> String {
        self.tempdir.path().to_string_lossy().into_owned()
    }

    pub fn write_file(&self, name: &str, data: &[u8]) {
        std::fs::write(self.path(name), data).expect("write fixture file");
    }

    pub fn create_dir(&self, name: &str) {
        std::fs::create_dir_all(self.path(name)).expect("create fixture dir");
    }

    pub fn write_zip(&self, name: &str, entries: &[zipgen::ZipSpec<'_>]) {
        self.write_file(name, &zipgen::build(entries));
    }

    /// Mounts the scratch directory at the virtual root for reads.
    pub fn mount_root(&self) {
        self.fs
            .mount(&self.root_str(), "", stratafs::MountPriority::Lowest)
            .expect("mount scratch root");
    }

    pub fn open(&self, path: &str, mode: OpenMode) -> Result<File, FsError> {
        self.fs.open(path, mode)
    }

    pub fn read_all(&self, path: &str, mode: OpenMode) -> Vec<u8> {
        let mut file = self.fs.open(path, mode).expect("open for read");
        file.read_to_end().expect("read to end")
    }
}
