//! Shows basic usage of archives.
//!
//! Like a plain file read, except the path may pass through a ZIP archive:
//! `cargo run --example archives -- pack.zip/readme.txt` opens the archived
//! file explicitly, while `pack/readme.txt` style paths resolve
//! transparently through any archive found along the way.

use std::io::Write;
use std::process::ExitCode;

use stratafs::backend::OsBackend;
use stratafs::{ArchiveTypes, Fs, FsError, OpenMode};

fn main() -> ExitCode {
    let Some(path) = std::env::args().nth(1) else {
        eprintln!("Usage: archives <file>");
        return ExitCode::FAILURE;
    };

    let fs = Fs::with_archive_types(OsBackend::new(), ArchiveTypes::zip_only());

    let mut file = match fs.open(&path, OpenMode::READ) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("Failed to open {path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = std::io::stdout().lock();
    let mut chunk = [0u8; 4096];
    loop {
        match file.read(&mut chunk) {
            Ok(count) => {
                if stdout.write_all(&chunk[..count]).is_err() {
                    return ExitCode::FAILURE;
                }
            }
            Err(FsError::AtEnd) => break,
            Err(err) => {
                eprintln!("Read failed: {err}");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
