//! File system utility.
//!
//! Small command-line front end over the library: list directories, print
//! and stat files, and unpack archives, optionally through a mount profile.
//!
//!     fsu ls pack.zip
//!     fsu cat pack.zip/docs/readme.txt
//!     fsu --profile mounts.toml cat /assets/model.obj
//!     fsu unpack pack.zip out/

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stratafs::backend::OsBackend;
use stratafs::{ArchiveTypes, Fs, FsError, FsResult, MountProfile, OpenMode};

#[derive(Parser)]
#[command(name = "fsu", about = "File system utility")]
struct Args {
    /// TOML mount profile applied before running the command.
    #[arg(long)]
    profile: Option<String>,

    /// Only resolve paths that name archives explicitly.
    #[arg(long)]
    verbose_paths: bool,

    /// Never descend into archives.
    #[arg(long, conflicts_with = "verbose_paths")]
    opaque: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List a directory.
    Ls { path: String },
    /// Print a file to stdout.
    Cat { path: String },
    /// Show metadata for a path.
    Stat { path: String },
    /// Unpack an archive into a directory.
    Unpack { archive: String, output: String },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("fsu: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> FsResult<()> {
    let fs = Fs::with_archive_types(OsBackend::new(), ArchiveTypes::zip_only());

    if let Some(profile_path) = &args.profile {
        let text = std::fs::read_to_string(profile_path).map_err(FsError::from)?;
        MountProfile::from_toml(&text)?.apply(&fs)?;
    }

    let mut mode_extra = OpenMode::default();
    if args.verbose_paths {
        mode_extra |= OpenMode::VERBOSE;
    }
    if args.opaque {
        mode_extra |= OpenMode::OPAQUE;
    }

    match &args.command {
        Command::Ls { path } => {
            for entry in fs.read_dir(path, OpenMode::READ | mode_extra)? {
                let kind = if entry.info.directory { "dir " } else { "file" };
                println!("{kind} {:>12} {}", entry.info.size, entry.name);
            }
            Ok(())
        }
        Command::Cat { path } => {
            let mut file = fs.open(path, OpenMode::READ | mode_extra)?;
            let bytes = file.read_to_end()?;
            use std::io::Write;
            std::io::stdout().lock().write_all(&bytes).map_err(FsError::from)
        }
        Command::Stat { path } => {
            let info = fs.info(path, OpenMode::READ | mode_extra)?;
            println!("size:      {}", info.size);
            println!("directory: {}", info.directory);
            println!("symlink:   {}", info.symlink);
            println!("modified:  {}s", info.modified_time.seconds);
            Ok(())
        }
        Command::Unpack { archive, output } => {
            let archive = fs.open_archive(archive, OpenMode::READ | OpenMode::VERBOSE)?;
            unpack_dir(&fs, &archive, "", output)
        }
    }
}

/// Recursively copies one directory level out of `archive` into `output`.
fn unpack_dir(fs: &Fs, archive: &Fs, dir: &str, output: &str) -> FsResult<()> {
    for entry in archive.read_dir(dir, OpenMode::READ | OpenMode::OPAQUE)? {
        let inner = join(dir, &entry.name);
        let target = join(output, &inner);

        if entry.info.directory {
            println!("dir  {target}");
            unpack_dir(fs, archive, &inner, output)?;
        } else {
            println!("file {target}");

            let mut source = archive.open(&inner, OpenMode::READ | OpenMode::OPAQUE)?;
            let mut dest =
                fs.open(&target, OpenMode::WRITE | OpenMode::TRUNCATE | OpenMode::IGNORE_MOUNTS)?;

            let mut chunk = [0u8; 4096];
            loop {
                match source.read(&mut chunk) {
                    Ok(count) => {
                        let mut written = 0;
                        while written < count {
                            written += dest.write(&chunk[written..count])?;
                        }
                    }
                    Err(FsError::AtEnd) => break,
                    Err(err) => return Err(err),
                }
            }
        }
    }

    Ok(())
}

fn join(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_owned()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), name)
    }
}
