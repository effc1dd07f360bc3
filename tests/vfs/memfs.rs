use stratafs::backend::MemBackend;
use stratafs::{DirEntry, Fs, FsError, OpenMode, SeekOrigin};

fn mem_fs() -> Fs {
    Fs::new(MemBackend::new())
}

#[test]
fn round_trip_through_the_vfs() {
    let fs = mem_fs();

    let mut file = fs.open("notes/today.txt", OpenMode::WRITE | OpenMode::IGNORE_MOUNTS).expect("create");
    file.write(b"in memory").expect("write");
    drop(file);

    let mut file = fs.open("notes/today.txt", OpenMode::READ).expect("open");
    assert_eq!(file.read_to_end().unwrap(), b"in memory");

    // Parent directories were auto-created.
    assert!(fs.info("notes", OpenMode::READ).unwrap().directory);
}

#[test]
fn truncate_at_cursor() {
    let fs = mem_fs();

    let mut file = fs.open("t.bin", OpenMode::WRITE | OpenMode::IGNORE_MOUNTS).expect("create");
    file.write(b"0123456789").expect("write");
    file.seek(4, SeekOrigin::Start).expect("seek");
    file.truncate().expect("truncate");
    drop(file);

    assert_eq!(fs.info("t.bin", OpenMode::READ).unwrap().size, 4);
}

#[test]
fn rename_contract() {
    let fs = mem_fs();
    fs.create_dirs("dir").expect("mkdir");

    let mut file = fs.open("a.txt", OpenMode::WRITE | OpenMode::IGNORE_MOUNTS).expect("create a");
    file.write(b"abc").expect("write");
    drop(file);

    let mut file = fs.open("taken.txt", OpenMode::WRITE | OpenMode::IGNORE_MOUNTS).expect("create taken");
    file.write(b"x").expect("write");
    drop(file);

    // Renaming over an existing destination is refused.
    assert_eq!(fs.rename("a.txt", "taken.txt"), Err(FsError::AlreadyExists));

    fs.rename("a.txt", "dir/b.txt").expect("rename into dir");
    assert_eq!(fs.info("a.txt", OpenMode::READ).err(), Some(FsError::DoesNotExist));
    assert_eq!(fs.info("dir/b.txt", OpenMode::READ).unwrap().size, 3);
}

#[test]
fn remove_contract() {
    let fs = mem_fs();
    fs.create_dirs("d").expect("mkdir");

    let file = fs.open("d/f.txt", OpenMode::WRITE | OpenMode::IGNORE_MOUNTS).expect("create");
    drop(file);

    assert_eq!(fs.remove("d"), Err(FsError::DirectoryNotEmpty));
    fs.remove("d/f.txt").expect("remove file");
    fs.remove("d").expect("remove empty dir");
    assert_eq!(fs.info("d", OpenMode::READ).err(), Some(FsError::DoesNotExist));
}

#[test]
fn listing_is_sorted() {
    let fs = mem_fs();
    for name in ["c.txt", "a.txt", "b.txt"] {
        drop(fs.open(name, OpenMode::WRITE | OpenMode::IGNORE_MOUNTS).expect("create"));
    }

    let names: Vec<String> = fs
        .read_dir("", OpenMode::READ)
        .expect("list root")
        .map(|entry: DirEntry| entry.name)
        .collect();

    assert_eq!(names, ["a.txt", "b.txt", "c.txt"]);
}

#[test]
fn archives_descend_inside_the_memory_backend() {
    // A zip stored in the in-memory tree, resolved through descent with no
    // OS involvement anywhere.
    use super::zipgen::{self, ZipSpec};

    let fs = Fs::with_archive_types(MemBackend::new(), stratafs::ArchiveTypes::zip_only());
    let zip = zipgen::build(&[ZipSpec::deflated("doc.txt", b"memory-resident")]);

    let mut file = fs.open("packs/data.zip", OpenMode::WRITE | OpenMode::IGNORE_MOUNTS).expect("store zip");
    file.write(&zip).expect("write zip");
    drop(file);

    let mut file = fs.open("packs/data.zip/doc.txt", OpenMode::READ).expect("descend");
    assert_eq!(file.read_to_end().unwrap(), b"memory-resident");
}
