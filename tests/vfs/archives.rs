use stratafs::{FsError, GcPolicy, MountPriority, OpenMode};

use super::common::Fixture;
use super::zipgen::{self, ZipSpec};

fn archive_fixture() -> Fixture {
    let fixture = Fixture::new();
    fixture.write_zip(
        "pkg.zip",
        &[
            ZipSpec::stored("readme", b"archived readme\n"),
            ZipSpec::deflated("docs/manual.txt", b"the manual, compressed"),
            ZipSpec::stored("a", b"Z"),
        ],
    );
    fixture
}

#[test]
fn open_from_archive_explicitly() {
    let fixture = archive_fixture();
    let path = fixture.path_str("pkg.zip/readme");

    assert_eq!(fixture.read_all(&path, OpenMode::READ), b"archived readme\n");
}

#[test]
fn open_nested_entry_explicitly() {
    let fixture = archive_fixture();
    let path = fixture.path_str("pkg.zip/docs/manual.txt");

    assert_eq!(fixture.read_all(&path, OpenMode::READ), b"the manual, compressed");
}

#[test]
fn open_from_archive_transparently() {
    let fixture = archive_fixture();
    fixture.mount_root();

    // No archive in the path: the zip sitting in the scratch root overlays
    // the remaining path.
    assert_eq!(fixture.read_all("readme", OpenMode::READ), b"archived readme\n");
    assert_eq!(fixture.read_all("docs/manual.txt", OpenMode::READ), b"the manual, compressed");
}

#[test]
fn disk_files_beat_archive_contents_in_transparent_mode() {
    let fixture = archive_fixture();
    fixture.mount_root();

    // "a" exists both on disk (4 bytes) and in the archive (1 byte).
    fixture.write_file("a", &[1, 2, 3, 4]);

    assert_eq!(fixture.read_all("a", OpenMode::READ), [1, 2, 3, 4]);
}

#[test]
fn verbose_mode_requires_explicit_archive_paths() {
    let fixture = archive_fixture();
    fixture.mount_root();

    let explicit = fixture.path_str("pkg.zip/readme");
    assert!(fixture.open(&explicit, OpenMode::READ | OpenMode::VERBOSE).is_ok());

    let transparent = fixture.open("readme", OpenMode::READ | OpenMode::VERBOSE);
    assert_eq!(transparent.err(), Some(FsError::DoesNotExist));
}

#[test]
fn opaque_mode_never_descends() {
    let fixture = archive_fixture();
    fixture.mount_root();

    let explicit = fixture.path_str("pkg.zip/readme");
    assert!(fixture.open(&explicit, OpenMode::READ | OpenMode::OPAQUE).is_err());
    assert!(fixture.open("readme", OpenMode::READ | OpenMode::OPAQUE).is_err());
}

#[test]
fn stat_resolves_through_archives() {
    let fixture = archive_fixture();
    let path = fixture.path_str("pkg.zip/readme");

    let info = fixture.fs.info(&path, OpenMode::READ).expect("stat archived file");
    assert_eq!(info.size, 16);
    assert!(!info.directory);

    let dir_info = fixture
        .fs
        .info(&fixture.path_str("pkg.zip/docs"), OpenMode::READ)
        .expect("stat archived dir");
    assert!(dir_info.directory);
}

#[test]
fn missing_entry_inside_archive_does_not_exist() {
    let fixture = archive_fixture();
    let path = fixture.path_str("pkg.zip/absent");

    assert_eq!(fixture.open(&path, OpenMode::READ).err(), Some(FsError::DoesNotExist));
}

#[test]
fn archive_cache_counts_references() {
    let fixture = archive_fixture();
    let archive_path = fixture.path_str("pkg.zip");

    let a = fixture.open(&fixture.path_str("pkg.zip/readme"), OpenMode::READ).expect("first");
    let b = fixture
        .open(&fixture.path_str("pkg.zip/docs/manual.txt"), OpenMode::READ)
        .expect("second");

    assert_eq!(fixture.fs.archive_refcount(&archive_path), Some(2));

    drop(a);
    assert_eq!(fixture.fs.archive_refcount(&archive_path), Some(1));

    drop(b);
    assert_eq!(fixture.fs.archive_refcount(&archive_path), Some(0));

    // Idle entries stay cached until GC crosses the threshold.
    assert_eq!(fixture.fs.cached_archive_count(), 1);

    fixture.fs.set_archive_gc_threshold(0);
    fixture.fs.gc_archives(GcPolicy::Threshold);
    assert_eq!(fixture.fs.cached_archive_count(), 0);

    // Reopening loads the archive afresh.
    assert_eq!(
        fixture.read_all(&fixture.path_str("pkg.zip/readme"), OpenMode::READ),
        b"archived readme\n"
    );
    assert_eq!(fixture.fs.cached_archive_count(), 1);
}

#[test]
fn gc_full_unloads_every_idle_archive() {
    let fixture = archive_fixture();
    fixture.write_zip("second.zip", &[ZipSpec::stored("x", b"x")]);

    fixture.read_all(&fixture.path_str("pkg.zip/readme"), OpenMode::READ);
    fixture.read_all(&fixture.path_str("second.zip/x"), OpenMode::READ);
    assert_eq!(fixture.fs.cached_archive_count(), 2);

    fixture.fs.gc_archives(GcPolicy::Full);
    assert_eq!(fixture.fs.cached_archive_count(), 0);
}

#[test]
fn gc_never_unloads_referenced_archives() {
    let fixture = archive_fixture();
    let path = fixture.path_str("pkg.zip/docs/manual.txt");

    let mut file = fixture.open(&path, OpenMode::READ).expect("open");
    fixture.fs.set_archive_gc_threshold(0);
    fixture.fs.gc_archives(GcPolicy::Full);
    assert_eq!(fixture.fs.cached_archive_count(), 1);

    // The handle still reads after the sweep.
    assert_eq!(file.read_to_end().unwrap(), b"the manual, compressed");
}

#[test]
fn open_archive_returns_a_usable_filesystem() {
    let fixture = archive_fixture();
    let archive = fixture
        .fs
        .open_archive(&fixture.path_str("pkg.zip"), OpenMode::READ | OpenMode::VERBOSE)
        .expect("open archive");

    let mut file = archive.open("readme", OpenMode::READ).expect("open inside archive");
    assert_eq!(file.read_to_end().unwrap(), b"archived readme\n");

    assert_eq!(fixture.fs.archive_refcount(&fixture.path_str("pkg.zip")), Some(1));
    drop(archive);
    assert_eq!(fixture.fs.archive_refcount(&fixture.path_str("pkg.zip")), Some(0));
}

#[test]
fn mounted_archive_resolves_under_its_prefix() {
    let fixture = archive_fixture();

    fixture
        .fs
        .mount(&fixture.path_str("pkg.zip"), "/pak", MountPriority::Lowest)
        .expect("mount archive");

    assert_eq!(fixture.read_all("/pak/readme", OpenMode::READ), b"archived readme\n");
    assert_eq!(fixture.read_all("/pak/docs/manual.txt", OpenMode::READ), b"the manual, compressed");

    fixture.fs.unmount(&fixture.path_str("pkg.zip")).expect("unmount");
    assert!(fixture.open("/pak/readme", OpenMode::READ).is_err());
    assert_eq!(fixture.fs.archive_refcount(&fixture.path_str("pkg.zip")), Some(0));
}

#[test]
fn mount_fs_shares_an_open_archive() {
    let fixture = archive_fixture();
    let archive = fixture
        .fs
        .open_archive(&fixture.path_str("pkg.zip"), OpenMode::READ | OpenMode::VERBOSE)
        .expect("open archive");

    fixture.fs.mount_fs(&archive, "/shared", MountPriority::Lowest).expect("mount fs");
    assert_eq!(fixture.read_all("/shared/readme", OpenMode::READ), b"archived readme\n");

    fixture.fs.unmount_fs(&archive).expect("unmount fs");
    assert!(fixture.open("/shared/readme", OpenMode::READ).is_err());
}

#[test]
fn archives_nest_inside_archives() {
    let fixture = Fixture::new();

    let inner = zipgen::build(&[ZipSpec::stored("secret.txt", b"inner payload")]);
    fixture.write_file(
        "outer.zip",
        &zipgen::build(&[
            ZipSpec::stored("inner.zip", &inner),
            ZipSpec::stored("top.txt", b"outer payload"),
        ]),
    );

    let path = fixture.path_str("outer.zip/inner.zip/secret.txt");
    assert_eq!(fixture.read_all(&path, OpenMode::READ), b"inner payload");
}

#[test]
fn files_keep_reading_after_owner_mounts_change() {
    let fixture = archive_fixture();
    fixture.mount_root();

    let mut file = fixture.open("docs/manual.txt", OpenMode::READ).expect("transparent open");
    fixture.fs.unmount(&fixture.root_str()).expect("unmount");

    assert_eq!(file.read_to_end().unwrap(), b"the manual, compressed");
}
