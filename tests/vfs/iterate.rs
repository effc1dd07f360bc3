use stratafs::{DirEntry, MountPriority, OpenMode};

use super::common::Fixture;
use super::zipgen::ZipSpec;

fn names(entries: &[DirEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.name.as_str()).collect()
}

#[test]
fn listing_is_sorted_by_name() {
    let fixture = Fixture::new();
    fixture.create_dir("d");
    fixture.write_file("d/zeta", b"z");
    fixture.write_file("d/alpha", b"a");
    fixture.write_file("d/mid", b"m");

    let entries: Vec<DirEntry> = fixture
        .fs
        .read_dir(&fixture.path_str("d"), OpenMode::READ)
        .expect("read dir")
        .collect();

    assert_eq!(names(&entries), ["alpha", "mid", "zeta"]);
}

#[test]
fn mounts_merge_and_deduplicate() {
    let fixture = Fixture::new();
    fixture.create_dir("high");
    fixture.create_dir("low");
    fixture.write_file("high/shared.txt", b"H!");
    fixture.write_file("high/only_high.txt", b"h");
    fixture.write_file("low/shared.txt", b"L");
    fixture.write_file("low/only_low.txt", b"l");

    fixture
        .fs
        .mount(&fixture.path_str("high"), "/data", MountPriority::Highest)
        .expect("mount high");
    fixture
        .fs
        .mount(&fixture.path_str("low"), "/data", MountPriority::Lowest)
        .expect("mount low");

    let entries: Vec<DirEntry> = fixture
        .fs
        .read_dir("/data", OpenMode::READ | OpenMode::ONLY_MOUNTS)
        .expect("read dir")
        .collect();

    assert_eq!(names(&entries), ["only_high.txt", "only_low.txt", "shared.txt"]);

    // The duplicate kept the higher-priority mount's metadata.
    let shared = entries.iter().find(|e| e.name == "shared.txt").unwrap();
    assert_eq!(shared.info.size, 2);
}

#[test]
fn archive_path_lists_archive_contents() {
    let fixture = Fixture::new();
    fixture.write_zip(
        "pkg.zip",
        &[
            ZipSpec::stored("b.txt", b"b"),
            ZipSpec::stored("a.txt", b"a"),
            ZipSpec::deflated("dir1/nested.txt", b"nested"),
        ],
    );

    let entries: Vec<DirEntry> = fixture
        .fs
        .read_dir(&fixture.path_str("pkg.zip"), OpenMode::READ)
        .expect("list archive root")
        .collect();

    assert_eq!(names(&entries), ["a.txt", "b.txt", "dir1"]);
    assert!(entries[2].info.directory);

    let nested: Vec<DirEntry> = fixture
        .fs
        .read_dir(&fixture.path_str("pkg.zip/dir1"), OpenMode::READ)
        .expect("list archive subdir")
        .collect();

    assert_eq!(names(&nested), ["nested.txt"]);
    assert_eq!(nested[0].info.size, 6);
}

#[test]
fn transparent_listing_merges_archive_overlay() {
    let fixture = Fixture::new();
    fixture.write_file("plain.txt", b"plain");
    fixture.write_zip(
        "pkg.zip",
        &[ZipSpec::stored("from_zip.txt", b"zipped"), ZipSpec::stored("plain.txt", b"shadowed")],
    );
    fixture.mount_root();

    let entries: Vec<DirEntry> =
        fixture.fs.read_dir("", OpenMode::READ).expect("merged listing").collect();
    let listed = names(&entries);

    // Disk entries and archive overlay entries appear side by side, with
    // disk versions winning the duplicate.
    assert!(listed.contains(&"plain.txt"));
    assert!(listed.contains(&"from_zip.txt"));
    assert!(listed.contains(&"pkg.zip"));

    let plain = entries.iter().find(|e| e.name == "plain.txt").unwrap();
    assert_eq!(plain.info.size, 5);
}

#[test]
fn opaque_listing_skips_archives() {
    let fixture = Fixture::new();
    fixture.write_zip("pkg.zip", &[ZipSpec::stored("from_zip.txt", b"zipped")]);
    fixture.mount_root();

    let entries: Vec<DirEntry> = fixture
        .fs
        .read_dir("", OpenMode::READ | OpenMode::OPAQUE)
        .expect("opaque listing")
        .collect();

    let listed = names(&entries);
    assert!(listed.contains(&"pkg.zip"));
    assert!(!listed.contains(&"from_zip.txt"));
}

#[test]
fn mounted_archive_contributes_to_its_prefix() {
    let fixture = Fixture::new();
    fixture.write_zip(
        "pkg.zip",
        &[ZipSpec::stored("inside.txt", b"i"), ZipSpec::stored("sub/deep.txt", b"d")],
    );

    fixture
        .fs
        .mount(&fixture.path_str("pkg.zip"), "/pak", MountPriority::Lowest)
        .expect("mount archive");

    let entries: Vec<DirEntry> = fixture
        .fs
        .read_dir("/pak", OpenMode::READ | OpenMode::ONLY_MOUNTS)
        .expect("list mounted archive")
        .collect();

    assert_eq!(names(&entries), ["inside.txt", "sub"]);
}
