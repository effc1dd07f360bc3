use stratafs::{FsError, MountPriority, MountProfile, OpenMode};

use super::common::Fixture;

#[test]
fn highest_priority_mount_wins() {
    let fixture = Fixture::new();
    fixture.create_dir("high");
    fixture.create_dir("low");
    fixture.write_file("high/a.txt", b"H");
    fixture.write_file("low/a.txt", b"L");

    fixture
        .fs
        .mount(&fixture.path_str("high"), "/data", MountPriority::Highest)
        .expect("mount high");
    fixture
        .fs
        .mount(&fixture.path_str("low"), "/data", MountPriority::Lowest)
        .expect("mount low");

    assert_eq!(fixture.read_all("/data/a.txt", OpenMode::READ), b"H");
}

#[test]
fn priority_is_positional_not_insertion_order() {
    let fixture = Fixture::new();
    fixture.create_dir("first");
    fixture.create_dir("second");
    fixture.write_file("first/a.txt", b"1");
    fixture.write_file("second/a.txt", b"2");

    // Mounted later but at the head of the list.
    fixture
        .fs
        .mount(&fixture.path_str("first"), "/d", MountPriority::Lowest)
        .expect("mount first");
    fixture
        .fs
        .mount(&fixture.path_str("second"), "/d", MountPriority::Highest)
        .expect("mount second");

    assert_eq!(fixture.read_all("/d/a.txt", OpenMode::READ), b"2");
}

#[test]
fn write_mount_longest_prefix_wins() {
    let fixture = Fixture::new();
    fixture.create_dir("broad");
    fixture.create_dir("narrow");

    fixture
        .fs
        .mount_write(&fixture.path_str("broad"), "/c", MountPriority::Lowest)
        .expect("mount broad");
    fixture
        .fs
        .mount_write(&fixture.path_str("narrow"), "/c/global", MountPriority::Lowest)
        .expect("mount narrow");

    let mut file = fixture
        .open("/c/global/settings.ini", OpenMode::WRITE)
        .expect("open through narrow mount");
    file.write(b"[core]").expect("write");
    drop(file);

    assert!(fixture.path("narrow/settings.ini").exists());
    assert!(!fixture.path("broad/global/settings.ini").exists());
}

#[test]
fn write_without_matching_mount_does_not_exist() {
    let fixture = Fixture::new();
    fixture.create_dir("w");
    fixture
        .fs
        .mount_write(&fixture.path_str("w"), "/w", MountPriority::Lowest)
        .expect("mount");

    let result = fixture.open("/elsewhere/file.txt", OpenMode::WRITE);
    assert_eq!(result.err(), Some(FsError::DoesNotExist));
}

#[test]
fn only_mounts_restricts_resolution() {
    let fixture = Fixture::new();
    fixture.write_file("direct.txt", b"direct");

    let direct = fixture.path_str("direct.txt");
    assert!(fixture.open(&direct, OpenMode::READ | OpenMode::ONLY_MOUNTS).is_err());

    // The same file resolves once its directory is mounted.
    fixture
        .fs
        .mount(&fixture.root_str(), "/m", MountPriority::Lowest)
        .expect("mount");
    assert_eq!(
        fixture.read_all("/m/direct.txt", OpenMode::READ | OpenMode::ONLY_MOUNTS),
        b"direct"
    );
}

#[test]
fn ignore_mounts_bypasses_the_mount_list() {
    let fixture = Fixture::new();
    fixture.create_dir("m");
    fixture.write_file("m/a.txt", b"mounted");

    fixture
        .fs
        .mount(&fixture.path_str("m"), "/m", MountPriority::Lowest)
        .expect("mount");

    assert_eq!(fixture.read_all("/m/a.txt", OpenMode::READ), b"mounted");
    assert!(fixture.open("/m/a.txt", OpenMode::READ | OpenMode::IGNORE_MOUNTS).is_err());
}

#[test]
fn unmount_removes_resolution() {
    let fixture = Fixture::new();
    fixture.create_dir("m");
    fixture.write_file("m/a.txt", b"x");

    let source = fixture.path_str("m");
    fixture.fs.mount(&source, "/m", MountPriority::Lowest).expect("mount");
    assert!(fixture.open("/m/a.txt", OpenMode::READ).is_ok());

    fixture.fs.unmount(&source).expect("unmount");
    assert!(fixture.open("/m/a.txt", OpenMode::READ).is_err());
}

#[test]
fn duplicate_mount_is_a_no_op() {
    let fixture = Fixture::new();
    fixture.create_dir("m");
    fixture.write_file("m/a.txt", b"x");

    let source = fixture.path_str("m");
    fixture.fs.mount(&source, "/m", MountPriority::Lowest).expect("first mount");
    fixture.fs.mount(&source, "/m", MountPriority::Lowest).expect("duplicate mount");

    // A single unmount clears it, proving one record existed.
    fixture.fs.unmount(&source).expect("unmount");
    assert!(fixture.open("/m/a.txt", OpenMode::READ).is_err());
}

#[test]
fn mount_profile_applies_mounts_and_threshold() {
    let fixture = Fixture::new();
    fixture.create_dir("assets");
    fixture.write_file("assets/a.txt", b"A");
    fixture.create_dir("save");

    let profile_text = format!(
        "archive-gc-threshold = 3\n\n\
         [[mount]]\nsource = \"{assets}\"\nprefix = \"/assets\"\n\n\
         [[write-mount]]\nsource = \"{save}\"\nprefix = \"/save\"\n",
        assets = fixture.path_str("assets").replace('\\', "/"),
        save = fixture.path_str("save").replace('\\', "/"),
    );

    let profile = MountProfile::from_toml(&profile_text).expect("parse profile");
    profile.apply(&fixture.fs).expect("apply profile");

    assert_eq!(fixture.fs.archive_gc_threshold(), 3);
    assert_eq!(fixture.read_all("/assets/a.txt", OpenMode::READ), b"A");

    let mut out = fixture.open("/save/game.dat", OpenMode::WRITE).expect("write mount");
    out.write(b"s").expect("write");
    drop(out);
    assert!(fixture.path("save/game.dat").exists());
}
