use std::fs;
use std::io::Write;
use std::path::Path;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use gpk::archive::crypto::apply_keystream;
use gpk::prelude::*;
use gpk::Error;

fn envelope(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    let mut blob = (data.len() as u32).to_be_bytes().to_vec();
    blob.extend(encoder.finish().unwrap());
    blob
}

/// Build a GPK file holding `(name, stored bytes, is DFLT)` entries.
fn build_archive(assets: &[(&str, Vec<u8>, bool)]) -> Vec<u8> {
    let mut file = Vec::new();
    let mut table = Vec::new();

    for (name, stored, dflt) in assets {
        let offset = file.len() as u32;
        file.extend_from_slice(stored);

        let units: Vec<u16> = name.encode_utf16().collect();
        table.extend_from_slice(&(units.len() as u16).to_le_bytes());
        for unit in units {
            table.extend_from_slice(&unit.to_le_bytes());
        }
        table.extend_from_slice(&[0, 0, 1, 0, 0, 0]);
        table.extend_from_slice(&offset.to_le_bytes());
        table.extend_from_slice(&(stored.len() as u32).to_le_bytes());
        table.extend_from_slice(if *dflt { b"DFLT" } else { b"    " });
        table.extend_from_slice(&0u32.to_le_bytes());
        table.push(0);
    }
    table.extend_from_slice(&[0, 0]);

    let mut blob = envelope(&table);
    apply_keystream(&mut blob);
    file.extend_from_slice(&blob);
    file.extend_from_slice(b"STKFile0PIDX");
    file.extend_from_slice(&(blob.len() as u32).to_le_bytes());
    file.extend_from_slice(b"STKFile0PACKFILE");
    file
}

fn raw<'a>(name: &'a str, data: &[u8]) -> (&'a str, Vec<u8>, bool) {
    (name, data.to_vec(), false)
}

fn write_game(root: &Path) {
    let packs = root.join("packs");
    fs::create_dir_all(packs.join("sub")).unwrap();

    fs::write(
        packs.join("BGM.GPK"),
        build_archive(&[raw("op_loop.ogg", b"bgm-op"), raw("ed_loop.ogg", b"bgm-ed")]),
    )
    .unwrap();
    fs::write(
        packs.join("Event.gpk"),
        build_archive(&[("ev01.PNG", envelope(b"png data"), true)]),
    )
    .unwrap();
    fs::write(
        packs.join("sub").join("Script.GPK"),
        build_archive(&[raw(r"scene\s01.txt", b"hello")]),
    )
    .unwrap();
    fs::write(packs.join("readme.txt"), b"not an archive").unwrap();
}

#[test]
fn test_discover_sorted_and_recursive() {
    let dir = tempfile::tempdir().unwrap();
    write_game(dir.path());

    let found = discover(dir.path()).unwrap();
    let names: Vec<String> = found
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();

    assert_eq!(names, ["BGM.GPK", "Event.gpk", "Script.GPK"]);
}

#[test]
fn test_discover_packs_dir_case_insensitive() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("PACKS")).unwrap();
    fs::write(
        dir.path().join("PACKS/Se.GPK"),
        build_archive(&[raw("click.ogg", b"x")]),
    )
    .unwrap();

    assert_eq!(discover(dir.path()).unwrap().len(), 1);
}

#[test]
fn test_discover_missing_dirs() {
    let dir = tempfile::tempdir().unwrap();

    assert!(matches!(
        discover(dir.path().join("absent")),
        Err(Error::RootNotFound(_))
    ));
    assert!(matches!(
        discover(dir.path()),
        Err(Error::PacksNotFound(_))
    ));
}

#[test]
fn test_mount_skips_broken_archive() {
    let dir = tempfile::tempdir().unwrap();
    write_game(dir.path());
    fs::write(dir.path().join("packs/Broken.GPK"), b"definitely not a gpk file").unwrap();

    let packs = PackSet::mount(dir.path()).unwrap();

    assert_eq!(packs.len(), 3);
    assert_eq!(packs.failed().len(), 1);
    assert!(packs.failed()[0].0.ends_with("Broken.GPK"));
    assert!(packs.get("bgm").is_some());
}

#[test]
fn test_unpack_all() {
    let dir = tempfile::tempdir().unwrap();
    write_game(dir.path());
    let out = dir.path().join("out");

    let mut packs = PackSet::mount(dir.path()).unwrap();
    let summaries = packs.unpack_all(&out, ExtractOptions::default());

    let names: Vec<&str> = summaries.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["BGM", "Event", "Script"]);
    assert!(summaries.iter().all(|s| s.report.is_success()));

    assert_eq!(fs::read(out.join("BGM/op_loop.ogg")).unwrap(), b"bgm-op");
    assert_eq!(fs::read(out.join("Script/scene/s01.txt")).unwrap(), b"hello");
    // Stored bytes are written untouched by default.
    assert_eq!(
        fs::read(out.join("Event/ev01.PNG")).unwrap(),
        envelope(b"png data")
    );
}

#[cfg(feature = "parallel")]
#[test]
fn test_unpack_all_parallel_decodes() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let dir = tempfile::tempdir().unwrap();
    write_game(dir.path());
    let out = dir.path().join("out");

    let seen = AtomicUsize::new(0);
    let mut packs = PackSet::mount(dir.path()).unwrap();
    let summaries = packs.unpack_all_parallel(
        &out,
        ExtractOptions::decoded(),
        |_, _, _| {
            seen.fetch_add(1, Ordering::Relaxed);
        },
    );

    assert_eq!(seen.load(Ordering::Relaxed), 4);
    assert_eq!(summaries.len(), 3);
    assert_eq!(summaries[1].name, "Event");
    assert_eq!(fs::read(out.join("Event/ev01.PNG")).unwrap(), b"png data");
}

#[test]
fn test_open_applies_name_policy() {
    let dir = tempfile::tempdir().unwrap();
    write_game(dir.path());

    let mut packs = PackSet::mount(dir.path()).unwrap();

    assert_eq!(packs.open("BGM/op").unwrap(), b"bgm-op");
    assert_eq!(packs.open("Event/ev01").unwrap(), b"png data");
    assert_eq!(packs.open("script/SCENE/s01.txt").unwrap(), b"hello");
    assert!(matches!(packs.open("BGM/missing"), Err(Error::NotFound(_))));
    assert!(matches!(packs.open("Voice/a"), Err(Error::NotFound(_))));
    assert!(matches!(packs.open("no-separator"), Err(Error::NotFound(_))));
}

#[test]
fn test_open_prefers_loose_file() {
    let dir = tempfile::tempdir().unwrap();
    write_game(dir.path());
    fs::create_dir_all(dir.path().join("BGM")).unwrap();
    fs::write(dir.path().join("BGM/op_loop.ogg"), b"loose").unwrap();

    let mut packs = PackSet::mount(dir.path()).unwrap();

    assert_eq!(packs.open("BGM/op_loop.ogg").unwrap(), b"loose");
    assert_eq!(packs.open("BGM/op").unwrap(), b"bgm-op");
}

#[test]
fn test_mount_skips_duplicate_display_name() {
    let dir = tempfile::tempdir().unwrap();
    let packs_dir = dir.path().join("packs");
    fs::create_dir_all(packs_dir.join("a")).unwrap();
    fs::create_dir_all(packs_dir.join("b")).unwrap();
    fs::write(
        packs_dir.join("a/Voice.GPK"),
        build_archive(&[raw("0001.ogg", b"first")]),
    )
    .unwrap();
    fs::write(
        packs_dir.join("b/voice.gpk"),
        build_archive(&[raw("0001.ogg", b"second")]),
    )
    .unwrap();

    let mut packs = PackSet::mount(dir.path()).unwrap();

    assert_eq!(packs.len(), 1);
    assert!(packs.archives()[0].path().ends_with("a/Voice.GPK"));
    assert_eq!(packs.failed().len(), 1);
    assert!(packs.failed()[0].0.ends_with("b/voice.gpk"));
    assert!(matches!(
        packs.failed()[0].1,
        Error::DuplicateName { .. }
    ));

    let out = dir.path().join("out");
    let summaries = packs.unpack_all(&out, ExtractOptions::default());
    assert_eq!(summaries.len(), 1);
    assert_eq!(fs::read(out.join("Voice/0001.ogg")).unwrap(), b"first");
}

#[test]
fn test_list_by_mask() {
    let dir = tempfile::tempdir().unwrap();
    write_game(dir.path());

    let packs = PackSet::mount(dir.path()).unwrap();

    assert_eq!(
        packs.list("BGM/*_loop.ogg").unwrap(),
        ["op_loop.ogg", "ed_loop.ogg"]
    );
    assert_eq!(packs.list("bgm/OP*").unwrap(), ["op_loop.ogg"]);
    assert_eq!(packs.list("script/*").unwrap(), ["scene/s01.txt"]);
    assert!(packs.list("Voice/*").unwrap().is_empty());
    assert!(matches!(packs.list("BGM"), Err(Error::InvalidMask(_))));
    assert!(matches!(packs.list("BGM/[x"), Err(Error::Pattern(_))));
}
