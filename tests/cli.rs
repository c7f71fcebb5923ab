use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use gpk::archive::crypto::apply_keystream;

/// Build a GPK file with one uncompressed entry per `(name, data)` pair.
fn build_archive(assets: &[(&str, &[u8])]) -> Vec<u8> {
    build_archive_with_header(assets, 0)
}

/// Same as [`build_archive`], with `comprheadlen` set on every entry.
fn build_archive_with_header(assets: &[(&str, &[u8])], comprheadlen: u8) -> Vec<u8> {
    let mut file = Vec::new();
    let mut table = Vec::new();

    for (name, data) in assets {
        let offset = file.len() as u32;
        file.extend_from_slice(data);

        let units: Vec<u16> = name.encode_utf16().collect();
        table.extend_from_slice(&(units.len() as u16).to_le_bytes());
        for unit in units {
            table.extend_from_slice(&unit.to_le_bytes());
        }
        table.extend_from_slice(&[0, 0, 1, 0, 0, 0]);
        table.extend_from_slice(&offset.to_le_bytes());
        table.extend_from_slice(&(data.len() as u32).to_le_bytes());
        table.extend_from_slice(b"    ");
        table.extend_from_slice(&0u32.to_le_bytes());
        table.push(comprheadlen);
    }
    table.extend_from_slice(&[0, 0]);

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&table).unwrap();
    let mut blob = (table.len() as u32).to_be_bytes().to_vec();
    blob.extend(encoder.finish().unwrap());
    apply_keystream(&mut blob);

    file.extend_from_slice(&blob);
    file.extend_from_slice(b"STKFile0PIDX");
    file.extend_from_slice(&(blob.len() as u32).to_le_bytes());
    file.extend_from_slice(b"STKFile0PACKFILE");
    file
}

fn gpk() -> Result<Command, Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("gpk")?;
    cmd.env_remove("GPK_GAME_ROOT")
        .env_remove("GPK_OUTPUT")
        .env_remove("GPK_INPUT")
        .env_remove("RUST_LOG");
    Ok(cmd)
}

fn write_game(root: &Path) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(root.join("packs"))?;
    fs::write(
        root.join("packs/Voice.GPK"),
        build_archive(&[("a01/0001.ogg", b"OggS-1"), ("a01/0002.ogg", b"OggS-2")]),
    )?;
    fs::write(
        root.join("packs/Script.GPK"),
        build_archive(&[("foo/bar.bin", &[0xAA, 0xBB, 0xCC])]),
    )?;
    Ok(())
}

#[test]
fn test_cli_missing_game_root_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;

    gpk()?
        .arg(dir.path().join("nowhere"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("game directory not found"));

    Ok(())
}

#[test]
fn test_cli_no_archives_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    fs::create_dir(dir.path().join("packs"))?;

    gpk()?
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No GPK archives found"));

    Ok(())
}

#[test]
fn test_cli_unpack_game_root() -> Result<(), Box<dyn std::error::Error>> {
    let game = tempdir()?;
    write_game(game.path())?;
    let out = tempdir()?;

    gpk()?
        .arg(game.path())
        .arg("-o")
        .arg(out.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Voice: 2 files")
                .and(predicate::str::contains("Script: 1 files")),
        );

    assert_eq!(fs::read(out.path().join("Script/foo/bar.bin"))?, [0xAAu8, 0xBB, 0xCC]);
    assert_eq!(fs::read(out.path().join("Voice/a01/0002.ogg"))?, b"OggS-2");

    Ok(())
}

#[test]
fn test_cli_fails_when_nothing_extracted() -> Result<(), Box<dyn std::error::Error>> {
    let game = tempdir()?;
    write_game(game.path())?;
    let blocker = game.path().join("not-a-dir");
    fs::write(&blocker, b"")?;

    gpk()?
        .arg(game.path())
        .arg("-o")
        .arg(&blocker)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Voice: 0 files"))
        .stderr(predicate::str::contains("No files could be extracted"));

    Ok(())
}

#[test]
fn test_cli_strip_ogg_header() -> Result<(), Box<dyn std::error::Error>> {
    let game = tempdir()?;
    fs::create_dir_all(game.path().join("packs"))?;
    fs::write(
        game.path().join("packs/Voice.GPK"),
        build_archive_with_header(&[("0001.ogg", b"\x01\x02\x03OggS-page")], 3),
    )?;
    let out = tempdir()?;

    gpk()?
        .arg(game.path())
        .arg("-o")
        .arg(out.path())
        .arg("--strip-ogg-header")
        .assert()
        .success();

    assert_eq!(fs::read(out.path().join("Voice/0001.ogg"))?, b"OggS-page");

    Ok(())
}

#[test]
fn test_cli_list_extract_dump_cycle() -> Result<(), Box<dyn std::error::Error>> {
    let game = tempdir()?;
    write_game(game.path())?;
    let archive = game.path().join("packs/Voice.GPK");

    gpk()?
        .arg("list")
        .arg("-i")
        .arg(&archive)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("a01/0001.ogg")
                .and(predicate::str::contains("a01/0002.ogg"))
                .and(predicate::str::contains("Total: 2 entries")),
        );

    gpk()?
        .args(["list", "--json", "--filter", "*0002*", "-i"])
        .arg(&archive)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"name\": \"a01/0002.ogg\"")
                .and(predicate::str::contains("0001").not()),
        );

    let out = tempdir()?;
    gpk()?
        .args(["extract", "--filter", "*0001.OGG", "-i"])
        .arg(&archive)
        .arg("-o")
        .arg(out.path())
        .assert()
        .success();

    assert_eq!(fs::read(out.path().join("a01/0001.ogg"))?, b"OggS-1");
    assert!(!out.path().join("a01/0002.ogg").exists());

    let dump = out.path().join("index.bin");
    gpk()?
        .args(["dump-index", "-i"])
        .arg(&archive)
        .arg("-o")
        .arg(&dump)
        .assert()
        .success();

    // Two records of 2 + 24 + 23 bytes plus the terminator.
    assert_eq!(fs::metadata(&dump)?.len(), 2 * (2 + 24 + 23) + 2);

    Ok(())
}

#[test]
fn test_cli_verbose_and_quiet_conflict() -> Result<(), Box<dyn std::error::Error>> {
    gpk()?.args(["-v", "-q", "."]).assert().failure();
    Ok(())
}
