//! Exercises the `tar-diff` and `tar-patch` binaries as a user would invoke
//! them from the shell.

use assert_cmd::Command;
use predicates::prelude::*;

fn build_tar(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_path(name).unwrap();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        builder.append(&header, *data).unwrap();
    }
    builder.finish().unwrap();
    builder.into_inner().unwrap()
}

#[test]
fn diff_then_patch_round_trips_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let old_path = dir.path().join("old.tar");
    let new_path = dir.path().join("new.tar");
    let delta_path = dir.path().join("delta.bin");
    let out_path = dir.path().join("reconstructed.tar");

    std::fs::write(&old_path, build_tar(&[("file.txt", b"hello world")])).unwrap();
    std::fs::write(&new_path, build_tar(&[("file.txt", b"hello brave world")])).unwrap();

    Command::cargo_bin("tar-diff")
        .unwrap()
        .args([&old_path, &new_path, &delta_path])
        .assert()
        .success()
        .stdout(predicate::str::contains("tar-diff:"));

    Command::cargo_bin("tar-patch")
        .unwrap()
        .args([&delta_path, &old_path, &out_path])
        .assert()
        .success()
        .stdout(predicate::str::contains("tar-patch:"));

    let expected = std::fs::read(&new_path).unwrap();
    let actual = std::fs::read(&out_path).unwrap();
    assert_eq!(actual, expected);
}

#[test]
fn tar_diff_rejects_missing_old_archive() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist.tar");
    let new_path = dir.path().join("new.tar");
    let delta_path = dir.path().join("delta.bin");
    std::fs::write(&new_path, build_tar(&[("a.txt", b"a")])).unwrap();

    Command::cargo_bin("tar-diff")
        .unwrap()
        .args([&missing, &new_path, &delta_path])
        .assert()
        .failure();
}

#[test]
fn tar_patch_rejects_corrupt_delta() {
    let dir = tempfile::tempdir().unwrap();
    let old_path = dir.path().join("old.tar");
    let bogus_delta = dir.path().join("bogus.delta");
    let out_path = dir.path().join("out.tar");
    std::fs::write(&old_path, build_tar(&[("a.txt", b"a")])).unwrap();
    std::fs::write(&bogus_delta, b"not a real delta file").unwrap();

    Command::cargo_bin("tar-patch")
        .unwrap()
        .args([&bogus_delta, &old_path, &out_path])
        .assert()
        .failure();
}
