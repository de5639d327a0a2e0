use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use beatsaver_harvester::expand::{expand_tree, extract_zip};

fn write_valid_zip(path: &Path) {
    let file = File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    zip.start_file("info.dat", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(b"{\"version\": \"2.0.0\"}").unwrap();
    zip.start_file("song/audio.egg", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(b"oggdata").unwrap();
    zip.finish().unwrap();
}

#[test]
fn expands_valid_and_skips_corrupt_archives() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("maps");

    let good_dir = root.join("aaaa");
    fs::create_dir_all(&good_dir).unwrap();
    write_valid_zip(&good_dir.join("a.zip"));

    let bad_dir = root.join("bbbb");
    fs::create_dir_all(&bad_dir).unwrap();
    fs::write(bad_dir.join("b.zip"), b"this is not a zip archive").unwrap();

    let summary = expand_tree(&root).unwrap();

    assert_eq!(summary.extracted, 1);
    assert_eq!(summary.failed, 1);

    // a.zip expanded into a sibling directory named "a"
    let extracted = good_dir.join("a");
    assert!(extracted.is_dir());
    assert_eq!(
        fs::read(extracted.join("info.dat")).unwrap(),
        b"{\"version\": \"2.0.0\"}"
    );
    assert_eq!(fs::read(extracted.join("song/audio.egg")).unwrap(), b"oggdata");

    // the corrupt archive produced nothing
    assert!(!bad_dir.join("b").exists());
}

#[test]
fn non_zip_files_are_ignored() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("maps");
    let dir = root.join("aaaa");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("meta.json"), b"{}").unwrap();

    let summary = expand_tree(&root).unwrap();
    assert_eq!(summary.extracted, 0);
    assert_eq!(summary.failed, 0);
}

#[test]
fn extract_preserves_nested_paths() {
    let temp = tempfile::tempdir().unwrap();
    let zip_path = temp.path().join("map.zip");
    write_valid_zip(&zip_path);

    let target = temp.path().join("out");
    extract_zip(&zip_path, &target).unwrap();

    assert!(target.join("info.dat").is_file());
    assert!(target.join("song").is_dir());
}
