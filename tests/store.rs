use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use beatsaver_harvester::domain::MapRecord;
use beatsaver_harvester::error::HarvestError;
use beatsaver_harvester::store::{FsMapStore, MapStore, META_FILE};

fn record(id: &str) -> MapRecord {
    serde_json::from_str(&format!(
        r#"{{
            "id": "{id}",
            "lastPublishedAt": "2023-05-04T12:00:00.000Z",
            "bpm": 174.0,
            "versions": [{{"downloadURL": "https://cdn.example.com/versions/{id}.zip"}}]
        }}"#
    ))
    .unwrap()
}

fn temp_store(temp: &tempfile::TempDir) -> FsMapStore {
    let root = Utf8PathBuf::from_path_buf(temp.path().join("maps")).unwrap();
    let store = FsMapStore::new(root);
    store.ensure_root().unwrap();
    store
}

#[test]
fn per_map_layout() {
    let temp = tempfile::tempdir().unwrap();
    let store = temp_store(&temp);
    let record = record("2f31a");

    let meta_path = store.write_meta(&record).unwrap();
    assert!(meta_path.ends_with("2f31a/meta.json"));
    assert!(meta_path.as_std_path().is_file());

    let mut body: &[u8] = b"payload bytes";
    let payload_path = store.write_payload(&record, &mut body).unwrap();
    // the payload is named by the final path segment of the download URL
    assert!(payload_path.ends_with("2f31a/2f31a.zip"));
    assert_eq!(std::fs::read(payload_path.as_std_path()).unwrap(), b"payload bytes");
    assert!(store.payload_exists(&record).unwrap());
}

#[test]
fn meta_file_round_trips_the_full_record() {
    let temp = tempfile::tempdir().unwrap();
    let store = temp_store(&temp);

    let meta_path = store.write_meta(&record("2f31a")).unwrap();
    let reread = store.read_meta(&meta_path).unwrap();
    assert_eq!(reread.id, "2f31a");
    assert_eq!(reread.last_published_at, "2023-05-04T12:00:00.000Z");
    assert_eq!(reread.extra["bpm"], 174.0);
}

#[test]
fn scan_reports_file_counts() {
    let temp = tempfile::tempdir().unwrap();
    let store = temp_store(&temp);

    let complete = record("aaaa");
    store.write_meta(&complete).unwrap();
    let mut body: &[u8] = b"zip";
    store.write_payload(&complete, &mut body).unwrap();

    store.write_meta(&record("bbbb")).unwrap();

    // a directory without a metadata file does not register
    std::fs::create_dir_all(store.map_dir("cccc").as_std_path()).unwrap();
    std::fs::write(store.map_dir("cccc").join("cccc.zip").as_std_path(), b"zip").unwrap();

    let entries = store.scan_entries().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].id, "aaaa");
    assert_eq!(entries[0].file_count, 2);
    assert!(entries[0].meta_path.ends_with("aaaa/meta.json"));
    assert_eq!(entries[1].id, "bbbb");
    assert_eq!(entries[1].file_count, 1);
}

#[test]
fn scan_of_missing_root_is_fatal() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().join("never-created")).unwrap();
    let store = FsMapStore::new(root);

    assert_matches!(store.scan_entries(), Err(HarvestError::Filesystem(_)));
}

#[test]
fn meta_path_layout() {
    let store = FsMapStore::new(Utf8PathBuf::from("data/raw_maps"));
    assert_eq!(
        store.meta_path("2f31a"),
        Utf8PathBuf::from("data/raw_maps/2f31a").join(META_FILE)
    );
}
