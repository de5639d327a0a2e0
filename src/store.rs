use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::sync::{Mutex, MutexGuard};

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::MapRecord;
use crate::error::HarvestError;

pub const META_FILE: &str = "meta.json";

const CHUNK_SIZE: usize = 8192;

/// One map directory found during a scan.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    pub id: String,
    pub meta_path: Utf8PathBuf,
    /// Files in the map directory. Fewer than two means the payload never
    /// landed next to the metadata.
    pub file_count: usize,
}

/// Storage backend for the per-map output tree.
///
/// Layout: `<root>/<id>/meta.json` plus one payload file named after the
/// final path segment of the record's download URL.
pub trait MapStore: Send + Sync {
    /// Enumerate map directories holding a metadata file.
    fn scan_entries(&self) -> Result<Vec<StoredEntry>, HarvestError>;

    fn read_meta(&self, meta_path: &Utf8Path) -> Result<MapRecord, HarvestError>;

    /// Serialize the full record into the map's metadata file, creating the
    /// directory if needed. Returns the metadata path.
    fn write_meta(&self, record: &MapRecord) -> Result<Utf8PathBuf, HarvestError>;

    /// Stream the payload body into the map directory.
    fn write_payload(
        &self,
        record: &MapRecord,
        body: &mut dyn Read,
    ) -> Result<Utf8PathBuf, HarvestError>;

    fn payload_exists(&self, record: &MapRecord) -> Result<bool, HarvestError>;
}

#[derive(Debug, Clone)]
pub struct FsMapStore {
    root: Utf8PathBuf,
}

impl FsMapStore {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn ensure_root(&self) -> Result<(), HarvestError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| HarvestError::Filesystem(err.to_string()))
    }

    pub fn map_dir(&self, id: &str) -> Utf8PathBuf {
        self.root.join(id)
    }

    pub fn meta_path(&self, id: &str) -> Utf8PathBuf {
        self.map_dir(id).join(META_FILE)
    }

    fn payload_path(&self, record: &MapRecord) -> Result<Utf8PathBuf, HarvestError> {
        Ok(self.map_dir(&record.id).join(record.payload_file_name()?))
    }

    fn ensure_map_dir(&self, id: &str) -> Result<Utf8PathBuf, HarvestError> {
        let dir = self.map_dir(id);
        fs::create_dir_all(dir.as_std_path())
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        Ok(dir)
    }
}

impl MapStore for FsMapStore {
    fn scan_entries(&self) -> Result<Vec<StoredEntry>, HarvestError> {
        let dirs = fs::read_dir(self.root.as_std_path())
            .map_err(|err| HarvestError::Filesystem(format!("scan {}: {err}", self.root)))?;

        let mut entries = Vec::new();
        for dir in dirs {
            let dir = dir.map_err(|err| HarvestError::Filesystem(err.to_string()))?;
            let path = dir.path();
            if !path.is_dir() {
                continue;
            }
            let meta = path.join(META_FILE);
            if !meta.is_file() {
                continue;
            }
            let file_count = fs::read_dir(&path)
                .map_err(|err| HarvestError::Filesystem(err.to_string()))?
                .count();
            let meta_path = Utf8PathBuf::from_path_buf(meta).map_err(|path| {
                HarvestError::Filesystem(format!("non-utf8 path: {}", path.display()))
            })?;
            entries.push(StoredEntry {
                id: dir.file_name().to_string_lossy().into_owned(),
                meta_path,
                file_count,
            });
        }
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(entries)
    }

    fn read_meta(&self, meta_path: &Utf8Path) -> Result<MapRecord, HarvestError> {
        let content = fs::read_to_string(meta_path.as_std_path())
            .map_err(|err| HarvestError::Filesystem(format!("read {meta_path}: {err}")))?;
        serde_json::from_str(&content).map_err(|err| HarvestError::MetaParse(err.to_string()))
    }

    fn write_meta(&self, record: &MapRecord) -> Result<Utf8PathBuf, HarvestError> {
        self.ensure_map_dir(&record.id)?;
        let path = self.meta_path(&record.id);
        let content = serde_json::to_vec(record)
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(tmp_path.as_std_path(), &content)
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        Ok(path)
    }

    fn write_payload(
        &self,
        record: &MapRecord,
        body: &mut dyn Read,
    ) -> Result<Utf8PathBuf, HarvestError> {
        self.ensure_map_dir(&record.id)?;
        let path = self.payload_path(record)?;
        let mut file = File::create(path.as_std_path())
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        let mut buf = [0u8; CHUNK_SIZE];
        loop {
            let n = body
                .read(&mut buf)
                .map_err(|err| HarvestError::PayloadHttp(err.to_string()))?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n])
                .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        }
        Ok(path)
    }

    fn payload_exists(&self, record: &MapRecord) -> Result<bool, HarvestError> {
        Ok(self.payload_path(record)?.as_std_path().exists())
    }
}

/// Same layout semantics as [`FsMapStore`], held entirely in memory. Lets the
/// engine be exercised without real filesystem I/O.
#[derive(Debug, Default)]
pub struct MemoryMapStore {
    files: Mutex<BTreeMap<Utf8PathBuf, Vec<u8>>>,
}

impl MemoryMapStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(&self, path: &Utf8Path) -> Option<Vec<u8>> {
        self.files.lock().ok()?.get(path).cloned()
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().map(|files| files.len()).unwrap_or(0)
    }

    /// Seed a raw file, as if a previous run had written it.
    pub fn insert(&self, path: Utf8PathBuf, content: Vec<u8>) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(path, content);
        }
    }

    fn meta_path(id: &str) -> Utf8PathBuf {
        Utf8PathBuf::from(id).join(META_FILE)
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<Utf8PathBuf, Vec<u8>>>, HarvestError> {
        self.files
            .lock()
            .map_err(|_| HarvestError::Filesystem("store lock poisoned".to_string()))
    }
}

impl MapStore for MemoryMapStore {
    fn scan_entries(&self) -> Result<Vec<StoredEntry>, HarvestError> {
        let files = self.lock()?;
        let mut counts = BTreeMap::<String, usize>::new();
        for path in files.keys() {
            if let Some(component) = path.components().next() {
                *counts.entry(component.as_str().to_string()).or_default() += 1;
            }
        }
        let mut entries = Vec::new();
        for (id, file_count) in counts {
            let meta_path = Self::meta_path(&id);
            if files.contains_key(&meta_path) {
                entries.push(StoredEntry {
                    id,
                    meta_path,
                    file_count,
                });
            }
        }
        Ok(entries)
    }

    fn read_meta(&self, meta_path: &Utf8Path) -> Result<MapRecord, HarvestError> {
        let files = self.lock()?;
        let content = files
            .get(meta_path)
            .ok_or_else(|| HarvestError::Filesystem(format!("read {meta_path}: not found")))?;
        serde_json::from_slice(content).map_err(|err| HarvestError::MetaParse(err.to_string()))
    }

    fn write_meta(&self, record: &MapRecord) -> Result<Utf8PathBuf, HarvestError> {
        let content = serde_json::to_vec(record)
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        let path = Self::meta_path(&record.id);
        self.lock()?.insert(path.clone(), content);
        Ok(path)
    }

    fn write_payload(
        &self,
        record: &MapRecord,
        body: &mut dyn Read,
    ) -> Result<Utf8PathBuf, HarvestError> {
        let path = Utf8PathBuf::from(&record.id).join(record.payload_file_name()?);
        let mut content = Vec::new();
        let mut buf = [0u8; CHUNK_SIZE];
        loop {
            let n = body
                .read(&mut buf)
                .map_err(|err| HarvestError::PayloadHttp(err.to_string()))?;
            if n == 0 {
                break;
            }
            content.extend_from_slice(&buf[..n]);
        }
        self.lock()?.insert(path.clone(), content);
        Ok(path)
    }

    fn payload_exists(&self, record: &MapRecord) -> Result<bool, HarvestError> {
        let path = Utf8PathBuf::from(&record.id).join(record.payload_file_name()?);
        Ok(self.lock()?.contains_key(&path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MapRecord;

    fn record(id: &str) -> MapRecord {
        serde_json::from_str(&format!(
            r#"{{
                "id": "{id}",
                "lastPublishedAt": "2023-05-04T12:00:00.000Z",
                "versions": [{{"downloadURL": "https://cdn.example.com/{id}.zip"}}]
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryMapStore::new();
        let record = record("2f31a");

        let meta_path = store.write_meta(&record).unwrap();
        assert_eq!(meta_path, Utf8PathBuf::from("2f31a/meta.json"));
        assert!(!store.payload_exists(&record).unwrap());

        let mut body: &[u8] = b"payload bytes";
        let payload_path = store.write_payload(&record, &mut body).unwrap();
        assert_eq!(payload_path, Utf8PathBuf::from("2f31a/2f31a.zip"));
        assert!(store.payload_exists(&record).unwrap());

        let reread = store.read_meta(&meta_path).unwrap();
        assert_eq!(reread.id, "2f31a");
    }

    #[test]
    fn memory_scan_counts_files_per_map() {
        let store = MemoryMapStore::new();
        let complete = record("aaaa");
        store.write_meta(&complete).unwrap();
        let mut body: &[u8] = b"zip";
        store.write_payload(&complete, &mut body).unwrap();

        store.write_meta(&record("bbbb")).unwrap();

        // a stray file with no meta.json must not register
        store.insert(Utf8PathBuf::from("cccc/orphan.zip"), b"zip".to_vec());

        let entries = store.scan_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "aaaa");
        assert_eq!(entries[0].file_count, 2);
        assert_eq!(entries[1].id, "bbbb");
        assert_eq!(entries[1].file_count, 1);
    }
}
