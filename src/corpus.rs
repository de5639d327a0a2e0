use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::HarvestError;
use crate::feed::FeedClient;
use crate::harvester::{ProgressEvent, ProgressSink};
use crate::store::MapStore;

/// Rebuildable index of maps already present in the output tree.
///
/// Membership means "already downloaded" to the engine, whether or not the
/// payload actually completed; completeness is handled once, during the scan.
#[derive(Debug, Default)]
pub struct Corpus {
    entries: HashMap<String, Utf8PathBuf>,
}

impl Corpus {
    /// Build the index by scanning the store. Any registered entry whose
    /// directory holds fewer than two files gets its payload re-downloaded
    /// on the spot, before the scan continues.
    pub fn scan(
        store: &dyn MapStore,
        client: &dyn FeedClient,
        sink: &dyn ProgressSink,
    ) -> Result<Self, HarvestError> {
        sink.event(ProgressEvent::message("checking for existing maps"));

        let mut entries = HashMap::new();
        for stored in store.scan_entries()? {
            sink.event(ProgressEvent::message(format!(
                "found existing map {}",
                stored.id
            )));
            if stored.file_count < 2 {
                sink.event(ProgressEvent::message(format!(
                    "map {} is missing its payload file",
                    stored.id
                )));
                repair(store, client, &stored.meta_path)?;
            }
            entries.insert(stored.id, stored.meta_path);
        }
        Ok(Self { entries })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn register(&mut self, id: String, meta_path: Utf8PathBuf) {
        self.entries.insert(id, meta_path);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Complete an entry that has metadata but no payload file.
///
/// Idempotent: a no-op once the existence check passes. Never touches corpus
/// membership; the entry is already registered by the scan.
pub fn repair(
    store: &dyn MapStore,
    client: &dyn FeedClient,
    meta_path: &Utf8Path,
) -> Result<bool, HarvestError> {
    let record = store.read_meta(meta_path)?;
    if store.payload_exists(&record)? {
        return Ok(false);
    }
    let mut body = client.fetch_payload(record.download_url()?)?;
    store.write_payload(&record, &mut body)?;
    Ok(true)
}
