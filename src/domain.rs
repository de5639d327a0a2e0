use serde::{Deserialize, Serialize};

use crate::error::HarvestError;

/// One entry of the `/maps/latest` feed.
///
/// Only the fields the harvester acts on are typed. Everything else the feed
/// returns rides along in `extra`, so a persisted `meta.json` is a complete
/// copy of the record as served.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapRecord {
    pub id: String,
    #[serde(rename = "lastPublishedAt")]
    pub last_published_at: String,
    #[serde(default)]
    pub versions: Vec<MapVersion>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapVersion {
    #[serde(rename = "downloadURL")]
    pub download_url: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MapRecord {
    /// The first version descriptor's download URL is authoritative.
    pub fn download_url(&self) -> Result<&str, HarvestError> {
        self.versions
            .first()
            .map(|version| version.download_url.as_str())
            .ok_or_else(|| HarvestError::MissingVersion(self.id.clone()))
    }

    /// Name of the payload file: the final path segment of the download URL.
    pub fn payload_file_name(&self) -> Result<&str, HarvestError> {
        let url = self.download_url()?;
        Ok(url.rsplit('/').next().unwrap_or(url))
    }
}

/// One batch of records from a single feed request. An empty `docs` list
/// means the feed is exhausted up to the point already walked.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub docs: Vec<MapRecord>,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}
