use std::fmt::Display;
use std::fs::{self, File};
use std::io;
use std::path::Path;

use zip::ZipArchive;

use crate::error::HarvestError;

#[derive(Debug, Clone, Copy, Default)]
pub struct ExpandSummary {
    pub extracted: usize,
    pub failed: usize,
}

/// Expand every `.zip` under the per-map subdirectories of `input_dir`, each
/// into a sibling directory named by stripping the extension.
///
/// A malformed archive is logged and skipped; the batch keeps going. Only a
/// failure to enumerate the tree itself aborts.
pub fn expand_tree(input_dir: &Path) -> Result<ExpandSummary, HarvestError> {
    let map_dirs = fs::read_dir(input_dir).map_err(|err| {
        HarvestError::Filesystem(format!("scan {}: {err}", input_dir.display()))
    })?;

    let mut summary = ExpandSummary::default();
    for map_dir in map_dirs {
        let map_dir = map_dir.map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        let dir_path = map_dir.path();
        if !dir_path.is_dir() {
            continue;
        }
        let files =
            fs::read_dir(&dir_path).map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        for file in files {
            let file = file.map_err(|err| HarvestError::Filesystem(err.to_string()))?;
            let path = file.path();
            if !path.is_file() || path.extension().map(|ext| ext != "zip").unwrap_or(true) {
                continue;
            }
            tracing::info!("unzipping file {}", path.display());
            match extract_zip(&path, &path.with_extension("")) {
                Ok(()) => summary.extracted += 1,
                Err(err) => {
                    tracing::error!("bad zip file {}: {err}", path.display());
                    summary.failed += 1;
                }
            }
        }
    }
    Ok(summary)
}

pub fn extract_zip(zip_path: &Path, target_dir: &Path) -> Result<(), HarvestError> {
    let file = File::open(zip_path).map_err(|err| {
        HarvestError::Filesystem(format!("open zip {}: {err}", zip_path.display()))
    })?;
    let mut archive = ZipArchive::new(file).map_err(|err| malformed(zip_path, err))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|err| malformed(zip_path, err))?;
        let entry_path = match entry.enclosed_name() {
            Some(path) => target_dir.join(path),
            None => {
                return Err(malformed(zip_path, "entry path traversal detected"));
            }
        };

        if entry.is_dir() {
            fs::create_dir_all(&entry_path)
                .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
            continue;
        }

        if let Some(parent) = entry_path.parent() {
            fs::create_dir_all(parent).map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        }
        let mut outfile =
            File::create(&entry_path).map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        io::copy(&mut entry, &mut outfile).map_err(|err| malformed(zip_path, err))?;
    }
    Ok(())
}

fn malformed(path: &Path, message: impl Display) -> HarvestError {
    HarvestError::MalformedArchive {
        path: path.display().to_string(),
        message: message.to_string(),
    }
}
