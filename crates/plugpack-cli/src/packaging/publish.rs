//! Output Publisher: fan one archive out to every output directory

use super::archive::ArchiveBlob;
use crate::errors::PublishFailure;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const ARCHIVE_EXTENSION: &str = "zip";

pub fn archive_file_name(name: &str, version: &str) -> String {
    format!("{}-{}.{}", name, version, ARCHIVE_EXTENSION)
}

/// What happened in one output directory
#[derive(Debug, Clone, Serialize)]
pub struct PublishOutcome {
    pub dir: PathBuf,
    pub removed: Vec<PathBuf>,
    pub written: Option<PathBuf>,
    pub error: Option<String>,
}

impl PublishOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-directory outcomes in output directory order
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct PublishReport {
    pub outcomes: Vec<PublishOutcome>,
}

impl PublishReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(PublishOutcome::is_success)
    }

    pub fn written(&self) -> impl Iterator<Item = &Path> {
        self.outcomes.iter().filter_map(|o| o.written.as_deref())
    }

    pub fn failures(&self) -> Vec<PublishFailure> {
        self.outcomes
            .iter()
            .filter_map(|o| {
                o.error.as_ref().map(|reason| PublishFailure {
                    dir: o.dir.clone(),
                    reason: reason.clone(),
                })
            })
            .collect()
    }
}

/// Regular files in `dir` whose name starts with `prefix`, sorted by name
fn stale_files(dir: &Path, prefix: &str) -> io::Result<Vec<PathBuf>> {
    let mut stale = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if name.to_str().is_some_and(|n| n.starts_with(prefix)) {
            stale.push(entry.path());
        }
    }
    stale.sort();
    Ok(stale)
}

fn publish_one(blob: &ArchiveBlob, dir: &Path, name: &str, file_name: &str) -> PublishOutcome {
    let mut outcome = PublishOutcome {
        dir: dir.to_path_buf(),
        removed: Vec::new(),
        written: None,
        error: None,
    };

    if !dir.is_dir() {
        outcome.error = Some("Output directory not found".to_string());
        return outcome;
    }

    let stale = match stale_files(dir, name) {
        Ok(stale) => stale,
        Err(e) => {
            outcome.error = Some(format!("Failed to list directory: {}", e));
            return outcome;
        }
    };
    for path in stale {
        if let Err(e) = fs::remove_file(&path) {
            outcome.error = Some(format!("Failed to remove {}: {}", path.display(), e));
            return outcome;
        }
        tracing::debug!("Removed stale archive {}", path.display());
        outcome.removed.push(path);
    }

    let target = dir.join(file_name);
    match fs::write(&target, blob.bytes()) {
        Ok(()) => outcome.written = Some(target),
        Err(e) => outcome.error = Some(format!("Failed to write {}: {}", target.display(), e)),
    }
    outcome
}

/// Write the same archive to every directory. A failing directory never
/// stops the ones after it.
pub fn publish<P: AsRef<Path>>(
    blob: &ArchiveBlob,
    dirs: &[P],
    name: &str,
    version: &str,
) -> PublishReport {
    let file_name = archive_file_name(name, version);
    let outcomes = dirs
        .iter()
        .map(|dir| {
            let outcome = publish_one(blob, dir.as_ref(), name, &file_name);
            if let Some(error) = &outcome.error {
                tracing::warn!("Publishing to {} failed: {}", dir.as_ref().display(), error);
            }
            outcome
        })
        .collect();
    PublishReport { outcomes }
}
