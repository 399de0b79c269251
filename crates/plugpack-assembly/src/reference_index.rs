//! Reference Index: binary file name -> every version the host ships

use crate::discovery::{list_binaries, BinaryCandidate};
use crate::errors::{MetadataError, ScanError};
use crate::identity::AssemblyVersion;
use crate::reader::MetadataReader;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Outcome of scanning one reference binary
#[derive(Debug)]
pub enum ReferenceScan {
    Indexed {
        file_name: String,
        version: AssemblyVersion,
    },
    /// Unreadable or unversioned binary; never fatal
    Skipped { path: PathBuf, error: MetadataError },
}

impl ReferenceScan {
    pub fn of<R: MetadataReader + ?Sized>(candidate: &BinaryCandidate, reader: &R) -> Self {
        match reader.read(&candidate.full_path) {
            Ok(identity) => ReferenceScan::Indexed {
                file_name: candidate.file_name.clone(),
                version: identity.version,
            },
            Err(error) => ReferenceScan::Skipped {
                path: candidate.full_path.clone(),
                error,
            },
        }
    }
}

/// A reference binary left out of the index, kept for reporting
#[derive(Debug, Clone, Serialize)]
pub struct SkippedReference {
    pub path: PathBuf,
    pub reason: String,
}

/// Multi-map from file name to the set of versions found across all
/// reference directories. A name is only ever present with at least one
/// version.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    entries: BTreeMap<String, BTreeSet<AssemblyVersion>>,
    skipped: Vec<SkippedReference>,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan every reference directory in order and index what can be read.
    ///
    /// A missing directory is fatal; an unreadable binary is only recorded.
    pub fn build<R, P>(dirs: &[P], reader: &R) -> Result<Self, ScanError>
    where
        R: MetadataReader + ?Sized,
        P: AsRef<Path>,
    {
        let mut index = ReferenceIndex::new();
        for dir in dirs {
            let dir = dir.as_ref();
            let listing = list_binaries(dir)?;
            debug!("Reference dir {:?}: {} binaries", dir, listing.candidates.len());
            for candidate in &listing.candidates {
                index.apply(ReferenceScan::of(candidate, reader));
            }
            for path in listing.unnamed {
                warn!("Skipping reference binary with non UTF-8 name: {:?}", path);
                index.skipped.push(SkippedReference {
                    path,
                    reason: "file name is not valid UTF-8".to_string(),
                });
            }
        }
        Ok(index)
    }

    /// Fold one scan outcome into the index
    pub fn apply(&mut self, scan: ReferenceScan) {
        match scan {
            ReferenceScan::Indexed { file_name, version } => {
                self.insert(file_name, version);
            }
            ReferenceScan::Skipped { path, error } => {
                warn!("Skipping reference binary: {}", error);
                self.skipped.push(SkippedReference {
                    path,
                    reason: error.to_string(),
                });
            }
        }
    }

    /// Add a (name, version) pair; returns false if it was already present
    pub fn insert(&mut self, file_name: impl Into<String>, version: AssemblyVersion) -> bool {
        self.entries
            .entry(file_name.into())
            .or_default()
            .insert(version)
    }

    pub fn versions(&self, file_name: &str) -> Option<&BTreeSet<AssemblyVersion>> {
        self.entries.get(file_name)
    }

    pub fn contains(&self, file_name: &str, version: &AssemblyVersion) -> bool {
        self.entries
            .get(file_name)
            .is_some_and(|versions| versions.contains(version))
    }

    /// Number of distinct file names
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn skipped(&self) -> &[SkippedReference] {
        &self.skipped
    }
}
