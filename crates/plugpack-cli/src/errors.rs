//! Error types for a packaging run
//!
//! Every failure that stops a run is a `PackageError`. Each variant belongs
//! to one pipeline stage so the final report can name the step that failed
//! together with the offending path.

use plugpack_assembly::{MetadataError, ScanError};
use plugpack_manifest::ManifestError;
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Pipeline stage a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Setup,
    ReferenceIndex,
    Reconcile,
    Version,
    Manifest,
    Archive,
    Publish,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Setup => "setup",
            Stage::ReferenceIndex => "reference index",
            Stage::Reconcile => "reconcile",
            Stage::Version => "version",
            Stage::Manifest => "manifest",
            Stage::Archive => "archive",
            Stage::Publish => "publish",
        };
        f.write_str(name)
    }
}

/// One output directory that could not be published to
#[derive(Debug, Clone, Serialize)]
pub struct PublishFailure {
    pub dir: PathBuf,
    pub reason: String,
}

fn describe_failures(failures: &[PublishFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.dir.display(), f.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("Plugin name must not be empty")]
    EmptyName,

    #[error("At least one build directory is required")]
    NoBuildDirectories,

    #[error("At least one reference directory is required")]
    NoReferenceDirectories,

    #[error("Reference directory scan failed: {0}")]
    ReferenceScan(#[source] ScanError),

    #[error("Build directory scan failed: {0}")]
    BuildScan(#[source] ScanError),

    #[error("Cannot compare {file_name} against host references: {source}")]
    BuildMetadata {
        file_name: String,
        #[source]
        source: MetadataError,
    },

    #[error("No {file_name} in first build directory {}", dir.display())]
    VersionSourceMissing { dir: PathBuf, file_name: String },

    #[error("Failed to resolve plugin version: {0}")]
    VersionRead(#[source] MetadataError),

    #[error("Manifest {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },

    #[error("Archive entry name collision: '{name}' comes from both {} and {}", first.display(), second.display())]
    EntryNameCollision {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Archive entry has no usable file name: {}", .0.display())]
    InvalidEntryName(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    EntryRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to build archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Failed to publish to {}", describe_failures(.0))]
    Publish(Vec<PublishFailure>),
}

impl PackageError {
    pub fn stage(&self) -> Stage {
        match self {
            PackageError::EmptyName
            | PackageError::NoBuildDirectories
            | PackageError::NoReferenceDirectories => Stage::Setup,
            PackageError::ReferenceScan(_) => Stage::ReferenceIndex,
            PackageError::BuildScan(_) | PackageError::BuildMetadata { .. } => Stage::Reconcile,
            PackageError::VersionSourceMissing { .. } | PackageError::VersionRead(_) => {
                Stage::Version
            }
            PackageError::Manifest { .. } => Stage::Manifest,
            PackageError::EntryNameCollision { .. }
            | PackageError::InvalidEntryName(_)
            | PackageError::EntryRead { .. }
            | PackageError::Archive(_) => Stage::Archive,
            PackageError::Publish(_) => Stage::Publish,
        }
    }

    /// The path the failure is about, when there is a single one
    pub fn path(&self) -> Option<&Path> {
        match self {
            PackageError::ReferenceScan(e) | PackageError::BuildScan(e) => Some(e.path().as_path()),
            PackageError::BuildMetadata { source, .. } | PackageError::VersionRead(source) => {
                Some(source.path().as_path())
            }
            PackageError::VersionSourceMissing { dir, .. } => Some(dir.as_path()),
            PackageError::Manifest { path, .. }
            | PackageError::EntryRead { path, .. }
            | PackageError::InvalidEntryName(path) => Some(path.as_path()),
            PackageError::EntryNameCollision { second, .. } => Some(second.as_path()),
            PackageError::Publish(failures) if failures.len() == 1 => {
                Some(failures[0].dir.as_path())
            }
            _ => None,
        }
    }
}
