use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while stamping a plugin manifest
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Malformed manifest: no {start}...{end} field found")]
    MarkerMissing {
        start: &'static str,
        end: &'static str,
    },

    #[error("Malformed manifest: {count} {start} fields found, expected exactly one")]
    AmbiguousMarker { start: &'static str, count: usize },

    #[error("Version field pattern failed to compile: {0}")]
    Pattern(String),

    #[error("Invalid version string '{0}': must be non-empty and contain no markup")]
    InvalidVersion(String),

    #[error("Failed to read manifest {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write manifest {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
