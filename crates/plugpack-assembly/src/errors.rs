use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Structural problems found while decoding a PE image or its CLI metadata
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("unexpected end of data at offset {offset:#x}")]
    Truncated { offset: usize },

    #[error("bad {0} signature")]
    BadSignature(&'static str),

    #[error("unsupported optional header magic {0:#x}")]
    UnsupportedOptionalHeader(u16),

    #[error("no CLI header (native image)")]
    NotManaged,

    #[error("RVA {0:#x} is not backed by any section")]
    UnmappedRva(u32),

    #[error("metadata stream {0} not found")]
    MissingStream(&'static str),

    #[error("no assembly manifest row (module-only image)")]
    NoAssemblyRow,

    #[error("string heap entry at {0:#x} is not valid UTF-8")]
    InvalidString(u32),
}

/// Failure to read an assembly identity from a file
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is not a readable versioned assembly: {source}", path.display())]
    NotAssembly {
        path: PathBuf,
        #[source]
        source: FormatError,
    },
}

impl MetadataError {
    pub fn path(&self) -> &PathBuf {
        match self {
            MetadataError::Io { path, .. } | MetadataError::NotAssembly { path, .. } => path,
        }
    }
}

/// Failure to enumerate a build or reference directory
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {}", .0.display())]
    DirectoryMissing(PathBuf),

    #[error("Failed to read directory {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Binary file name is not valid UTF-8: {}", .0.display())]
    InvalidName(PathBuf),
}

impl ScanError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ScanError::DirectoryMissing(path)
            | ScanError::Walk { path, .. }
            | ScanError::InvalidName(path) => path,
        }
    }
}

/// Version strings that don't parse as `major.minor[.build[.revision]]`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid assembly version '{0}'")]
pub struct VersionParseError(pub String);
