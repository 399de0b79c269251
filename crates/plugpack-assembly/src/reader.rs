//! Metadata Reader: file path in, assembly identity out

use crate::errors::MetadataError;
use crate::identity::AssemblyIdentity;
use crate::{pe, tables};
use std::path::Path;
use tracing::trace;

/// Reads the logical name and version of a binary.
///
/// The packaging engine only depends on this trait, so tests can drive it
/// with an in-memory reader instead of real assemblies.
pub trait MetadataReader {
    fn read(&self, path: &Path) -> Result<AssemblyIdentity, MetadataError>;
}

/// Reads assembly identity straight from the CLI metadata of a PE file
#[derive(Debug, Clone, Copy, Default)]
pub struct ClrMetadataReader;

impl ClrMetadataReader {
    /// Decode an identity from an in-memory image
    pub fn read_bytes(path: &Path, image: &[u8]) -> Result<AssemblyIdentity, MetadataError> {
        let not_assembly = |source| MetadataError::NotAssembly {
            path: path.to_path_buf(),
            source,
        };
        let metadata = pe::cli_metadata(image).map_err(not_assembly)?;
        tables::assembly_identity(metadata).map_err(not_assembly)
    }
}

impl MetadataReader for ClrMetadataReader {
    fn read(&self, path: &Path) -> Result<AssemblyIdentity, MetadataError> {
        let image = std::fs::read(path).map_err(|source| MetadataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let identity = Self::read_bytes(path, &image)?;
        trace!("{:?}: {}", path, identity);
        Ok(identity)
    }
}
