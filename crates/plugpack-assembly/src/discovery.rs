//! Non-recursive discovery of binaries inside build and reference directories

use crate::errors::ScanError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extension of the binaries considered for packaging
pub const BINARY_EXTENSION: &str = "dll";

/// Extension of the debug-symbol file that may sit beside a binary
pub const SYMBOL_EXTENSION: &str = "pdb";

/// One binary found directly inside a scanned directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BinaryCandidate {
    /// Base file name, the case-sensitive identity key
    pub file_name: String,
    pub full_path: PathBuf,
}

fn has_binary_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(BINARY_EXTENSION))
}

/// Binaries directly inside a directory, plus those whose name is not UTF-8
#[derive(Debug, Clone, Default)]
pub struct BinaryListing {
    pub candidates: Vec<BinaryCandidate>,
    pub unnamed: Vec<PathBuf>,
}

/// List every binary directly inside `dir`, ordered by file name.
///
/// A binary whose name can't be used as an identity key is an error.
pub fn discover_binaries(dir: &Path) -> Result<Vec<BinaryCandidate>, ScanError> {
    let listing = list_binaries(dir)?;
    match listing.unnamed.into_iter().next() {
        Some(path) => Err(ScanError::InvalidName(path)),
        None => Ok(listing.candidates),
    }
}

/// Like [`discover_binaries`], but hands back unusable names instead of failing
pub fn list_binaries(dir: &Path) -> Result<BinaryListing, ScanError> {
    if !dir.is_dir() {
        return Err(ScanError::DirectoryMissing(dir.to_path_buf()));
    }

    let mut listing = BinaryListing::default();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| ScanError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() || !has_binary_extension(path) {
            continue;
        }

        match entry.file_name().to_str() {
            Some(file_name) => listing.candidates.push(BinaryCandidate {
                file_name: file_name.to_string(),
                full_path: path.to_path_buf(),
            }),
            None => listing.unnamed.push(path.to_path_buf()),
        }
    }

    Ok(listing)
}

/// Debug-symbol file beside `binary` (same stem, `.pdb`), if it exists
pub fn companion_symbol_file(binary: &Path) -> Option<PathBuf> {
    let candidate = binary.with_extension(SYMBOL_EXTENSION);
    candidate.is_file().then_some(candidate)
}
