//! Assembly metadata and host reference indexing
//!
//! This crate answers two questions for the packager:
//! - which binaries live in a directory (`discovery`)
//! - what name and version a binary carries (`reader`), and across all host
//!   reference directories, which versions of each file name already ship
//!   (`reference_index`)
//!
//! The metadata reader walks the PE container and the ECMA-335 tables stream
//! directly; it only decodes the Assembly row.

mod bytes;
pub mod discovery;
pub mod errors;
pub mod identity;
mod pe;
pub mod reader;
pub mod reference_index;
mod tables;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use discovery::{
    companion_symbol_file, discover_binaries, BinaryCandidate, BINARY_EXTENSION, SYMBOL_EXTENSION,
};
pub use errors::{FormatError, MetadataError, ScanError, VersionParseError};
pub use identity::{AssemblyIdentity, AssemblyVersion};
pub use reader::{ClrMetadataReader, MetadataReader};
pub use reference_index::{ReferenceIndex, ReferenceScan, SkippedReference};
