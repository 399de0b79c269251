//! Plugin manifest handling
//!
//! The manifest is a small text document shipped inside the plugin archive.
//! The host reads its version field to learn which build it is loading, so
//! every packaging run stamps the resolved version into it before archiving.

pub mod errors;
pub mod manifest_file;
pub mod version_marker;

pub use errors::ManifestError;
pub use manifest_file::ManifestFile;
pub use version_marker::{current_version, set_version, VERSION_END, VERSION_START};
