//! Manifest file on disk: load, stamp, save

use crate::errors::ManifestError;
use crate::version_marker;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A manifest document loaded from disk.
///
/// Stamping happens in memory; nothing touches the file until [`save`](Self::save).
#[derive(Debug, Clone)]
pub struct ManifestFile {
    path: PathBuf,
    original: String,
    text: String,
}

impl ManifestFile {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded manifest {:?} ({} bytes)", path, text.len());
        Ok(ManifestFile {
            path: path.to_path_buf(),
            original: text.clone(),
            text,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn current_version(&self) -> Result<&str, ManifestError> {
        version_marker::current_version(&self.text)
    }

    /// Replace the version field. On error the document is left unchanged.
    pub fn stamp(&mut self, version: &str) -> Result<(), ManifestError> {
        self.text = version_marker::set_version(&self.text, version)?;
        Ok(())
    }

    /// True when the in-memory text differs from what was loaded
    pub fn is_modified(&self) -> bool {
        self.text != self.original
    }

    /// Write the document back in place with an atomic temp-file rename.
    ///
    /// Unmodified documents are not rewritten so the file's timestamp survives.
    pub fn save(&mut self) -> Result<bool, ManifestError> {
        if !self.is_modified() {
            debug!("Manifest {:?} unchanged, skipping write", self.path);
            return Ok(false);
        }

        let write_err = |source| ManifestError::Write {
            path: self.path.clone(),
            source,
        };

        let mut temp_name = self.path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);
        {
            let mut file = std::fs::File::create(&temp_path).map_err(write_err)?;
            file.write_all(self.text.as_bytes()).map_err(write_err)?;
            file.flush().map_err(write_err)?;
        }
        std::fs::rename(&temp_path, &self.path).map_err(write_err)?;

        self.original.clone_from(&self.text);
        debug!("Manifest written to {:?}", self.path);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_manifest(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("manifest.xml");
        let _ = std::fs::write(&path, body);
        path
    }

    #[test]
    fn test_stamp_and_save() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let path = write_manifest(
            temp_dir.path(),
            "<PluginManifest>\n  <Version>v1.0</Version>\n</PluginManifest>\n",
        );

        let Ok(mut manifest) = ManifestFile::load(&path) else {
            panic!("manifest should load");
        };
        assert_eq!(manifest.current_version().ok(), Some("v1.0"));
        assert!(manifest.stamp("1.4.0.0").is_ok());
        assert!(manifest.is_modified());
        assert!(manifest.save().is_ok_and(|written| written));
        assert!(!manifest.is_modified());

        let on_disk = std::fs::read_to_string(&path).unwrap_or_default();
        assert_eq!(
            on_disk,
            "<PluginManifest>\n  <Version>1.4.0.0</Version>\n</PluginManifest>\n"
        );
        assert!(!temp_dir.path().join("manifest.xml.tmp").exists());
    }

    #[test]
    fn test_unchanged_manifest_is_not_rewritten() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let path = write_manifest(temp_dir.path(), "<Version>2.0</Version>");
        let Ok(mut manifest) = ManifestFile::load(&path) else {
            panic!("manifest should load");
        };
        assert!(manifest.stamp("2.0").is_ok());
        assert!(manifest.save().is_ok_and(|written| !written));
    }

    #[test]
    fn test_failed_stamp_keeps_text() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let path = write_manifest(temp_dir.path(), "<Name>NoVersion</Name>");
        let Ok(mut manifest) = ManifestFile::load(&path) else {
            panic!("manifest should load");
        };
        assert!(manifest.stamp("1.0").is_err());
        assert_eq!(manifest.text(), "<Name>NoVersion</Name>");
        assert!(!manifest.is_modified());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let path = temp_dir.path().join("absent.xml");
        let err = ManifestFile::load(&path).err();
        assert!(err.is_some_and(|e| e.to_string().contains("absent.xml")));
    }
}
