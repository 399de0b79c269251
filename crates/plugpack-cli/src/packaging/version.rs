//! Resolve the plugin version from its own binary

use crate::errors::PackageError;
use plugpack_assembly::{discover_binaries, BinaryCandidate, MetadataReader, BINARY_EXTENSION};
use std::path::Path;

/// Find `{name}.dll` among the binaries of `dir`. The stem match is case-sensitive.
pub fn version_source(dir: &Path, name: &str) -> Result<BinaryCandidate, PackageError> {
    let candidates = discover_binaries(dir).map_err(PackageError::BuildScan)?;
    candidates
        .into_iter()
        .find(|c| {
            Path::new(&c.file_name)
                .file_stem()
                .is_some_and(|stem| stem == name)
        })
        .ok_or_else(|| PackageError::VersionSourceMissing {
            dir: dir.to_path_buf(),
            file_name: format!("{}.{}", name, BINARY_EXTENSION),
        })
}

/// Version of the plugin's own binary in the first build directory, as a dotted quad
pub fn resolve_version<R, P>(build_dirs: &[P], name: &str, reader: &R) -> Result<String, PackageError>
where
    R: MetadataReader + ?Sized,
    P: AsRef<Path>,
{
    let first = build_dirs.first().ok_or(PackageError::NoBuildDirectories)?;
    let source = version_source(first.as_ref(), name)?;
    let identity = reader
        .read(&source.full_path)
        .map_err(PackageError::VersionRead)?;
    tracing::debug!(
        "Resolved version {} from {}",
        identity.version,
        source.full_path.display()
    );
    Ok(identity.version.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Stage;
    use plugpack_assembly::fixtures::StaticMetadataReader;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn build_dir(files: &[&str]) -> Option<(TempDir, PathBuf)> {
        let temp = TempDir::new().ok()?;
        let dir = temp.path().join("bin");
        fs::create_dir_all(&dir).ok()?;
        for name in files {
            fs::write(dir.join(name), b"").ok()?;
        }
        Some((temp, dir))
    }

    #[test]
    fn test_version_comes_from_plugin_binary() {
        let Some((_temp, dir)) = build_dir(&["Acme.Plugin.dll", "Core.dll"]) else {
            return;
        };
        let reader = StaticMetadataReader::new()
            .with_file(dir.join("Acme.Plugin.dll"), "Acme.Plugin", "3.1.4")
            .with_file(dir.join("Core.dll"), "Core", "9.0");
        let version = resolve_version(&[&dir], "Acme.Plugin", &reader);
        assert!(version.is_ok_and(|v| v == "3.1.4.0"));
    }

    #[test]
    fn test_only_first_build_directory_is_used() {
        let Some((temp, first)) = build_dir(&["Core.dll"]) else {
            return;
        };
        let second = temp.path().join("bin2");
        let _ = fs::create_dir_all(&second);
        let _ = fs::write(second.join("Acme.dll"), b"");
        let reader = StaticMetadataReader::new().with_file(second.join("Acme.dll"), "Acme", "1.0");

        let result = resolve_version(&[&first, &second], "Acme", &reader);
        let Err(err) = result else {
            panic!("expected a missing version source");
        };
        assert_eq!(err.stage(), Stage::Version);
        assert_eq!(err.path(), Some(first.as_path()));
    }

    #[test]
    fn test_stem_match_is_case_sensitive() {
        let Some((_temp, dir)) = build_dir(&["acme.dll"]) else {
            return;
        };
        let result = version_source(&dir, "Acme");
        assert!(matches!(result, Err(PackageError::VersionSourceMissing { .. })));
    }

    #[test]
    fn test_unreadable_plugin_binary_fails_version_stage() {
        let Some((_temp, dir)) = build_dir(&["Acme.dll"]) else {
            return;
        };
        let result = resolve_version(&[&dir], "Acme", &StaticMetadataReader::new());
        assert!(matches!(result, Err(PackageError::VersionRead(_))));
    }
}
