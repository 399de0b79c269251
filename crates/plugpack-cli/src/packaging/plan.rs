//! The ordered list of files that go into the archive

use crate::errors::PackageError;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Included binaries and their symbol files in discovery order, manifest last
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackagePlan {
    entries: Vec<PathBuf>,
}

/// A plan entry paired with the name it gets inside the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEntry {
    pub name: String,
    pub path: PathBuf,
}

impl PackagePlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: impl Into<PathBuf>) {
        self.entries.push(path.into());
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Archive entry names are base file names, so they must be unique.
    pub fn entries(&self) -> Result<Vec<PlannedEntry>, PackageError> {
        let mut seen: HashMap<&str, &Path> = HashMap::with_capacity(self.entries.len());
        let mut planned = Vec::with_capacity(self.entries.len());

        for path in &self.entries {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| PackageError::InvalidEntryName(path.clone()))?;

            if let Some(first) = seen.insert(name, path) {
                return Err(PackageError::EntryNameCollision {
                    name: name.to_string(),
                    first: first.to_path_buf(),
                    second: path.clone(),
                });
            }

            planned.push(PlannedEntry {
                name: name.to_string(),
                path: path.clone(),
            });
        }

        Ok(planned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_use_base_names_in_order() {
        let mut plan = PackagePlan::new();
        plan.push("bin/Core.dll");
        plan.push("bin/Core.pdb");
        plan.push("meta/manifest.xml");

        let entries = plan.entries().unwrap_or_default();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Core.dll", "Core.pdb", "manifest.xml"]);
        assert_eq!(entries[2].path, PathBuf::from("meta/manifest.xml"));
    }

    #[test]
    fn test_same_base_name_from_two_dirs_collides() {
        let mut plan = PackagePlan::new();
        plan.push("net48/Core.dll");
        plan.push("net48/Extra.dll");
        plan.push("netstandard/Core.dll");

        match plan.entries() {
            Err(PackageError::EntryNameCollision {
                name,
                first,
                second,
            }) => {
                assert_eq!(name, "Core.dll");
                assert_eq!(first, PathBuf::from("net48/Core.dll"));
                assert_eq!(second, PathBuf::from("netstandard/Core.dll"));
            }
            other => panic!("expected collision, got {:?}", other),
        }
    }

    #[test]
    fn test_path_without_file_name_is_rejected() {
        let mut plan = PackagePlan::new();
        plan.push("..");
        assert!(matches!(
            plan.entries(),
            Err(PackageError::InvalidEntryName(_))
        ));
    }
}
