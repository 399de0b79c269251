//! Archive Builder: pack the plan into one in-memory zip
//!
//! The archive is built once per run and handed to every output directory
//! by reference, so all published copies are byte-identical.

use super::plan::PlannedEntry;
use crate::errors::PackageError;
use chrono::{Datelike, NaiveDateTime, Timelike};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// One file to store, under its base name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ArchiveEntry {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        ArchiveEntry {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn read(entry: &PlannedEntry) -> Result<Self, PackageError> {
        let bytes = fs::read(&entry.path).map_err(|source| PackageError::EntryRead {
            path: entry.path.clone(),
            source,
        })?;
        Ok(Self::new(entry.name.as_str(), bytes))
    }
}

/// The finished archive; immutable once built
#[derive(Debug, Clone)]
pub struct ArchiveBlob {
    bytes: Vec<u8>,
    sha256: String,
}

impl ArchiveBlob {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lowercase hex SHA-256 of the archive bytes
    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Zip timestamps cover 1980 through 2107; anything else falls back to the epoch.
fn zip_timestamp(timestamp: &NaiveDateTime) -> zip::DateTime {
    zip::DateTime::from_date_and_time(
        timestamp.year() as u16,
        timestamp.month() as u8,
        timestamp.day() as u8,
        timestamp.hour() as u8,
        timestamp.minute() as u8,
        timestamp.second() as u8,
    )
    .unwrap_or_default()
}

/// Write `entries` in order, deflated, every entry stamped with `timestamp`.
pub fn build_archive(
    entries: &[ArchiveEntry],
    timestamp: NaiveDateTime,
) -> Result<ArchiveBlob, PackageError> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip_timestamp(&timestamp))
        .large_file(false);

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for entry in entries {
        writer.start_file(entry.name.as_str(), options)?;
        writer
            .write_all(&entry.bytes)
            .map_err(zip::result::ZipError::Io)?;
        tracing::debug!("Stored {} ({} bytes)", entry.name, entry.bytes.len());
    }
    let bytes = writer.finish()?.into_inner();

    let sha256 = hex::encode(Sha256::digest(&bytes));
    Ok(ArchiveBlob { bytes, sha256 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Read;
    use zip::ZipArchive;

    fn fixed_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 17)
            .and_then(|d| d.and_hms_opt(10, 30, 0))
            .unwrap_or_default()
    }

    fn sample_entries() -> Vec<ArchiveEntry> {
        vec![
            ArchiveEntry::new("Core.dll", vec![0x4d, 0x5a, 0x90, 0x00]),
            ArchiveEntry::new("Core.pdb", b"symbols".to_vec()),
            ArchiveEntry::new("manifest.xml", "<Version>1.0.0.0</Version>"),
        ]
    }

    #[test]
    fn test_entries_round_trip_in_plan_order() {
        let entries = sample_entries();
        let Ok(blob) = build_archive(&entries, fixed_time()) else {
            panic!("archive build failed");
        };
        let Ok(mut archive) = ZipArchive::new(Cursor::new(blob.bytes().to_vec())) else {
            panic!("archive did not reopen");
        };
        assert_eq!(archive.len(), entries.len());

        for (i, expected) in entries.iter().enumerate() {
            let Ok(mut file) = archive.by_index(i) else {
                panic!("missing entry {}", i);
            };
            assert_eq!(file.name(), expected.name);
            assert_eq!(file.compression(), CompressionMethod::Deflated);
            let mut content = Vec::new();
            assert!(file.read_to_end(&mut content).is_ok());
            assert_eq!(content, expected.bytes);
        }
        let names: Vec<&str> = archive.file_names().collect();
        assert_eq!(names, vec!["Core.dll", "Core.pdb", "manifest.xml"]);
    }

    #[test]
    fn test_fixed_timestamp_gives_identical_bytes() {
        let entries = sample_entries();
        let first = build_archive(&entries, fixed_time());
        let second = build_archive(&entries, fixed_time());
        let (Ok(first), Ok(second)) = (first, second) else {
            panic!("archive build failed");
        };
        assert_eq!(first.bytes(), second.bytes());
        assert_eq!(first.sha256(), second.sha256());
        assert_eq!(first.sha256().len(), 64);
    }

    #[test]
    fn test_entries_carry_timestamp() {
        let Ok(blob) = build_archive(&sample_entries(), fixed_time()) else {
            panic!("archive build failed");
        };
        let Ok(mut archive) = ZipArchive::new(Cursor::new(blob.bytes().to_vec())) else {
            panic!("archive did not reopen");
        };
        let Ok(file) = archive.by_index(0) else {
            panic!("missing entry");
        };
        let Some(modified) = file.last_modified() else {
            panic!("entry has no timestamp");
        };
        assert_eq!(
            (modified.year(), modified.month(), modified.day()),
            (2024, 5, 17)
        );
        assert_eq!((modified.hour(), modified.minute()), (10, 30));
    }

    #[test]
    fn test_out_of_range_timestamp_falls_back() {
        let ancient = NaiveDate::from_ymd_opt(1970, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        assert_eq!(zip_timestamp(&ancient), zip::DateTime::default());
        assert!(build_archive(&sample_entries(), ancient).is_ok());
    }

    #[test]
    fn test_empty_archive_is_still_valid() {
        let Ok(blob) = build_archive(&[], fixed_time()) else {
            panic!("archive build failed");
        };
        assert!(!blob.is_empty());
        let archive = ZipArchive::new(Cursor::new(blob.bytes().to_vec()));
        assert!(archive.is_ok_and(|a| a.is_empty()));
    }
}
