//! One packaging run, start to finish
//!
//! validate -> reference index -> reconcile -> resolve version -> stamp
//! manifest -> build archive once -> publish to every output directory.
//! Any fatal error stops the run; the diagnostics gathered up to that point
//! travel with the error so they can still be reported.

use super::archive::{build_archive, ArchiveEntry};
use super::diagnostics::AssemblyDiagnostic;
use super::publish::{archive_file_name, publish, PublishReport};
use super::reconcile::{Reconciler, Reconciliation};
use super::version::resolve_version;
use crate::errors::PackageError;
use chrono::NaiveDateTime;
use plugpack_assembly::{MetadataReader, ReferenceIndex, ScanError, SkippedReference};
use plugpack_logger as logger;
use plugpack_manifest::ManifestFile;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Inputs of a packaging run
#[derive(Debug, Clone)]
pub struct PackRequest {
    pub name: String,
    pub manifest: PathBuf,
    pub build_dirs: Vec<PathBuf>,
    pub reference_dirs: Vec<PathBuf>,
    pub output_dirs: Vec<PathBuf>,
    pub strict: bool,
    pub except: BTreeSet<String>,
    /// Stop after planning; nothing is written
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveSummary {
    pub file_name: String,
    pub size: usize,
    pub sha256: String,
}

/// Everything a finished run reports
#[derive(Debug, Clone, Serialize)]
pub struct PackSummary {
    pub name: String,
    pub version: String,
    pub strict: bool,
    pub dry_run: bool,
    pub diagnostics: Vec<AssemblyDiagnostic>,
    pub skipped_references: Vec<SkippedReference>,
    /// Archive entry names in plan order
    pub entries: Vec<String>,
    pub manifest_updated: bool,
    pub archive: Option<ArchiveSummary>,
    pub published: PublishReport,
}

/// A fatal error plus what was learned before it
#[derive(Debug)]
pub struct PackFailure {
    pub error: PackageError,
    pub diagnostics: Vec<AssemblyDiagnostic>,
    pub skipped_references: Vec<SkippedReference>,
}

impl fmt::Display for PackFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for PackFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<PackageError> for PackFailure {
    fn from(error: PackageError) -> Self {
        PackFailure {
            error,
            diagnostics: Vec::new(),
            skipped_references: Vec::new(),
        }
    }
}

fn require_dirs(dirs: &[PathBuf], wrap: fn(ScanError) -> PackageError) -> Result<(), PackageError> {
    match dirs.iter().find(|d| !d.is_dir()) {
        Some(missing) => Err(wrap(ScanError::DirectoryMissing(missing.clone()))),
        None => Ok(()),
    }
}

fn validate(request: &PackRequest) -> Result<(), PackageError> {
    if request.name.trim().is_empty() {
        return Err(PackageError::EmptyName);
    }
    if request.build_dirs.is_empty() {
        return Err(PackageError::NoBuildDirectories);
    }
    if request.reference_dirs.is_empty() {
        return Err(PackageError::NoReferenceDirectories);
    }
    require_dirs(&request.build_dirs, PackageError::BuildScan)?;
    require_dirs(&request.reference_dirs, PackageError::ReferenceScan)?;
    Ok(())
}

fn manifest_error(path: &Path) -> impl FnOnce(plugpack_manifest::ManifestError) -> PackageError + '_ {
    move |source| PackageError::Manifest {
        path: path.to_path_buf(),
        source,
    }
}

/// Run the whole pipeline. `timestamp` stamps every archive entry.
pub fn run<R: MetadataReader + ?Sized>(
    request: &PackRequest,
    reader: &R,
    timestamp: NaiveDateTime,
) -> Result<PackSummary, PackFailure> {
    validate(request)?;

    logger::step("Indexing reference directories");
    let index = ReferenceIndex::build(&request.reference_dirs, reader)
        .map_err(PackageError::ReferenceScan)?;
    for skipped in index.skipped() {
        logger::warn(&format!(
            "Skipping reference {}: {}",
            skipped.path.display(),
            skipped.reason
        ));
    }
    logger::debug(&format!("Reference index holds {} file names", index.len()));
    let skipped_references = index.skipped().to_vec();

    let mut reconciliation = Reconciliation::default();
    let reconciler = Reconciler::new(&index, &request.except, request.strict, reader);
    if let Err(error) = reconciler.classify_into(&request.build_dirs, &mut reconciliation) {
        return Err(PackFailure {
            error,
            diagnostics: reconciliation.diagnostics,
            skipped_references,
        });
    }
    reconciliation.append_manifest(&request.manifest);

    let Reconciliation { plan, diagnostics } = reconciliation;
    let fail = |error: PackageError| PackFailure {
        error,
        diagnostics: diagnostics.clone(),
        skipped_references: skipped_references.clone(),
    };

    let version = resolve_version(&request.build_dirs, &request.name, reader).map_err(fail)?;
    logger::step(&format!("Resolved version {}", version));

    let mut manifest = ManifestFile::load(&request.manifest)
        .map_err(manifest_error(&request.manifest))
        .map_err(fail)?;
    if let Ok(previous) = manifest.current_version() {
        logger::debug(&format!("Manifest version {} -> {}", previous, version));
    }
    manifest
        .stamp(&version)
        .map_err(manifest_error(&request.manifest))
        .map_err(fail)?;

    let planned = plan.entries().map_err(fail)?;
    let entries: Vec<String> = planned.iter().map(|e| e.name.clone()).collect();

    let mut summary = PackSummary {
        name: request.name.clone(),
        version: version.clone(),
        strict: request.strict,
        dry_run: request.dry_run,
        diagnostics: diagnostics.clone(),
        skipped_references: skipped_references.clone(),
        entries,
        manifest_updated: false,
        archive: None,
        published: PublishReport::default(),
    };

    if request.dry_run {
        logger::info("Dry run: manifest, archive and outputs left untouched");
        return Ok(summary);
    }

    summary.manifest_updated = manifest
        .save()
        .map_err(manifest_error(&request.manifest))
        .map_err(fail)?;

    // The manifest entry is the stamped text, whatever sits on disk
    let mut contents = Vec::with_capacity(planned.len());
    for entry in &planned {
        if entry.path == request.manifest {
            contents.push(ArchiveEntry::new(entry.name.as_str(), manifest.text()));
        } else {
            contents.push(ArchiveEntry::read(entry).map_err(fail)?);
        }
    }

    let file_name = archive_file_name(&request.name, &version);
    logger::spinner_start(&format!("Building {}", file_name));
    let blob = match build_archive(&contents, timestamp) {
        Ok(blob) => {
            logger::spinner_stop();
            blob
        }
        Err(error) => {
            logger::spinner_error(&format!("Failed to build {}", file_name));
            return Err(fail(error));
        }
    };
    summary.archive = Some(ArchiveSummary {
        file_name,
        size: blob.len(),
        sha256: blob.sha256().to_string(),
    });

    let report = publish(&blob, &request.output_dirs, &request.name, &version);
    if !report.is_success() {
        return Err(fail(PackageError::Publish(report.failures())));
    }
    summary.published = report;

    Ok(summary)
}
