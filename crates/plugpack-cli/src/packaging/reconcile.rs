//! Reconciliation Engine: decide which build binaries ship with the plugin.
//!
//! Each discovered binary gets exactly one verdict:
//! 1. excluded by name, without looking at the host references;
//! 2. no host reference with that name: included, along with its `.pdb`;
//! 3. host references exist: the binary's own version is read (failure is
//!    fatal) and it ships only if the version differs and strict mode is on.

use super::diagnostics::AssemblyDiagnostic;
use super::plan::PackagePlan;
use crate::errors::PackageError;
use plugpack_assembly::{
    companion_symbol_file, discover_binaries, BinaryCandidate, MetadataReader, ReferenceIndex,
};
use plugpack_logger as logger;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Plan plus one diagnostic per discovered binary
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub plan: PackagePlan,
    pub diagnostics: Vec<AssemblyDiagnostic>,
}

/// Verdict for a single candidate and the files it adds to the plan
#[derive(Debug, Clone)]
pub struct Judgement {
    pub diagnostic: AssemblyDiagnostic,
    pub entries: Vec<PathBuf>,
}

impl Reconciliation {
    fn record(&mut self, judgement: Judgement) {
        for path in judgement.entries {
            self.plan.push(path);
        }
        self.diagnostics.push(judgement.diagnostic);
    }

    /// The manifest always closes the plan
    pub fn append_manifest(&mut self, manifest: &Path) {
        self.plan.push(manifest);
    }
}

pub struct Reconciler<'a, R: MetadataReader + ?Sized> {
    index: &'a ReferenceIndex,
    except: &'a BTreeSet<String>,
    strict: bool,
    reader: &'a R,
}

impl<'a, R: MetadataReader + ?Sized> Reconciler<'a, R> {
    pub fn new(
        index: &'a ReferenceIndex,
        except: &'a BTreeSet<String>,
        strict: bool,
        reader: &'a R,
    ) -> Self {
        Reconciler {
            index,
            except,
            strict,
            reader,
        }
    }

    pub fn judge(&self, candidate: &BinaryCandidate) -> Result<Judgement, PackageError> {
        let name = &candidate.file_name;

        if self.except.contains(name) {
            return Ok(Judgement {
                diagnostic: AssemblyDiagnostic::excluded(name.as_str()),
                entries: Vec::new(),
            });
        }

        let diagnostic = match self.index.versions(name) {
            Some(versions) if !versions.is_empty() => {
                let identity = self.reader.read(&candidate.full_path).map_err(|source| {
                    PackageError::BuildMetadata {
                        file_name: name.clone(),
                        source,
                    }
                })?;
                AssemblyDiagnostic::referenced(
                    name.as_str(),
                    identity.version.to_string(),
                    versions.iter().map(ToString::to_string).collect(),
                    self.index.contains(name, &identity.version),
                    self.strict,
                )
            }
            _ => AssemblyDiagnostic::unreferenced(name.as_str()),
        };

        let mut entries = Vec::new();
        if diagnostic.included {
            entries.push(candidate.full_path.clone());
            match companion_symbol_file(&candidate.full_path) {
                Some(symbols) => entries.push(symbols),
                None => logger::debug(&format!("No symbol file beside {}", name)),
            }
        }

        Ok(Judgement {
            diagnostic,
            entries,
        })
    }

    /// Judge every binary of every build directory, in order, into `acc`.
    ///
    /// On a fatal error `acc` keeps everything judged before it.
    pub fn classify_into<P: AsRef<Path>>(
        &self,
        build_dirs: &[P],
        acc: &mut Reconciliation,
    ) -> Result<(), PackageError> {
        for dir in build_dirs {
            let candidates = discover_binaries(dir.as_ref()).map_err(PackageError::BuildScan)?;
            for candidate in &candidates {
                let judgement = self.judge(candidate)?;
                logger::step(&format!(
                    "{} -> {}",
                    candidate.file_name,
                    judgement.diagnostic.verdict.label()
                ));
                acc.record(judgement);
            }
        }
        Ok(())
    }

    /// Classify all build directories, then append the manifest as the last entry
    pub fn classify<P: AsRef<Path>>(
        &self,
        build_dirs: &[P],
        manifest: &Path,
    ) -> Result<Reconciliation, PackageError> {
        let mut reconciliation = Reconciliation::default();
        self.classify_into(build_dirs, &mut reconciliation)?;
        reconciliation.append_manifest(manifest);
        Ok(reconciliation)
    }
}
