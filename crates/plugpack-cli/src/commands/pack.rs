//! `plugpack pack`: run the packaging pipeline and report

use crate::errors::Stage;
use crate::packaging::{self, sort_for_display, PackFailure, PackRequest, PackSummary};
use clap::{ArgAction, Args};
use colored::Colorize;
use plugpack_assembly::ClrMetadataReader;
use plugpack_config::Config;
use plugpack_logger as logger;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct PackCommand {
    /// Plugin name; also names `{name}.dll` and the archive
    #[arg(short = 'n', long)]
    pub name: String,

    /// Manifest holding the `<Version>` field to stamp
    #[arg(short = 'm', long, value_name = "FILE")]
    pub manifest: PathBuf,

    /// Build output directories, first one provides the version
    #[arg(short = 'b', long = "build-dir", value_name = "DIR", num_args = 1.., required = true)]
    pub build_dirs: Vec<PathBuf>,

    /// Host reference directories (default: config `reference-dirs`)
    #[arg(short = 'r', long = "reference-dir", value_name = "DIR", num_args = 1..)]
    pub reference_dirs: Vec<PathBuf>,

    /// Directories to publish the archive to (default: config `output-dirs`)
    #[arg(short = 'o', long = "output-dir", value_name = "DIR", num_args = 1..)]
    pub output_dirs: Vec<PathBuf>,

    /// Keep plugin binaries whose version differs from the host's (default: true)
    #[arg(short = 's', long = "strict-version", value_name = "BOOL", action = ArgAction::Set)]
    pub strict_version: Option<bool>,

    /// Binary file names never to package (default: config `except`)
    #[arg(short = 'e', long = "except", value_name = "FILE", num_args = 1..)]
    pub except: Vec<String>,

    /// Plan and report without writing the manifest or any archive
    #[arg(long)]
    pub dry_run: bool,

    /// Print the report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

fn or_config(given: Vec<PathBuf>, configured: &[String]) -> Vec<PathBuf> {
    if given.is_empty() {
        configured.iter().map(PathBuf::from).collect()
    } else {
        given
    }
}

impl PackCommand {
    /// Fill anything not given on the command line from the config file
    pub fn into_request(self, config: &Config) -> PackRequest {
        let except = if self.except.is_empty() {
            config.except.iter().cloned().collect()
        } else {
            self.except.into_iter().collect()
        };
        PackRequest {
            name: self.name,
            manifest: self.manifest,
            build_dirs: self.build_dirs,
            reference_dirs: or_config(self.reference_dirs, &config.reference_dirs),
            output_dirs: or_config(self.output_dirs, &config.output_dirs),
            strict: self
                .strict_version
                .unwrap_or_else(|| config.strict_version()),
            except,
            dry_run: self.dry_run,
        }
    }
}

/// One line per diagnostic, in display order
pub fn render_diagnostics(diagnostics: &[packaging::AssemblyDiagnostic]) -> String {
    let mut out = String::new();
    for diagnostic in sort_for_display(diagnostics) {
        out.push_str(&format!("{}\n", diagnostic));
    }
    out
}

pub fn render_summary(summary: &PackSummary) -> String {
    let mut out = render_diagnostics(&summary.diagnostics);
    out.push_str(&format!(
        "{} {} {}\n",
        "Packaged".bold(),
        summary.name,
        summary.version
    ));
    for entry in &summary.entries {
        out.push_str(&format!("  {}\n", entry));
    }
    if let Some(archive) = &summary.archive {
        out.push_str(&format!(
            "{} {} ({} bytes, sha256 {})\n",
            "Archive".bold(),
            archive.file_name,
            archive.size,
            archive.sha256
        ));
    }
    for written in summary.published.written() {
        out.push_str(&format!("  -> {}\n", written.display()));
    }
    out
}

/// Last line of a failed run: the step and, when known, the path
pub fn failure_line(failure: &PackFailure) -> String {
    let stage = failure.error.stage();
    match failure.error.path() {
        Some(path) => format!("{} failed at {}: {}", stage, path.display(), failure.error),
        None => format!("{} failed: {}", stage, failure.error),
    }
}

#[derive(Serialize)]
struct FailureReport<'a> {
    stage: Stage,
    path: Option<String>,
    error: String,
    diagnostics: &'a [packaging::AssemblyDiagnostic],
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => logger::error(&format!("Failed to serialize report: {}", e)),
    }
}

pub fn handle_pack(cmd: PackCommand) -> Result<(), PackFailure> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            logger::warn(&format!("Ignoring unreadable config {}: {}", Config::path().display(), e));
            Config::default()
        }
    };
    let json = cmd.json;
    let request = cmd.into_request(&config);
    logger::debug(&format!(
        "Packaging {} (strict: {}, {} build dirs, {} reference dirs, {} output dirs)",
        request.name,
        request.strict,
        request.build_dirs.len(),
        request.reference_dirs.len(),
        request.output_dirs.len()
    ));
    if request.output_dirs.is_empty() && !request.dry_run {
        logger::warn("No output directories given; the archive will not be published");
    }

    let timestamp = chrono::Local::now().naive_local();
    match packaging::run(&request, &ClrMetadataReader, timestamp) {
        Ok(summary) => {
            if json {
                print_json(&summary);
            } else {
                print!("{}", render_summary(&summary));
            }
            Ok(())
        }
        Err(failure) => {
            if json {
                print_json(&FailureReport {
                    stage: failure.error.stage(),
                    path: failure.error.path().map(|p| p.display().to_string()),
                    error: failure.error.to_string(),
                    diagnostics: &failure.diagnostics,
                });
            } else {
                print!("{}", render_diagnostics(&failure.diagnostics));
            }
            logger::error(&failure_line(&failure));
            Err(failure)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PackageError;
    use crate::packaging::publish::{PublishOutcome, PublishReport};
    use crate::packaging::AssemblyDiagnostic;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        pack: PackCommand,
    }

    fn parse(args: &[&str]) -> Option<PackCommand> {
        let argv = std::iter::once("pack").chain(args.iter().copied());
        Harness::try_parse_from(argv).ok().map(|h| h.pack)
    }

    #[test]
    fn test_flags_parse_with_multiple_values() {
        let Some(cmd) = parse(&[
            "-n", "Acme", "-m", "manifest.xml", "-b", "bin1", "bin2", "-r", "refs", "-s", "false",
            "-e", "Legacy.dll", "Old.dll",
        ]) else {
            panic!("arguments did not parse");
        };
        assert_eq!(cmd.build_dirs, vec![PathBuf::from("bin1"), PathBuf::from("bin2")]);
        assert_eq!(cmd.strict_version, Some(false));
        assert_eq!(cmd.except, vec!["Legacy.dll", "Old.dll"]);
        assert!(cmd.output_dirs.is_empty());
    }

    #[test]
    fn test_build_dir_is_required() {
        assert!(parse(&["-n", "Acme", "-m", "manifest.xml"]).is_none());
    }

    #[test]
    fn test_missing_values_come_from_config() {
        let Some(cmd) = parse(&["-n", "Acme", "-m", "m.xml", "-b", "bin"]) else {
            panic!("arguments did not parse");
        };
        let config = Config {
            reference_dirs: vec!["host".to_string()],
            output_dirs: vec!["dist".to_string()],
            except: vec!["Legacy.dll".to_string()],
            strict_version: Some(false),
        };
        let request = cmd.into_request(&config);
        assert_eq!(request.reference_dirs, vec![PathBuf::from("host")]);
        assert_eq!(request.output_dirs, vec![PathBuf::from("dist")]);
        assert!(request.except.contains("Legacy.dll"));
        assert!(!request.strict);
    }

    #[test]
    fn test_command_line_wins_over_config() {
        let Some(cmd) = parse(&["-n", "A", "-m", "m.xml", "-b", "bin", "-r", "refs", "-s", "true"])
        else {
            panic!("arguments did not parse");
        };
        let config = Config {
            reference_dirs: vec!["host".to_string()],
            strict_version: Some(false),
            ..Config::default()
        };
        let request = cmd.into_request(&config);
        assert_eq!(request.reference_dirs, vec![PathBuf::from("refs")]);
        assert!(request.strict);
    }

    #[test]
    fn test_strict_defaults_to_true() {
        let Some(cmd) = parse(&["-n", "A", "-m", "m.xml", "-b", "bin"]) else {
            panic!("arguments did not parse");
        };
        assert!(cmd.into_request(&Config::default()).strict);
    }

    #[test]
    fn test_failure_report_ends_with_step_and_path() {
        let failure = PackFailure {
            error: PackageError::VersionSourceMissing {
                dir: PathBuf::from("bin"),
                file_name: "Acme.dll".to_string(),
            },
            diagnostics: vec![
                AssemblyDiagnostic::unreferenced("Extra.dll"),
                AssemblyDiagnostic::excluded("Legacy.dll"),
            ],
            skipped_references: Vec::new(),
        };
        let rendered = render_diagnostics(&failure.diagnostics);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines, vec!["x Legacy.dll", "o Extra.dll"]);
        assert_eq!(
            failure_line(&failure),
            "version failed at bin: No Acme.dll in first build directory bin"
        );
    }

    #[test]
    fn test_summary_lists_only_written_archives() {
        let summary = PackSummary {
            name: "Acme".to_string(),
            version: "1.4.0.0".to_string(),
            strict: true,
            dry_run: false,
            diagnostics: vec![AssemblyDiagnostic::unreferenced("Acme.dll")],
            skipped_references: Vec::new(),
            entries: vec!["Acme.dll".to_string()],
            manifest_updated: true,
            archive: None,
            published: PublishReport {
                outcomes: vec![
                    PublishOutcome {
                        dir: PathBuf::from("dist"),
                        removed: vec![PathBuf::from("dist/Acme-1.3.0.0.zip")],
                        written: Some(PathBuf::from("dist/Acme-1.4.0.0.zip")),
                        error: None,
                    },
                    PublishOutcome {
                        dir: PathBuf::from("mirror"),
                        removed: Vec::new(),
                        written: None,
                        error: Some("not a directory".to_string()),
                    },
                ],
            },
        };
        let rendered = render_summary(&summary);
        let targets: Vec<&str> = rendered.lines().filter(|l| l.contains("->")).collect();
        assert_eq!(targets, vec!["  -> dist/Acme-1.4.0.0.zip"]);
    }
}
