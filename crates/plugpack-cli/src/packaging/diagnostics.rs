//! Per-binary verdicts and their display

use serde::Serialize;
use std::fmt;

/// Why a build binary was or wasn't packaged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    /// Named in the exclusion list; the reference index was not consulted
    Excluded,
    /// No host reference carries this file name
    Unreferenced,
    /// The host already ships this exact version
    Matched,
    /// The host ships other versions; strict mode keeps the plugin's copy
    Overridden,
    /// The host ships other versions; non-strict mode defers to the host
    Deferred,
}

impl Verdict {
    pub fn is_included(self) -> bool {
        matches!(self, Verdict::Unreferenced | Verdict::Overridden)
    }

    pub fn label(self) -> &'static str {
        match self {
            Verdict::Excluded => "excluded by name",
            Verdict::Unreferenced => "no host reference",
            Verdict::Matched => "host ships the same version",
            Verdict::Overridden => "plugin version kept over host",
            Verdict::Deferred => "host version preferred",
        }
    }
}

/// One verdict per build binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyDiagnostic {
    pub name: String,
    pub verdict: Verdict,
    pub included: bool,
    pub reference_existed: bool,
    pub version_match: bool,
    /// Build binary version, empty when it was not read
    pub version: String,
    /// Every version the host references carry for this name
    pub reference_versions: Vec<String>,
}

impl AssemblyDiagnostic {
    pub fn excluded(name: impl Into<String>) -> Self {
        Self::new(name, Verdict::Excluded, String::new(), Vec::new())
    }

    pub fn unreferenced(name: impl Into<String>) -> Self {
        Self::new(name, Verdict::Unreferenced, String::new(), Vec::new())
    }

    /// A binary that shares its name with host references.
    ///
    /// `version_match` is true when one of those references carries the
    /// binary's exact version.
    pub fn referenced(
        name: impl Into<String>,
        version: String,
        reference_versions: Vec<String>,
        version_match: bool,
        strict: bool,
    ) -> Self {
        let verdict = if version_match {
            Verdict::Matched
        } else if strict {
            Verdict::Overridden
        } else {
            Verdict::Deferred
        };
        Self::new(name, verdict, version, reference_versions)
    }

    fn new(
        name: impl Into<String>,
        verdict: Verdict,
        version: String,
        reference_versions: Vec<String>,
    ) -> Self {
        AssemblyDiagnostic {
            name: name.into(),
            verdict,
            included: verdict.is_included(),
            reference_existed: matches!(
                verdict,
                Verdict::Matched | Verdict::Overridden | Verdict::Deferred
            ),
            version_match: verdict == Verdict::Matched,
            version,
            reference_versions,
        }
    }

    /// Reference versions joined for display
    pub fn reference_version(&self) -> String {
        self.reference_versions.join(", ")
    }
}

impl fmt::Display for AssemblyDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.included {
            return write!(f, "x {}", self.name);
        }
        if self.version.is_empty() {
            return write!(f, "o {}", self.name);
        }
        if !self.reference_existed || self.version_match {
            return write!(f, "o {} ({})", self.name, self.version);
        }
        write!(
            f,
            "o {} ({} -> {})",
            self.name,
            self.reference_version(),
            self.version
        )
    }
}

/// Display order: not included, then included with a version match, then
/// included without one. Relative order inside each group is preserved.
pub fn sort_for_display(diagnostics: &[AssemblyDiagnostic]) -> Vec<&AssemblyDiagnostic> {
    let excluded = diagnostics.iter().filter(|d| !d.included);
    let matched = diagnostics.iter().filter(|d| d.included && d.version_match);
    let mismatched = diagnostics.iter().filter(|d| d.included && !d.version_match);
    excluded.chain(matched).chain(mismatched).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(versions: &[&str]) -> Vec<String> {
        versions.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_excluded_has_no_reference_fields() {
        let d = AssemblyDiagnostic::excluded("Legacy.dll");
        assert!(!d.included);
        assert!(!d.reference_existed);
        assert!(!d.version_match);
        assert!(d.version.is_empty());
        assert!(d.reference_versions.is_empty());
        assert_eq!(d.to_string(), "x Legacy.dll");
    }

    #[test]
    fn test_unreferenced_is_always_included() {
        let d = AssemblyDiagnostic::unreferenced("Extra.dll");
        assert!(d.included);
        assert!(!d.reference_existed);
        assert_eq!(d.to_string(), "o Extra.dll");
    }

    #[test]
    fn test_matching_version_is_never_included() {
        for strict in [true, false] {
            let d = AssemblyDiagnostic::referenced(
                "Core.dll",
                "1.0.0.0".to_string(),
                refs(&["1.0.0.0", "2.0.0.0"]),
                true,
                strict,
            );
            assert_eq!(d.verdict, Verdict::Matched);
            assert!(!d.included);
            assert!(d.version_match);
        }
    }

    #[test]
    fn test_mismatch_follows_strict_flag() {
        let strict = AssemblyDiagnostic::referenced(
            "Core.dll",
            "1.0.0.0".to_string(),
            refs(&["2.0.0.0"]),
            false,
            true,
        );
        assert!(strict.included);
        assert!(strict.reference_existed);
        assert!(!strict.version_match);
        assert_eq!(strict.to_string(), "o Core.dll (2.0.0.0 -> 1.0.0.0)");

        let lenient = AssemblyDiagnostic::referenced(
            "Core.dll",
            "1.0.0.0".to_string(),
            refs(&["2.0.0.0"]),
            false,
            false,
        );
        assert_eq!(lenient.verdict, Verdict::Deferred);
        assert!(!lenient.included);
        assert_eq!(lenient.to_string(), "x Core.dll");
    }

    #[test]
    fn test_reference_version_lists_all_host_versions() {
        let d = AssemblyDiagnostic::referenced(
            "Core.dll",
            "3.0.0.0".to_string(),
            refs(&["1.0.0.0", "2.0.0.0"]),
            false,
            true,
        );
        assert_eq!(d.reference_version(), "1.0.0.0, 2.0.0.0");
        assert_ne!(d.reference_version(), d.version);
    }

    #[test]
    fn test_display_order_is_stable_partition() {
        let mut matched_but_included = AssemblyDiagnostic::unreferenced("B.dll");
        matched_but_included.version_match = true;
        let diagnostics = vec![
            AssemblyDiagnostic::unreferenced("A.dll"),
            AssemblyDiagnostic::excluded("Z.dll"),
            matched_but_included,
            AssemblyDiagnostic::unreferenced("C.dll"),
            AssemblyDiagnostic::excluded("Y.dll"),
        ];
        let order: Vec<&str> = sort_for_display(&diagnostics)
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(order, vec!["Z.dll", "Y.dll", "B.dll", "A.dll", "C.dll"]);
    }
}
