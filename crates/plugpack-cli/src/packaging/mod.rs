//! The packaging engine: reconcile, version, archive, publish

pub mod archive;
pub mod diagnostics;
pub mod pipeline;
pub mod plan;
pub mod publish;
pub mod reconcile;
pub mod version;

pub use diagnostics::{sort_for_display, AssemblyDiagnostic, Verdict};
pub use pipeline::{run, PackFailure, PackRequest, PackSummary};
