//! `plugpack inspect`: print the assembly identity of binaries

use anyhow::{bail, Result};
use plugpack_assembly::{AssemblyIdentity, ClrMetadataReader, MetadataReader};
use plugpack_logger as logger;
use std::path::PathBuf;

/// `name version` per readable file; unreadable files are reported and skipped
pub fn inspect_files<R: MetadataReader + ?Sized>(
    files: &[PathBuf],
    reader: &R,
) -> (Vec<AssemblyIdentity>, usize) {
    let mut identities = Vec::with_capacity(files.len());
    let mut failed = 0;
    for file in files {
        match reader.read(file) {
            Ok(identity) => identities.push(identity),
            Err(e) => {
                logger::error(&e.to_string());
                failed += 1;
            }
        }
    }
    (identities, failed)
}

pub fn handle_inspect(files: &[PathBuf], json: bool) -> Result<()> {
    let (identities, failed) = inspect_files(files, &ClrMetadataReader);

    if json {
        println!("{}", serde_json::to_string_pretty(&identities)?);
    } else {
        for identity in &identities {
            println!("{}", identity);
        }
    }

    if failed > 0 {
        bail!("{} of {} files could not be read", failed, files.len());
    }
    Ok(())
}
