use anyhow::{Context as _, Result, ensure};
use fs_err::File;
use sealzip_protocol::Password;
use sealzip_sdk::archive::read_single_entry;
use std::path::Path;
use tracing::info;

use crate::counters::pretty_size;

pub fn verify(
    password: &Password,
    archive: &Path,
    entry: Option<&str>,
    expect: Option<&Path>,
) -> Result<()> {
    let found = read_single_entry(File::open(archive)?, password)
        .with_context(|| format!("failed to verify {archive:?}"))?;
    if let Some(entry) = entry {
        ensure!(
            found.name == entry,
            "entry name mismatch; actual {:?}, expected {entry:?}",
            found.name,
        );
    }
    if let Some(expect) = expect {
        let expected = fs_err::read(expect)?;
        ensure!(
            found.content == expected,
            "content of {:?} doesn't match {expect:?}",
            found.name,
        );
    }
    let size: u64 = found.content.len().try_into()?;
    info!(
        "{archive:?} is valid: entry {:?}, {} ({size} bytes)",
        found.name,
        pretty_size(size),
    );
    Ok(())
}
