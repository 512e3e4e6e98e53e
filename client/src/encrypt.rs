use crate::Ctx;
use anyhow::{Context as _, Result, bail};
use fs_err::create_dir_all;
use futures::future::join_all;
use sealzip_protocol::{WorkItem, ZIP_FILENAME_ATTRIBUTE};
use sealzip_sdk::ArchiveResult;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, atomic::Ordering};
use tempfile::NamedTempFile;
use tokio::{sync::Semaphore, task};
use tracing::{error, info, warn};

pub async fn encrypt(
    ctx: &Arc<Ctx>,
    inputs: &[PathBuf],
    out_dir: &Path,
    failure_dir: Option<&Path>,
) -> Result<()> {
    create_dir_all(out_dir)?;
    if let Some(failure_dir) = failure_dir {
        create_dir_all(failure_dir)?;
    }

    let items = inputs
        .iter()
        .map(|input| (input, WorkItem::from_file(input)))
        .collect::<Vec<_>>();
    // Archive and failure copy names are derived from the file name only.
    let mut name_counts = HashMap::<&str, usize>::new();
    for item in items.iter().filter_map(|(_, item)| item.as_ref().ok()) {
        let count = name_counts.entry(item.attributes.filename()).or_default();
        *count = count.saturating_add(1);
    }
    let clashing = |item: &WorkItem| {
        name_counts
            .get(item.attributes.filename())
            .is_some_and(|&count| count > 1)
    };

    let semaphore = Arc::new(Semaphore::new(ctx.config.max_parallel()));
    let mut spawned = Vec::new();
    let mut tasks = Vec::new();
    for (input, item) in &items {
        let item = match item {
            Ok(item) if clashing(item) => {
                error!(
                    "Skipping {input:?}: another input is also named {:?}",
                    item.attributes.filename()
                );
                ctx.counters.failed.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            Ok(item) => item.clone(),
            Err(err) => {
                error!("Failed to process {input:?}: {err:?}");
                ctx.counters.failed.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };
        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        let ctx = Arc::clone(ctx);
        let input = (*input).clone();
        let out_dir = out_dir.to_path_buf();
        let failure_dir = failure_dir.map(Path::to_path_buf);
        spawned.push(input.clone());
        tasks.push(task::spawn_blocking(move || {
            let _permit = permit;
            encrypt_file(&ctx, &input, item, &out_dir, failure_dir.as_deref())
        }));
    }

    for (input, result) in spawned.iter().zip(join_all(tasks).await) {
        if let Err(err) = result? {
            error!("Failed to process {input:?}: {err:?}");
            ctx.counters.failed.fetch_add(1, Ordering::Relaxed);
        }
    }
    ctx.counters.report();
    let failed = ctx.counters.failed();
    if failed > 0 {
        bail!("{failed} of {} files could not be archived", inputs.len());
    }
    Ok(())
}

fn encrypt_file(
    ctx: &Ctx,
    input: &Path,
    item: WorkItem,
    out_dir: &Path,
    failure_dir: Option<&Path>,
) -> Result<()> {
    let size = item.content.len()?;
    if size > ctx.config.warn_about_files_larger_than.as_u64() {
        warn!("{input:?} is large ({size} bytes), it will be held in memory while archiving");
    }
    ctx.counters.bytes_in.fetch_add(size, Ordering::Relaxed);

    match ctx.processor.process(item) {
        ArchiveResult::Success(item) => {
            let name = item
                .attributes
                .get(ZIP_FILENAME_ATTRIBUTE)
                .context("delivered item has no archive name")?;
            let output = out_dir.join(name);
            let written = write_atomically(&output, &mut item.content.open()?)?;
            ctx.counters.delivered.fetch_add(1, Ordering::Relaxed);
            ctx.counters.bytes_out.fetch_add(written, Ordering::Relaxed);
            info!("Archived {input:?} to {output:?}");
        }
        ArchiveResult::Failure { item, error } => {
            error!(state = %error.state(), "Failed to archive {input:?}: {error}");
            if let Some(failure_dir) = failure_dir {
                let output = failure_dir.join(item.attributes.filename());
                write_atomically(&output, &mut item.content.open()?)?;
                info!("Forwarded original {input:?} to {output:?}");
            }
            // Counted by the caller if forwarding fails.
            ctx.counters.failed.fetch_add(1, Ordering::Relaxed);
        }
    }
    Ok(())
}

/// Writes `content` to a temporary file next to `path` and moves it into place,
/// so `path` never holds a partially written file.
fn write_atomically(path: &Path, content: &mut impl io::Read) -> Result<u64> {
    let dir = path.parent().context("output path has no parent")?;
    let mut file = NamedTempFile::new_in(dir)?;
    let written = io::copy(content, &mut file)?;
    file.flush()?;
    file.persist(path)
        .with_context(|| format!("failed to write {path:?}"))?;
    Ok(written)
}
