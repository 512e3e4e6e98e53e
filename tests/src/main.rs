mod random;

use {
    anyhow::{Context as _, Result, bail, ensure},
    futures::future::join_all,
    random::{Case, Expectation, random_case, random_password},
    sealzip_protocol::{
        DEFAULT_FILENAME, FILENAME_ATTRIBUTE, Password, WorkItem, ZIP_FILENAME_ATTRIBUTE,
        util::log_writer,
    },
    sealzip_sdk::{
        ArchiveResult, EncryptionSpec, InvocationError, Processor, StagingArea,
        archive::read_single_entry,
    },
    std::{env, io::Cursor, path::PathBuf, sync::Mutex},
    tempfile::TempDir,
    tokio::task,
    tracing::{debug, error, info},
    tracing_subscriber::{EnvFilter, util::SubscriberInitExt},
};

const ROUNDS: usize = 50;
const INVOCATIONS_PER_ROUND: usize = 16;

#[tokio::main]
async fn main() {
    if let Err(err) = try_main().await {
        error!("{err:?}");
        std::process::exit(1);
    }
}

async fn try_main() -> Result<()> {
    let log_file = env::args().nth(1).map(PathBuf::from);
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(log_writer(log_file.as_deref())?))
        .with_env_filter(EnvFilter::try_new("info,sealzip_sdk=debug")?)
        .finish()
        .init();

    let dir = TempDir::new()?;
    let inputs_dir = dir.path().join("inputs");
    fs_err::create_dir_all(&inputs_dir)?;
    let staging = StagingArea::new(dir.path().join("staging"))?;
    info!("staging area: {}", staging.root().display());

    let password = random_password();
    let processor = Processor::new(staging.clone(), EncryptionSpec::new(password.clone()));
    let no_password = Processor::new(staging.clone(), EncryptionSpec::new(Password::new("")));

    for round in 0..ROUNDS {
        let cases = (0..INVOCATIONS_PER_ROUND)
            .map(|_| random_case(&inputs_dir))
            .collect::<Result<Vec<_>>>()?;
        let tasks = cases.into_iter().map(|case| {
            let processor = if case.expectation == Expectation::ArchiveBuildFails {
                no_password.clone()
            } else {
                processor.clone()
            };
            let password = password.clone();
            task::spawn_blocking(move || check_case(&processor, &password, case))
        });
        for result in join_all(tasks).await {
            result??;
        }
        let leftovers = staging.list()?;
        ensure!(
            leftovers.is_empty(),
            "temporary files left after round {round}: {leftovers:?}"
        );
        debug!("round {round} ok");
    }
    info!(
        "checked {} invocations, no issues found",
        ROUNDS * INVOCATIONS_PER_ROUND
    );
    Ok(())
}

fn check_case(processor: &Processor, password: &Password, case: Case) -> Result<()> {
    let Some(item) = case.item else {
        ensure!(
            processor.trigger(None).is_none(),
            "invocation without work produced a result"
        );
        return Ok(());
    };
    let original = item.clone();
    let result = processor
        .trigger(Some(item))
        .context("invocation with work produced no result")?;

    match (case.expectation, result) {
        (Expectation::Delivered, ArchiveResult::Success(delivered)) => {
            check_delivered(&original, &delivered, password)
        }
        (Expectation::ArchiveBuildFails, ArchiveResult::Failure { item, error }) => {
            ensure!(
                matches!(error, InvocationError::ArchiveBuild(_)),
                "unexpected error: {error:?}"
            );
            ensure!(item == original, "original item was modified");
            Ok(())
        }
        (Expectation::StagingFails, ArchiveResult::Failure { item, error }) => {
            ensure!(
                matches!(error, InvocationError::Staging(_)),
                "unexpected error: {error:?}"
            );
            ensure!(item == original, "original item was modified");
            Ok(())
        }
        (expectation, result) => {
            bail!("expected {expectation:?}, got {result:?} for {original:?}")
        }
    }
}

fn check_delivered(original: &WorkItem, delivered: &WorkItem, password: &Password) -> Result<()> {
    let filename = original
        .attributes
        .get(FILENAME_ATTRIBUTE)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_FILENAME);
    let expected_archive_name = format!("{filename}.zip");
    ensure!(
        delivered.attributes.get(ZIP_FILENAME_ATTRIBUTE) == Some(expected_archive_name.as_str()),
        "archive name mismatch; actual {:?}, expected {expected_archive_name:?}",
        delivered.attributes.get(ZIP_FILENAME_ATTRIBUTE),
    );
    for (key, value) in original.attributes.iter() {
        ensure!(
            delivered.attributes.get(key) == Some(value),
            "attribute {key:?} was not carried over"
        );
    }

    let archive = delivered.content.to_bytes()?;
    let expected_content = original.content.to_bytes()?;
    let entry = read_single_entry(Cursor::new(archive.clone()), password)?;
    ensure!(
        entry.name == filename,
        "entry name mismatch; actual {:?}, expected {filename:?}",
        entry.name,
    );
    ensure!(
        entry.content == expected_content.as_ref(),
        "content mismatch for {filename:?}"
    );

    let wrong_password = Password::new(format!("{}x", password.as_unmasked_str()));
    if let Ok(entry) = read_single_entry(Cursor::new(archive), &wrong_password) {
        ensure!(
            entry.content != expected_content.as_ref() || expected_content.is_empty(),
            "wrong password revealed the content of {filename:?}"
        );
    }
    Ok(())
}
