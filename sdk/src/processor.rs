use {
    crate::{
        archive::{ArchiveFile, ArchiveName, EncryptionSpec, build_encrypted_archive},
        staging::{StagedFile, StagingArea},
    },
    anyhow::{Error, Result},
    bytes::Bytes,
    derive_more::Display,
    scopeguard::guard,
    sealzip_protocol::{WorkItem, ZIP_FILENAME_ATTRIBUTE},
    std::{
        error::Error as StdError,
        fmt::{self, Debug},
    },
    tracing::{debug, instrument, warn},
};

/// Progress of a single invocation.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Received,
    Staged,
    Archived,
    Delivered,
    Failed,
}

/// Error that moved an invocation to [`InvocationState::Failed`].
#[derive(Display)]
pub enum InvocationError {
    #[display("failed to stage content: {_0:#}")]
    Staging(Error),
    #[display("failed to build encrypted archive: {_0:#}")]
    ArchiveBuild(Error),
    #[display("failed to deliver archive: {_0:#}")]
    Delivery(Error),
}

impl InvocationError {
    fn staging(err: impl Into<Error>) -> Self {
        Self::Staging(err.into())
    }

    fn archive_build(err: impl Into<Error>) -> Self {
        Self::ArchiveBuild(err.into())
    }

    fn delivery(err: impl Into<Error>) -> Self {
        Self::Delivery(err.into())
    }

    /// Last state reached before the failure.
    #[must_use]
    #[inline]
    pub fn state(&self) -> InvocationState {
        match self {
            Self::Staging(_) => InvocationState::Received,
            Self::ArchiveBuild(_) => InvocationState::Staged,
            Self::Delivery(_) => InvocationState::Archived,
        }
    }

    #[must_use]
    #[inline]
    pub fn cause(&self) -> &Error {
        match self {
            Self::Staging(err) | Self::ArchiveBuild(err) | Self::Delivery(err) => err,
        }
    }
}

impl Debug for InvocationError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Staging(_) => "Staging",
            Self::ArchiveBuild(_) => "ArchiveBuild",
            Self::Delivery(_) => "Delivery",
        };
        f.debug_tuple(name).field(self.cause()).finish()
    }
}

impl StdError for InvocationError {
    #[inline]
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&**self.cause())
    }
}

/// Outcome of one invocation.
#[derive(Debug)]
pub enum ArchiveResult {
    /// The archive bytes with the original attributes and `zip.filename`.
    /// The original item is discarded.
    Success(WorkItem),
    /// The original item, unchanged, and the reason the transformation was abandoned.
    Failure { item: WorkItem, error: InvocationError },
}

impl ArchiveResult {
    #[must_use]
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[must_use]
    #[inline]
    pub fn state(&self) -> InvocationState {
        match self {
            Self::Success(_) => InvocationState::Delivered,
            Self::Failure { .. } => InvocationState::Failed,
        }
    }

    /// Item to hand to the next consumer, whichever way the invocation ended.
    #[must_use]
    #[inline]
    pub fn into_item(self) -> WorkItem {
        match self {
            Self::Success(item) | Self::Failure { item, .. } => item,
        }
    }
}

/// Temporary files of one invocation.
#[derive(Default)]
struct Artifacts {
    staged: Option<StagedFile>,
    archive: Option<ArchiveFile>,
}

impl Artifacts {
    /// Attempts to delete both files, even if deleting the first one fails.
    fn release(self) {
        if let Some(staged) = self.staged {
            if let Err(err) = staged.release() {
                warn!(error = ?err, "failed to release staged file");
            }
        }
        if let Some(archive) = self.archive {
            if let Err(err) = archive.release() {
                warn!(error = ?err, "failed to release archive file");
            }
        }
    }
}

/// Wraps incoming work items into password-protected archives.
///
/// Invocations share nothing but the staging area, so one processor can serve
/// many threads at once.
#[derive(Debug, Clone)]
pub struct Processor {
    staging: StagingArea,
    spec: EncryptionSpec,
}

impl Processor {
    #[must_use]
    #[inline]
    pub fn new(staging: StagingArea, spec: EncryptionSpec) -> Self {
        Self { staging, spec }
    }

    #[must_use]
    #[inline]
    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// Processes `item` if there is one. Returns `None` without touching
    /// anything when no work is available.
    #[inline]
    pub fn trigger(&self, item: Option<WorkItem>) -> Option<ArchiveResult> {
        item.map(|item| self.process(item))
    }

    /// Wraps `item` into an encrypted archive.
    ///
    /// Nothing is logged on failure: the returned error is the diagnostic.
    #[inline]
    pub fn process(&self, item: WorkItem) -> ArchiveResult {
        self.process_with(item, ArchiveFile::read_all)
    }

    #[instrument(skip_all, fields(filename = item.attributes.filename()))]
    fn process_with(
        &self,
        item: WorkItem,
        deliver: impl FnOnce(&mut ArchiveFile) -> Result<Bytes>,
    ) -> ArchiveResult {
        let name = ArchiveName::for_file(item.attributes.filename());
        debug!(
            stem = %name.stem,
            archive = %name.file_name,
            "derived archive name"
        );

        let mut artifacts = guard(Artifacts::default(), Artifacts::release);
        let archived = self.run(&item, &mut artifacts, deliver);
        drop(artifacts);

        match archived {
            Ok(archive) => {
                debug!(archive = %name.file_name, size = archive.len(), "archive delivered");
                let mut attributes = item.attributes;
                attributes.insert(ZIP_FILENAME_ATTRIBUTE, name.file_name);
                ArchiveResult::Success(WorkItem {
                    content: archive.into(),
                    attributes,
                })
            }
            Err(error) => {
                debug!(state = %error.state(), "invocation failed");
                ArchiveResult::Failure { item, error }
            }
        }
    }

    fn run(
        &self,
        item: &WorkItem,
        artifacts: &mut Artifacts,
        deliver: impl FnOnce(&mut ArchiveFile) -> Result<Bytes>,
    ) -> Result<Bytes, InvocationError> {
        let filename = item.attributes.filename();
        let mut content = item.content.open().map_err(InvocationError::staging)?;
        let staged = artifacts.staged.insert(
            self.staging
                .stage(&mut content, filename)
                .map_err(InvocationError::staging)?,
        );
        debug!(state = %InvocationState::Staged, "content staged");

        let archive = artifacts.archive.insert(
            build_encrypted_archive(&self.staging, staged, filename, &self.spec)
                .map_err(InvocationError::archive_build)?,
        );
        debug!(state = %InvocationState::Archived, "archive built");

        deliver(archive).map_err(InvocationError::delivery)
    }
}
