use {
    anyhow::{Context as _, Result},
    fs_err::{File, create_dir_all, read_dir},
    sealzip_protocol::DEFAULT_FILENAME,
    std::{
        env,
        io::{self, Read, Write},
        path::{Path, PathBuf},
    },
    tempfile::{Builder, NamedTempFile},
    tracing::{debug, instrument},
};

const STAGED_PREFIX: &str = "input";
const ARCHIVE_PREFIX: &str = "archive";
const ARCHIVE_SUFFIX: &str = ".zip";

/// Max length of the file name part appended to staged file names.
const MAX_NAME_SUFFIX_LEN: usize = 64;

/// Private directory holding the temporary files of all invocations.
///
/// Every file gets a random name, so concurrent invocations can share one area.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    #[inline]
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Staging area inside the system temporary directory.
    #[inline]
    pub fn system() -> Result<Self> {
        Self::new(env::temp_dir().join("sealzip"))
    }

    #[must_use]
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copies `content` into a new staged file.
    ///
    /// If copying fails, the partially written file is removed before returning.
    #[instrument(skip_all, fields(%suggested_name))]
    #[inline]
    pub fn stage(&self, content: &mut impl Read, suggested_name: &str) -> Result<StagedFile> {
        let suffix = format!("_{}", sanitize_name(suggested_name));
        let mut file = Builder::new()
            .prefix(STAGED_PREFIX)
            .suffix(&suffix)
            .tempfile_in(&self.root)
            .with_context(|| format!("failed to create staged file in {:?}", self.root))?;
        let size = io::copy(content, file.as_file_mut())
            .with_context(|| format!("failed to copy content to {:?}", file.path()))?;
        file.as_file_mut().flush()?;
        debug!(path = ?file.path(), size, "staged content");
        Ok(StagedFile { file, size })
    }

    pub(crate) fn create_archive_file(&self) -> Result<NamedTempFile> {
        Builder::new()
            .prefix(ARCHIVE_PREFIX)
            .suffix(ARCHIVE_SUFFIX)
            .tempfile_in(&self.root)
            .with_context(|| format!("failed to create archive file in {:?}", self.root))
    }

    /// Lists files currently present in the staging area.
    #[inline]
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        let mut paths = read_dir(&self.root)?
            .map(|entry| Ok(entry?.path()))
            .collect::<Result<Vec<_>>>()?;
        paths.sort();
        Ok(paths)
    }
}

/// Makes a file name safe to use as a part of a staged file name.
fn sanitize_name(name: &str) -> String {
    let name = if name.is_empty() {
        DEFAULT_FILENAME
    } else {
        name
    };
    let mut output = String::new();
    for c in name.chars() {
        if output.len().saturating_add(c.len_utf8()) > MAX_NAME_SUFFIX_LEN {
            break;
        }
        if matches!(c, '/' | '\\' | '\0') {
            output.push('_');
        } else {
            output.push(c);
        }
    }
    output
}

/// Deletes a temporary file, reporting the failure if it cannot be removed.
pub(crate) fn release_temp_file(file: NamedTempFile) -> Result<()> {
    let path = file.path().to_path_buf();
    file.close()
        .with_context(|| format!("failed to remove temporary file {path:?}"))
}

/// Temporary on-disk copy of incoming content.
///
/// The file is deleted by [`StagedFile::release`] or, failing that, on drop.
#[derive(Debug)]
pub struct StagedFile {
    file: NamedTempFile,
    size: u64,
}

impl StagedFile {
    #[must_use]
    #[inline]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    #[must_use]
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    pub fn open(&self) -> Result<File> {
        Ok(File::open(self.path())?)
    }

    #[inline]
    pub fn release(self) -> Result<()> {
        release_temp_file(self.file)
    }
}
