use {
    crate::staging::{StagedFile, StagingArea, release_temp_file},
    anyhow::{Context as _, Result, ensure},
    bytes::Bytes,
    sealzip_protocol::Password,
    serde::{Deserialize, Serialize},
    std::{
        io::{self, Read, Seek, Write},
        path::Path,
    },
    tempfile::NamedTempFile,
    tracing::{debug, instrument},
    zip::{AesMode, CompressionMethod, ZipArchive, ZipWriter, write::SimpleFileOptions},
};

const ZIP_EXTENSION: &str = "zip";

/// Entries at least this large need ZIP64 headers.
const LARGE_FILE_THRESHOLD: u64 = 0xFFFF_FFFF;

/// Original file name with its last extension removed.
///
/// Nothing is removed if the only dot is the leading one (e.g. `.hidden`).
#[must_use]
#[inline]
pub fn archive_stem(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

/// Names derived from the original file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName {
    /// Original name without its last extension. Only reported, never used as a name.
    pub stem: String,
    /// Name of the archive file: the original name followed by `.zip`.
    pub file_name: String,
}

impl ArchiveName {
    #[must_use]
    #[inline]
    pub fn for_file(original: &str) -> Self {
        Self {
            stem: archive_stem(original).to_owned(),
            file_name: format!("{original}.{ZIP_EXTENSION}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AesStrength {
    Aes128,
    Aes192,
    #[default]
    Aes256,
}

impl From<AesStrength> for AesMode {
    #[inline]
    fn from(value: AesStrength) -> Self {
        match value {
            AesStrength::Aes128 => Self::Aes128,
            AesStrength::Aes192 => Self::Aes192,
            AesStrength::Aes256 => Self::Aes256,
        }
    }
}

/// How archive entries are encrypted. Entries are always encrypted with AES.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionSpec {
    pub password: Password,
    pub strength: AesStrength,
}

impl EncryptionSpec {
    #[must_use]
    #[inline]
    pub fn new(password: Password) -> Self {
        Self {
            password,
            strength: AesStrength::default(),
        }
    }

    #[inline]
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.password.is_empty(), "password must not be empty");
        Ok(())
    }
}

/// Completed archive in the staging area.
///
/// The file is deleted by [`ArchiveFile::release`] or, failing that, on drop.
#[derive(Debug)]
pub struct ArchiveFile {
    file: NamedTempFile,
    size: u64,
}

impl ArchiveFile {
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

    /// Reads the whole archive back from disk.
    #[inline]
    pub fn read_all(&mut self) -> Result<Bytes> {
        let file = self.file.as_file_mut();
        file.rewind()?;
        let mut data = Vec::with_capacity(self.size.try_into()?);
        file.read_to_end(&mut data)
            .with_context(|| format!("failed to read archive {:?}", self.file.path()))?;
        ensure!(
            u64::try_from(data.len())? == self.size,
            "archive size mismatch; read {}, expected {}",
            data.len(),
            self.size,
        );
        Ok(data.into())
    }

    #[inline]
    pub fn release(self) -> Result<()> {
        release_temp_file(self.file)
    }
}

/// Writes an archive with a single encrypted entry holding the content of `staged`.
///
/// On failure the unfinished archive is removed, so callers never see a partial archive.
#[instrument(skip_all, fields(%entry_name, staged = ?staged.path()))]
#[inline]
pub fn build_encrypted_archive(
    area: &StagingArea,
    staged: &StagedFile,
    entry_name: &str,
    spec: &EncryptionSpec,
) -> Result<ArchiveFile> {
    spec.validate()?;
    let mut input = staged.open()?;
    let mut file = area.create_archive_file()?;
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(staged.size() >= LARGE_FILE_THRESHOLD)
        .with_aes_encryption(spec.strength.into(), spec.password.as_unmasked_str());

    let mut writer = ZipWriter::new(file.as_file_mut());
    writer
        .start_file(entry_name, options)
        .context("failed to start archive entry")?;
    let written = io::copy(&mut input, &mut writer).context("failed to write archive entry")?;
    ensure!(
        written == staged.size(),
        "staged file changed while archiving; read {written}, expected {}",
        staged.size(),
    );
    writer
        .finish()
        .context("failed to finish archive")?
        .flush()?;

    let size = file.as_file().metadata()?.len();
    debug!(path = ?file.path(), size, "archive written");
    Ok(ArchiveFile { file, size })
}

/// Decrypted content of a single-entry archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub content: Vec<u8>,
}

/// Opens an archive produced by [`build_encrypted_archive`] and decrypts its only entry.
#[inline]
pub fn read_single_entry(archive: impl Read + Seek, password: &Password) -> Result<ArchiveEntry> {
    let mut archive = ZipArchive::new(archive).context("failed to open archive")?;
    ensure!(
        archive.len() == 1,
        "expected exactly one entry, found {}",
        archive.len(),
    );
    let mut entry = archive
        .by_index_decrypt(0, password.as_unmasked_str().as_bytes())
        .context("failed to decrypt entry")?;
    ensure!(entry.encrypted(), "entry is not encrypted");
    let name = entry.name().to_owned();
    let mut content = Vec::new();
    entry
        .read_to_end(&mut content)
        .context("failed to read entry")?;
    Ok(ArchiveEntry { name, content })
}
