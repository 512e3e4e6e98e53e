use {
    crate::{DEFAULT_FILENAME, FILENAME_ATTRIBUTE},
    anyhow::{Context as _, Result},
    bytes::Bytes,
    derive_more::{From, Into},
    fs_err::File,
    serde::{Deserialize, Serialize},
    std::{
        collections::BTreeMap,
        fmt::{self, Debug},
        io::Read,
        path::{Path, PathBuf},
    },
};

/// Payload of a work item.
///
/// Content can be opened any number of times, so the original bytes are
/// still available after a failed transformation has consumed one reader.
#[derive(Clone, PartialEq, Eq)]
pub enum Content {
    Memory(Bytes),
    File(PathBuf),
}

impl Content {
    #[inline]
    pub fn open(&self) -> Result<Box<dyn Read + Send + '_>> {
        match self {
            Self::Memory(bytes) => Ok(Box::new(bytes.as_ref())),
            Self::File(path) => Ok(Box::new(File::open(path)?)),
        }
    }

    #[inline]
    pub fn len(&self) -> Result<u64> {
        match self {
            Self::Memory(bytes) => Ok(bytes.len().try_into()?),
            Self::File(path) => Ok(fs_err::metadata(path)?.len()),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Reads the whole content into memory.
    #[inline]
    pub fn to_bytes(&self) -> Result<Bytes> {
        match self {
            Self::Memory(bytes) => Ok(bytes.clone()),
            Self::File(path) => {
                let data = fs_err::read(path)?;
                Ok(Bytes::from(data))
            }
        }
    }
}

impl From<Bytes> for Content {
    #[inline]
    fn from(value: Bytes) -> Self {
        Self::Memory(value)
    }
}

impl From<Vec<u8>> for Content {
    #[inline]
    fn from(value: Vec<u8>) -> Self {
        Self::Memory(value.into())
    }
}

impl Debug for Content {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory(bytes) => f.debug_tuple("Memory").field(&bytes.len()).finish(),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, From, Into)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    #[must_use]
    #[inline]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[inline]
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Name of the incoming file, or [`DEFAULT_FILENAME`] if it's missing or empty.
    #[must_use]
    #[inline]
    pub fn filename(&self) -> &str {
        self.get(FILENAME_ATTRIBUTE)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_FILENAME)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    #[inline]
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// One unit of content and attributes submitted for transformation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub content: Content,
    pub attributes: Attributes,
}

impl WorkItem {
    #[must_use]
    #[inline]
    pub fn new(content: impl Into<Content>) -> Self {
        Self {
            content: content.into(),
            attributes: Attributes::default(),
        }
    }

    /// Creates a file-backed item with `filename` set to the file's name.
    #[inline]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .context("path has no file name")?
            .to_str()
            .with_context(|| format!("unsupported file name: {path:?}"))?
            .to_owned();
        Ok(Self::new(Content::File(path.to_path_buf())).with_attribute(FILENAME_ATTRIBUTE, name))
    }

    #[must_use]
    #[inline]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key, value);
        self
    }
}
