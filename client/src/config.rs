use anyhow::{Context as _, Result};
use byte_unit::Byte;
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::thread::available_parallelism;

use sealzip_protocol::Password;
use sealzip_sdk::AesStrength;

use crate::cli::default_config_path;

#[derive(Derivative, Clone, Serialize, Deserialize)]
#[derivative(Debug)]
pub struct Config {
    /// Can also be supplied via `SEALZIP_PASSWORD` or typed in when missing.
    #[derivative(Debug = "ignore")]
    #[serde(default)]
    pub password: Option<Password>,
    #[serde(default)]
    pub aes_strength: AesStrength,
    /// Directory for temporary files. Defaults to `sealzip` in the system temp dir.
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Max number of files processed at once. Defaults to available parallelism.
    #[serde(default)]
    pub max_parallel: Option<NonZeroUsize>,

    #[serde(default = "default_warn_about_files_larger_than")]
    pub warn_about_files_larger_than: Byte,
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            password: None,
            aes_strength: AesStrength::default(),
            staging_dir: None,
            log_file: None,
            log_filter: default_log_filter(),
            max_parallel: None,
            warn_about_files_larger_than: default_warn_about_files_larger_than(),
        }
    }
}

impl Config {
    /// Loads the config from `path`, or from the default location if no path is given.
    ///
    /// A missing file at the default location is not an error.
    #[inline]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = if let Some(path) = path {
            path.to_path_buf()
        } else {
            let path = default_config_path()?;
            if !path.try_exists()? {
                return Ok(Self::default());
            }
            path
        };
        let text = fs_err::read_to_string(&path)?;
        json5::from_str(&text).with_context(|| format!("failed to parse config {path:?}"))
    }

    #[must_use]
    #[inline]
    pub fn max_parallel(&self) -> usize {
        self.max_parallel
            .or_else(|| available_parallelism().ok())
            .map_or(1, NonZeroUsize::get)
    }
}

fn default_log_filter() -> String {
    "info".into()
}

fn default_warn_about_files_larger_than() -> Byte {
    Byte::from_u64(512 * 1024 * 1024)
}
