use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the config file. Defaults to `sealzip.json5` in the user's config directory.
    #[clap(long)]
    pub config: Option<PathBuf>,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Wrap each input file into its own password-protected archive.
    Encrypt {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Directory receiving the archives.
        #[arg(long)]
        out_dir: PathBuf,
        /// Directory receiving unchanged copies of inputs that could not be archived.
        #[arg(long)]
        failure_dir: Option<PathBuf>,
    },
    /// Check that an archive opens with the configured password.
    Verify {
        archive: PathBuf,
        /// Expected name of the entry.
        #[arg(long)]
        entry: Option<String>,
        /// File that the entry's content must match.
        #[arg(long)]
        expect: Option<PathBuf>,
    },
    /// Print the archive name derived from a file name.
    ArchiveName { filename: String },
}

#[inline]
pub fn default_config_path() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("cannot find config dir")?
        .join("sealzip.json5"))
}
