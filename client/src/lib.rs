pub mod cli;
pub mod config;
mod counters;
mod encrypt;
mod verify;

use crate::{encrypt::encrypt, verify::verify};
use anyhow::{Result, bail};
use cli::{Cli, Command};
use config::Config;
use counters::Counters;
use derivative::Derivative;
use sealzip_protocol::{Password, util::log_writer};
use sealzip_sdk::{ArchiveName, EncryptionSpec, Processor, StagingArea};
use std::{
    env,
    path::PathBuf,
    sync::{Arc, Mutex},
};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable that takes precedence over the password in the config.
pub const PASSWORD_ENV_VAR: &str = "SEALZIP_PASSWORD";

#[derive(Derivative)]
#[derivative(Debug)]
pub struct Ctx {
    pub config: Config,
    pub processor: Processor,
    #[derivative(Debug = "ignore")]
    pub password: Password,
    pub counters: Counters,
}

impl Ctx {
    pub fn new(config: Config, password: Password) -> Result<Self> {
        let staging = if let Some(dir) = &config.staging_dir {
            StagingArea::new(dir)?
        } else {
            StagingArea::system()?
        };
        let spec = EncryptionSpec {
            password: password.clone(),
            strength: config.aes_strength,
        };
        Ok(Self {
            processor: Processor::new(staging, spec),
            password,
            config,
            counters: Counters::default(),
        })
    }
}

/// Takes the password from the environment, then the config, and finally asks for it.
pub fn resolve_password(config: &Config) -> Result<Password> {
    if let Ok(value) = env::var(PASSWORD_ENV_VAR) {
        return Ok(value.into());
    }
    if let Some(password) = &config.password {
        return Ok(password.clone());
    }
    info!("password is not configured");
    let value = rpassword::prompt_password("Input archive password: ")?;
    if value.is_empty() {
        bail!("no value provided");
    }
    Ok(value.into())
}

pub async fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Command::Encrypt {
            inputs,
            out_dir,
            failure_dir,
        } => {
            let password = resolve_password(&config)?;
            let ctx = Arc::new(Ctx::new(config, password)?);
            encrypt(&ctx, &inputs, &out_dir, failure_dir.as_deref()).await?;
        }
        Command::Verify {
            archive,
            entry,
            expect,
        } => {
            let password = resolve_password(&config)?;
            verify(&password, &archive, entry.as_deref(), expect.as_deref())?;
        }
        Command::ArchiveName { filename } => {
            let name = ArchiveName::for_file(&filename);
            debug!(stem = %name.stem, "derived archive name");
            println!("{}", name.file_name);
        }
    }
    Ok(())
}

pub fn setup_logger(log_file: Option<PathBuf>, log_filter: &str) -> Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(log_writer(log_file.as_deref())?));
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(EnvFilter::try_new(log_filter)?)
        .init();
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::Parser;

    #[tokio::test]
    async fn archive_name_needs_no_password() {
        let cli = Cli::try_parse_from(["sealzip", "archive-name", "report.v2.csv"]).unwrap();
        run(cli, Config::default()).await.unwrap();
    }
}
