//! Implementation of the `traffic-sync init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::cli::commands::connect_store;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{seed_snapshot, Config, StoreBackend, SEED_VERSION};
use crate::infrastructure::config::PROJECT_CONFIG_PATH;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite the config file and reseed an existing store
    #[arg(long, short)]
    pub force: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub message: String,
    pub config_path: PathBuf,
    pub config_written: bool,
    pub backend: StoreBackend,
    pub store_seeded: bool,
    pub seed_version: u32,
    pub version: u64,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if self.config_written {
            lines.push(format!("Wrote {}", self.config_path.display()));
        } else {
            lines.push(format!("Kept existing {}", self.config_path.display()));
        }
        if self.store_seeded {
            lines.push(format!(
                "Seeded {:?} store with the reference network (seed v{}, store version {})",
                self.backend, self.seed_version, self.version
            ));
        } else {
            lines.push(format!("Store already holds a snapshot at version {}", self.version));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: InitArgs, config: &Config, json_mode: bool) -> Result<()> {
    let config_path = PathBuf::from(PROJECT_CONFIG_PATH);
    let config_written = write_config(&config_path, config, args.force).await?;

    let store = connect_store(config).await?;
    let current = store.load().await.context("Failed to read junction store")?;

    let (store_seeded, version) = if args.force {
        (true, store.reset().await.context("Failed to reseed junction store")?)
    } else if current.version == 0 {
        let version = store
            .save(&seed_snapshot(), 0)
            .await
            .context("Failed to seed junction store")?;
        (true, version)
    } else {
        (false, current.version)
    };

    if store_seeded {
        tracing::info!(version, force = args.force, "junction store seeded");
    }

    let out = InitOutput {
        message: if args.force {
            "Project reinitialized successfully.".to_string()
        } else {
            "Project initialized successfully.".to_string()
        },
        config_path,
        config_written,
        backend: config.store.backend,
        store_seeded,
        seed_version: SEED_VERSION,
        version,
    };
    output(&out, json_mode);
    Ok(())
}

async fn write_config(path: &Path, config: &Config, force: bool) -> Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let yaml = serde_yaml::to_string(config).context("Failed to serialize configuration")?;
    fs::write(path, yaml)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}
