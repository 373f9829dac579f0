//! CLI subcommands

pub mod completions;
pub mod config;
pub mod events;
pub mod tokens;

use anyhow::{Context, Result};
use zonesync_cache::DatabasePool;
use zonesync_core::config::Config;

/// Opens the state database named in `config`, or `None` if it does not
/// exist yet
pub(crate) async fn open_database(config: &Config) -> Result<Option<DatabasePool>> {
    let path = &config.storage.database;
    if !path.exists() {
        return Ok(None);
    }
    let pool = DatabasePool::new(path)
        .await
        .with_context(|| format!("Failed to open database at {}", path.display()))?;
    Ok(Some(pool))
}
