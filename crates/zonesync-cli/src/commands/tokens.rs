//! Tokens command - inspect and clear stored change tokens
//!
//! Clearing a token makes the next sync of that scope or partition start
//! from a full enumeration.

use std::sync::Arc;

use anyhow::Result;
use clap::Subcommand;
use tracing::info;
use zonesync_cache::SqliteKeyValueStore;
use zonesync_core::config::Config;
use zonesync_core::domain::{PartitionName, Scope, ScopeKind};
use zonesync_sync::{TokenEntry, TokenStore};

use super::open_database;
use crate::output::{get_formatter, render_table, to_json, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum TokensCommand {
    /// List stored change tokens
    List {
        /// Only show tokens of this scope
        #[arg(long)]
        scope: Option<ScopeKind>,
    },
    /// Show the token of a scope or one of its partitions
    Show {
        scope: ScopeKind,
        partition: Option<PartitionName>,
    },
    /// Clear a token so the next sync enumerates everything again
    Clear {
        scope: ScopeKind,
        partition: Option<PartitionName>,
        /// Also clear every partition token of the scope
        #[arg(long, conflicts_with = "partition")]
        all_partitions: bool,
    },
}

impl TokensCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        let Some(pool) = open_database(config).await? else {
            formatter.error(&format!(
                "No database found at {}",
                config.storage.database.display()
            ));
            return Ok(());
        };
        let store = Arc::new(SqliteKeyValueStore::new(pool.pool().clone()));
        let tokens = TokenStore::new(store, config.sync.token_key_prefix.clone());

        match self {
            TokensCommand::List { scope } => {
                let entries = list_tokens(&tokens, *scope).await?;
                info!(count = entries.len(), "Listed change tokens");

                if format.is_json() {
                    formatter.print_json(&to_json(&entries)?);
                } else if entries.is_empty() {
                    formatter.info("No change tokens stored; the next sync starts from scratch.");
                } else {
                    formatter.success(&format!("{} change token(s)", entries.len()));
                    let rows: Vec<Vec<String>> = entries
                        .iter()
                        .map(|e| {
                            vec![
                                e.scope.to_string(),
                                e.partition
                                    .as_ref()
                                    .map(ToString::to_string)
                                    .unwrap_or_else(|| "-".into()),
                                e.token.to_base64(),
                            ]
                        })
                        .collect();
                    for line in render_table(&["Scope", "Partition", "Token"], &rows) {
                        formatter.info(&line);
                    }
                }
            }
            TokensCommand::Show { scope, partition } => {
                let (key, token) = match partition {
                    Some(name) => {
                        let p = Scope::new(*scope).partition(name.clone());
                        (tokens.key_for(&p), tokens.get(&p).await?)
                    }
                    None => {
                        let s = Scope::new(*scope);
                        (tokens.key_for(&s), tokens.get(&s).await?)
                    }
                };

                if format.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "key": key,
                        "token": token.as_ref().map(|t| t.to_base64()),
                    }));
                } else if let Some(token) = token {
                    formatter.success(&key);
                    formatter.info(&token.to_base64());
                } else {
                    formatter.info(&format!("{} is not set", key));
                }
            }
            TokensCommand::Clear {
                scope,
                partition,
                all_partitions,
            } => {
                let cleared =
                    clear_tokens(&tokens, *scope, partition.as_ref(), *all_partitions).await?;
                info!(count = cleared.len(), "Cleared change tokens");

                if format.is_json() {
                    formatter.print_json(&serde_json::json!({ "cleared": cleared }));
                } else if cleared.is_empty() {
                    formatter.info("Nothing to clear");
                } else {
                    formatter.success(&format!("Cleared {} token(s)", cleared.len()));
                    for key in &cleared {
                        formatter.info(key);
                    }
                }
            }
        }

        Ok(())
    }
}

async fn list_tokens(tokens: &TokenStore, scope: Option<ScopeKind>) -> Result<Vec<TokenEntry>> {
    let entries = tokens.list().await?;
    Ok(entries
        .into_iter()
        .filter(|e| scope.map_or(true, |s| e.scope == s))
        .collect())
}

/// Clears the requested tokens and returns the keys that were set before
async fn clear_tokens(
    tokens: &TokenStore,
    scope: ScopeKind,
    partition: Option<&PartitionName>,
    all_partitions: bool,
) -> Result<Vec<String>> {
    let mut cleared = Vec::new();

    if let Some(name) = partition {
        let p = Scope::new(scope).partition(name.clone());
        if tokens.get(&p).await?.is_some() {
            tokens.clear(&p).await?;
            cleared.push(tokens.key_for(&p));
        }
        return Ok(cleared);
    }

    let s = Scope::new(scope);
    if tokens.get(&s).await?.is_some() {
        tokens.clear(&s).await?;
        cleared.push(tokens.key_for(&s));
    }

    if all_partitions {
        for entry in list_tokens(tokens, Some(scope)).await? {
            if let Some(name) = entry.partition {
                tokens.clear(&s.partition(name)).await?;
                cleared.push(entry.key);
            }
        }
    }
    Ok(cleared)
}
