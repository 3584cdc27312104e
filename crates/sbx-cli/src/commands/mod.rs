//! Command implementations for sbx-cli

use std::path::Path;

use sbx_api::{Client, SpaceId};
use sbx_core::SyncConfig;

use crate::cli::{GlobalArgs, Selection};
use crate::error::{CliError, Result};

pub mod completion;
pub mod pull;
pub mod push;
pub mod space;

pub use completion::run_completion;
pub use pull::run_pull;
pub use push::run_push;
pub use space::run_space_info;

/// Rejects a selection with neither names nor `--all`
pub fn require_selection(selection: &Selection) -> Result<()> {
    if selection.names.is_empty() && !selection.all {
        return Err(CliError::user("either provide component names or use --all"));
    }
    Ok(())
}

pub fn require_token(globals: &GlobalArgs) -> Result<&str> {
    globals
        .token
        .as_deref()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| CliError::user("management token is required (flag --token or SB_MGMT_TOKEN)"))
}

/// A positive space ID, or an error naming the variable it defaults from
pub fn require_space(space: Option<i64>, env: &str) -> Result<SpaceId> {
    match space {
        Some(id) if id > 0 => Ok(id as SpaceId),
        _ => Err(CliError::user(format!(
            "a valid space ID is required (flag --space or {})",
            env
        ))),
    }
}

/// Load `--config`, or `sbx.toml` from `dir` when present
pub fn load_config(globals: &GlobalArgs, dir: &Path) -> Result<SyncConfig> {
    let config = SyncConfig::resolve(globals.config.as_deref(), dir)?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

/// Validated token plus configured client
pub fn connect(globals: &GlobalArgs) -> Result<(SyncConfig, Client)> {
    let token = require_token(globals)?;
    let cwd = std::env::current_dir()?;
    let config = load_config(globals, &cwd)?;
    let client = config.client(token)?;
    Ok((config, client))
}
