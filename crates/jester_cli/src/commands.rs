pub mod admin;
pub mod config;
pub mod court;
pub mod player;

use jester_core::{EconomyError, EconomyService, JesterConfig, JsonFileStore, LoggingRoleSync};
use jester_core::economy::Economy;
use miette::Result;
use std::sync::Arc;
use tracing::info;

pub type Court = EconomyService<JsonFileStore>;

/// Open the ledger named by `config`. Economy commands need a founder, as
/// the bot refuses to start without one.
pub fn open_court(config: &JesterConfig, config_path: &str) -> Result<Court> {
    if config.founder.is_none() {
        return Err(EconomyError::configuration(
            config_path,
            "founder",
            "a founder identity (or JESTER_OWNER_ID / OWNER_ID in the environment)",
            "no founder configured",
        )
        .into());
    }

    info!("Using ledger at {}", config.storage.path.display());
    let economy = Economy::new(config.ledger_store(), config.rules());
    Ok(EconomyService::new(economy, Arc::new(LoggingRoleSync)))
}
