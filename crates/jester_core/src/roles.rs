//! Seam to the external role directory
//!
//! The engine never talks to the chat platform. It reports rank changes,
//! and whoever owns the platform connection reflects them onto roles.
//! Failures here are cosmetic: they are logged, never fed back into the
//! economy.

use async_trait::async_trait;
use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::{PlayerId, Rank};

/// A player's rank moved (or was assigned for the first time on join)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankChange {
    pub player: PlayerId,
    pub previous: Option<Rank>,
    pub current: Rank,
}

impl RankChange {
    pub fn new(player: &PlayerId, previous: Option<Rank>, current: Rank) -> Self {
        Self {
            player: player.clone(),
            previous,
            current,
        }
    }

    /// `Some` only when the rank actually differs
    pub fn between(player: &PlayerId, previous: Rank, current: Rank) -> Option<Self> {
        (previous != current).then(|| Self::new(player, Some(previous), current))
    }
}

/// Directory role that mirrors `rank`. The founder carries the "Jester" role.
pub fn role_name(rank: Rank) -> &'static str {
    match rank {
        Rank::Founder => "Jester",
        other => other.name(),
    }
}

#[derive(Error, Diagnostic, Debug)]
pub enum RoleSyncError {
    #[error("Member not found")]
    #[diagnostic(
        code(jester_core::roles::member_not_found),
        help("Player {player} is not a member of the directory")
    )]
    MemberNotFound { player: PlayerId },

    #[error("Role update rejected")]
    #[diagnostic(
        code(jester_core::roles::rejected),
        help("The directory refused to give {player} the '{role}' role: {reason}")
    )]
    Rejected {
        player: PlayerId,
        role: String,
        reason: String,
    },
}

#[async_trait]
pub trait RoleSynchronizer: Send + Sync {
    /// Reflect `change.current` onto the player's directory roles
    async fn sync_rank(&self, change: &RankChange) -> Result<(), RoleSyncError>;
}

/// Synchronizer for deployments without a role directory; only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingRoleSync;

#[async_trait]
impl RoleSynchronizer for LoggingRoleSync {
    async fn sync_rank(&self, change: &RankChange) -> Result<(), RoleSyncError> {
        info!(
            "Role for {} is now '{}'",
            change.player,
            role_name(change.current)
        );
        Ok(())
    }
}
