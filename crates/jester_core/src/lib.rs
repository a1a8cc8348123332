//! Jester Core - player economy for JesterBot
//!
//! Ranks earned through experience, doubloons, masks and props that boost
//! rewards, and peer trades, all kept in one JSON ledger. The chat platform
//! stays outside: a dispatcher calls into [`EconomyService`] and a
//! [`RoleSynchronizer`] mirrors rank changes onto platform roles.

pub mod activity;
pub mod boosts;
pub mod clock;
pub mod config;
pub mod currency;
pub mod economy;
pub mod error;
pub mod id;
pub mod items;
pub mod ledger;
pub mod player;
pub mod rank;
pub mod roles;
pub mod service;
pub mod trade;

pub use boosts::{Boosts, compute_boosts};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::JesterConfig;
pub use currency::Doubloons;
pub use economy::{Economy, EconomyRules};
pub use error::{EconomyError, Result};
pub use id::PlayerId;
pub use ledger::{JsonFileStore, Ledger, LedgerStore, MemoryStore};
pub use player::PlayerRecord;
pub use rank::{Rank, rank_of};
pub use roles::{LoggingRoleSync, RankChange, RoleSyncError, RoleSynchronizer};
pub use service::EconomyService;
pub use trade::{PendingTrade, TradeSettlement};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        Boosts, Doubloons, Economy, EconomyError, EconomyRules, EconomyService, JesterConfig,
        JsonFileStore, LedgerStore, LoggingRoleSync, PendingTrade, PlayerId, PlayerRecord, Rank,
        RankChange, Result, RoleSynchronizer,
    };
}
