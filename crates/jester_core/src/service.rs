//! Shared, serialized access to the economy
//!
//! Every command runs under one lock, so two load-mutate-save cycles never
//! interleave. Rank changes are forwarded to the role synchronizer once the
//! lock is released; a failed role update is logged and otherwise ignored.

use chrono::Duration;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::economy::{
    CardAward, DailyClaim, Economy, FavorGrant, Gift, LeaderboardEntry, Pickup, Profile, Purchase,
    RankDivergence, ShopListing,
};
use crate::ledger::LedgerStore;
use crate::roles::{RankChange, RoleSynchronizer, role_name};
use crate::trade::{PendingTrade, TradeSettlement};
use crate::{Doubloons, PlayerId, Rank, Result};

/// Outcomes that may carry rank changes for the role directory
pub trait RankEffects {
    fn rank_changes(&self) -> Vec<RankChange> {
        Vec::new()
    }
}

impl RankEffects for RankChange {
    fn rank_changes(&self) -> Vec<RankChange> {
        vec![self.clone()]
    }
}

impl RankEffects for Option<RankChange> {
    fn rank_changes(&self) -> Vec<RankChange> {
        self.iter().cloned().collect()
    }
}

impl RankEffects for CardAward {
    fn rank_changes(&self) -> Vec<RankChange> {
        self.rank_change.rank_changes()
    }
}

impl RankEffects for Gift {
    fn rank_changes(&self) -> Vec<RankChange> {
        self.rank_change.rank_changes()
    }
}

impl RankEffects for () {}
impl RankEffects for u64 {}
impl RankEffects for usize {}
impl RankEffects for Doubloons {}
impl RankEffects for PendingTrade {}
impl RankEffects for TradeSettlement {}
impl RankEffects for DailyClaim {}
impl RankEffects for Purchase {}
impl RankEffects for FavorGrant {}
impl RankEffects for Pickup {}

pub struct EconomyService<S> {
    economy: Arc<Mutex<Economy<S>>>,
    roles: Arc<dyn RoleSynchronizer>,
}

impl<S> Clone for EconomyService<S> {
    fn clone(&self) -> Self {
        Self {
            economy: Arc::clone(&self.economy),
            roles: Arc::clone(&self.roles),
        }
    }
}

impl<S: LedgerStore + 'static> EconomyService<S> {
    pub fn new(economy: Economy<S>, roles: Arc<dyn RoleSynchronizer>) -> Self {
        Self {
            economy: Arc::new(Mutex::new(economy)),
            roles,
        }
    }

    /// Run a read-only query (or anything without rank effects) under the lock
    pub fn query<T>(&self, op: impl FnOnce(&mut Economy<S>) -> Result<T>) -> Result<T> {
        let mut economy = self.economy.lock();
        op(&mut economy)
    }

    /// Run a command under the lock, then sync any rank changes it produced
    pub async fn execute<T: RankEffects>(
        &self,
        op: impl FnOnce(&mut Economy<S>) -> Result<T>,
    ) -> Result<T> {
        let outcome = {
            let mut economy = self.economy.lock();
            op(&mut economy)?
        };
        self.sync_roles(outcome.rank_changes()).await;
        Ok(outcome)
    }

    async fn sync_roles(&self, changes: Vec<RankChange>) {
        for change in changes {
            match self.roles.sync_rank(&change).await {
                Ok(()) => debug!("Synced {} to role '{}'", change.player, role_name(change.current)),
                Err(e) => warn!("Role sync for {} failed: {}", change.player, e),
            }
        }
    }

    pub async fn join(&self, player: &PlayerId) -> Result<RankChange> {
        self.execute(|economy| economy.join(player)).await
    }

    pub async fn award_card_experience(&self, actor: &PlayerId, target: &PlayerId) -> Result<CardAward> {
        self.execute(|economy| economy.award_card_experience(actor, target))
            .await
    }

    pub async fn gift_currency(
        &self,
        sender: &PlayerId,
        recipient: &PlayerId,
        amount: &Doubloons,
    ) -> Result<Gift> {
        self.execute(|economy| economy.gift_currency(sender, recipient, amount))
            .await
    }

    pub async fn override_rank(
        &self,
        granter: &PlayerId,
        target: &PlayerId,
        rank: Rank,
    ) -> Result<Option<RankChange>> {
        self.execute(|economy| economy.override_rank(granter, target, rank))
            .await
    }

    pub async fn claim_daily(&self, player: &PlayerId) -> Result<DailyClaim> {
        self.execute(|economy| economy.claim_daily(player)).await
    }

    pub async fn purchase_item(&self, player: &PlayerId, item_name: &str) -> Result<Purchase> {
        self.execute(|economy| economy.purchase_item(player, item_name))
            .await
    }

    pub async fn grant_favor(
        &self,
        granter: &PlayerId,
        target: &PlayerId,
        amount: i64,
        duration: Option<Duration>,
    ) -> Result<FavorGrant> {
        self.execute(|economy| economy.grant_favor(granter, target, amount, duration))
            .await
    }

    pub async fn drop_currency(&self, player: &PlayerId, amount: &Doubloons) -> Result<Doubloons> {
        self.execute(|economy| economy.drop_currency(player, amount))
            .await
    }

    pub async fn pick_up_drop(&self, player: &PlayerId) -> Result<Pickup> {
        self.execute(|economy| economy.pick_up_drop(player)).await
    }

    pub async fn override_experience(
        &self,
        granter: &PlayerId,
        target: &PlayerId,
        experience: u64,
    ) -> Result<u64> {
        self.execute(|economy| economy.override_experience(granter, target, experience))
            .await
    }

    pub async fn propose_trade(
        &self,
        sender: &PlayerId,
        recipient: &PlayerId,
        doubloons: &Doubloons,
        item_names: &[&str],
    ) -> Result<PendingTrade> {
        self.execute(|economy| economy.propose_trade(sender, recipient, doubloons, item_names))
            .await
    }

    pub async fn accept_trade(&self, recipient: &PlayerId) -> Result<TradeSettlement> {
        self.execute(|economy| economy.accept_trade(recipient)).await
    }

    pub async fn reject_trade(&self, recipient: &PlayerId) -> Result<PendingTrade> {
        self.execute(|economy| economy.reject_trade(recipient)).await
    }

    pub async fn cancel_trade(&self, sender: &PlayerId, recipient: &PlayerId) -> Result<PendingTrade> {
        self.execute(|economy| economy.cancel_trade(sender, recipient))
            .await
    }

    pub fn pending_offer(&self, recipient: &PlayerId) -> Option<PendingTrade> {
        self.economy.lock().pending_offer(recipient).cloned()
    }

    pub fn pending_offers(&self) -> Vec<(PlayerId, PendingTrade)> {
        self.economy.lock().pending_offers()
    }

    pub fn rank(&self, player: &PlayerId) -> Result<Rank> {
        self.query(|economy| economy.rank(player))
    }

    pub fn divergent_players(&self) -> Result<Vec<RankDivergence>> {
        self.query(|economy| economy.divergent_players())
    }

    pub fn profile(&self, player: &PlayerId) -> Result<Profile> {
        self.query(|economy| economy.profile(player))
    }

    pub fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        self.query(|economy| economy.leaderboard(limit))
    }

    pub fn activity(&self, limit: usize) -> Result<Vec<String>> {
        self.query(|economy| economy.activity(limit))
    }

    pub fn shop(&self, player: Option<&PlayerId>) -> Result<Vec<ShopListing>> {
        self.query(|economy| economy.shop(player))
    }

    /// Run one favor sweep under the lock
    pub fn sweep_expired_favor(&self) -> Result<usize> {
        self.query(|economy| economy.sweep_expired_favor())
    }

    /// Periodically clear expired favor. The first sweep runs after one
    /// full interval.
    pub fn spawn_favor_sweep(&self, every: Duration) -> JoinHandle<()> {
        let service = self.clone();
        let period = every
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(60))
            .max(std::time::Duration::from_secs(1));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            info!("Favor sweep running every {:?}", period);

            loop {
                interval.tick().await;
                match service.sweep_expired_favor() {
                    Ok(0) => {}
                    Ok(count) => debug!("Favor sweep cleared {} players", count),
                    Err(e) => error!("Favor sweep failed: {}", e),
                }
            }
        })
    }
}
