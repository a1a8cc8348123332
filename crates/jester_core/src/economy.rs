//! The economy engine
//!
//! Every mutating operation follows the same cycle: load the ledger,
//! validate against current balances, mutate the loaded copy, append
//! activity, and save the whole ledger. Process-memory state (the dropped
//! doubloons and pending trades) only changes once the save succeeded, so a
//! failed write leaves the engine exactly as it was.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::boosts::{Boosts, compute_boosts};
use crate::clock::{Clock, SystemClock};
use crate::items::{self, Item};
use crate::ledger::{Ledger, LedgerStore};
use crate::player::MAX_FAVOR;
use crate::rank::rank_of;
use crate::roles::RankChange;
use crate::trade::TradeCoordinator;
use crate::{Doubloons, EconomyError, PlayerId, PlayerRecord, Rank, Result};

/// Base experience for one card
pub const CARD_EXPERIENCE: u64 = 20;

/// Base experience a gift recipient earns, scaled by the sender's boost
pub const GIFT_BONUS_EXPERIENCE: u64 = 10;

/// Base daily doubloons
pub const DAILY_AMOUNT: u64 = 20;

/// Time between daily claims
pub fn daily_cooldown() -> Duration {
    Duration::milliseconds(86_400_000)
}

/// Who stands above the ordinary rules
#[derive(Debug, Clone, Default)]
pub struct EconomyRules {
    /// The one identity holding the Founder rank
    pub founder: Option<PlayerId>,
    /// Identities allowed to grant favor and override ranks
    pub privileged: BTreeSet<PlayerId>,
}

impl EconomyRules {
    pub fn is_founder(&self, player: &PlayerId) -> bool {
        self.founder.as_ref() == Some(player)
    }
}

/// Doubloons lying on the floor, waiting for someone to pick them up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedDoubloons {
    pub dropper: PlayerId,
    pub amount: Doubloons,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardAward {
    pub target: PlayerId,
    pub experience_gained: u64,
    pub experience_total: u64,
    pub rank_change: Option<RankChange>,
    pub unlocked: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyClaim {
    pub amount: Doubloons,
    pub balance: Doubloons,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Purchase {
    pub item: &'static str,
    pub price: Doubloons,
    pub balance: Doubloons,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gift {
    pub debited: Doubloons,
    pub credited: Doubloons,
    pub bonus_experience: u64,
    pub rank_change: Option<RankChange>,
    pub unlocked: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FavorGrant {
    pub favor: u8,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pickup {
    pub dropper: PlayerId,
    pub amount: Doubloons,
    pub balance: Doubloons,
}

/// Stored rank that no longer matches the rank earned by experience
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankDivergence {
    pub player: PlayerId,
    pub stored: Rank,
    pub earned: Rank,
    pub experience: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub player: PlayerId,
    pub rank: Rank,
    pub experience: u64,
    pub doubloons: Doubloons,
    pub favor: u8,
    pub favor_expires_at: Option<DateTime<Utc>>,
    pub props: Vec<&'static str>,
    pub masks: Vec<&'static str>,
    pub boosts: Boosts,
    pub next_rank: Option<(Rank, u64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub position: usize,
    pub player: PlayerId,
    pub rank: Rank,
    pub experience: u64,
    pub doubloons: Doubloons,
    pub favor: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShopListing {
    pub item: &'static str,
    pub base_price: Doubloons,
    pub price: Doubloons,
    pub boost: f64,
    pub owned: bool,
}

/// Experience and unlocks from one progression step
pub(crate) struct Progress {
    pub(crate) rank_change: Option<RankChange>,
    pub(crate) unlocked: Vec<&'static str>,
}

pub struct Economy<S> {
    pub(crate) store: S,
    pub(crate) rules: EconomyRules,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) dropped: Option<DroppedDoubloons>,
    pub(crate) trades: TradeCoordinator,
}

impl<S: LedgerStore> Economy<S> {
    pub fn new(store: S, rules: EconomyRules) -> Self {
        Self::with_clock(store, rules, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, rules: EconomyRules, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            rules,
            clock,
            dropped: None,
            trades: TradeCoordinator::new(),
        }
    }

    pub fn rules(&self) -> &EconomyRules {
        &self.rules
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn dropped(&self) -> Option<&DroppedDoubloons> {
        self.dropped.as_ref()
    }

    pub(crate) fn commit(&mut self, ledger: &Ledger) -> Result<()> {
        self.store.save(ledger)
    }

    /// Founder, configured privileged identities, and holders of the top tier
    pub fn has_standing(&self, ledger: &Ledger, player: &PlayerId) -> bool {
        self.rules.is_founder(player)
            || self.rules.privileged.contains(player)
            || ledger
                .get(player)
                .is_some_and(|record| record.rank == Rank::TheJestersHand)
    }

    fn require_standing(&self, ledger: &Ledger, player: &PlayerId, action: &str) -> Result<()> {
        if self.has_standing(ledger, player) {
            Ok(())
        } else {
            debug!("{} lacks standing to {}", player, action);
            Err(EconomyError::not_privileged(player, action))
        }
    }

    /// Add experience, re-derive the rank, and hand out any props the rank
    /// now grants
    pub(crate) fn progress(
        &self,
        ledger: &mut Ledger,
        player: &PlayerId,
        gained: u64,
    ) -> Result<Progress> {
        let is_founder = self.rules.is_founder(player);
        let record = ledger.player_mut(player)?;
        let previous = record.rank;
        record.experience = record.experience.saturating_add(gained);
        record.rank = rank_of(record.experience, is_founder);
        let current = record.rank;

        let unlocked: Vec<&'static str> = items::props_unlocked_by(current)
            .filter(|prop| record.grant(prop.name))
            .map(|prop| prop.name)
            .collect();

        for prop in &unlocked {
            ledger.record_activity(format!(
                "🎁 {} unlocked {} for reaching {}!",
                player.mention(),
                prop,
                current
            ));
        }

        let rank_change = RankChange::between(player, previous, current);
        if let Some(change) = &rank_change {
            info!("{} moved from {:?} to {}", player, change.previous, change.current);
        }

        Ok(Progress {
            rank_change,
            unlocked,
        })
    }

    /// Enroll a player as Motley (the founder enrolls as Founder)
    pub fn join(&mut self, player: &PlayerId) -> Result<RankChange> {
        if player.is_empty() {
            return Err(EconomyError::invalid_argument("player", "player id is empty"));
        }
        let mut ledger = self.store.load()?;
        let rank = rank_of(0, self.rules.is_founder(player));
        ledger.create_if_absent(player, rank)?;
        ledger.record_activity(format!("🎭 {} joined the Court!", player.mention()));
        self.commit(&ledger)?;
        info!("{} joined as {}", player, rank);
        Ok(RankChange::new(player, None, rank))
    }

    /// Someone handed `target` a card. Every call counts.
    pub fn award_card_experience(
        &mut self,
        actor: &PlayerId,
        target: &PlayerId,
    ) -> Result<CardAward> {
        if actor == target {
            return Err(EconomyError::invalid_argument(
                "target",
                "players cannot give cards to themselves",
            ));
        }
        let mut ledger = self.store.load()?;
        let boosts = compute_boosts(ledger.player(target)?);
        let gained = Doubloons::from(CARD_EXPERIENCE).scale(boosts.experience);
        let gained = gained.to_u64().unwrap_or(u64::MAX);

        let progress = self.progress(&mut ledger, target, gained)?;
        let experience_total = ledger.player(target)?.experience;
        ledger.record_activity(format!(
            "🃏 {} gave a card to {} (+{} EXP)",
            actor.mention(),
            target.mention(),
            gained
        ));
        self.commit(&ledger)?;

        info!("{} awarded {} EXP to {}", actor, gained, target);
        Ok(CardAward {
            target: target.clone(),
            experience_gained: gained,
            experience_total,
            rank_change: progress.rank_change,
            unlocked: progress.unlocked,
        })
    }

    /// Collect the daily doubloons, once per 24 hours
    pub fn claim_daily(&mut self, player: &PlayerId) -> Result<DailyClaim> {
        let now = self.clock.now();
        let mut ledger = self.store.load()?;
        let record = ledger.player_mut(player)?;

        let next_claim = record.last_daily + daily_cooldown();
        if now < next_claim {
            let remaining = next_claim - now;
            debug!("{} daily still cooling down for {}s", player, remaining.num_seconds());
            return Err(EconomyError::CooldownActive {
                player: player.clone(),
                remaining_secs: remaining.num_seconds().max(1),
            });
        }

        let amount = Doubloons::from(DAILY_AMOUNT).scale(compute_boosts(record).doubloons);
        record.doubloons += &amount;
        record.last_daily = now;
        let balance = record.doubloons.clone();

        ledger.record_activity(format!(
            "💰 {} collected daily {} doubloons!",
            player.mention(),
            amount
        ));
        self.commit(&ledger)?;

        info!("{} claimed {} daily doubloons", player, amount);
        Ok(DailyClaim { amount, balance })
    }

    /// Buy a mask from the shop. The price scales with the buyer's doubloon
    /// boost.
    pub fn purchase_item(&mut self, player: &PlayerId, item_name: &str) -> Result<Purchase> {
        let item = items::find_item(item_name).ok_or_else(|| EconomyError::ItemNotFound {
            name: item_name.trim().to_string(),
            available: items::catalog_names(),
        })?;
        let mask = match item {
            Item::Mask(mask) => mask,
            Item::Prop(prop) => {
                return Err(EconomyError::invalid_argument(
                    "item",
                    format!("{} is not for sale; it is granted on reaching {}", prop.name, prop.rank),
                ));
            }
        };

        let is_founder = self.rules.is_founder(player);
        let mut ledger = self.store.load()?;
        let record = ledger.player_mut(player)?;
        if record.owns(mask.name) {
            return Err(EconomyError::invalid_argument(
                "item",
                format!("{} already owns the {}", player, mask.name),
            ));
        }

        let price = if is_founder {
            Doubloons::zero()
        } else {
            mask.price().scale(compute_boosts(record).doubloons)
        };
        record.doubloons = record.doubloons.checked_sub(&price).ok_or_else(|| {
            EconomyError::insufficient_funds(player, price.clone(), record.doubloons.clone())
        })?;
        record.grant(mask.name);
        let balance = record.doubloons.clone();

        ledger.record_activity(format!("🛒 {} bought {}!", player.mention(), mask.name));
        self.commit(&ledger)?;

        info!("{} bought {} for {}", player, mask.name, price);
        Ok(Purchase {
            item: mask.name,
            price,
            balance,
        })
    }

    /// Send doubloons to another player.
    ///
    /// The sender pays exactly `amount`; the recipient receives `amount`
    /// scaled by the *sender's* doubloon boost, plus a little experience.
    pub fn gift_currency(
        &mut self,
        sender: &PlayerId,
        recipient: &PlayerId,
        amount: &Doubloons,
    ) -> Result<Gift> {
        if sender == recipient {
            return Err(EconomyError::invalid_argument(
                "recipient",
                "players cannot gift doubloons to themselves",
            ));
        }
        if amount.is_zero() {
            return Err(EconomyError::invalid_argument("amount", "gift must be at least 1 doubloon"));
        }

        let is_founder = self.rules.is_founder(sender);
        let mut ledger = self.store.load()?;
        ledger.player(recipient)?;
        let sender_record = ledger.player_mut(sender)?;
        let boosts = compute_boosts(sender_record);

        let debited = if is_founder {
            Doubloons::zero()
        } else {
            amount.clone()
        };
        sender_record.doubloons = sender_record
            .doubloons
            .checked_sub(&debited)
            .ok_or_else(|| {
                EconomyError::insufficient_funds(sender, amount.clone(), sender_record.doubloons.clone())
            })?;

        let credited = amount.scale(boosts.doubloons);
        let bonus = Doubloons::from(GIFT_BONUS_EXPERIENCE).scale(boosts.experience);
        let bonus_experience = bonus.to_u64().unwrap_or(u64::MAX);
        ledger.player_mut(recipient)?.doubloons += &credited;
        let progress = self.progress(&mut ledger, recipient, bonus_experience)?;

        ledger.record_activity(format!(
            "🎁 {} gifted {} doubloons to {}",
            sender.mention(),
            amount,
            recipient.mention()
        ));
        self.commit(&ledger)?;

        info!("{} gifted {} to {} ({} credited)", sender, amount, recipient, credited);
        Ok(Gift {
            debited,
            credited,
            bonus_experience,
            rank_change: progress.rank_change,
            unlocked: progress.unlocked,
        })
    }

    /// Adjust a player's favor by `amount` (may be negative), clamped to
    /// 0..=100. With `duration`, the favor lapses once it has passed;
    /// without, any existing expiry is kept.
    pub fn grant_favor(
        &mut self,
        granter: &PlayerId,
        target: &PlayerId,
        amount: i64,
        duration: Option<Duration>,
    ) -> Result<FavorGrant> {
        if duration.is_some_and(|d| d <= Duration::zero()) {
            return Err(EconomyError::invalid_argument("duration", "favor duration must be positive"));
        }
        let now = self.clock.now();
        let expires_at = duration
            .map(|duration| {
                now.checked_add_signed(duration).ok_or_else(|| {
                    EconomyError::invalid_argument("duration", "favor duration is out of range")
                })
            })
            .transpose()?;
        let mut ledger = self.store.load()?;
        self.require_standing(&ledger, granter, "grant favor")?;

        let record = ledger.player_mut(target)?;
        let favor = (i64::from(record.favor).saturating_add(amount)).clamp(0, i64::from(MAX_FAVOR));
        record.favor = favor as u8;
        if expires_at.is_some() {
            record.favor_expires_at = expires_at;
        }
        if record.favor == 0 {
            record.favor_expires_at = None;
        }
        let grant = FavorGrant {
            favor: record.favor,
            expires_at: record.favor_expires_at,
        };

        ledger.record_activity(format!(
            "⭐ {} gave {} favor to {}",
            granter.mention(),
            amount,
            target.mention()
        ));
        self.commit(&ledger)?;

        info!("{} set favor of {} to {}", granter, target, grant.favor);
        Ok(grant)
    }

    /// Clear favor whose expiry has passed. Saves only when something changed.
    pub fn sweep_expired_favor(&mut self) -> Result<usize> {
        let now = self.clock.now();
        let mut ledger = self.store.load()?;

        let mut expired = Vec::new();
        for (player, record) in ledger.players_mut() {
            if record.favor_expires_at.is_some_and(|at| at <= now) {
                record.favor = 0;
                record.favor_expires_at = None;
                expired.push(player.clone());
            }
        }
        if expired.is_empty() {
            return Ok(0);
        }

        for player in &expired {
            ledger.record_activity(format!("⌛ {}'s favor has worn off", player.mention()));
        }
        self.commit(&ledger)?;

        info!("Favor expired for {} players", expired.len());
        Ok(expired.len())
    }

    /// Put doubloons on the floor for anyone to grab. Only one pile at a time.
    pub fn drop_currency(&mut self, player: &PlayerId, amount: &Doubloons) -> Result<Doubloons> {
        if amount.is_zero() {
            return Err(EconomyError::invalid_argument("amount", "drop must be at least 1 doubloon"));
        }
        if let Some(dropped) = &self.dropped {
            return Err(EconomyError::DropPending {
                dropper: dropped.dropper.clone(),
                amount: dropped.amount.clone(),
            });
        }

        let is_founder = self.rules.is_founder(player);
        let mut ledger = self.store.load()?;
        let record = ledger.player_mut(player)?;
        if !is_founder {
            record.doubloons = record.doubloons.checked_sub(amount).ok_or_else(|| {
                EconomyError::insufficient_funds(player, amount.clone(), record.doubloons.clone())
            })?;
        }
        let balance = record.doubloons.clone();

        ledger.record_activity(format!(
            "💸 {} dropped {} doubloons! First to pick them up keeps them",
            player.mention(),
            amount
        ));
        self.commit(&ledger)?;

        self.dropped = Some(DroppedDoubloons {
            dropper: player.clone(),
            amount: amount.clone(),
        });
        info!("{} dropped {} doubloons", player, amount);
        Ok(balance)
    }

    /// First caller after a drop takes the whole pile, unboosted
    pub fn pick_up_drop(&mut self, player: &PlayerId) -> Result<Pickup> {
        let dropped = self.dropped.clone().ok_or(EconomyError::NothingDropped)?;

        let mut ledger = self.store.load()?;
        let record = ledger.player_mut(player)?;
        record.doubloons += &dropped.amount;
        let balance = record.doubloons.clone();

        ledger.record_activity(format!(
            "🤑 {} picked up {} doubloons dropped by {}",
            player.mention(),
            dropped.amount,
            dropped.dropper.mention()
        ));
        self.commit(&ledger)?;

        self.dropped = None;
        info!("{} picked up {} doubloons", player, dropped.amount);
        Ok(Pickup {
            dropper: dropped.dropper,
            amount: dropped.amount,
            balance,
        })
    }

    /// Set a stored rank directly. The result may disagree with experience.
    pub fn override_rank(
        &mut self,
        granter: &PlayerId,
        target: &PlayerId,
        rank: Rank,
    ) -> Result<Option<RankChange>> {
        if rank.is_founder() || self.rules.is_founder(target) {
            return Err(EconomyError::invalid_argument(
                "rank",
                "the Founder rank belongs to the founder alone and cannot be reassigned",
            ));
        }
        let mut ledger = self.store.load()?;
        self.require_standing(&ledger, granter, "override ranks")?;

        let record = ledger.player_mut(target)?;
        let previous = record.rank;
        record.rank = rank;

        ledger.record_activity(format!(
            "📜 {} decreed {} a {}",
            granter.mention(),
            target.mention(),
            rank
        ));
        self.commit(&ledger)?;

        info!("{} overrode rank of {} to {}", granter, target, rank);
        Ok(RankChange::between(target, previous, rank))
    }

    /// Set experience directly without re-deriving the rank
    pub fn override_experience(
        &mut self,
        granter: &PlayerId,
        target: &PlayerId,
        experience: u64,
    ) -> Result<u64> {
        let mut ledger = self.store.load()?;
        self.require_standing(&ledger, granter, "override experience")?;

        let record = ledger.player_mut(target)?;
        let previous = record.experience;
        record.experience = experience;

        ledger.record_activity(format!(
            "📜 {} set {}'s experience to {}",
            granter.mention(),
            target.mention(),
            experience
        ));
        self.commit(&ledger)?;

        info!("{} overrode experience of {} from {} to {}", granter, target, previous, experience);
        Ok(previous)
    }

    pub fn player(&mut self, player: &PlayerId) -> Result<PlayerRecord> {
        self.store.load()?.player(player).cloned()
    }

    /// Stored rank, as the role directory should show it
    pub fn rank(&mut self, player: &PlayerId) -> Result<Rank> {
        Ok(self.player(player)?.rank)
    }

    fn divergence(&self, player: &PlayerId, record: &PlayerRecord) -> Option<RankDivergence> {
        let earned = rank_of(record.experience, self.rules.is_founder(player));
        (earned != record.rank).then(|| RankDivergence {
            player: player.clone(),
            stored: record.rank,
            earned,
            experience: record.experience,
        })
    }

    pub fn rank_divergence(&mut self, player: &PlayerId) -> Result<Option<RankDivergence>> {
        let ledger = self.store.load()?;
        Ok(self.divergence(player, ledger.player(player)?))
    }

    pub fn divergent_players(&mut self) -> Result<Vec<RankDivergence>> {
        let ledger = self.store.load()?;
        Ok(ledger
            .players()
            .filter_map(|(player, record)| self.divergence(player, record))
            .collect())
    }

    pub fn profile(&mut self, player: &PlayerId) -> Result<Profile> {
        let record = self.player(player)?;
        let next_rank = record
            .rank
            .next()
            .and_then(|rank| rank.threshold().map(|threshold| (rank, threshold)));
        Ok(Profile {
            player: player.clone(),
            rank: record.rank,
            experience: record.experience,
            doubloons: record.doubloons.clone(),
            favor: record.favor,
            favor_expires_at: record.favor_expires_at,
            props: record.props().map(|prop| prop.name).collect(),
            masks: record.masks().map(|mask| mask.name).collect(),
            boosts: compute_boosts(&record),
            next_rank,
        })
    }

    /// Top `limit` players by experience; ties broken by id
    pub fn leaderboard(&mut self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let ledger = self.store.load()?;
        let mut players: Vec<_> = ledger.players().collect();
        players.sort_by(|(a_id, a), (b_id, b)| {
            b.experience.cmp(&a.experience).then_with(|| a_id.cmp(b_id))
        });
        Ok(players
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(index, (player, record))| LeaderboardEntry {
                position: index + 1,
                player: player.clone(),
                rank: record.rank,
                experience: record.experience,
                doubloons: record.doubloons.clone(),
                favor: record.favor,
            })
            .collect())
    }

    /// Newest first
    pub fn activity(&mut self, limit: usize) -> Result<Vec<String>> {
        let ledger = self.store.load()?;
        Ok(ledger.activity.iter().take(limit).map(str::to_string).collect())
    }

    /// Masks for sale, priced for `player` when given
    pub fn shop(&mut self, player: Option<&PlayerId>) -> Result<Vec<ShopListing>> {
        let record = match player {
            Some(player) => Some(self.player(player)?),
            None => None,
        };
        let is_founder = player.is_some_and(|p| self.rules.is_founder(p));
        let multiplier = record
            .as_ref()
            .map(|record| compute_boosts(record).doubloons)
            .unwrap_or(1.0);

        Ok(items::MASKS
            .iter()
            .map(|mask| ShopListing {
                item: mask.name,
                base_price: mask.price(),
                price: if is_founder {
                    Doubloons::zero()
                } else {
                    mask.price().scale(multiplier)
                },
                boost: mask.boost,
                owned: record.as_ref().is_some_and(|r| r.owns(mask.name)),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::ledger::MemoryStore;
    use pretty_assertions::assert_eq;

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn economy() -> (Economy<MemoryStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        let rules = EconomyRules {
            founder: Some(PlayerId::from("founder")),
            privileged: [PlayerId::from("ruler")].into_iter().collect(),
        };
        (
            Economy::with_clock(MemoryStore::new(), rules, clock.clone()),
            clock,
        )
    }

    fn id(raw: &str) -> PlayerId {
        PlayerId::from(raw)
    }

    fn coins(amount: u64) -> Doubloons {
        Doubloons::from(amount)
    }

    fn set_balance(economy: &mut Economy<MemoryStore>, player: &str, amount: u64) {
        let mut ledger = economy.store.load().unwrap();
        ledger.player_mut(&id(player)).unwrap().doubloons = coins(amount);
        economy.store.save(&ledger).unwrap();
    }

    fn edit(economy: &mut Economy<MemoryStore>, player: &str, f: impl FnOnce(&mut PlayerRecord)) {
        let mut ledger = economy.store.load().unwrap();
        f(ledger.player_mut(&id(player)).unwrap());
        economy.store.save(&ledger).unwrap();
    }

    #[test]
    fn test_join_creates_motley_with_ten_doubloons() {
        let (mut economy, _) = economy();
        let change = economy.join(&id("alice")).unwrap();
        assert_eq!(change, RankChange::new(&id("alice"), None, Rank::Motley));
        let record = economy.player(&id("alice")).unwrap();
        assert_eq!(record.doubloons, coins(10));
        assert_eq!(record.rank, Rank::Motley);

        let err = economy.join(&id("alice")).unwrap_err();
        assert!(matches!(err, EconomyError::AlreadyJoined { .. }));
        assert_eq!(economy.activity(10).unwrap().len(), 1);
    }

    #[test]
    fn test_join_refuses_the_activity_key() {
        let (mut economy, _) = economy();
        economy.join(&id("alice")).unwrap();

        let err = economy.join(&id("activity")).unwrap_err();
        assert!(matches!(err, EconomyError::InvalidArgument { .. }));
        assert_eq!(economy.player(&id("alice")).unwrap().doubloons, coins(10));
        assert_eq!(economy.activity(10).unwrap().len(), 1);
    }

    #[test]
    fn test_scepter_holder_daily_claim_matches_float_reward() {
        let (mut economy, _) = economy();
        economy.join(&id("alice")).unwrap();
        edit(&mut economy, "alice", |r| {
            r.grant("Scepter");
        });
        // floor(20 * 1.15) in doubles is 23
        assert_eq!(economy.claim_daily(&id("alice")).unwrap().amount, coins(23));
    }

    #[test]
    fn test_founder_joins_as_founder() {
        let (mut economy, _) = economy();
        let change = economy.join(&id("founder")).unwrap();
        assert_eq!(change.current, Rank::Founder);
    }

    #[test]
    fn test_tenth_card_crosses_into_trickster_exactly_at_200() {
        let (mut economy, _) = economy();
        economy.join(&id("alice")).unwrap();
        for award in 1..=9 {
            let outcome = economy.award_card_experience(&id("bob"), &id("alice")).unwrap();
            assert_eq!(outcome.experience_gained, 20);
            assert_eq!(outcome.experience_total, award * 20);
            assert_eq!(outcome.rank_change, None);
        }
        assert_eq!(economy.rank(&id("alice")).unwrap(), Rank::Motley);

        let tenth = economy.award_card_experience(&id("bob"), &id("alice")).unwrap();
        assert_eq!(tenth.experience_total, 200);
        assert_eq!(
            tenth.rank_change,
            Some(RankChange::new(&id("alice"), Some(Rank::Motley), Rank::Trickster))
        );
    }

    #[test]
    fn test_self_card_is_rejected() {
        let (mut economy, _) = economy();
        economy.join(&id("alice")).unwrap();
        let err = economy.award_card_experience(&id("alice"), &id("alice")).unwrap_err();
        assert!(matches!(err, EconomyError::InvalidArgument { .. }));
    }

    #[test]
    fn test_reaching_jester_knight_unlocks_scepter_once() {
        let (mut economy, _) = economy();
        economy.join(&id("alice")).unwrap();
        edit(&mut economy, "alice", |r| r.experience = 1990);

        let award = economy.award_card_experience(&id("bob"), &id("alice")).unwrap();
        assert_eq!(award.unlocked, vec!["Scepter"]);
        assert_eq!(award.rank_change.unwrap().current, Rank::JesterKnight);
        assert!(economy.player(&id("alice")).unwrap().owns("Scepter"));
        assert!(economy.activity(5).unwrap().iter().any(|e| e.contains("unlocked Scepter")));

        // Scepter now boosts experience: floor(20 * 1.1) = 22
        let again = economy.award_card_experience(&id("bob"), &id("alice")).unwrap();
        assert_eq!(again.experience_gained, 22);
        assert!(again.unlocked.is_empty());
    }

    #[test]
    fn test_daily_claim_respects_cooldown() {
        let (mut economy, clock) = economy();
        economy.join(&id("alice")).unwrap();

        let claim = economy.claim_daily(&id("alice")).unwrap();
        assert_eq!(claim.amount, coins(20));
        assert_eq!(claim.balance, coins(30));

        clock.advance(Duration::hours(23));
        let err = economy.claim_daily(&id("alice")).unwrap_err();
        assert!(matches!(err, EconomyError::CooldownActive { remaining_secs: 3600, .. }));
        assert_eq!(economy.player(&id("alice")).unwrap().doubloons, coins(30));

        clock.advance(Duration::hours(1));
        assert_eq!(economy.claim_daily(&id("alice")).unwrap().balance, coins(50));
    }

    #[test]
    fn test_daily_claim_scales_with_favor() {
        let (mut economy, _) = economy();
        economy.join(&id("alice")).unwrap();
        edit(&mut economy, "alice", |r| r.favor = 50);
        assert_eq!(economy.claim_daily(&id("alice")).unwrap().amount, coins(30));
    }

    #[test]
    fn test_purchase_debits_scaled_price() {
        let (mut economy, _) = economy();
        economy.join(&id("alice")).unwrap();
        set_balance(&mut economy, "alice", 100);
        edit(&mut economy, "alice", |r| r.favor = 10);

        let purchase = economy.purchase_item(&id("alice"), "comedy mask").unwrap();
        assert_eq!(purchase.item, "Comedy Mask");
        assert_eq!(purchase.price, coins(55));
        assert_eq!(purchase.balance, coins(45));
        assert!(economy.player(&id("alice")).unwrap().owns("Comedy Mask"));
    }

    #[test]
    fn test_failed_purchase_leaves_record_untouched() {
        let (mut economy, _) = economy();
        economy.join(&id("alice")).unwrap();
        let before = economy.player(&id("alice")).unwrap();

        let err = economy.purchase_item(&id("alice"), "Masquerade Mask").unwrap_err();
        assert!(matches!(err, EconomyError::InsufficientFunds { .. }));
        assert_eq!(economy.player(&id("alice")).unwrap(), before);

        let err = economy.purchase_item(&id("alice"), "Clown Nose").unwrap_err();
        assert!(matches!(err, EconomyError::ItemNotFound { .. }));

        let err = economy.purchase_item(&id("alice"), "Crown").unwrap_err();
        assert!(matches!(err, EconomyError::InvalidArgument { .. }));
        assert_eq!(economy.player(&id("alice")).unwrap(), before);
    }

    #[test]
    fn test_gift_debits_exact_amount_and_credits_with_sender_boost() {
        let (mut economy, _) = economy();
        economy.join(&id("alice")).unwrap();
        economy.join(&id("bob")).unwrap();
        set_balance(&mut economy, "alice", 100);
        edit(&mut economy, "alice", |r| r.favor = 50);

        let gift = economy.gift_currency(&id("alice"), &id("bob"), &coins(40)).unwrap();
        assert_eq!(gift.debited, coins(40));
        assert_eq!(gift.credited, coins(60));
        assert_eq!(gift.bonus_experience, 15);

        assert_eq!(economy.player(&id("alice")).unwrap().doubloons, coins(60));
        let bob = economy.player(&id("bob")).unwrap();
        assert_eq!(bob.doubloons, coins(70));
        assert_eq!(bob.experience, 15);
    }

    #[test]
    fn test_gift_rejects_overdraw_and_unknown_recipient() {
        let (mut economy, _) = economy();
        economy.join(&id("alice")).unwrap();
        economy.join(&id("bob")).unwrap();

        let err = economy.gift_currency(&id("alice"), &id("bob"), &coins(11)).unwrap_err();
        assert!(matches!(err, EconomyError::InsufficientFunds { .. }));
        let err = economy.gift_currency(&id("alice"), &id("carol"), &coins(1)).unwrap_err();
        assert!(matches!(err, EconomyError::PlayerNotFound { .. }));
        let err = economy.gift_currency(&id("alice"), &id("bob"), &coins(0)).unwrap_err();
        assert!(matches!(err, EconomyError::InvalidArgument { .. }));
        assert_eq!(economy.player(&id("alice")).unwrap().doubloons, coins(10));
    }

    #[test]
    fn test_founder_gifts_without_debit() {
        let (mut economy, _) = economy();
        economy.join(&id("founder")).unwrap();
        economy.join(&id("bob")).unwrap();
        let gift = economy.gift_currency(&id("founder"), &id("bob"), &coins(1000)).unwrap();
        assert_eq!(gift.debited, coins(0));
        assert_eq!(economy.player(&id("founder")).unwrap().doubloons, coins(10));
        assert_eq!(economy.player(&id("bob")).unwrap().doubloons, coins(1010));
    }

    #[test]
    fn test_favor_requires_standing_and_clamps() {
        let (mut economy, _) = economy();
        economy.join(&id("alice")).unwrap();
        economy.join(&id("bob")).unwrap();

        let err = economy.grant_favor(&id("bob"), &id("alice"), 10, None).unwrap_err();
        assert!(matches!(err, EconomyError::NotPrivileged { .. }));

        assert_eq!(economy.grant_favor(&id("ruler"), &id("alice"), 70, None).unwrap().favor, 70);
        assert_eq!(economy.grant_favor(&id("founder"), &id("alice"), 70, None).unwrap().favor, 100);
        assert_eq!(economy.grant_favor(&id("ruler"), &id("alice"), -500, None).unwrap().favor, 0);

        // The top tier carries standing of its own
        edit(&mut economy, "bob", |r| r.rank = Rank::TheJestersHand);
        assert_eq!(economy.grant_favor(&id("bob"), &id("alice"), 5, None).unwrap().favor, 5);
    }

    #[test]
    fn test_favor_duration_out_of_range_is_rejected() {
        let (mut economy, _) = economy();
        economy.join(&id("alice")).unwrap();
        let saves = economy.store().saves();

        let err = economy
            .grant_favor(&id("founder"), &id("alice"), 10, Some(Duration::MAX))
            .unwrap_err();
        assert!(matches!(err, EconomyError::InvalidArgument { .. }));
        assert_eq!(economy.store().saves(), saves);
        assert_eq!(economy.player(&id("alice")).unwrap().favor, 0);
    }

    #[test]
    fn test_favor_expiry_sweep() {
        let (mut economy, clock) = economy();
        economy.join(&id("alice")).unwrap();
        economy.join(&id("bob")).unwrap();
        economy
            .grant_favor(&id("ruler"), &id("alice"), 30, Some(Duration::minutes(5)))
            .unwrap();
        economy.grant_favor(&id("ruler"), &id("bob"), 20, None).unwrap();

        let saves = economy.store().saves();
        assert_eq!(economy.sweep_expired_favor().unwrap(), 0);
        assert_eq!(economy.store().saves(), saves);

        clock.advance(Duration::minutes(5));
        assert_eq!(economy.sweep_expired_favor().unwrap(), 1);
        let alice = economy.player(&id("alice")).unwrap();
        assert_eq!(alice.favor, 0);
        assert_eq!(alice.favor_expires_at, None);
        assert_eq!(economy.player(&id("bob")).unwrap().favor, 20);
    }

    #[test]
    fn test_drop_slot_rejects_second_drop_until_picked_up() {
        let (mut economy, _) = economy();
        for player in ["alice", "bob", "carol"] {
            economy.join(&id(player)).unwrap();
        }
        set_balance(&mut economy, "alice", 100);

        assert_eq!(economy.drop_currency(&id("alice"), &coins(30)).unwrap(), coins(70));

        let err = economy.drop_currency(&id("bob"), &coins(5)).unwrap_err();
        assert!(matches!(err, EconomyError::DropPending { .. }));
        assert_eq!(economy.player(&id("bob")).unwrap().doubloons, coins(10));

        let pickup = economy.pick_up_drop(&id("carol")).unwrap();
        assert_eq!(pickup.amount, coins(30));
        assert_eq!(pickup.balance, coins(40));
        assert_eq!(pickup.dropper, id("alice"));

        assert!(matches!(economy.pick_up_drop(&id("bob")), Err(EconomyError::NothingDropped)));
        assert_eq!(economy.drop_currency(&id("bob"), &coins(5)).unwrap(), coins(5));
    }

    #[test]
    fn test_failed_save_leaves_drop_slot_empty() {
        let (mut economy, _) = economy();
        economy.join(&id("alice")).unwrap();
        economy.store_mut().fail_saves(true);

        let err = economy.drop_currency(&id("alice"), &coins(5)).unwrap_err();
        assert!(matches!(err, EconomyError::PersistenceFailed { .. }));
        assert!(economy.dropped().is_none());

        economy.store_mut().fail_saves(false);
        assert_eq!(economy.player(&id("alice")).unwrap().doubloons, coins(10));
    }

    #[test]
    fn test_rank_override_is_visible_as_divergence() {
        let (mut economy, _) = economy();
        economy.join(&id("alice")).unwrap();
        assert_eq!(economy.rank_divergence(&id("alice")).unwrap(), None);

        let change = economy
            .override_rank(&id("ruler"), &id("alice"), Rank::Harlequin)
            .unwrap();
        assert_eq!(change.unwrap().current, Rank::Harlequin);

        let divergence = economy.rank_divergence(&id("alice")).unwrap().unwrap();
        assert_eq!(divergence.stored, Rank::Harlequin);
        assert_eq!(divergence.earned, Rank::Motley);
        assert_eq!(economy.divergent_players().unwrap().len(), 1);

        let err = economy
            .override_rank(&id("ruler"), &id("alice"), Rank::Founder)
            .unwrap_err();
        assert!(matches!(err, EconomyError::InvalidArgument { .. }));
    }

    #[test]
    fn test_experience_override_keeps_rank() {
        let (mut economy, _) = economy();
        economy.join(&id("alice")).unwrap();
        let previous = economy
            .override_experience(&id("founder"), &id("alice"), 5000)
            .unwrap();
        assert_eq!(previous, 0);
        assert_eq!(economy.rank(&id("alice")).unwrap(), Rank::Motley);
        assert_eq!(economy.rank_divergence(&id("alice")).unwrap().unwrap().earned, Rank::FoolsRegent);
    }

    #[test]
    fn test_leaderboard_orders_by_experience() {
        let (mut economy, _) = economy();
        for (player, experience) in [("alice", 300), ("bob", 900), ("carol", 300)] {
            economy.join(&id(player)).unwrap();
            edit(&mut economy, player, |r| r.experience = experience);
        }
        let board = economy.leaderboard(2).unwrap();
        let order: Vec<_> = board.iter().map(|e| e.player.as_str()).collect();
        assert_eq!(order, vec!["bob", "alice"]);
        assert_eq!(board[1].position, 2);
    }

    #[test]
    fn test_profile_and_shop() {
        let (mut economy, _) = economy();
        economy.join(&id("alice")).unwrap();
        edit(&mut economy, "alice", |r| {
            r.grant("Tragedy Mask");
            r.experience = 250;
            r.rank = Rank::Trickster;
        });

        let profile = economy.profile(&id("alice")).unwrap();
        assert_eq!(profile.masks, vec!["Tragedy Mask"]);
        assert!(profile.props.is_empty());
        assert_eq!(profile.next_rank, Some((Rank::Prankmaster, 600)));

        let shop = economy.shop(Some(&id("alice"))).unwrap();
        assert_eq!(shop.len(), 3);
        assert!(shop.iter().find(|l| l.item == "Tragedy Mask").unwrap().owned);
        assert_eq!(shop[2].price, coins(100));
    }
}
