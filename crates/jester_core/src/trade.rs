//! Peer-to-peer trades
//!
//! An offer is keyed by its recipient, and each recipient holds at most one.
//! Offers live in process memory only. The sender's balance and items are
//! checked when the offer is made and again when it is accepted; the second
//! check is the one that counts.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::economy::Economy;
use crate::items::{self, Item};
use crate::ledger::{Ledger, LedgerStore};
use crate::{Doubloons, EconomyError, PlayerId, Result};

/// An outstanding offer from `sender` to whoever it is keyed under
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingTrade {
    pub sender: PlayerId,
    pub doubloons: Doubloons,
    pub items: Vec<&'static str>,
}

impl PendingTrade {
    pub fn is_empty(&self) -> bool {
        self.doubloons.is_zero() && self.items.is_empty()
    }
}

/// A settled trade, as reported back to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeSettlement {
    pub sender: PlayerId,
    pub recipient: PlayerId,
    pub doubloons: Doubloons,
    pub items: Vec<&'static str>,
}

/// Table of pending offers, one per recipient
#[derive(Debug, Clone, Default)]
pub struct TradeCoordinator {
    pending: BTreeMap<PlayerId, PendingTrade>,
}

impl TradeCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, recipient: &PlayerId) -> Option<&PendingTrade> {
        self.pending.get(recipient)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PlayerId, &PendingTrade)> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Store `offer` for `recipient` unless one is already waiting
    pub fn offer(&mut self, recipient: &PlayerId, offer: PendingTrade) -> Result<()> {
        if let Some(existing) = self.pending.get(recipient) {
            return Err(EconomyError::OfferPending {
                recipient: recipient.clone(),
                sender: existing.sender.clone(),
            });
        }
        self.pending.insert(recipient.clone(), offer);
        Ok(())
    }

    pub fn take(&mut self, recipient: &PlayerId) -> Result<PendingTrade> {
        self.pending
            .remove(recipient)
            .ok_or_else(|| EconomyError::NoPendingOffer {
                recipient: recipient.clone(),
            })
    }

    /// Remove the offer only if it came from `sender`
    pub fn withdraw(&mut self, sender: &PlayerId, recipient: &PlayerId) -> Result<PendingTrade> {
        match self.pending.get(recipient) {
            Some(offer) if &offer.sender == sender => self.take(recipient),
            _ => Err(EconomyError::NoPendingOffer {
                recipient: recipient.clone(),
            }),
        }
    }
}

/// Resolve offered item names to catalog masks, dropping duplicates
fn resolve_items(names: &[&str]) -> Result<Vec<&'static str>> {
    let mut resolved = Vec::with_capacity(names.len());
    for name in names {
        let item = items::find_item(name).ok_or_else(|| EconomyError::ItemNotFound {
            name: name.trim().to_string(),
            available: items::catalog_names(),
        })?;
        match item {
            Item::Mask(mask) => {
                if !resolved.contains(&mask.name) {
                    resolved.push(mask.name);
                }
            }
            Item::Prop(prop) => {
                return Err(EconomyError::invalid_argument(
                    "items",
                    format!("{} is bound to its holder and cannot be traded", prop.name),
                ));
            }
        }
    }
    Ok(resolved)
}

/// The sender can still cover every part of `offer`
fn check_coverage(ledger: &Ledger, offer: &PendingTrade) -> Result<()> {
    let record = ledger.player(&offer.sender)?;
    if record.doubloons < offer.doubloons {
        return Err(EconomyError::insufficient_funds(
            &offer.sender,
            offer.doubloons.clone(),
            record.doubloons.clone(),
        ));
    }
    if let Some(missing) = offer.items.iter().find(|item| !record.owns(item)) {
        return Err(EconomyError::ItemNotOwned {
            player: offer.sender.clone(),
            item: missing.to_string(),
        });
    }
    Ok(())
}

impl<S: LedgerStore> Economy<S> {
    /// Offer doubloons and masks to `recipient`. Nothing moves until the
    /// recipient accepts.
    pub fn propose_trade(
        &mut self,
        sender: &PlayerId,
        recipient: &PlayerId,
        doubloons: &Doubloons,
        item_names: &[&str],
    ) -> Result<PendingTrade> {
        if sender == recipient {
            return Err(EconomyError::invalid_argument(
                "recipient",
                "players cannot trade with themselves",
            ));
        }
        let offer = PendingTrade {
            sender: sender.clone(),
            doubloons: doubloons.clone(),
            items: resolve_items(item_names)?,
        };
        if offer.is_empty() {
            return Err(EconomyError::invalid_argument(
                "offer",
                "a trade must offer doubloons or at least one mask",
            ));
        }

        let ledger = self.store.load()?;
        ledger.player(recipient)?;
        check_coverage(&ledger, &offer)?;

        self.trades.offer(recipient, offer.clone())?;
        info!(
            "{} offered {} doubloons and {:?} to {}",
            sender, offer.doubloons, offer.items, recipient
        );
        Ok(offer)
    }

    /// Settle the pending offer for `recipient`.
    ///
    /// A stale offer the sender can no longer cover is discarded. A failed
    /// save keeps the offer so it can be accepted again.
    pub fn accept_trade(&mut self, recipient: &PlayerId) -> Result<TradeSettlement> {
        let offer = self
            .trades
            .get(recipient)
            .cloned()
            .ok_or_else(|| EconomyError::NoPendingOffer {
                recipient: recipient.clone(),
            })?;

        let mut ledger = self.store.load()?;
        let still_valid = ledger
            .player(recipient)
            .and_then(|_| check_coverage(&ledger, &offer));
        if let Err(e) = still_valid {
            debug!("Discarding stale offer for {}: {}", recipient, e);
            self.trades.take(recipient)?;
            return Err(e);
        }

        let sender = ledger.player_mut(&offer.sender)?;
        sender.doubloons = sender
            .doubloons
            .checked_sub(&offer.doubloons)
            .ok_or_else(|| {
                EconomyError::insufficient_funds(&offer.sender, offer.doubloons.clone(), sender.doubloons.clone())
            })?;
        for item in &offer.items {
            sender.surrender(item);
        }

        let receiver = ledger.player_mut(recipient)?;
        receiver.doubloons += &offer.doubloons;
        for item in &offer.items {
            receiver.grant(item);
        }

        let items = if offer.items.is_empty() {
            "no items".to_string()
        } else {
            offer.items.join(", ")
        };
        ledger.record_activity(format!(
            "🤝 {} traded {} doubloons and {} to {}",
            offer.sender.mention(),
            offer.doubloons,
            items,
            recipient.mention()
        ));
        self.commit(&ledger)?;

        self.trades.take(recipient)?;
        info!("{} accepted trade from {}", recipient, offer.sender);
        Ok(TradeSettlement {
            sender: offer.sender,
            recipient: recipient.clone(),
            doubloons: offer.doubloons,
            items: offer.items,
        })
    }

    /// Recipient declines the pending offer
    pub fn reject_trade(&mut self, recipient: &PlayerId) -> Result<PendingTrade> {
        let sender = self
            .trades
            .get(recipient)
            .map(|offer| offer.sender.clone())
            .ok_or_else(|| EconomyError::NoPendingOffer {
                recipient: recipient.clone(),
            })?;

        let mut ledger = self.store.load()?;
        ledger.record_activity(format!(
            "❌ {} declined the trade from {}",
            recipient.mention(),
            sender.mention()
        ));
        self.commit(&ledger)?;

        let offer = self.trades.take(recipient)?;
        info!("{} rejected trade from {}", recipient, sender);
        Ok(offer)
    }

    /// Sender withdraws an offer they made to `recipient`
    pub fn cancel_trade(&mut self, sender: &PlayerId, recipient: &PlayerId) -> Result<PendingTrade> {
        let offer = self.trades.withdraw(sender, recipient)?;
        info!("{} withdrew trade offer to {}", sender, recipient);
        Ok(offer)
    }

    pub fn pending_offer(&self, recipient: &PlayerId) -> Option<&PendingTrade> {
        self.trades.get(recipient)
    }

    /// Every outstanding offer as `(recipient, offer)`
    pub fn pending_offers(&self) -> Vec<(PlayerId, PendingTrade)> {
        self.trades
            .iter()
            .map(|(recipient, offer)| (recipient.clone(), offer.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::EconomyRules;
    use crate::ledger::MemoryStore;
    use pretty_assertions::assert_eq;

    fn id(raw: &str) -> PlayerId {
        PlayerId::from(raw)
    }

    fn coins(amount: u64) -> Doubloons {
        Doubloons::from(amount)
    }

    fn court() -> Economy<MemoryStore> {
        let mut economy = Economy::new(MemoryStore::new(), EconomyRules::default());
        economy.join(&id("alice")).unwrap();
        economy.join(&id("bob")).unwrap();
        economy.join(&id("carol")).unwrap();
        let mut ledger = economy.store.load().unwrap();
        let alice = ledger.player_mut(&id("alice")).unwrap();
        alice.doubloons = coins(100);
        alice.grant("Comedy Mask");
        alice.grant("Scepter");
        economy.store.save(&ledger).unwrap();
        economy
    }

    #[test]
    fn test_coordinator_holds_one_offer_per_recipient() {
        let mut trades = TradeCoordinator::new();
        let offer = PendingTrade {
            sender: id("alice"),
            doubloons: coins(5),
            items: vec![],
        };
        trades.offer(&id("bob"), offer.clone()).unwrap();
        let err = trades.offer(&id("bob"), offer).unwrap_err();
        assert!(matches!(err, EconomyError::OfferPending { .. }));
        assert_eq!(trades.len(), 1);

        assert!(trades.withdraw(&id("carol"), &id("bob")).is_err());
        assert_eq!(trades.withdraw(&id("alice"), &id("bob")).unwrap().doubloons, coins(5));
        assert!(trades.is_empty());
    }

    #[test]
    fn test_propose_validates_sender_holdings() {
        let mut economy = court();
        let err = economy
            .propose_trade(&id("alice"), &id("bob"), &coins(101), &[])
            .unwrap_err();
        assert!(matches!(err, EconomyError::InsufficientFunds { .. }));

        let err = economy
            .propose_trade(&id("alice"), &id("bob"), &coins(0), &["Tragedy Mask"])
            .unwrap_err();
        assert!(matches!(err, EconomyError::ItemNotOwned { .. }));

        let err = economy
            .propose_trade(&id("alice"), &id("bob"), &coins(0), &["Scepter"])
            .unwrap_err();
        assert!(matches!(err, EconomyError::InvalidArgument { .. }));

        let err = economy
            .propose_trade(&id("alice"), &id("bob"), &coins(0), &[])
            .unwrap_err();
        assert!(matches!(err, EconomyError::InvalidArgument { .. }));

        assert!(economy.pending_offers().is_empty());
    }

    #[test]
    fn test_second_offer_to_same_recipient_is_rejected() {
        let mut economy = court();
        economy
            .propose_trade(&id("alice"), &id("bob"), &coins(10), &[])
            .unwrap();
        let err = economy
            .propose_trade(&id("carol"), &id("bob"), &coins(1), &[])
            .unwrap_err();
        assert!(matches!(err, EconomyError::OfferPending { .. }));
        assert_eq!(economy.pending_offer(&id("bob")).unwrap().sender, id("alice"));
    }

    #[test]
    fn test_accept_moves_doubloons_and_masks() {
        let mut economy = court();
        economy
            .propose_trade(&id("alice"), &id("bob"), &coins(30), &["comedy mask"])
            .unwrap();
        let settlement = economy.accept_trade(&id("bob")).unwrap();
        assert_eq!(settlement.items, vec!["Comedy Mask"]);

        let alice = economy.player(&id("alice")).unwrap();
        let bob = economy.player(&id("bob")).unwrap();
        assert_eq!(alice.doubloons, coins(70));
        assert_eq!(bob.doubloons, coins(40));
        assert!(!alice.owns("Comedy Mask"));
        assert!(bob.owns("Comedy Mask"));
        assert!(economy.pending_offer(&id("bob")).is_none());
    }

    #[test]
    fn test_stale_offer_is_discarded_on_accept() {
        let mut economy = court();
        economy
            .propose_trade(&id("alice"), &id("bob"), &coins(90), &[])
            .unwrap();
        economy
            .gift_currency(&id("alice"), &id("carol"), &coins(50))
            .unwrap();

        let err = economy.accept_trade(&id("bob")).unwrap_err();
        assert!(matches!(err, EconomyError::InsufficientFunds { .. }));
        assert!(economy.pending_offer(&id("bob")).is_none());
        assert_eq!(economy.player(&id("bob")).unwrap().doubloons, coins(10));
    }

    #[test]
    fn test_failed_save_keeps_offer_for_retry() {
        let mut economy = court();
        economy
            .propose_trade(&id("alice"), &id("bob"), &coins(10), &[])
            .unwrap();
        economy.store_mut().fail_saves(true);
        let err = economy.accept_trade(&id("bob")).unwrap_err();
        assert!(matches!(err, EconomyError::PersistenceFailed { .. }));
        assert!(economy.pending_offer(&id("bob")).is_some());

        economy.store_mut().fail_saves(false);
        economy.accept_trade(&id("bob")).unwrap();
        assert_eq!(economy.player(&id("bob")).unwrap().doubloons, coins(20));
    }

    #[test]
    fn test_reject_and_cancel() {
        let mut economy = court();
        economy
            .propose_trade(&id("alice"), &id("bob"), &coins(10), &[])
            .unwrap();
        economy.reject_trade(&id("bob")).unwrap();
        assert!(matches!(
            economy.reject_trade(&id("bob")),
            Err(EconomyError::NoPendingOffer { .. })
        ));

        economy
            .propose_trade(&id("alice"), &id("carol"), &coins(10), &[])
            .unwrap();
        assert!(economy.cancel_trade(&id("bob"), &id("carol")).is_err());
        economy.cancel_trade(&id("alice"), &id("carol")).unwrap();
        assert!(economy.pending_offers().is_empty());
        assert_eq!(economy.player(&id("alice")).unwrap().doubloons, coins(100));
    }
}
