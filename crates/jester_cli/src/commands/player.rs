use jester_core::{Doubloons, EconomyError, PlayerId};
use miette::Result;
use owo_colors::OwoColorize;

use super::Court;
use crate::output::{Output, format_doubloons, format_rank, format_relative_time, format_wait};

/// Enroll a player
pub async fn join(court: &Court, player: &PlayerId, output: &Output) -> Result<()> {
    let change = court.join(player).await?;
    if output.is_json() {
        return output.json(&change);
    }

    output.success(&format!(
        "{} joined the Court as {}",
        player.bright_cyan(),
        format_rank(change.current)
    ));
    Ok(())
}

/// Hand a card to another player
pub async fn card(court: &Court, actor: &PlayerId, target: &PlayerId, output: &Output) -> Result<()> {
    let award = court.award_card_experience(actor, target).await?;
    if output.is_json() {
        return output.json(&award);
    }

    output.success(&format!(
        "{} gave a card to {} (+{} EXP, {} total)",
        actor.bright_cyan(),
        target.bright_cyan(),
        award.experience_gained,
        award.experience_total
    ));
    if let Some(change) = &award.rank_change {
        output.info("🎉", &format!("{} is now {}", target, format_rank(change.current)));
    }
    for prop in &award.unlocked {
        output.info("🎁", &format!("Unlocked {}", prop.bright_yellow()));
    }
    Ok(())
}

/// Collect the daily doubloons
pub async fn daily(court: &Court, player: &PlayerId, output: &Output) -> Result<()> {
    match court.claim_daily(player).await {
        Ok(claim) if output.is_json() => output.json(&claim),
        Ok(claim) => {
            output.success(&format!(
                "{} collected {}",
                player.bright_cyan(),
                format_doubloons(&claim.amount)
            ));
            output.kv("Balance", &format_doubloons(&claim.balance));
            Ok(())
        }
        Err(EconomyError::CooldownActive { remaining_secs, .. }) if !output.is_json() => {
            output.warning(&format!(
                "Daily already collected; come back in {}",
                format_wait(remaining_secs)
            ));
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Buy a mask from the shop
pub async fn buy(court: &Court, player: &PlayerId, item: &str, output: &Output) -> Result<()> {
    let purchase = court.purchase_item(player, item).await?;
    if output.is_json() {
        return output.json(&purchase);
    }

    output.success(&format!(
        "{} bought the {} for {}",
        player.bright_cyan(),
        purchase.item.bright_yellow(),
        format_doubloons(&purchase.price)
    ));
    output.kv("Balance", &format_doubloons(&purchase.balance));
    Ok(())
}

/// Send doubloons to another player
pub async fn gift(
    court: &Court,
    sender: &PlayerId,
    recipient: &PlayerId,
    amount: &Doubloons,
    output: &Output,
) -> Result<()> {
    let gift = court.gift_currency(sender, recipient, amount).await?;
    if output.is_json() {
        return output.json(&gift);
    }

    output.success(&format!(
        "{} gifted {} to {}",
        sender.bright_cyan(),
        format_doubloons(&gift.debited),
        recipient.bright_cyan()
    ));
    output.kv("Received", &format_doubloons(&gift.credited));
    output.kv("Bonus EXP", &gift.bonus_experience.to_string());
    if let Some(change) = &gift.rank_change {
        output.info("🎉", &format!("{} is now {}", recipient, format_rank(change.current)));
    }
    Ok(())
}

/// Show a player's standing
pub async fn profile(court: &Court, player: &PlayerId, output: &Output) -> Result<()> {
    let profile = court.profile(player)?;
    if output.is_json() {
        return output.json(&profile);
    }

    output.section(&format!("Profile of {}", player));
    output.kv("Rank", &format_rank(profile.rank));
    output.kv("Experience", &profile.experience.to_string());
    if let Some((next, threshold)) = profile.next_rank {
        output.kv(
            "Next rank",
            &format!(
                "{} at {} EXP ({} to go)",
                format_rank(next),
                threshold,
                threshold.saturating_sub(profile.experience)
            ),
        );
    }
    output.kv("Doubloons", &format_doubloons(&profile.doubloons));

    let favor = match profile.favor_expires_at {
        Some(at) => format!("{} (expires {})", profile.favor, format_relative_time(at)),
        None => profile.favor.to_string(),
    };
    output.kv("Favor", &favor);

    output.section("Items");
    if profile.masks.is_empty() && profile.props.is_empty() {
        output.status("No items yet");
    }
    for mask in &profile.masks {
        output.list_item(&format!("🎭 {}", mask));
    }
    for prop in &profile.props {
        output.list_item(&format!("👑 {}", prop.bright_yellow()));
    }

    output.section("Boosts");
    output.kv("EXP", &format!("x{:.2}", profile.boosts.experience));
    output.kv("Doubloons", &format!("x{:.2}", profile.boosts.doubloons));
    output.kv("Mask", &format!("x{:.2}", profile.boosts.mask));
    output.kv("Drops", &format!("x{:.2}", profile.boosts.drops));
    if profile.boosts.minor_luck {
        output.kv("Luck", "🍀 minor luck");
    }
    Ok(())
}
