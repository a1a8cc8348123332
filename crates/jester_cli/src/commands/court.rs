use jester_core::PlayerId;
use miette::Result;
use owo_colors::OwoColorize;

use super::Court;
use crate::output::{Output, format_doubloons, format_rank};

/// Top players by experience
pub async fn leaderboard(court: &Court, limit: usize, output: &Output) -> Result<()> {
    let entries = court.leaderboard(limit)?;
    if output.is_json() {
        return output.json(&entries);
    }

    output.section("🏆 Court Leaderboard");
    if entries.is_empty() {
        output.status("Nobody has joined yet");
        return Ok(());
    }

    output.table_header(&["#", "Player", "Rank", "EXP", "Doubloons"]);
    for entry in &entries {
        output.table_row(&[
            &entry.position.to_string(),
            entry.player.as_str(),
            &format_rank(entry.rank),
            &entry.experience.to_string(),
            &entry.doubloons.to_string(),
        ]);
    }
    Ok(())
}

/// Recent court activity, newest first
pub async fn activity(court: &Court, limit: usize, output: &Output) -> Result<()> {
    let entries = court.activity(limit)?;
    if output.is_json() {
        return output.json(&entries);
    }

    output.section("📜 Recent Activity");
    if entries.is_empty() {
        output.status("Nothing has happened yet");
    }
    for entry in &entries {
        output.list_item(entry);
    }
    Ok(())
}

/// Masks for sale, priced for `player` when given
pub async fn shop(court: &Court, player: Option<&PlayerId>, output: &Output) -> Result<()> {
    let listings = court.shop(player)?;
    if output.is_json() {
        return output.json(&listings);
    }

    output.section("🛒 Mask Shop");
    for listing in &listings {
        let owned = if listing.owned {
            " (owned)".dimmed().to_string()
        } else {
            String::new()
        };
        let price = if listing.price == listing.base_price {
            format_doubloons(&listing.price)
        } else {
            format!(
                "{} {}",
                format_doubloons(&listing.price),
                format!("(base {})", listing.base_price).dimmed()
            )
        };
        output.list_item(&format!(
            "🎭 {} x{:.2} for {}{}",
            listing.item.bright_white().bold(),
            listing.boost,
            price,
            owned
        ));
    }
    if let Some(player) = player {
        output.status(&format!("Prices shown for {}", player));
    }
    Ok(())
}
