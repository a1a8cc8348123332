use chrono::Duration;
use jester_core::{EconomyError, PlayerId, Rank};
use miette::{IntoDiagnostic, Result};
use owo_colors::OwoColorize;

use super::Court;
use crate::output::{Output, format_rank, format_relative_time};

/// Grant (or take away) favor
pub async fn favor(
    court: &Court,
    granter: &PlayerId,
    target: &PlayerId,
    amount: i64,
    minutes: Option<i64>,
    output: &Output,
) -> Result<()> {
    let duration = favor_duration(minutes)?;
    let grant = court.grant_favor(granter, target, amount, duration).await?;
    if output.is_json() {
        return output.json(&grant);
    }

    output.success(&format!(
        "{} now has {} favor",
        target.bright_cyan(),
        grant.favor.to_string().bright_white()
    ));
    if let Some(at) = grant.expires_at {
        output.kv("Expires", &format_relative_time(at));
    }
    Ok(())
}

fn favor_duration(minutes: Option<i64>) -> Result<Option<Duration>, EconomyError> {
    minutes
        .map(|minutes| {
            Duration::try_minutes(minutes).ok_or_else(|| {
                EconomyError::invalid_argument("minutes", format!("{} minutes is out of range", minutes))
            })
        })
        .transpose()
}

/// Set a stored rank directly
pub async fn set_rank(
    court: &Court,
    granter: &PlayerId,
    target: &PlayerId,
    rank: Rank,
    output: &Output,
) -> Result<()> {
    let change = court.override_rank(granter, target, rank).await?;
    if output.is_json() {
        return output.json(&change);
    }

    match change {
        Some(change) => output.success(&format!(
            "{} is now {}",
            target.bright_cyan(),
            format_rank(change.current)
        )),
        None => output.status(&format!("{} already holds {}", target, rank)),
    }
    Ok(())
}

/// Set experience directly, leaving the rank alone
pub async fn set_experience(
    court: &Court,
    granter: &PlayerId,
    target: &PlayerId,
    experience: u64,
    output: &Output,
) -> Result<()> {
    let previous = court.override_experience(granter, target, experience).await?;
    if output.is_json() {
        return output.json(&serde_json::json!({ "previous": previous, "current": experience }));
    }

    output.success(&format!(
        "{} experience set from {} to {}",
        target.bright_cyan(),
        previous,
        experience
    ));
    Ok(())
}

/// List players whose stored rank disagrees with their experience
pub async fn divergence(court: &Court, output: &Output) -> Result<()> {
    let divergent = court.divergent_players()?;
    if output.is_json() {
        return output.json(&divergent);
    }

    output.section("Rank Divergence");
    if divergent.is_empty() {
        output.success("Every stored rank matches its experience");
        return Ok(());
    }

    output.table_header(&["Player", "Stored", "Earned", "EXP"]);
    for entry in &divergent {
        output.table_row(&[
            entry.player.as_str(),
            &format_rank(entry.stored),
            &format_rank(entry.earned),
            &entry.experience.to_string(),
        ]);
    }
    Ok(())
}

/// Clear expired favor once
pub async fn sweep(court: &Court, output: &Output) -> Result<()> {
    let cleared = court.sweep_expired_favor()?;
    if output.is_json() {
        return output.json(&serde_json::json!({ "cleared": cleared }));
    }

    output.success(&format!("Favor expired for {} players", cleared));
    Ok(())
}

/// Keep sweeping expired favor until interrupted
pub async fn watch(court: &Court, every: Duration, output: &Output) -> Result<()> {
    output.info(
        "⌛",
        &format!("Sweeping expired favor every {}s, Ctrl-C to stop", every.num_seconds()),
    );
    let handle = court.spawn_favor_sweep(every);
    tokio::signal::ctrl_c().await.into_diagnostic()?;
    handle.abort();
    output.status("Favor sweep stopped");
    Ok(())
}
