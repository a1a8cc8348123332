use jester_core::config::{self, JesterConfig};
use miette::{IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use std::path::PathBuf;

use crate::output::Output;

/// Show current configuration
pub async fn show(config: &JesterConfig, output: &Output) -> Result<()> {
    if output.is_json() {
        return output.json(config);
    }

    output.section("Current Configuration");
    println!();

    let toml_str = toml::to_string_pretty(config).into_diagnostic()?;
    println!("{}", toml_str);

    if config.founder.is_none() {
        output.warning("No founder configured; economy commands will refuse to run");
    }
    Ok(())
}

/// Save current configuration to file
pub async fn save(config: &JesterConfig, path: &PathBuf, output: &Output) -> Result<()> {
    output.info(
        "💾",
        &format!("Saving configuration to: {}", path.display()),
    );

    config::save_config(config, path).await?;

    output.success("Configuration saved successfully!");
    println!();
    println!("To use this configuration, run:");
    println!("  {} --config {}", "jester".bright_green(), path.display());

    Ok(())
}
