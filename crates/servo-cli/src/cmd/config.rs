use crate::output::{print_json, Table};
use anyhow::Context;
use clap::Subcommand;
use servo_core::config::{Config, WarnLevel};
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Validate the config for common mistakes
    Check,

    /// Show the effective configuration (defaults applied)
    Show,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(path: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Check => check(path, json),
        ConfigSubcommand::Show => show(path, json),
    }
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

fn check(path: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    let warnings = config.validate();

    if json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(path: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load_or_default(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;

    if json {
        return print_json(&config);
    }

    println!("listen: {}", config.bind_addr());
    println!("log level: {}", config.log.level);

    if config.servos.is_empty() {
        println!("\nNo servos configured at startup.");
    } else {
        println!();
        let mut table = Table::new(&["CHANNEL", "PULSE_US", "INITIAL", "INVERTED", "LIMITS"]);
        for (channel, s) in &config.servos {
            let limits = s.effective_limits();
            table.row(vec![
                channel.to_string(),
                format!("{}-{}", s.min_pulse, s.max_pulse),
                s.initial_position.to_string(),
                if s.inverted { "yes" } else { "no" }.to_string(),
                format!("{}..{}", limits.min_angle, limits.max_angle),
            ]);
        }
        table.print();
    }

    if !config.patterns.is_empty() {
        println!();
        let mut table = Table::new(&["PATTERN", "STEPS", "DURATION"]);
        for p in &config.patterns {
            table.row(vec![
                p.name.clone(),
                p.steps.len().to_string(),
                format!("{:.1}s", p.total_duration().as_secs_f64()),
            ]);
        }
        table.print();
    }

    Ok(())
}
