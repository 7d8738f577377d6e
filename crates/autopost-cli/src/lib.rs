//! Command-line surface for autopost: argument parsing, config layering, and outcome printing.

pub mod cli_args;

use std::path::PathBuf;

use anyhow::{Context, bail};
use autopost_core::{
    AutopostConfig, AutopostError, ConfigError, RunOptions, RunOutcome, RunPlan,
    ScheduleResolver, apply_runtime_overrides, config_path, expand_config_path, load_config,
    run_with_config, save_config,
};
use chrono::{DateTime, FixedOffset, Utc};
pub use cli_args::{Cli, Command, ConfigCommand, RunArgs, ThemesArgs};
use tracing::info;

/// Exit status for failures that carry no pipeline stage.
pub const GENERIC_FAILURE: i32 = 1;

/// Map an error returned by [`dispatch`] to the process exit status.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<AutopostError>()
        .map(AutopostError::exit_code)
        .unwrap_or(GENERIC_FAILURE)
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let config_file = cli.config.as_deref().map(expand_config_path);
    match cli.command {
        Some(Command::Config(cmd)) => {
            if !cli.run.is_empty() {
                bail!("Run flags cannot be combined with config commands.");
            }
            handle_config_command(cmd, config_file)
        }
        Some(Command::Themes(args)) => {
            let config = effective_config(config_file, &cli.run)?;
            print!("{}", render_calendar(&config, cli.run.now, args.weeks)?);
            Ok(())
        }
        None => {
            let config = effective_config(config_file, &cli.run)?;
            let options = RunOptions {
                dry_run: cli.run.dry_run,
                now: cli.run.now,
                progress: None,
            };
            let outcome = run_with_config(&config, &options).await?;
            print!("{}", describe_outcome(&outcome));
            Ok(())
        }
    }
}

/// Defaults, then the TOML file, then the process environment, then command-line flags.
pub fn effective_config(
    config_file: Option<PathBuf>,
    run: &RunArgs,
) -> Result<AutopostConfig, AutopostError> {
    apply_layers(config_file, run, AutopostConfig::apply_process_env)
}

/// [`effective_config`] with an injectable environment.
pub fn layered_config<F>(
    config_file: Option<PathBuf>,
    run: &RunArgs,
    env: F,
) -> Result<AutopostConfig, AutopostError>
where
    F: Fn(&str) -> Option<String>,
{
    apply_layers(config_file, run, |config| config.apply_env(env))
}

fn apply_layers<E>(
    config_file: Option<PathBuf>,
    run: &RunArgs,
    apply_env: E,
) -> Result<AutopostConfig, AutopostError>
where
    E: FnOnce(&mut AutopostConfig) -> Result<(), ConfigError>,
{
    let load = load_config(config_file.as_deref());
    for warning in &load.warnings {
        eprintln!("Warning: {warning}");
    }
    let mut config = load.config;
    apply_env(&mut config)?;
    apply_runtime_overrides(&mut config, &run.to_runtime_overrides());
    config.validate()?;
    Ok(config)
}

fn handle_config_command(
    command: ConfigCommand,
    config_file: Option<PathBuf>,
) -> anyhow::Result<()> {
    let path = config_file.clone().unwrap_or_else(config_path);
    match command {
        ConfigCommand::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommand::Show => {
            let config = effective_config(config_file, &RunArgs::default())?;
            print!("{}", config.redacted().to_toml().map_err(AutopostError::from)?);
            Ok(())
        }
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "{} already exists; pass --force to overwrite it.",
                    path.display()
                );
            }
            save_config(&AutopostConfig::default(), &path)
                .map_err(AutopostError::from)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "Wrote default configuration");
            println!("Wrote {}", path.display());
            Ok(())
        }
    }
}

/// The publishing calendar for the next `weeks` weeks, one slot per line.
pub fn render_calendar(
    config: &AutopostConfig,
    now: Option<DateTime<FixedOffset>>,
    weeks: u32,
) -> Result<String, AutopostError> {
    let resolver = ScheduleResolver::from_config(config)?;
    let now = resolver.localize(&now.unwrap_or_else(|| Utc::now().fixed_offset()));
    let count = resolver.themes().iter().count() * weeks as usize;

    let mut out = String::new();
    for slot in resolver.upcoming(now, count)? {
        let variant = slot
            .friday_variant()
            .map(|v| format!("  type {} ({})", v.letter(), v.title()))
            .unwrap_or_default();
        out.push_str(&format!(
            "{}  {:<28}  {}{}\n",
            slot.publish_at.format("%a %Y-%m-%d %H:%M %Z"),
            slot.theme.label,
            slot.theme.category,
            variant
        ));
    }
    Ok(out)
}

pub fn describe_outcome(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Published(post) => {
            let mut out = match post.scheduled_for {
                Some(at) => format!("Scheduled for {}: {}\n", at.to_rfc3339(), post.title),
                None => format!("Published: {}\n", post.title),
            };
            if let Some(url) = post.url.as_deref() {
                out.push_str(url);
                out.push('\n');
            }
            out
        }
        RunOutcome::NotPublishingDay { date, weekday } => {
            format!("{date} ({weekday}) is not a publishing day. Nothing to do.\n")
        }
        RunOutcome::SlotTaken { date } => {
            format!("A post is already scheduled for {date}. Skipping.\n")
        }
        RunOutcome::DryRun(plan) => describe_plan(plan),
    }
}

fn describe_plan(plan: &RunPlan) -> String {
    let theme = &plan.theme;
    let mut out = format!("Theme:    {} ({})\n", theme.label, plan.theme_date);
    out.push_str(&format!("Category: {}\n", theme.category));
    out.push_str(&format!("Tags:     {}\n", theme.tags.join(", ")));
    if let Some(variant) = plan.friday_variant {
        out.push_str(&format!("Type:     {} ({})\n", variant.letter(), variant.title()));
    }
    match plan.scheduled_for() {
        Some(at) => out.push_str(&format!("Status:   future at {}\n", at.to_rfc3339())),
        None => out.push_str("Status:   publish now\n"),
    }
    if let Some(date) = plan.slot_check {
        out.push_str(&format!("Guard:    skip if {date} is already taken\n"));
    }
    out.push_str("\n--- prompt ---\n");
    out.push_str(&plan.prompt);
    out
}
