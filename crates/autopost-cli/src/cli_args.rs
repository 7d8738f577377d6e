use autopost_core::{FutureTarget, PostMode, RuntimeOverrides};
use chrono::{DateTime, FixedOffset};
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

/// Generate and publish today's themed blog post.
#[derive(Parser, Debug, Clone)]
#[command(name = "autopost", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to the per-user config directory).
    #[arg(long, global = true, value_hint = ValueHint::FilePath, value_name = "PATH")]
    pub config: Option<String>,

    #[command(flatten)]
    pub run: RunArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Inspect or initialise the configuration file.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print the upcoming publishing calendar.
    Themes(ThemesArgs),
}

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigCommand {
    /// Print the configuration file path.
    Path,
    /// Print the effective configuration with secrets redacted.
    Show,
    /// Write a configuration file populated with defaults.
    Init {
        /// Overwrite an existing file.
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ThemesArgs {
    /// Number of weeks to list.
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..=52))]
    pub weeks: u32,
}

/// Flags for the default run.
#[derive(Debug, Clone, Args, Default)]
pub struct RunArgs {
    /// Resolve the schedule and print the prompt without calling any remote service.
    #[arg(long, action = ArgAction::SetTrue)]
    pub dry_run: bool,

    /// Pretend the current time is this RFC 3339 instant.
    #[arg(long, global = true, value_name = "RFC3339", value_parser = parse_instant)]
    pub now: Option<DateTime<FixedOffset>>,

    /// Publish immediately or schedule for later.
    #[arg(long, value_name = "MODE", value_parser = parse_mode)]
    pub mode: Option<PostMode>,

    /// What `future` mode schedules against.
    #[arg(long, value_name = "TARGET", value_parser = parse_target)]
    pub target: Option<FutureTarget>,

    /// Minutes ahead for the `minutes-ahead` target.
    #[arg(long, value_name = "MINUTES")]
    pub future_minutes: Option<u32>,

    /// IANA time zone for the schedule.
    #[arg(long, global = true, value_name = "ZONE")]
    pub timezone: Option<String>,

    /// Model identifier for the generative API.
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Do not consult already-scheduled posts before publishing.
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_slot_check: bool,
}

impl RunArgs {
    pub fn is_empty(&self) -> bool {
        !self.dry_run && self.now.is_none() && self.to_runtime_overrides().is_empty()
    }

    pub fn to_runtime_overrides(&self) -> RuntimeOverrides {
        RuntimeOverrides {
            timezone: self.timezone.clone(),
            mode: self.mode,
            future_target: self.target,
            future_minutes: self.future_minutes,
            model: self.model.clone(),
            skip_if_scheduled: self.no_slot_check.then_some(false),
        }
    }
}

fn parse_instant(raw: &str) -> Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_rfc3339(raw.trim()).map_err(|err| format!("{raw:?}: {err}"))
}

fn parse_mode(raw: &str) -> Result<PostMode, String> {
    raw.parse()
}

fn parse_target(raw: &str) -> Result<FutureTarget, String> {
    raw.parse()
}
