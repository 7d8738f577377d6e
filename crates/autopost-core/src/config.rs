use crate::error::ConfigError;
use chrono::NaiveTime;
use chrono_tz::Tz;
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const CONFIG_DIR_NAME: &str = "autopost";
const CONFIG_FILE_NAME: &str = "config.toml";
const CURRENT_SCHEMA_VERSION: u32 = 1;
pub const DEFAULT_TIMEZONE: &str = "America/Denver";
pub const DEFAULT_PUBLISH_HOUR: u32 = 9;
pub const DEFAULT_PUBLISH_MINUTE: u32 = 0;
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_WPCOM_API_BASE: &str = "https://public-api.wordpress.com";
pub const DEFAULT_FUTURE_MINUTES: u32 = 5;
pub const DEFAULT_GENERATION_ATTEMPTS: u32 = 3;
pub const DEFAULT_GENERATION_RETRY_MS: u64 = 1_500;
pub const DEFAULT_CATEGORY_MOM_CHAOS: &str = "Parenting in the Wild";
pub const DEFAULT_CATEGORY_WTFS: &str = "WTFs for Dinner";
pub const DEFAULT_CATEGORY_FIF: &str = "Fuck-It Fridays";
pub const DEFAULT_CATEGORY_SUNDAY: &str = "Hot Mess Hacks";

/// Result returned by [`load_config`], capturing the source and any non-fatal issues.
#[derive(Debug, Clone)]
pub struct ConfigLoadResult {
    pub config: AutopostConfig,
    pub warnings: Vec<String>,
    pub source: ConfigSource,
}

/// Indicates where the file layer of the configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// No usable configuration file; defaults were synthesized.
    Default,
    /// Configuration was read from a TOML file.
    File,
}

/// Whether a post goes live immediately or is handed to the platform's scheduler.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostMode {
    #[default]
    Publish,
    Future,
}

impl FromStr for PostMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "publish" => Ok(PostMode::Publish),
            "future" => Ok(PostMode::Future),
            other => Err(format!("expected `publish` or `future`, got `{other}`")),
        }
    }
}

impl fmt::Display for PostMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostMode::Publish => f.write_str("publish"),
            PostMode::Future => f.write_str("future"),
        }
    }
}

/// How the scheduled timestamp is chosen when [`PostMode::Future`] is active.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FutureTarget {
    /// Today's theme, scheduled `future_minutes` after the run.
    #[default]
    MinutesAhead,
    /// The next publishing slot resolved from the weekly calendar.
    NextSlot,
}

impl FromStr for FutureTarget {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "minutes-ahead" | "minutes_ahead" => Ok(FutureTarget::MinutesAhead),
            "next-slot" | "next_slot" => Ok(FutureTarget::NextSlot),
            other => Err(format!(
                "expected `minutes-ahead` or `next-slot`, got `{other}`"
            )),
        }
    }
}

impl fmt::Display for FutureTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FutureTarget::MinutesAhead => f.write_str("minutes-ahead"),
            FutureTarget::NextSlot => f.write_str("next-slot"),
        }
    }
}

/// Full configuration: TOML file layer, then environment, then runtime overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutopostConfig {
    #[serde(default = "AutopostConfig::schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub schedule: ScheduleSettings,
    #[serde(default)]
    pub wordpress: WordPressSettings,
    #[serde(default)]
    pub openai: OpenAiSettings,
    #[serde(default)]
    pub publishing: PublishingSettings,
    #[serde(default)]
    pub generation: GenerationSettings,
    #[serde(default)]
    pub categories: CategoryOverrides,
}

impl Default for AutopostConfig {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            schedule: ScheduleSettings::default(),
            wordpress: WordPressSettings::default(),
            openai: OpenAiSettings::default(),
            publishing: PublishingSettings::default(),
            generation: GenerationSettings::default(),
            categories: CategoryOverrides::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSettings {
    #[serde(default = "ScheduleSettings::default_timezone")]
    pub timezone: String,
    #[serde(default = "ScheduleSettings::default_publish_hour")]
    pub publish_hour: u32,
    #[serde(default)]
    pub publish_minute: u32,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            timezone: Self::default_timezone(),
            publish_hour: DEFAULT_PUBLISH_HOUR,
            publish_minute: DEFAULT_PUBLISH_MINUTE,
        }
    }
}

impl ScheduleSettings {
    fn default_timezone() -> String {
        DEFAULT_TIMEZONE.to_string()
    }

    const fn default_publish_hour() -> u32 {
        DEFAULT_PUBLISH_HOUR
    }
}

/// WordPress.com OAuth client and account credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordPressSettings {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub app_password: String,
    #[serde(default)]
    pub site_id: String,
    #[serde(default = "WordPressSettings::default_api_base")]
    pub api_base: String,
}

impl Default for WordPressSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            username: String::new(),
            app_password: String::new(),
            site_id: String::new(),
            api_base: Self::default_api_base(),
        }
    }
}

impl WordPressSettings {
    fn default_api_base() -> String {
        DEFAULT_WPCOM_API_BASE.to_string()
    }

    /// Environment names of the token-exchange credentials that are blank.
    pub fn missing_auth_credentials(&self) -> Vec<&'static str> {
        [
            ("WPCOM_CLIENT_ID", &self.client_id),
            ("WPCOM_CLIENT_SECRET", &self.client_secret),
            ("WPCOM_USERNAME", &self.username),
            ("WPCOM_APP_PASSWORD", &self.app_password),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "OpenAiSettings::default_model")]
    pub model: String,
    #[serde(default = "OpenAiSettings::default_base_url")]
    pub base_url: String,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: Self::default_model(),
            base_url: Self::default_base_url(),
        }
    }
}

impl OpenAiSettings {
    fn default_model() -> String {
        DEFAULT_OPENAI_MODEL.to_string()
    }

    fn default_base_url() -> String {
        DEFAULT_OPENAI_BASE_URL.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishingSettings {
    #[serde(default)]
    pub mode: PostMode,
    #[serde(default)]
    pub future_target: FutureTarget,
    #[serde(default = "PublishingSettings::default_future_minutes")]
    pub future_minutes: u32,
    #[serde(default = "PublishingSettings::default_skip_if_scheduled")]
    pub skip_if_scheduled: bool,
    #[serde(default)]
    pub storefront_url: Option<String>,
}

impl Default for PublishingSettings {
    fn default() -> Self {
        Self {
            mode: PostMode::default(),
            future_target: FutureTarget::default(),
            future_minutes: DEFAULT_FUTURE_MINUTES,
            skip_if_scheduled: true,
            storefront_url: None,
        }
    }
}

impl PublishingSettings {
    const fn default_future_minutes() -> u32 {
        DEFAULT_FUTURE_MINUTES
    }

    const fn default_skip_if_scheduled() -> bool {
        true
    }

    /// Storefront URL with blank values treated as unset.
    pub fn storefront(&self) -> Option<&str> {
        self.storefront_url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    #[serde(default = "GenerationSettings::default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "GenerationSettings::default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_GENERATION_ATTEMPTS,
            retry_delay_ms: DEFAULT_GENERATION_RETRY_MS,
        }
    }
}

impl GenerationSettings {
    const fn default_max_attempts() -> u32 {
        DEFAULT_GENERATION_ATTEMPTS
    }

    const fn default_retry_delay_ms() -> u64 {
        DEFAULT_GENERATION_RETRY_MS
    }
}

/// Platform category names for each weekday theme. Must match existing categories exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryOverrides {
    #[serde(default = "CategoryOverrides::default_mom_chaos")]
    pub mom_chaos: String,
    #[serde(default = "CategoryOverrides::default_wtfs")]
    pub wtfs: String,
    #[serde(default = "CategoryOverrides::default_fuck_it_friday")]
    pub fuck_it_friday: String,
    #[serde(default = "CategoryOverrides::default_sunday")]
    pub sunday: String,
}

impl Default for CategoryOverrides {
    fn default() -> Self {
        Self {
            mom_chaos: Self::default_mom_chaos(),
            wtfs: Self::default_wtfs(),
            fuck_it_friday: Self::default_fuck_it_friday(),
            sunday: Self::default_sunday(),
        }
    }
}

impl CategoryOverrides {
    fn default_mom_chaos() -> String {
        DEFAULT_CATEGORY_MOM_CHAOS.to_string()
    }

    fn default_wtfs() -> String {
        DEFAULT_CATEGORY_WTFS.to_string()
    }

    fn default_fuck_it_friday() -> String {
        DEFAULT_CATEGORY_FIF.to_string()
    }

    fn default_sunday() -> String {
        DEFAULT_CATEGORY_SUNDAY.to_string()
    }
}

/// Overrides sourced from the command line.
#[derive(Debug, Default, Clone)]
pub struct RuntimeOverrides {
    pub timezone: Option<String>,
    pub mode: Option<PostMode>,
    pub future_target: Option<FutureTarget>,
    pub future_minutes: Option<u32>,
    pub model: Option<String>,
    pub skip_if_scheduled: Option<bool>,
}

impl RuntimeOverrides {
    pub fn is_empty(&self) -> bool {
        self.timezone.is_none()
            && self.mode.is_none()
            && self.future_target.is_none()
            && self.future_minutes.is_none()
            && self.model.is_none()
            && self.skip_if_scheduled.is_none()
    }
}

impl AutopostConfig {
    const fn schema_version() -> u32 {
        CURRENT_SCHEMA_VERSION
    }

    /// Layer environment variables over the current values.
    ///
    /// `lookup` abstracts the environment so callers (and tests) can supply their own source.
    /// Blank values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = get("BLOG_TIMEZONE") {
            self.schedule.timezone = value;
        }
        if let Some(value) = get("PUBLISH_HOUR") {
            self.schedule.publish_hour = parse_number("PUBLISH_HOUR", &value)?;
        }
        if let Some(value) = get("PUBLISH_MINUTE") {
            self.schedule.publish_minute = parse_number("PUBLISH_MINUTE", &value)?;
        }

        let wordpress = [
            ("WPCOM_CLIENT_ID", &mut self.wordpress.client_id),
            ("WPCOM_CLIENT_SECRET", &mut self.wordpress.client_secret),
            ("WPCOM_USERNAME", &mut self.wordpress.username),
            ("WPCOM_APP_PASSWORD", &mut self.wordpress.app_password),
            ("WPCOM_SITE_ID", &mut self.wordpress.site_id),
            ("WPCOM_API_BASE", &mut self.wordpress.api_base),
        ];
        for (key, slot) in wordpress {
            if let Some(value) = get(key) {
                *slot = value;
            }
        }

        if let Some(value) = get("OPENAI_API_KEY") {
            self.openai.api_key = value;
        }
        if let Some(value) = get("OPENAI_MODEL") {
            self.openai.model = value;
        }
        if let Some(value) = get("OPENAI_BASE_URL") {
            self.openai.base_url = value;
        }

        if let Some(value) = get("STAN_STORE_URL") {
            self.publishing.storefront_url = Some(value);
        }
        if let Some(value) = get("POST_MODE") {
            self.publishing.mode = value
                .parse()
                .map_err(|reason: String| ConfigError::invalid("POST_MODE", reason))?;
        }
        if let Some(value) = get("FUTURE_TARGET") {
            self.publishing.future_target = value
                .parse()
                .map_err(|reason: String| ConfigError::invalid("FUTURE_TARGET", reason))?;
        }
        if let Some(value) = get("FUTURE_MINUTES") {
            self.publishing.future_minutes = parse_number("FUTURE_MINUTES", &value)?;
        }
        if let Some(value) = get("SKIP_IF_SCHEDULED") {
            self.publishing.skip_if_scheduled = parse_flag("SKIP_IF_SCHEDULED", &value)?;
        }

        if let Some(value) = get("GENERATION_ATTEMPTS") {
            self.generation.max_attempts = parse_number("GENERATION_ATTEMPTS", &value)?;
        }
        if let Some(value) = get("GENERATION_RETRY_MS") {
            self.generation.retry_delay_ms = parse_number("GENERATION_RETRY_MS", &value)?;
        }

        let categories = [
            ("CAT_MOM_CHAOS", &mut self.categories.mom_chaos),
            ("CAT_WTFS", &mut self.categories.wtfs),
            ("CAT_FIF", &mut self.categories.fuck_it_friday),
            ("CAT_SUNDAY", &mut self.categories.sunday),
        ];
        for (key, slot) in categories {
            if let Some(value) = get(key) {
                *slot = value;
            }
        }

        Ok(())
    }

    /// Layer the process environment over the current values.
    pub fn apply_process_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Parsed time zone.
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.schedule
            .timezone
            .trim()
            .parse::<Tz>()
            .map_err(|err| ConfigError::invalid("BLOG_TIMEZONE", err.to_string()))
    }

    /// Local wall-clock publish time with zero seconds.
    pub fn publish_time(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::from_hms_opt(self.schedule.publish_hour, self.schedule.publish_minute, 0)
            .ok_or_else(|| {
                ConfigError::invalid(
                    "PUBLISH_HOUR/PUBLISH_MINUTE",
                    format!(
                        "{:02}:{:02} is not a valid time of day",
                        self.schedule.publish_hour, self.schedule.publish_minute
                    ),
                )
            })
    }

    /// Checks every value that can be checked without talking to a remote service.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schema_version != CURRENT_SCHEMA_VERSION {
            return Err(ConfigError::invalid(
                "schema_version",
                format!(
                    "unknown schema version {} (expected {})",
                    self.schema_version, CURRENT_SCHEMA_VERSION
                ),
            ));
        }
        self.timezone()?;
        self.publish_time()?;
        if self.generation.max_attempts == 0 {
            return Err(ConfigError::invalid(
                "GENERATION_ATTEMPTS",
                "must be at least 1",
            ));
        }
        for (key, value) in [
            ("CAT_MOM_CHAOS", &self.categories.mom_chaos),
            ("CAT_WTFS", &self.categories.wtfs),
            ("CAT_FIF", &self.categories.fuck_it_friday),
            ("CAT_SUNDAY", &self.categories.sunday),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::invalid(key, "category name cannot be blank"));
            }
        }
        Ok(())
    }

    /// Fails fast when any credential needed by the network stages is blank.
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        let mut missing = self.wordpress.missing_auth_credentials();
        if self.wordpress.site_id.trim().is_empty() {
            missing.push("WPCOM_SITE_ID");
        }
        if self.openai.api_key.trim().is_empty() {
            missing.push("OPENAI_API_KEY");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing(missing.join(", ")))
        }
    }

    /// Pretty TOML rendering, the same format [`save_config`] writes.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Copy with every secret replaced, suitable for printing.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for secret in [
            &mut copy.wordpress.client_secret,
            &mut copy.wordpress.app_password,
            &mut copy.openai.api_key,
        ] {
            if !secret.is_empty() {
                *secret = "<redacted>".to_string();
            }
        }
        copy
    }
}

fn parse_number<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|err| ConfigError::invalid(key, err.to_string()))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid(
            key,
            format!("expected a boolean, got `{other}`"),
        )),
    }
}

/// Apply command-line overrides on top of the loaded configuration.
pub fn apply_runtime_overrides(config: &mut AutopostConfig, overrides: &RuntimeOverrides) {
    if let Some(timezone) = overrides.timezone.as_ref() {
        config.schedule.timezone = timezone.trim().to_string();
    }
    if let Some(mode) = overrides.mode {
        config.publishing.mode = mode;
    }
    if let Some(target) = overrides.future_target {
        config.publishing.future_target = target;
    }
    if let Some(minutes) = overrides.future_minutes {
        config.publishing.future_minutes = minutes;
    }
    if let Some(model) = overrides.model.as_ref() {
        let trimmed = model.trim();
        if !trimmed.is_empty() {
            config.openai.model = trimmed.to_string();
        }
    }
    if let Some(skip) = overrides.skip_if_scheduled {
        config.publishing.skip_if_scheduled = skip;
    }
}

/// Path to the configuration directory.
pub fn config_directory() -> PathBuf {
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Path to the default `config.toml`.
pub fn config_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

/// Expand `~` and environment references in a user-supplied config path.
pub fn expand_config_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(raw).as_ref()),
    }
}

/// Load the TOML file layer, falling back to defaults with a warning when it is unusable.
///
/// `path` selects an explicit file; `None` uses [`config_path`]. A missing default file is
/// not worth a warning, a missing explicit file is.
pub fn load_config(path: Option<&Path>) -> ConfigLoadResult {
    let mut warnings = Vec::new();
    let explicit = path.is_some();
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);

    if path.exists() {
        match fs::read_to_string(&path) {
            Ok(raw) => match toml::from_str::<AutopostConfig>(&raw) {
                Ok(cfg) if cfg.schema_version == CURRENT_SCHEMA_VERSION => {
                    return ConfigLoadResult {
                        config: cfg,
                        warnings,
                        source: ConfigSource::File,
                    };
                }
                Ok(cfg) => warnings.push(format!(
                    "Unknown config schema version {} in {}. Falling back to defaults.",
                    cfg.schema_version,
                    path.display()
                )),
                Err(err) => warnings.push(format!(
                    "Failed to parse {} as TOML: {}. Falling back to defaults.",
                    path.display(),
                    err
                )),
            },
            Err(err) => warnings.push(format!(
                "Failed to read {}: {}. Falling back to defaults.",
                path.display(),
                err
            )),
        }
    } else if explicit {
        warnings.push(format!(
            "Config file {} does not exist. Using defaults.",
            path.display()
        ));
    }

    ConfigLoadResult {
        config: AutopostConfig::default(),
        warnings,
        source: ConfigSource::Default,
    }
}

/// Persist the configuration as TOML.
pub fn save_config(config: &AutopostConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, config.to_toml()?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env_from(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_match_documented_values() {
        let config = AutopostConfig::default();
        assert_eq!(config.schedule.timezone, "America/Denver");
        assert_eq!(config.publish_time().unwrap(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(config.openai.model, "gpt-4.1");
        assert_eq!(config.publishing.mode, PostMode::Publish);
        assert_eq!(config.publishing.future_minutes, 5);
        assert_eq!(config.generation.max_attempts, 3);
        assert_eq!(config.categories.fuck_it_friday, "Fuck-It Fridays");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_env_overrides_values() {
        let env = env_from(&[
            ("BLOG_TIMEZONE", "America/New_York"),
            ("PUBLISH_HOUR", "7"),
            ("PUBLISH_MINUTE", "30"),
            ("WPCOM_SITE_ID", "  example.wordpress.com  "),
            ("POST_MODE", "FUTURE"),
            ("FUTURE_TARGET", "next-slot"),
            ("FUTURE_MINUTES", "15"),
            ("CAT_SUNDAY", "Feed the Chaos"),
            ("STAN_STORE_URL", "https://stan.store/example"),
        ]);
        let mut config = AutopostConfig::default();
        config.apply_env(|key| env.get(key).cloned()).unwrap();

        assert_eq!(config.schedule.timezone, "America/New_York");
        assert_eq!(config.publish_time().unwrap(), NaiveTime::from_hms_opt(7, 30, 0).unwrap());
        assert_eq!(config.wordpress.site_id, "example.wordpress.com");
        assert_eq!(config.publishing.mode, PostMode::Future);
        assert_eq!(config.publishing.future_target, FutureTarget::NextSlot);
        assert_eq!(config.publishing.future_minutes, 15);
        assert_eq!(config.categories.sunday, "Feed the Chaos");
        assert_eq!(config.publishing.storefront(), Some("https://stan.store/example"));
    }

    #[test]
    fn test_apply_env_ignores_blank_values() {
        let env = env_from(&[("OPENAI_MODEL", "   "), ("CAT_WTFS", "")]);
        let mut config = AutopostConfig::default();
        config.apply_env(|key| env.get(key).cloned()).unwrap();
        assert_eq!(config.openai.model, DEFAULT_OPENAI_MODEL);
        assert_eq!(config.categories.wtfs, DEFAULT_CATEGORY_WTFS);
    }

    #[test]
    fn test_apply_env_rejects_malformed_values() {
        let env = env_from(&[("POST_MODE", "later")]);
        let mut config = AutopostConfig::default();
        let err = config.apply_env(|key| env.get(key).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "POST_MODE"));

        let env = env_from(&[("FUTURE_MINUTES", "soon")]);
        let mut config = AutopostConfig::default();
        assert!(config.apply_env(|key| env.get(key).cloned()).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_timezone_and_time() {
        let mut config = AutopostConfig::default();
        config.schedule.timezone = "Mars/Olympus_Mons".to_string();
        assert!(config.validate().is_err());

        let mut config = AutopostConfig::default();
        config.schedule.publish_hour = 24;
        assert!(config.validate().is_err());

        let mut config = AutopostConfig::default();
        config.generation.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_require_credentials_lists_every_blank_value() {
        let config = AutopostConfig::default();
        let err = config.require_credentials().unwrap_err();
        let text = err.to_string();
        for name in [
            "WPCOM_CLIENT_ID",
            "WPCOM_CLIENT_SECRET",
            "WPCOM_USERNAME",
            "WPCOM_APP_PASSWORD",
            "WPCOM_SITE_ID",
            "OPENAI_API_KEY",
        ] {
            assert!(text.contains(name), "{name} missing from {text}");
        }
    }

    #[test]
    fn test_redacted_hides_secrets_only() {
        let mut config = AutopostConfig::default();
        config.wordpress.client_id = "client".to_string();
        config.wordpress.client_secret = "secret".to_string();
        config.openai.api_key = "sk-test".to_string();
        let redacted = config.redacted();
        assert_eq!(redacted.wordpress.client_id, "client");
        assert_eq!(redacted.wordpress.client_secret, "<redacted>");
        assert_eq!(redacted.openai.api_key, "<redacted>");
        assert_eq!(redacted.wordpress.app_password, "");
    }

    #[test]
    fn test_apply_runtime_overrides() {
        let mut config = AutopostConfig::default();
        let overrides = RuntimeOverrides {
            mode: Some(PostMode::Future),
            future_target: Some(FutureTarget::NextSlot),
            model: Some("  ".to_string()),
            skip_if_scheduled: Some(false),
            ..RuntimeOverrides::default()
        };
        assert!(!overrides.is_empty());
        apply_runtime_overrides(&mut config, &overrides);
        assert_eq!(config.publishing.mode, PostMode::Future);
        assert_eq!(config.publishing.future_target, FutureTarget::NextSlot);
        assert_eq!(config.openai.model, DEFAULT_OPENAI_MODEL);
        assert!(!config.publishing.skip_if_scheduled);
    }

    #[test]
    fn test_load_config_partial_file_keeps_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "[publishing]\nmode = \"future\"\nfuture_target = \"next-slot\"\n\n[categories]\nsunday = \"Feed the Chaos\"\n",
        )
        .unwrap();

        let result = load_config(Some(&path));
        assert_eq!(result.source, ConfigSource::File);
        assert!(result.warnings.is_empty());
        assert_eq!(result.config.publishing.mode, PostMode::Future);
        assert_eq!(result.config.categories.sunday, "Feed the Chaos");
        assert_eq!(result.config.categories.wtfs, DEFAULT_CATEGORY_WTFS);
        assert_eq!(result.config.schedule.timezone, DEFAULT_TIMEZONE);
    }

    #[test]
    fn test_load_config_bad_toml_falls_back_with_warning() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "this is not = = toml").unwrap();

        let result = load_config(Some(&path));
        assert_eq!(result.source, ConfigSource::Default);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.config, AutopostConfig::default());
    }

    #[test]
    fn test_load_config_missing_explicit_file_warns() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("absent.toml");
        let result = load_config(Some(&path));
        assert_eq!(result.source, ConfigSource::Default);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_save_then_load_preserves_settings() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let mut config = AutopostConfig::default();
        config.publishing.storefront_url = Some("https://stan.store/example".to_string());
        config.schedule.publish_minute = 15;

        save_config(&config, &path).unwrap();
        let loaded = load_config(Some(&path));
        assert_eq!(loaded.source, ConfigSource::File);
        assert_eq!(loaded.config, config);
    }
}
