use crate::config::{AutopostConfig, FutureTarget, PostMode};
use crate::error::AutopostError;
use crate::generation::{GeneratedPost, RetryPolicy, TextGenerator, request_generation};
use crate::openai::OpenAiClient;
use crate::prompt::build_prompt;
use crate::schedule::{ScheduleResolver, friday_variant, is_slot_taken};
use crate::theme::{FridayVariant, Theme, ThemeKey};
use crate::wpcom::{BlogPlatform, PublishRequest, PublishTiming, WordPressClient};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc, Weekday};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

pub type StageProgressCallback = Arc<dyn Fn(StageProgressEvent) + Send + Sync + 'static>;

#[derive(Debug, Clone, Serialize)]
pub struct StageProgressEvent {
    pub kind: StageProgressEventKind,
    pub stage: Option<String>,
    pub elapsed_ms: f64,
    pub stage_elapsed_ms: Option<f64>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageProgressEventKind {
    Begin,
    End,
    Note,
}

struct StageLogger {
    program_start: Instant,
    stage_start: Instant,
    current_stage: Option<&'static str>,
    callback: Option<StageProgressCallback>,
}

impl StageLogger {
    fn new(callback: Option<StageProgressCallback>) -> Self {
        let start = Instant::now();
        Self {
            program_start: start,
            stage_start: start,
            current_stage: None,
            callback,
        }
    }

    fn emit(&self, kind: StageProgressEventKind, stage_elapsed: Option<f64>, message: String) {
        if let Some(cb) = &self.callback {
            cb(StageProgressEvent {
                kind,
                stage: self.current_stage.map(str::to_string),
                elapsed_ms: as_ms(self.program_start.elapsed()),
                stage_elapsed_ms: stage_elapsed,
                message: Some(message),
            });
        }
    }

    fn begin(&mut self, name: &'static str) {
        let since_start = as_ms(self.program_start.elapsed());
        info!(stage = name, elapsed_ms = since_start, "BEGIN");
        self.stage_start = Instant::now();
        self.current_stage = Some(name);
        self.emit(StageProgressEventKind::Begin, None, format!("Starting {name}"));
    }

    fn end(&mut self) {
        let Some(name) = self.current_stage else {
            return;
        };
        let stage_elapsed = as_ms(self.stage_start.elapsed());
        info!(
            stage = name,
            elapsed_ms = as_ms(self.program_start.elapsed()),
            stage_elapsed_ms = stage_elapsed,
            "END"
        );
        self.emit(
            StageProgressEventKind::End,
            Some(stage_elapsed),
            format!("Finished {name} (Δ {stage_elapsed:.3} ms)"),
        );
        self.current_stage = None;
    }

    fn note(&self, message: impl Into<String>) {
        let text = message.into();
        info!(stage = self.current_stage.unwrap_or("-"), "{text}");
        self.emit(
            StageProgressEventKind::Note,
            Some(as_ms(self.stage_start.elapsed())),
            text,
        );
    }
}

fn as_ms(d: std::time::Duration) -> f64 {
    d.as_secs_f64() * 1_000.0
}

/// Knobs for a single run that do not belong in the persisted configuration.
#[derive(Clone, Default)]
pub struct RunOptions {
    /// Resolve and build the prompt, but make no network call.
    pub dry_run: bool,
    /// Fixed clock; the system clock is used when absent.
    pub now: Option<DateTime<FixedOffset>>,
    pub progress: Option<StageProgressCallback>,
}

/// Everything decided before the first remote call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunPlan {
    pub theme: Theme,
    /// Local calendar day whose theme was picked.
    pub theme_date: NaiveDate,
    pub friday_variant: Option<FridayVariant>,
    #[serde(skip)]
    pub timing: PublishTiming,
    /// Day checked against already-scheduled posts, when the guard is on.
    pub slot_check: Option<NaiveDate>,
    pub prompt: String,
}

impl RunPlan {
    pub fn status(&self) -> &'static str {
        self.timing.status()
    }

    pub fn scheduled_for(&self) -> Option<DateTime<FixedOffset>> {
        match self.timing {
            PublishTiming::Now => None,
            PublishTiming::At(at) => Some(at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPost {
    pub id: u64,
    pub title: String,
    pub url: Option<String>,
    pub status: String,
    pub scheduled_for: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Published(PublishedPost),
    /// Today's weekday has no theme. Not an error.
    NotPublishingDay { date: NaiveDate, weekday: Weekday },
    /// A post is already scheduled on the target day. Not an error.
    SlotTaken { date: NaiveDate },
    DryRun(RunPlan),
}

/// Pick the theme, the publish timing and the prompt for `now`.
///
/// `Ok(None)` means today is not a publishing day in a today-mode run.
pub fn plan_run(
    config: &AutopostConfig,
    now: DateTime<FixedOffset>,
) -> Result<Option<RunPlan>, AutopostError> {
    let resolver = ScheduleResolver::from_config(config)?;
    let local_now = resolver.localize(&now);
    let publishing = &config.publishing;

    let (theme, theme_instant, timing) = match (publishing.mode, publishing.future_target) {
        (PostMode::Future, FutureTarget::NextSlot) => {
            let slot = resolver.next_publish_datetime(local_now)?;
            let at = slot.publish_at.fixed_offset();
            (slot.theme, slot.publish_at, PublishTiming::At(at))
        }
        (mode, _) => {
            let Some(theme) = resolver.theme_for_date(local_now.date_naive()) else {
                return Ok(None);
            };
            let timing = match mode {
                PostMode::Publish => PublishTiming::Now,
                PostMode::Future => {
                    let minutes = i64::from(publishing.future_minutes);
                    PublishTiming::At((local_now + Duration::minutes(minutes)).fixed_offset())
                }
            };
            (theme, local_now, timing)
        }
    };

    let theme_date = theme_instant.date_naive();
    let slot_check = match timing {
        PublishTiming::At(at) if publishing.skip_if_scheduled => Some(at.date_naive()),
        _ => None,
    };

    Ok(Some(RunPlan {
        theme: theme.clone(),
        theme_date,
        friday_variant: (theme.key == ThemeKey::FuckItFriday).then(|| friday_variant(theme_date)),
        timing,
        slot_check,
        prompt: build_prompt(theme, &theme_instant, publishing.storefront()),
    }))
}

/// Run the pipeline against the given collaborators.
///
/// Remote calls happen strictly in order: authenticate, list (only when the slot guard is on),
/// generate, publish. Nothing remote is touched when the configuration is incomplete.
pub async fn run_pipeline<G, P>(
    config: &AutopostConfig,
    generator: &G,
    platform: &P,
    options: &RunOptions,
) -> Result<RunOutcome, AutopostError>
where
    G: TextGenerator + ?Sized,
    P: BlogPlatform + ?Sized,
{
    let mut logger = StageLogger::new(options.progress.clone());
    let now = options.now.unwrap_or_else(|| Utc::now().fixed_offset());

    logger.begin("Resolve schedule");
    config.validate()?;
    let plan = match plan_run(config, now)? {
        Some(plan) => plan,
        None => {
            let local = config.timezone()?;
            let date = now.with_timezone(&local).date_naive();
            logger.note(format!("{date} is not a publishing day; nothing to do"));
            logger.end();
            return Ok(RunOutcome::NotPublishingDay {
                date,
                weekday: date.weekday(),
            });
        }
    };
    logger.note(format!(
        "Theme {} for {} ({})",
        plan.theme.label,
        plan.theme_date,
        plan.status()
    ));
    if let Some(variant) = plan.friday_variant {
        logger.note(format!("Friday type {variant}"));
    }
    logger.end();

    if options.dry_run {
        logger.note("Dry run; skipping remote calls");
        return Ok(RunOutcome::DryRun(plan));
    }

    config.require_credentials()?;

    logger.begin("Authenticate");
    let token = platform
        .authenticate()
        .await
        .map_err(AutopostError::Authentication)?;
    logger.end();

    if let Some(date) = plan.slot_check {
        logger.begin("Check scheduled posts");
        let upcoming = platform
            .list_upcoming(&token)
            .await
            .map_err(AutopostError::Listing)?;
        debug!(count = upcoming.len(), "Fetched upcoming posts");
        let taken = is_slot_taken(upcoming.iter().map(|post| post.date.as_str()), date);
        if taken {
            logger.note(format!("A post is already scheduled on {date}; skipping"));
            logger.end();
            return Ok(RunOutcome::SlotTaken { date });
        }
        logger.end();
    }

    logger.begin("Generate content");
    let policy = RetryPolicy::new(
        config.generation.max_attempts,
        std::time::Duration::from_millis(config.generation.retry_delay_ms),
    );
    let post: GeneratedPost = request_generation(
        generator,
        &plan.prompt,
        &plan.theme,
        config.publishing.storefront(),
        &policy,
    )
    .await?;
    logger.end();

    logger.begin("Publish");
    let request = PublishRequest::build(&post, plan.timing);
    let created = platform
        .publish(&token, &request)
        .await
        .map_err(AutopostError::Publish)?;
    logger.note(format!("Created post {} ({})", created.id, request.status));
    logger.end();

    Ok(RunOutcome::Published(PublishedPost {
        id: created.id,
        title: if created.title.trim().is_empty() {
            post.title
        } else {
            created.title
        },
        url: created.url,
        status: created.status.unwrap_or(request.status),
        scheduled_for: plan.scheduled_for(),
    }))
}

/// Run against the real OpenAI and WordPress.com clients.
pub async fn run_with_config(
    config: &AutopostConfig,
    options: &RunOptions,
) -> Result<RunOutcome, AutopostError> {
    let generator = OpenAiClient::new(&config.openai)?;
    let platform =
        WordPressClient::new(&config.wordpress).map_err(AutopostError::Authentication)?;
    run_pipeline(config, &generator, &platform, options).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    fn config(mode: PostMode, target: FutureTarget) -> AutopostConfig {
        let mut config = AutopostConfig::default();
        config.publishing.mode = mode;
        config.publishing.future_target = target;
        config
    }

    #[test]
    fn test_today_mode_skips_non_publishing_day() {
        let config = config(PostMode::Publish, FutureTarget::MinutesAhead);
        // Thursday
        let plan = plan_run(&config, at("2024-03-07T08:00:00-07:00")).unwrap();
        assert!(plan.is_none());
    }

    #[test]
    fn test_today_mode_publishes_immediately_without_slot_check() {
        let config = config(PostMode::Publish, FutureTarget::MinutesAhead);
        let plan = plan_run(&config, at("2024-03-08T07:00:00-07:00"))
            .unwrap()
            .unwrap();
        assert_eq!(plan.theme.key, ThemeKey::FuckItFriday);
        assert_eq!(plan.friday_variant, Some(FridayVariant::A));
        assert_eq!(plan.timing, PublishTiming::Now);
        assert_eq!(plan.status(), "publish");
        assert_eq!(plan.slot_check, None);
        assert!(plan.prompt.contains("THIS WEEK'S TYPE: A"));
    }

    #[test]
    fn test_minutes_ahead_schedules_from_local_now() {
        let mut config = config(PostMode::Future, FutureTarget::MinutesAhead);
        config.publishing.future_minutes = 5;
        // Wednesday evening in UTC terms is still Wednesday in Denver.
        let plan = plan_run(&config, at("2024-03-07T06:58:00Z")).unwrap().unwrap();
        assert_eq!(plan.theme.key, ThemeKey::WtfsWednesday);
        assert_eq!(plan.theme_date, NaiveDate::from_ymd_opt(2024, 3, 6).unwrap());
        assert_eq!(
            plan.scheduled_for().unwrap().to_rfc3339(),
            "2024-03-07T00:03:00-07:00"
        );
        assert_eq!(plan.slot_check, NaiveDate::from_ymd_opt(2024, 3, 7));
    }

    #[test]
    fn test_next_slot_mode_targets_resolved_slot() {
        let config = config(PostMode::Future, FutureTarget::NextSlot);
        let plan = plan_run(&config, at("2024-03-07T08:00:00-07:00"))
            .unwrap()
            .unwrap();
        assert_eq!(plan.theme.key, ThemeKey::FuckItFriday);
        assert_eq!(
            plan.scheduled_for().unwrap().to_rfc3339(),
            "2024-03-08T09:00:00-07:00"
        );
        assert_eq!(plan.slot_check, NaiveDate::from_ymd_opt(2024, 3, 8));
        assert_eq!(plan.status(), "future");
    }

    #[test]
    fn test_slot_check_disabled_by_config() {
        let mut config = config(PostMode::Future, FutureTarget::NextSlot);
        config.publishing.skip_if_scheduled = false;
        let plan = plan_run(&config, at("2024-03-07T08:00:00-07:00"))
            .unwrap()
            .unwrap();
        assert_eq!(plan.slot_check, None);
    }

    #[test]
    fn test_plan_carries_configured_theme() {
        let mut config = config(PostMode::Future, FutureTarget::NextSlot);
        config.categories.fuck_it_friday = "Friday Freedom".to_string();
        let plan = plan_run(&config, at("2024-03-07T08:00:00-07:00"))
            .unwrap()
            .unwrap();
        assert_eq!(plan.theme.key, ThemeKey::FuckItFriday);
        assert_eq!(plan.theme.category, "Friday Freedom");
        assert!(plan.theme.tags.iter().any(|tag| tag == "Fuck It Friday"));
    }

    #[test]
    fn test_stage_logger_forwards_events() {
        use std::sync::Mutex;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: StageProgressCallback = Arc::new(move |event: StageProgressEvent| {
            sink.lock().unwrap().push((event.kind, event.stage));
        });

        let mut logger = StageLogger::new(Some(callback));
        logger.begin("Publish");
        logger.note("hello");
        logger.end();
        logger.end();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (StageProgressEventKind::Begin, Some("Publish".to_string())),
                (StageProgressEventKind::Note, Some("Publish".to_string())),
                (StageProgressEventKind::End, Some("Publish".to_string())),
            ]
        );
    }
}
