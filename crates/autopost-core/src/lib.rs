//! Core library for the autopost blog pipeline: schedule, prompt, generate, publish.

pub mod config;
pub mod error;
pub mod generation;
pub mod logging;
pub mod openai;
pub mod prompt;
pub mod runtime;
pub mod schedule;
pub mod theme;
pub mod wpcom;

pub use config::{
    AutopostConfig, ConfigLoadResult, ConfigSource, FutureTarget, PostMode, RuntimeOverrides,
    apply_runtime_overrides, config_directory, config_path, expand_config_path, load_config,
    save_config,
};
pub use error::{AutopostError, ConfigError, GenerationError, PlatformError, ResolveError};
pub use generation::{GeneratedPost, RetryPolicy, TextGenerator};
pub use logging::{LoggingDestination, LoggingError, init_logging};
pub use runtime::{
    PublishedPost, RunOptions, RunOutcome, RunPlan, StageProgressCallback, StageProgressEvent,
    StageProgressEventKind, plan_run, run_pipeline, run_with_config,
};
pub use schedule::{ResolvedSlot, ScheduleResolver};
pub use theme::{FridayVariant, Theme, ThemeKey, ThemeTable};
pub use wpcom::{AccessToken, BlogPlatform, CreatedPost, PostSummary, PublishRequest, PublishTiming};
