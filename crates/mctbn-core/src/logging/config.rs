//! Logging configuration for learning runs.
//!
//! Sources, lowest precedence first: defaults, `MCTBN_LOG` (level) and
//! `MCTBN_LOG_FORMAT`, then explicit overrides. `RUST_LOG`, when set,
//! replaces the generated filter entirely.

use super::events::event_names;
use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per event.
    Jsonl,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" => Ok(LogFormat::Human),
            "jsonl" | "json" => Ok(LogFormat::Jsonl),
            _ => Err(format!("unknown log format: {s}")),
        }
    }
}

/// Rate limit of one recurring warning within a run: the first `burst`
/// occurrences are logged, then every `every`-th.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningLimit {
    pub burst: u64,
    pub every: u64,
}

impl Default for WarningLimit {
    fn default() -> Self {
        WarningLimit {
            burst: 5,
            every: 1_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LevelFilter,
    /// Emit one `search.iteration` event per accepted move (at debug level).
    pub search_iterations: bool,
    /// `stats.unseen_state` warnings.
    pub unseen_state: WarningLimit,
    /// `classify.fallback_to_prior` warnings.
    pub prior_fallback: WarningLimit,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Human,
            level: LevelFilter::INFO,
            search_iterations: true,
            unseen_state: WarningLimit::default(),
            prior_fallback: WarningLimit::default(),
        }
    }
}

impl LogConfig {
    /// Defaults, then the environment, then the given overrides.
    pub fn from_env(level: Option<LevelFilter>, format: Option<LogFormat>) -> Self {
        let mut config = LogConfig::default();
        if let Some(parsed) = std::env::var("MCTBN_LOG").ok().and_then(|v| v.parse().ok()) {
            config.level = parsed;
        }
        if let Some(parsed) = std::env::var("MCTBN_LOG_FORMAT").ok().and_then(|v| v.parse().ok()) {
            config.format = parsed;
        }
        config.level = level.unwrap_or(config.level);
        config.format = format.unwrap_or(config.format);
        config
    }

    /// EnvFilter directives enabling `level` for this crate and every event
    /// target family emitted through `log_event!`.
    pub fn filter_directives(&self) -> String {
        let level = self.level.to_string().to_ascii_lowercase();
        let mut directives: Vec<String> = std::iter::once("mctbn_core")
            .chain(event_names::TARGET_PREFIXES.iter().copied())
            .map(|target| format!("{target}={level}"))
            .collect();
        if !self.search_iterations {
            directives.push(format!("{}=off", event_names::SEARCH_ITERATION));
        }
        directives.join(",")
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    pub fn with_search_iterations(mut self, enabled: bool) -> Self {
        self.search_iterations = enabled;
        self
    }
}
