//! Structured event definitions for logging.
//!
//! Events follow a consistent schema for machine-parseable JSONL output.
//! All events include the run id and the pipeline stage.

use super::config::LogConfig;
use super::rate_limit::RunWarnings;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Log levels for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Stages of the learning pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Configuration and validation.
    Init,
    /// Dataset construction and sequence validation.
    Data,
    /// Sufficient-statistics accumulation.
    Statistics,
    /// Parameter estimation.
    Estimate,
    /// Structure search.
    Search,
    /// Prediction on unlabeled sequences.
    Classify,
    /// Metrics over labeled predictions.
    Evaluate,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Data => "data",
            Stage::Statistics => "statistics",
            Stage::Estimate => "estimate",
            Stage::Search => "search",
            Stage::Classify => "classify",
            Stage::Evaluate => "evaluate",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Learn lifecycle
    pub const LEARN_STARTED: &str = "learn.started";
    pub const LEARN_FINISHED: &str = "learn.finished";
    pub const CONFIG_REJECTED: &str = "learn.config_rejected";

    // Data stage
    pub const DATA_LOADED: &str = "data.loaded";
    pub const DATA_SEQUENCE_REJECTED: &str = "data.sequence_rejected";

    // Statistics stage
    pub const STATS_UNSEEN_STATE: &str = "stats.unseen_state";

    // Search stage
    pub const SEARCH_STARTED: &str = "search.started";
    pub const SEARCH_ITERATION: &str = "search.iteration";
    pub const SEARCH_RESTART: &str = "search.restart";
    pub const SEARCH_EDGE_REMOVED: &str = "search.edge_removed";
    pub const SEARCH_CONVERGED: &str = "search.converged";

    // Classify stage
    pub const CLASSIFY_FALLBACK: &str = "classify.fallback_to_prior";
    pub const CLASSIFY_FINISHED: &str = "classify.finished";

    // Evaluate stage
    pub const EVALUATE_FINISHED: &str = "evaluate.finished";

    /// First segment of every event name above.
    pub const TARGET_PREFIXES: &[&str] = &["learn", "data", "stats", "search", "classify", "evaluate"];
}

/// A structured log event for JSONL output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    /// Timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    pub level: Level,

    /// Event name (e.g., "learn.started", "search.converged").
    pub event: String,

    /// Unique ID for this learning run.
    pub run_id: String,

    pub stage: Stage,

    /// Variable the event concerns, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,

    /// Human-readable message.
    pub message: String,

    /// Additional structured fields (stable keys).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub fields: HashMap<String, serde_json::Value>,
}

impl LogEvent {
    /// Create a new log event with required fields.
    pub fn new(
        level: Level,
        event: impl Into<String>,
        run_id: impl Into<String>,
        stage: Stage,
        message: impl Into<String>,
    ) -> Self {
        LogEvent {
            ts: Utc::now(),
            level,
            event: event.into(),
            run_id: run_id.into(),
            stage,
            node: None,
            message: message.into(),
            fields: HashMap::new(),
        }
    }

    /// Attach the variable this event concerns.
    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }

    /// Add a field to the event.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.fields.insert(key.into(), v);
        }
        self
    }

    /// Serialize to a single JSON line.
    pub fn to_jsonl(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"error":"serialization_failed","event":"{}"}}"#,
                self.event
            )
        })
    }
}

/// Context for generating log events with a consistent run id.
///
/// Clones share the run's warning counters.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub run_id: String,
    pub warnings: Arc<RunWarnings>,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
            warnings: Arc::new(RunWarnings::default()),
        }
    }

    /// Context with a freshly generated run id.
    pub fn fresh() -> Self {
        Self::new(super::generate_run_id())
    }

    /// Fresh run id, warning limits from `config`.
    pub fn from_config(config: &LogConfig) -> Self {
        LogContext {
            run_id: super::generate_run_id(),
            warnings: Arc::new(RunWarnings::from_config(config)),
        }
    }

    /// Create an event with this context.
    pub fn event(
        &self,
        level: Level,
        event: impl Into<String>,
        stage: Stage,
        message: impl Into<String>,
    ) -> LogEvent {
        LogEvent::new(level, event, &self.run_id, stage, message)
    }

    pub fn info(
        &self,
        event: impl Into<String>,
        stage: Stage,
        message: impl Into<String>,
    ) -> LogEvent {
        self.event(Level::Info, event, stage, message)
    }

    pub fn warn(
        &self,
        event: impl Into<String>,
        stage: Stage,
        message: impl Into<String>,
    ) -> LogEvent {
        self.event(Level::Warn, event, stage, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event_serialization() {
        let event = LogEvent::new(
            Level::Info,
            "search.converged",
            "run-12345",
            Stage::Search,
            "Hill climbing converged",
        )
        .with_node("F")
        .with_field("iterations", 7);

        let json = event.to_jsonl();
        assert!(json.contains(r#""event":"search.converged""#));
        assert!(json.contains(r#""level":"info""#));
        assert!(json.contains(r#""stage":"search""#));
        assert!(json.contains(r#""run_id":"run-12345""#));
        assert!(json.contains(r#""node":"F""#));
        assert!(json.contains(r#""iterations":7"#));
    }

    #[test]
    fn test_node_omitted_when_absent() {
        let event = LogEvent::new(Level::Warn, "data.loaded", "run-1", Stage::Data, "loaded");
        assert!(!event.to_jsonl().contains("\"node\""));
    }

    #[test]
    fn test_log_context() {
        let ctx = LogContext::new("run-abc");
        let event = ctx.warn(
            event_names::STATS_UNSEEN_STATE,
            Stage::Statistics,
            "value outside domain",
        );
        assert_eq!(event.run_id, "run-abc");
        assert_eq!(event.stage, Stage::Statistics);
        assert_eq!(event.level, Level::Warn);
    }

    #[test]
    fn test_fresh_context_ids_differ() {
        assert_ne!(LogContext::fresh().run_id, LogContext::fresh().run_id);
    }

    #[test]
    fn test_clones_share_run_warnings() {
        let ctx = LogContext::new("run-abc");
        let clone = ctx.clone();
        clone.warnings.unseen_state.hit();
        assert_eq!(ctx.warnings.skipped_updates(), 1);
        assert_eq!(LogContext::new("run-abc").warnings.skipped_updates(), 0);
    }

    #[test]
    fn test_stage_display_matches_serde() {
        for stage in [Stage::Init, Stage::Statistics, Stage::Classify] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage));
        }
    }

    #[test]
    fn test_event_names_share_prefixes() {
        for name in [
            event_names::LEARN_STARTED,
            event_names::DATA_SEQUENCE_REJECTED,
            event_names::STATS_UNSEEN_STATE,
            event_names::SEARCH_ITERATION,
            event_names::CLASSIFY_FALLBACK,
            event_names::EVALUATE_FINISHED,
        ] {
            let prefix = name.split('.').next().unwrap();
            assert!(event_names::TARGET_PREFIXES.contains(&prefix), "{name}");
        }
    }
}
