use std::{fmt, sync::Arc};

use log::{Level, Log, Record};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    core::state::{LogContext, ProcessState},
    eav::{Criteria, Family, FamilyRef, OrderBy, Query, pager::DEFAULT_MAX_PER_PAGE},
};

/// Level used to report an empty result set.
///
/// The eight syslog severities are accepted and mapped onto `log` levels:
/// emergency, alert, critical and error log at `Error`, notice and info at
/// `Info`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyLogLevel {
    Alert,
    Critical,
    Debug,
    Emergency,
    Error,
    Info,
    Notice,
    #[default]
    Warning,
}

impl EmptyLogLevel {
    pub fn level(self) -> Level {
        match self {
            EmptyLogLevel::Emergency
            | EmptyLogLevel::Alert
            | EmptyLogLevel::Critical
            | EmptyLogLevel::Error => Level::Error,
            EmptyLogLevel::Warning => Level::Warn,
            EmptyLogLevel::Notice | EmptyLogLevel::Info => Level::Info,
            EmptyLogLevel::Debug => Level::Debug,
        }
    }
}

impl fmt::Display for EmptyLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EmptyLogLevel::Alert => "alert",
            EmptyLogLevel::Critical => "critical",
            EmptyLogLevel::Debug => "debug",
            EmptyLogLevel::Emergency => "emergency",
            EmptyLogLevel::Error => "error",
            EmptyLogLevel::Info => "info",
            EmptyLogLevel::Notice => "notice",
            EmptyLogLevel::Warning => "warning",
        };
        f.write_str(name)
    }
}

fn default_max_per_page() -> usize {
    DEFAULT_MAX_PER_PAGE
}

fn default_first_page() -> usize {
    1
}

/// Reader configuration, as written in a pipeline definition.
///
/// ```
/// use eav_batch_rs::task::options::{EavReaderOptions, EmptyLogLevel};
///
/// let options: EavReaderOptions = serde_json::from_str(
///     r#"{ "family": "product", "log_count": true, "empty_log_level": "notice" }"#,
/// ).unwrap();
/// assert!(options.log_count);
/// assert!(!options.allow_reset);
/// assert_eq!(options.empty_log_level, EmptyLogLevel::Notice);
/// assert_eq!(options.max_per_page, 10);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EavReaderOptions {
    pub family: FamilyRef,
    #[serde(default)]
    pub criteria: Criteria,
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
    #[serde(default = "default_max_per_page")]
    pub max_per_page: usize,
    #[serde(default = "default_first_page")]
    pub first_page: usize,
    /// Allow the reader to restart once its iteration is over
    #[serde(default)]
    pub allow_reset: bool,
    /// Log the result count when the query is opened
    #[serde(default)]
    pub log_count: bool,
    #[serde(default)]
    pub empty_log_level: EmptyLogLevel,
}

impl EavReaderOptions {
    pub fn new(family: impl Into<FamilyRef>) -> Self {
        Self {
            family: family.into(),
            criteria: Criteria::default(),
            order_by: Vec::new(),
            max_per_page: DEFAULT_MAX_PER_PAGE,
            first_page: 1,
            allow_reset: false,
            log_count: false,
            empty_log_level: EmptyLogLevel::default(),
        }
    }
}

/// Reader options with the family resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedReaderOptions {
    pub family: Arc<Family>,
    pub criteria: Criteria,
    pub order_by: Vec<OrderBy>,
    pub max_per_page: usize,
    pub first_page: usize,
    pub allow_reset: bool,
    pub log_count: bool,
    pub empty_log_level: EmptyLogLevel,
}

impl ResolvedReaderOptions {
    pub fn query(&self) -> Query {
        Query {
            family: Arc::clone(&self.family),
            criteria: self.criteria.clone(),
            order_by: self.order_by.clone(),
        }
    }

    /// Normalized options as logged with every diagnostic, family as its code.
    pub fn to_log_value(&self) -> serde_json::Value {
        json!({
            "family": self.family.code(),
            "criteria": self.criteria,
            "order_by": self.order_by,
            "max_per_page": self.max_per_page,
            "first_page": self.first_page,
            "allow_reset": self.allow_reset,
            "log_count": self.log_count,
            "empty_log_level": self.empty_log_level,
        })
    }
}

/// Merges the host's log context with the task options.
pub(crate) fn log_context<I, O>(
    state: &ProcessState<I, O>,
    options: &ResolvedReaderOptions,
) -> LogContext {
    let mut context = state.get_log_context().clone();
    context.insert("options".to_string(), options.to_log_value());
    context
}

/// Sends one event with its context to `logger`, under the caller's `target`.
pub(crate) fn log_event(
    logger: &dyn Log,
    target: &str,
    level: Level,
    message: &str,
    context: LogContext,
) {
    logger.log(
        &Record::builder()
            .level(level)
            .target(target)
            .args(format_args!(
                "{} {}",
                message,
                serde_json::Value::Object(context)
            ))
            .build(),
    );
}
