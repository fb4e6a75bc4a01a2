use crate::connection::LogSettings;
use log::LevelFilter;
use std::borrow::Cow;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

/// `log` target of the bundled driver's own request logging.
pub const DRIVER_LOG_TARGET: &str = "snowflake_millis::driver";

/// Targets that log on behalf of the driver: the bundled driver and the HTTP stack below it.
pub const DRIVER_LOG_TARGETS: &[&str] = &[
    DRIVER_LOG_TARGET,
    "reqwest",
    "hyper",
    "hyper_util",
    "rustls",
    "h2",
];

/// Level [`filter_driver_logs`] is normally called with.
pub const DEFAULT_DRIVER_LOG_LEVEL: LevelFilter = LevelFilter::Warn;

/// Caps every driver log target at `level` on the given `env_logger` builder.
///
/// Driver and HTTP client logs are very chatty at debug and info levels. Call this once
/// while setting up logging, before `init()`:
///
/// ```rust,no_run
/// use snowflake_millis_core::logger::{filter_driver_logs, DEFAULT_DRIVER_LOG_LEVEL};
///
/// let mut builder = env_logger::Builder::from_default_env();
/// filter_driver_logs(&mut builder, DEFAULT_DRIVER_LOG_LEVEL).init();
/// ```
pub fn filter_driver_logs(
    builder: &mut env_logger::Builder,
    level: LevelFilter,
) -> &mut env_logger::Builder {
    for target in DRIVER_LOG_TARGETS {
        builder.filter_module(target, level);
    }

    builder
}

/// Statement log settings shared by a connection and every cursor it handed out.
///
/// Replacing the settings through one handle is seen by all clones, including cursors that
/// already exist.
#[derive(Clone, Debug, Default)]
pub(crate) struct SharedLogSettings(Arc<RwLock<LogSettings>>);

impl SharedLogSettings {
    pub(crate) fn new(settings: LogSettings) -> Self {
        Self(Arc::new(RwLock::new(settings)))
    }

    pub(crate) fn get(&self) -> LogSettings {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn replace(&self, settings: LogSettings) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = settings;
    }
}

/// Measures one statement execution and logs its duration when dropped.
///
/// The line is written exactly once, however the surrounding scope is left: normal return,
/// early return through `?`, or the enclosing future being dropped mid-flight. The settings
/// in effect when the line is written decide its target and level.
pub(crate) struct QueryLogger<'q> {
    sql: &'q str,
    start: Instant,
    settings: SharedLogSettings,
}

impl<'q> QueryLogger<'q> {
    pub(crate) fn new(sql: &'q str, settings: SharedLogSettings) -> Self {
        Self {
            sql,
            start: Instant::now(),
            settings,
        }
    }

    pub(crate) fn finish(&self) {
        let elapsed = self.start.elapsed();
        let settings = self.settings.get();

        let lvl = if elapsed >= settings.slow_statements_duration {
            settings.slow_statements_level
        } else {
            settings.statements_level
        };

        if let Some(lvl) = lvl.to_level() {
            let target: &str = &settings.target;

            log::log!(
                target: target,
                lvl,
                "MillisLoggingCursor: {} millis spent executing: {}",
                elapsed.as_millis(),
                escape_newlines(self.sql)
            );
        }
    }
}

impl<'q> Drop for QueryLogger<'q> {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Replaces each newline with a visible `  \n  ` marker so a statement fits on one log line.
pub(crate) fn escape_newlines(sql: &str) -> Cow<'_, str> {
    if sql.contains('\n') {
        Cow::Owned(sql.replace('\n', "  \\n  "))
    } else {
        Cow::Borrowed(sql)
    }
}
