use crate::config::TelemetryConfig;
use time::UtcOffset;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl From<&TelemetryConfig> for (LogLevel, LogFormat) {
    fn from(cfg: &TelemetryConfig) -> Self {
        let level = match cfg.log_level.to_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "warn" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        };
        let format = if cfg.log_format.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        };
        (level, format)
    }
}

/// 环境变量中的调试开关：1/true/yes/on
pub fn debug_from_env(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

/// 初始化 tracing。`debug` 为真时强制 debug 级别。
/// 日志写到 stderr，stdout 留给进度输出。
pub fn init_tracing_with(cfg: &TelemetryConfig, debug: bool) {
    let (lvl_enum, fmt_enum): (LogLevel, LogFormat) = cfg.into();
    let lvl = if debug && lvl_enum != LogLevel::Trace {
        LogLevel::Debug
    } else {
        lvl_enum
    };

    let filter = EnvFilter::new(lvl.as_str());
    let base = fmt::layer()
        .with_target(debug)
        .with_ansi(!cfg.log_no_ansi)
        .with_writer(std::io::stderr);
    let fmt_layer = match fmt_enum {
        LogFormat::Json => base.json().boxed(),
        LogFormat::Text => {
            let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
            base.with_timer(fmt::time::OffsetTime::new(
                offset,
                time::format_description::well_known::Rfc3339,
            ))
            .boxed()
        }
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
