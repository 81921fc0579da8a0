//! Logger installation for binaries
//!
//! The library only emits records through the `log` facade. Binaries call
//! [`init_logging`] to print them: info records as bare messages, debug
//! records prefixed with `DEBUG:`, warnings and errors set apart by blank
//! lines.

use std::io::Write;
use std::str::FromStr;

use log::{Level, LevelFilter};

/// Verbosity accepted on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Warnings and errors
    Warning,
    /// Progress messages
    #[default]
    Info,
    /// Everything
    Debug,
}

impl LogLevel {
    /// Matching `log` filter
    pub fn filter(self) -> LevelFilter {
        match self {
            LogLevel::Warning => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "warning" | "warn" => Ok(LogLevel::Warning),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            other => Err(format!("unknown log level '{other}', expected warning, info or debug")),
        }
    }
}

/// Render one record
pub fn render(level: Level, message: &str) -> String {
    match level {
        Level::Info => message.to_string(),
        Level::Debug | Level::Trace => format!("{level}: {message}"),
        Level::Warn | Level::Error => format!("\n{level}: {message}\n"),
    }
}

/// Install the process-wide logger
///
/// Without an explicit level, `RUST_LOG` is honoured and `info` is the
/// fallback. Calling this twice keeps the first logger.
pub fn init_logging(level: Option<LogLevel>) {
    let mut builder = match level {
        Some(level) => {
            let mut builder = env_logger::Builder::new();
            builder.filter_level(level.filter());
            builder
        }
        None => env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")),
    };

    let _ = builder
        .format(|buf, record| writeln!(buf, "{}", render(record.level(), &record.args().to_string())))
        .try_init();
}
