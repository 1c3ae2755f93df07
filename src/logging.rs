//! Logging setup for the `imgadjust` binary.
//!
//! The library only talks to the `log` facade. The binary calls [`init`]
//! once with the configured level; `RUST_LOG` refines it per module.

use env_logger::Builder;
use log::{Level, LevelFilter};
use std::io::Write;

/// Level names accepted in config and on the command line.
pub fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Some(LevelFilter::Trace),
        "debug" => Some(LevelFilter::Debug),
        "info" => Some(LevelFilter::Info),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "error" => Some(LevelFilter::Error),
        "off" => Some(LevelFilter::Off),
        _ => None,
    }
}

/// Install the global logger. Unknown levels fall back to `info`.
pub fn init(level: &str) {
    let mut builder = Builder::new();
    builder.filter_level(parse_level(level).unwrap_or(LevelFilter::Info));

    builder.format(|buf, record| {
        let style = match record.level() {
            Level::Error => "\x1b[31m",
            Level::Warn => "\x1b[33m",
            Level::Info => "\x1b[32m",
            Level::Debug => "\x1b[34m",
            Level::Trace => "\x1b[35m",
        };
        writeln!(
            buf,
            "{style}{:5}\x1b[0m [{}] {}",
            record.level(),
            record.target(),
            record.args()
        )
    });

    if let Ok(rust_log) = std::env::var("RUST_LOG") {
        builder.parse_filters(&rust_log);
    }

    // A second init (tests, embedding) keeps the first logger.
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_level_known_names() {
        assert_eq!(parse_level("debug"), Some(LevelFilter::Debug));
        assert_eq!(parse_level("WARNING"), Some(LevelFilter::Warn));
        assert_eq!(parse_level(" off "), Some(LevelFilter::Off));
    }

    #[test]
    fn parse_level_rejects_unknown() {
        assert_eq!(parse_level("verbose"), None);
    }

    #[test]
    fn init_twice_is_harmless() {
        init("error");
        init("debug");
    }
}
