//!
//! src/logging.rs  Oct 16th, 2026
//!
//! Initializes logger so the enricher reports per-row progress,
//! retries and failures as structured events while running
//!
//!

use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use tracing_error::ErrorLayer;
use tracing_appender::non_blocking;

use crate::config::{LogFormat, LoggingConfig};
use crate::errors::EnricherError;

/// Flushes buffered log lines when dropped, hold for the whole run
pub struct LoggingGuard(tracing_appender::non_blocking::WorkerGuard);

fn filter_for(cfg: &LoggingConfig) -> Result<EnvFilter, EnricherError> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives),
        _ => EnvFilter::try_new(&cfg.filter_directives)
    };
    filter.map_err(|e| EnricherError::Config(format!("log filter: {e}")))
}

pub fn init_logging(cfg: &LoggingConfig) -> Result<LoggingGuard, EnricherError> {
    let (writer, guard) = non_blocking(std::io::stdout());
    let filter = filter_for(cfg)?;
    let time = fmt::time::UtcTime::rfc_3339();

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(ErrorLayer::default());

    let result = match cfg.format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .with_writer(writer)
                .with_timer(time)
                .with_target(cfg.include_target)
                .with_file(cfg.include_file_line)
                .with_line_number(cfg.include_file_line)
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(true);
            registry.with(fmt_layer).try_init()
        }
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .with_writer(writer)
                .with_timer(time)
                .with_ansi(cfg.with_ansi)
                .with_target(cfg.include_target)
                .with_file(cfg.include_file_line)
                .with_line_number(cfg.include_file_line)
                .pretty();
            registry.with(fmt_layer).try_init()
        }
    };

    result.map_err(|e| EnricherError::Config(format!("logger init: {e}")))?;
    Ok( LoggingGuard(guard) )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directives_parse() {
        let cfg = LoggingConfig::default();
        assert!(EnvFilter::try_new(&cfg.filter_directives).is_ok());
    }
}
