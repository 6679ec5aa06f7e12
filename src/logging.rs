//! # Structured logging
//!
//! Installs a `tracing` subscriber writing to stderr, either human-readable or
//! as JSON lines. `RUST_LOG` wins over the configured level when set.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, LoggingConfig};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize logging once per process. Later calls are no-ops.
pub fn init(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = build_filter(config);
        let registry = tracing_subscriber::registry().with(filter);

        // Don't panic if another subscriber (e.g. a test harness) got there first
        let result = match config.format {
            LogFormat::Pretty => registry
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_level(true),
                )
                .try_init(),
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_ansi(false)
                        .json(),
                )
                .try_init(),
        };

        if result.is_err() {
            tracing::debug!("global tracing subscriber already set, keeping it");
        }

        tracing::debug!(level = %config.level, format = ?config.format, "logging initialized");
    });
}

/// In-memory log sink for asserting on emitted events.
#[cfg(test)]
pub(crate) mod capture {
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing::subscriber::DefaultGuard;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    pub(crate) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        /// Route events on the current thread here until the guard drops.
        pub(crate) fn install(&self) -> DefaultGuard {
            let subscriber = tracing_subscriber::fmt()
                .with_writer(self.clone())
                .with_ansi(false)
                .with_max_level(tracing::Level::DEBUG)
                .finish();
            tracing::subscriber::set_default(subscriber)
        }

        pub(crate) fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_falls_back() {
        let config = LoggingConfig {
            level: "not a [valid directive".into(),
            format: LogFormat::Pretty,
        };
        // Must not panic regardless of RUST_LOG
        let _ = build_filter(&config);
    }

    #[test]
    fn init_is_idempotent() {
        let config = LoggingConfig::default();
        init(&config);
        init(&config);
        assert!(LOGGER_INITIALIZED.get().is_some());
    }

    #[test]
    fn captured_logs_collect_events() {
        let logs = capture::CapturedLogs::default();
        {
            let _guard = logs.install();
            tracing::error!(lead_id = "l-1", "store unavailable");
        }
        tracing::error!("after the guard");
        let out = logs.contents();
        assert!(out.contains("ERROR"));
        assert!(out.contains("store unavailable"));
        assert!(out.contains("lead_id=\"l-1\""));
        assert!(!out.contains("after the guard"));
    }
}
