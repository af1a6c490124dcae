//! Subscriber assembly

use crate::config::{Config, Format};
use armature_error::audit::SECURITY_TARGET;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{EnvFilter, FilterExt, LevelFilter};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{filter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps the non-blocking file writers alive; dropping it flushes and closes
/// the sinks.
#[derive(Debug, Default)]
pub struct LoggerGuard {
    _guards: Vec<WorkerGuard>,
}

impl LoggerGuard {
    /// Guard that owns nothing — returned when a subscriber was already
    /// installed (tests, nested initialisation in workers).
    pub fn noop() -> Self {
        Self::default()
    }

    fn new(guards: Vec<WorkerGuard>) -> Self {
        Self { _guards: guards }
    }
}

/// Assembles the layered subscriber from a [`Config`].
#[derive(Debug)]
pub struct LoggerBuilder {
    config: Config,
}

impl LoggerBuilder {
    /// Start from a configuration.
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Build and install the global subscriber.
    ///
    /// A second initialisation in the same process is a no-op returning a
    /// [`LoggerGuard::noop`] — worker re-initialisation and test harnesses
    /// both hit this path.
    pub fn build(self) -> crate::Result<LoggerGuard> {
        if tracing::dispatcher::has_been_set() {
            return Ok(LoggerGuard::noop());
        }

        let mut guards = Vec::new();
        let mut layers: Vec<BoxedLayer> = Vec::new();

        // The security sink is exclusive: its target reaches only its own
        // file, and no other sink ever sees it.
        let not_security = filter::filter_fn(|meta| meta.target() != SECURITY_TARGET);

        if self.config.console {
            let layer: BoxedLayer = match self.config.format {
                Format::Full => fmt::layer()
                    .with_filter(not_security.clone().and(self.env_filter()))
                    .boxed(),
                Format::Compact => fmt::layer()
                    .compact()
                    .with_filter(not_security.clone().and(self.env_filter()))
                    .boxed(),
            };
            layers.push(layer);
        }

        if let Some(dir) = &self.config.dir {
            let appender =
                tracing_appender::rolling::never(dir, format!("{}.log", self.config.file_prefix));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            guards.push(guard);
            layers.push(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(not_security.clone().and(self.env_filter()))
                    .boxed(),
            );

            let appender = tracing_appender::rolling::never(dir, "security_audit.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            guards.push(guard);
            let only_security = filter::filter_fn(|meta| meta.target() == SECURITY_TARGET);
            layers.push(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(only_security.and(LevelFilter::WARN))
                    .boxed(),
            );
        }

        let subscriber = Registry::default().with(layers);
        tracing::subscriber::set_global_default(subscriber)?;
        Ok(LoggerGuard::new(guards))
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.config.filter).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_build_yields_noop_guard() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            console: false,
            dir: Some(dir.path().to_path_buf()),
            ..Config::default()
        };

        let first = LoggerBuilder::from_config(config.clone()).build();
        assert!(first.is_ok());

        // Second install must not fail.
        let second = LoggerBuilder::from_config(config).build();
        assert!(second.is_ok());
    }
}
