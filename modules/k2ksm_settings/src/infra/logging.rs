//! Diagnostics sink
//!
//! Installs a `tracing` subscriber with two output channels, standard error
//! and an optional log file. Each channel has its own switch so it can be
//! muted and re-enabled at runtime; output already written is kept.
//!
//! SECURITY NOTE: at debug level, raw setting values are logged.

use crate::config::LogConfig;
use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::{filter_fn, EnvFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

/// Handle to the installed diagnostics channels
///
/// Dropping it flushes and closes the file channel.
pub struct Diagnostics {
    stderr: Arc<AtomicBool>,
    file: Option<Arc<AtomicBool>>,
    _file_guard: Option<WorkerGuard>,
}

impl Diagnostics {
    /// Build the subscriber and install it as the global default
    pub fn init(cfg: &LogConfig) -> Result<Self> {
        let (diagnostics, subscriber) = Self::build(cfg)?;
        subscriber
            .try_init()
            .context("a global tracing subscriber is already installed")?;
        Ok(diagnostics)
    }

    /// Build the subscriber without installing it
    pub fn build(
        cfg: &LogConfig,
    ) -> Result<(Self, impl tracing::Subscriber + Send + Sync + 'static)> {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&cfg.level)
                .with_context(|| format!("invalid log level '{}'", cfg.level))?,
        };

        let stderr = Arc::new(AtomicBool::new(cfg.stderr));
        let stderr_switch = stderr.clone();
        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(filter_fn(move |_| stderr_switch.load(Ordering::Relaxed)));

        let (file, file_layer, file_guard) = match &cfg.file {
            Some(path) => {
                let appender = file_appender(path)?;
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let switch = Arc::new(AtomicBool::new(true));
                let file_switch = switch.clone();
                let layer = fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_filter(filter_fn(move |_| file_switch.load(Ordering::Relaxed)));
                (Some(switch), Some(layer), Some(guard))
            }
            None => (None, None, None),
        };

        let subscriber = tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer);

        Ok((
            Self {
                stderr,
                file,
                _file_guard: file_guard,
            },
            subscriber,
        ))
    }

    pub fn set_stderr(&self, enabled: bool) {
        self.stderr.store(enabled, Ordering::Relaxed);
    }

    pub fn stderr_enabled(&self) -> bool {
        self.stderr.load(Ordering::Relaxed)
    }

    /// Switch the file channel. Fails if no log file was configured.
    pub fn set_file(&self, enabled: bool) -> Result<()> {
        match &self.file {
            Some(switch) => {
                switch.store(enabled, Ordering::Relaxed);
                Ok(())
            }
            None if enabled => bail!("no log file configured"),
            None => Ok(()),
        }
    }

    pub fn file_enabled(&self) -> bool {
        self.file
            .as_ref()
            .is_some_and(|switch| switch.load(Ordering::Relaxed))
    }
}

fn file_appender(path: &Path) -> Result<RollingFileAppender> {
    let name = path
        .file_name()
        .with_context(|| format!("log file path {} has no file name", path.display()))?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name.to_string_lossy().into_owned())
        .build(dir)
        .with_context(|| format!("can not open log file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_channel_can_be_muted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("k2ksm.log");
        let cfg = LogConfig {
            level: "info".to_string(),
            stderr: false,
            file: Some(path.clone()),
        };

        let (diagnostics, subscriber) = Diagnostics::build(&cfg).unwrap();
        assert!(!diagnostics.stderr_enabled());
        assert!(diagnostics.file_enabled());

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("first message");
            diagnostics.set_file(false).unwrap();
            tracing::warn!("muted message");
            diagnostics.set_file(true).unwrap();
            tracing::warn!("last message");
        });
        drop(diagnostics);

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("first message"));
        assert!(!written.contains("muted message"));
        assert!(written.contains("last message"));
    }

    #[test]
    fn test_file_switch_without_file() {
        let cfg = LogConfig::default();
        let (diagnostics, _subscriber) = Diagnostics::build(&cfg).unwrap();

        assert!(diagnostics.stderr_enabled());
        assert!(!diagnostics.file_enabled());
        assert!(diagnostics.set_file(true).is_err());
        assert!(diagnostics.set_file(false).is_ok());

        diagnostics.set_stderr(false);
        assert!(!diagnostics.stderr_enabled());
    }

    #[test]
    fn test_invalid_level_rejected() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let cfg = LogConfig {
            level: "k2ksm=loud".to_string(),
            ..LogConfig::default()
        };
        assert!(Diagnostics::build(&cfg).is_err());
    }
}
