use std::path::Path;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_error::ErrorLayer;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

use crate::config::LoggingConfig;
use crate::targets::{SUBSYSTEM_TARGETS, T_DHCP, T_LINK};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps the non-blocking file writers flushing; drop it last.
pub struct LoggingGuards {
    file_guards: Vec<WorkerGuard>,
}

impl LoggingGuards {
    pub fn file_logging(&self) -> bool {
        !self.file_guards.is_empty()
    }
}

/// Install the global subscriber: stdout plus daily files under `<root>/logs`.
///
/// File logging is skipped with a warning when the directory cannot be
/// created. A second call leaves the first subscriber in place.
pub fn init(component: &str, root: &Path, cfg: &LoggingConfig) -> Result<LoggingGuards> {
    let stdout_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_line_number(true)
        .compact()
        .boxed();

    let mut layers: Vec<BoxedLayer> = vec![stdout_layer];
    let mut file_guards = Vec::new();
    let mut dir_error = None;

    if cfg.enabled {
        let log_dir = log_dir(root);
        match std::fs::create_dir_all(&log_dir) {
            Ok(()) => {
                let (layer, guard) = file_layer(
                    &log_dir,
                    &component_log_name(component),
                    component_targets(),
                );
                layers.push(layer);
                file_guards.push(guard);

                for (filename, target) in [("link.log", T_LINK), ("dhcp.log", T_DHCP)] {
                    let targets = Targets::new().with_target(target, LevelFilter::TRACE);
                    let (layer, guard) = file_layer(&log_dir, filename, targets);
                    layers.push(layer);
                    file_guards.push(guard);
                }
            }
            Err(err) => dir_error = Some((log_dir, err)),
        }
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(build_filter(cfg))
        .with(ErrorLayer::default())
        .try_init()
        .ok();

    if let Some((dir, err)) = dir_error {
        tracing::warn!("File logging disabled ({}): {}", dir.display(), err);
    }

    Ok(LoggingGuards { file_guards })
}

pub fn log_dir(root: &Path) -> std::path::PathBuf {
    root.join("logs")
}

pub fn component_log_name(component: &str) -> String {
    format!("{component}.log")
}

fn build_filter(cfg: &LoggingConfig) -> EnvFilter {
    if !cfg.enabled {
        return EnvFilter::new("off");
    }
    EnvFilter::try_new(cfg.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn component_targets() -> Targets {
    SUBSYSTEM_TARGETS
        .iter()
        .fold(Targets::new().with_default(LevelFilter::TRACE), |targets, t| {
            targets.with_target(*t, LevelFilter::OFF)
        })
}

fn file_layer(log_dir: &Path, filename: &str, targets: Targets) -> (BoxedLayer, WorkerGuard) {
    let appender = tracing_appender::rolling::daily(log_dir, filename);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_line_number(true)
        .with_ansi(false)
        .compact()
        .with_writer(writer)
        .with_filter(targets)
        .boxed();
    (layer, guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_filter_disabled() {
        let cfg = LoggingConfig {
            enabled: false,
            ..Default::default()
        };
        assert_eq!(build_filter(&cfg).to_string(), "off");
    }

    #[test]
    fn test_invalid_level_falls_back() {
        let cfg = LoggingConfig {
            level: "link=notalevel".to_string(),
            ..Default::default()
        };
        assert_eq!(build_filter(&cfg).to_string(), "info");
    }

    #[test]
    fn test_component_log_name() {
        assert_eq!(component_log_name("uplinkd"), "uplinkd.log");
    }

    #[test]
    fn test_init_creates_log_dir() {
        let root = TempDir::new().unwrap();
        let guards = init("uplinkd", root.path(), &LoggingConfig::default()).unwrap();
        assert!(guards.file_logging());
        assert!(log_dir(root.path()).is_dir());
    }
}
