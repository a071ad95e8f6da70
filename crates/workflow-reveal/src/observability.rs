use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::config::parse_bool;

const DEFAULT_LOG_FILE: &str = "workflow-reveal.logs.jsonl";

static INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging once per process.
///
/// Environment variables:
/// - `WORKFLOW_REVEAL_OBSERVABILITY`: optional enable/disable flag (default enabled).
/// - `WORKFLOW_REVEAL_LOG_LEVEL`: optional filter (`info`, `workflow_reveal=debug`, ...).
/// - `RUST_LOG`: used when the variable above is unset or invalid.
/// - `WORKFLOW_REVEAL_JSON_LOG_PATH`: when set, logs are JSON lines appended to
///   that file; otherwise compact lines go to stderr, away from revealed text.
pub fn init_observability() {
    INIT.get_or_init(|| {
        let enabled = std::env::var("WORKFLOW_REVEAL_OBSERVABILITY")
            .ok()
            .and_then(|v| parse_bool(&v))
            .unwrap_or(true);
        if !enabled {
            return;
        }

        let filter = env_filter(std::env::var("WORKFLOW_REVEAL_LOG_LEVEL").ok().as_deref());
        match std::env::var("WORKFLOW_REVEAL_JSON_LOG_PATH") {
            Ok(raw) => {
                let (dir, file_name) = json_log_target(Path::new(&raw));
                let _ = std::fs::create_dir_all(&dir);
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(false)
                    .with_writer(tracing_appender::rolling::never(dir, file_name));
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .try_init();
            }
            Err(_) => {
                let layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr);
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .try_init();
            }
        }
    });
}

fn env_filter(level: Option<&str>) -> EnvFilter {
    level
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Splits a log path into the directory and file name the appender expects.
fn json_log_target(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE)
        .to_string();
    (dir, file_name)
}
