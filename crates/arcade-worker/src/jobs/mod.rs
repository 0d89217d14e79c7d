//! Built-in side-effect handlers.

pub mod archive;

use std::sync::Arc;
use std::time::Duration;

use arcade_core::config::WorkerConfig;
use arcade_core::error::AppError;

use crate::executor::EffectHandler;

pub use archive::{HttpArchiveSink, LogArchiveSink};

/// Request timeout for the history sink.
const ARCHIVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Pick the history sink: HTTP when an archive URL is configured, the log
/// otherwise.
pub fn history_sink(config: &WorkerConfig) -> Result<Arc<dyn EffectHandler>, AppError> {
    if config.archive_url.trim().is_empty() {
        return Ok(Arc::new(LogArchiveSink));
    }
    Ok(Arc::new(HttpArchiveSink::new(&config.archive_url, ARCHIVE_TIMEOUT)?))
}
