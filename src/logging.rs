use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

pub(crate) const LOG_FILE_NAME: &str = "bills-analyzer.log";

/// Send tracing output to `<data_dir>/bills-analyzer.log`.
///
/// The terminal belongs to the TUI, so nothing is ever written to stdout/stderr.
/// Filtering follows `RUST_LOG`, defaulting to `info`. Failure to open the log
/// file or to install the subscriber leaves logging disabled.
pub(crate) fn init(data_dir: &Path) {
    let path = data_dir.join(LOG_FILE_NAME);
    let file = match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(f) => f,
        Err(_) => return,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .try_init();
}
