// SPDX-License-Identifier: MIT OR Apache-2.0

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Installs the global logger, writing to stderr.
///
/// The filter is read from `RUST_LOG`. Without it everything is logged at `info` level, or at
/// `debug` level when `debug` is set.
pub fn setup_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .ok();
}
