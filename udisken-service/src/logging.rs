// SPDX-License-Identifier: GPL-3.0-only

use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingLevel;

/// Log to stderr so journald picks it up. `RUST_LOG` overrides `level`.
pub(crate) fn init(level: LoggingLevel) {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directives(level))),
        )
        .with_writer(std::io::stderr)
        .init();
}

// The `udisken` target prefix also covers the udisken_udisks and
// udisken_contracts crates.
fn default_directives(level: LoggingLevel) -> String {
    format!("udisken={},warn", level.as_directive())
}
