// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2025 Switchyard Contributors

//! Logging initialisation for the `switchyard` binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,switchyard=debug";

/// Install the global subscriber.
///
/// The filter comes from `RUST_LOG`, falling back to `info,switchyard=debug`.
/// With `json` set, events are written as one JSON object per line.
pub fn init(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    Ok(())
}
