//! Telemetry initialization (tracing, fmt subscriber, env filter).
//!
//! Log verbosity is controlled through the standard `RUST_LOG` environment
//! variable, defaulting to `info` when unset:
//!
//! ```bash
//! RUST_LOG=soapbox=debug,tower_http=debug soapbox
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the tracing subscriber.
///
/// Safe to call once per process; a second call returns an error from
/// `try_init` rather than panicking, which keeps test harnesses happy.
pub fn init_telemetry() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}
