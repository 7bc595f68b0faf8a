//! Process-wide `tracing` subscriber.

use std::io::{self, Stderr};
use std::sync::Mutex;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "widegate=info";

/// Install the subscriber. `verbose` raises the default filter to debug.
///
/// Output goes to a single locked stderr writer so lines never interleave.
/// Calling this twice is a no-op.
pub fn init(verbose: bool) {
    let default = if verbose { "widegate=debug" } else { DEFAULT_FILTER };
    let writer: Mutex<Stderr> = Mutex::new(io::stderr());

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(fmt::layer().with_target(false).with_writer(writer))
        .try_init();
}
