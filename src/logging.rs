use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default directive when `RUST_LOG` is not set
pub const DEFAULT_DIRECTIVE: &str = "ev_registry=info";

/// Build the filter: `RUST_LOG` if present, otherwise `ev_registry=info`.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Initializes console logging. Log lines go to stderr so stdout stays
/// free for the loader's progress output. Safe to call more than once.
pub fn init_logging() {
    let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(console_layer)
        .try_init();
}
