use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

static INIT: OnceLock<()> = OnceLock::new();

/// Install the global tracing subscriber. Level is controlled by `RUST_LOG`,
/// defaulting to `info`. Safe to call more than once; only the first call
/// takes effect.
pub fn init() {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = Registry::default()
            .with(filter)
            .with(fmt::layer().with_target(false));
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
