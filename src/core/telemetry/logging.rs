use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_DIRECTIVES: &str = "info,tantivy=warn";

/// Installs the fmt subscriber. `RUST_LOG` wins over the default directives;
/// a second call is a no-op.
pub fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    let _ = fmt().with_env_filter(env_filter).with_target(true).try_init();
}
