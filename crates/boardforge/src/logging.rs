use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Installs a stdout `tracing` subscriber.
///
/// `RUST_LOG` wins over `filter` when set, e.g.
/// `RUST_LOG=boardforge_session=debug`. Returns `false` if a global
/// subscriber was already installed, in which case nothing changes.
pub fn init_tracing(filter: &str) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(filter, "tracing initialised");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_second_call_is_noop() {
        init_tracing("warn");
        assert!(!init_tracing("debug"));
    }
}
