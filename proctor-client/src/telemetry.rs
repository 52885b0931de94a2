use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::EnvVars;

/// Installs the diagnostic channel: pretty stdout logging, plus Sentry when `SENTRY_DSN` is set.
///
/// NOTE: Events are only flushed to Sentry once the returned guard is dropped.
pub fn init(env_vars: &EnvVars) -> Option<sentry::ClientInitGuard> {
    let installed = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=debug,proctor_core=debug", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().pretty())
        .with(sentry::integrations::tracing::layer())
        .try_init();
    if let Err(e) = installed {
        debug!("tracing subscriber already installed: {e}");
    }

    let sentry_dsn = env_vars.sentry_dsn.clone()?;
    info!("initializing Sentry");
    Some(sentry::init((
        sentry_dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(env_vars.environment.to_string().into()),
            traces_sample_rate: 1.0,
            ..Default::default()
        },
    )))
}
