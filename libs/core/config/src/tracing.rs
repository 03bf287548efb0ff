//! Logging setup shared by every binary in the workspace.
//!
//! Development gets pretty multi-line events; production gets one flattened
//! JSON object per event with its target kept, so `audit` events can be
//! routed to their own sink. Both install `tracing_error::ErrorLayer` so
//! `eyre` reports carry span traces.

use crate::Environment;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, prelude::*};

/// Default directives when `RUST_LOG` is unset.
///
/// `audit` stays at info in both modes; login, logout, checkout and
/// patient deletion must always be recorded.
pub fn default_directives(environment: &Environment) -> &'static str {
    if environment.is_production() {
        "info,audit=info,tower_http=info,sea_orm=warn,sqlx=warn"
    } else {
        "debug,audit=info,tower_http=debug,sea_orm=info,sqlx=warn,hyper_util=info"
    }
}

fn env_filter(environment: &Environment) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(environment)))
}

/// Install color-eyre for startup error reports.
///
/// Locations on, environment section off. Repeated calls are ignored.
pub fn install_color_eyre() {
    let _ = color_eyre::config::HookBuilder::default()
        .display_location_section(true)
        .display_env_section(false)
        .install();
}

/// Initialize the global subscriber for `environment`.
///
/// - `APP_ENV=production`: JSON, flattened, targets kept
/// - otherwise: pretty output without targets or file locations
/// - `RUST_LOG` overrides [`default_directives`], e.g. `clinic_api=trace,audit=info`
///
/// A second call is a no-op, which keeps tests that share a process quiet.
///
/// ```ignore
/// #[tracing::instrument(skip(self), fields(article_id = %id))]
/// async fn get_article(&self, id: i64) -> PharmacyResult<ArticleResource> { .. }
/// ```
pub fn init_tracing(environment: &Environment) {
    let filter = env_filter(environment);

    let result = if environment.is_production() {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .flatten_event(true)
                    .with_current_span(false),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    };

    match result {
        Ok(()) => info!(environment = ?environment, "Tracing initialized"),
        Err(_) => debug!("Tracing already initialized"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_target_is_always_enabled() {
        for env in [Environment::Development, Environment::Production] {
            assert!(default_directives(&env).contains("audit=info"));
        }
    }

    #[test]
    fn test_production_is_quieter_than_development() {
        assert!(default_directives(&Environment::Production).starts_with("info,"));
        assert!(default_directives(&Environment::Development).starts_with("debug,"));
    }

    #[test]
    fn test_default_directives_parse() {
        for env in [Environment::Development, Environment::Production] {
            assert!(EnvFilter::try_new(default_directives(&env)).is_ok());
        }
    }

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        temp_env::with_var("RUST_LOG", Some("warn"), || {
            init_tracing(&Environment::Production);
            init_tracing(&Environment::Development);
        });
    }
}
