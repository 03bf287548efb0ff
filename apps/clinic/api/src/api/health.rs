//! `/ready` probes both stores the clinic cannot serve without.

use crate::state::AppState;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use axum_helpers::server::{HealthCheckFuture, run_health_checks};
use database::DatabaseResult;

fn probe<'a>(check: impl Future<Output = DatabaseResult<()>> + Send + 'a) -> HealthCheckFuture<'a> {
    Box::pin(async move { check.await.map_err(|e| e.to_string()) })
}

/// Records and visits live in PostgreSQL; every authenticated request
/// consults the token store in Redis. Either one down means 503.
pub async fn ready_handler(State(state): State<AppState>) -> Response {
    let mut tokens = state.redis.clone();
    let checks = vec![
        ("database", probe(database::postgres::check_health(&state.db))),
        ("token_store", probe(async move { database::redis::check_health(&mut tokens).await })),
    ];

    match run_health_checks(checks).await {
        Ok(ready) => ready.into_response(),
        Err(not_ready) => not_ready.into_response(),
    }
}
