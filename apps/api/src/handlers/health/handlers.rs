use super::checks::{check_postgres, check_redis};
use super::*;

pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let postgres = check_postgres(&state.postgres_pool).await;
    let redis = check_redis(state.redis_client.as_ref()).await;

    let ready = is_ready(postgres.status, redis.status);
    let http_status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(HealthResponse {
            status: if ready { "ok" } else { "degraded" },
            ready,
            postgres,
            redis,
        }),
    )
}

fn is_ready(postgres_status: &str, redis_status: &str) -> bool {
    postgres_status == "ok" && redis_status != "error"
}
