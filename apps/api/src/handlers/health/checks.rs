use redis::AsyncCommands;

use super::*;

pub(super) async fn check_postgres(pool: &sqlx::PgPool) -> HealthDependencyStatus {
    let probe = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await
        .map(|_| ())
        .map_err(|error| format!("postgres check failed: {error}"));

    HealthDependencyStatus::from_probe(probe)
}

/// `disabled` when no Redis client is configured.
pub(super) async fn check_redis(redis_client: Option<&redis::Client>) -> HealthDependencyStatus {
    let Some(redis_client) = redis_client else {
        return HealthDependencyStatus::disabled();
    };

    HealthDependencyStatus::from_probe(ping_redis(redis_client).await)
}

async fn ping_redis(redis_client: &redis::Client) -> Result<(), String> {
    let mut connection = redis_client
        .get_multiplexed_async_connection()
        .await
        .map_err(|error| format!("redis connection failed: {error}"))?;
    let reply = connection
        .ping::<String>()
        .await
        .map_err(|error| format!("redis ping failed: {error}"))?;

    if reply.eq_ignore_ascii_case("pong") {
        Ok(())
    } else {
        Err(format!("unexpected redis ping response: {reply}"))
    }
}
