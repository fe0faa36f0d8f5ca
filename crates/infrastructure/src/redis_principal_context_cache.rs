//! Redis-backed principal context cache.

use async_trait::async_trait;
use orgaccess_application::PrincipalContextCache;
use orgaccess_core::{AppError, AppResult};
use orgaccess_domain::{PrincipalContext, PrincipalId};
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tracing::warn;

/// Redis implementation of the principal context cache port.
///
/// Keys embed a generation counter; invalidating every principal bumps the
/// generation instead of scanning the keyspace, and orphaned keys expire on
/// their own ttl.
#[derive(Clone)]
pub struct RedisPrincipalContextCache {
    client: redis::Client,
    key_prefix: String,
}

impl RedisPrincipalContextCache {
    /// Creates a cache adapter with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn generation_key(&self) -> String {
        format!("{}:generation", self.key_prefix)
    }

    fn context_key(&self, generation: u64, principal_id: PrincipalId) -> String {
        format!("{}:g{generation}:{principal_id}", self.key_prefix)
    }

    async fn connection(&self) -> AppResult<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| redis_error("failed to connect to redis", error))
    }

    async fn current_generation(&self, connection: &mut MultiplexedConnection) -> AppResult<u64> {
        let generation: Option<u64> = connection
            .get(self.generation_key())
            .await
            .map_err(|error| redis_error("failed to read context cache generation", error))?;

        Ok(generation.unwrap_or(0))
    }
}

#[async_trait]
impl PrincipalContextCache for RedisPrincipalContextCache {
    async fn get_context(&self, principal_id: PrincipalId) -> AppResult<Option<PrincipalContext>> {
        let mut connection = self.connection().await?;
        let generation = self.current_generation(&mut connection).await?;

        let encoded: Option<String> = connection
            .get(self.context_key(generation, principal_id))
            .await
            .map_err(|error| redis_error("failed to read principal context cache entry", error))?;

        let Some(encoded) = encoded else {
            return Ok(None);
        };

        match serde_json::from_str::<PrincipalContext>(&encoded) {
            Ok(context) => Ok(Some(context)),
            Err(error) => {
                warn!(%principal_id, %error, "discarding undecodable principal context cache entry");
                Ok(None)
            }
        }
    }

    async fn set_context(
        &self,
        principal_id: PrincipalId,
        context: &PrincipalContext,
        ttl_seconds: u32,
    ) -> AppResult<()> {
        if ttl_seconds == 0 {
            return Ok(());
        }

        let encoded = serde_json::to_string(context).map_err(|error| {
            AppError::Internal(format!("failed to encode principal context: {error}"))
        })?;
        let mut connection = self.connection().await?;
        let generation = self.current_generation(&mut connection).await?;

        connection
            .set_ex(
                self.context_key(generation, principal_id),
                encoded,
                u64::from(ttl_seconds),
            )
            .await
            .map_err(|error| redis_error("failed to write principal context cache entry", error))
    }

    async fn invalidate_context(&self, principal_id: Option<PrincipalId>) -> AppResult<()> {
        let mut connection = self.connection().await?;

        match principal_id {
            Some(principal_id) => {
                let generation = self.current_generation(&mut connection).await?;
                connection
                    .del::<_, ()>(self.context_key(generation, principal_id))
                    .await
                    .map_err(|error| {
                        redis_error("failed to delete principal context cache entry", error)
                    })
            }
            None => connection
                .incr::<_, _, ()>(self.generation_key(), 1_u64)
                .await
                .map_err(|error| redis_error("failed to bump context cache generation", error)),
        }
    }
}

fn redis_error(context: &str, error: redis::RedisError) -> AppError {
    if error.is_io_error() || error.is_timeout() {
        AppError::Unavailable(format!("{context}: {error}"))
    } else {
        AppError::Internal(format!("{context}: {error}"))
    }
}
