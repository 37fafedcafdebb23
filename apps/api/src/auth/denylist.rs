//! Revoked token ids, kept until the token would have expired anyway.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;

/// Storage for revoked `jti` values. Carried in `AppState` as `Arc<dyn TokenDenylist>`.
#[async_trait]
pub trait TokenDenylist: Send + Sync {
    async fn revoke(&self, jti: Uuid, ttl: Duration) -> Result<(), AppError>;
    async fn is_revoked(&self, jti: Uuid) -> Result<bool, AppError>;
}

fn redis_key(jti: Uuid) -> String {
    format!("hireops:revoked:{jti}")
}

/// Redis-backed denylist. Keys expire on their own with `EX`.
pub struct RedisDenylist {
    client: redis::Client,
}

impl RedisDenylist {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, AppError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Redis connection failed: {e}")))
    }
}

#[async_trait]
impl TokenDenylist for RedisDenylist {
    async fn revoke(&self, jti: Uuid, ttl: Duration) -> Result<(), AppError> {
        let mut conn = self.connection().await?;
        redis::cmd("SET")
            .arg(redis_key(jti))
            .arg(1)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Redis SET failed: {e}")))
    }

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, AppError> {
        let mut conn = self.connection().await?;
        redis::cmd("EXISTS")
            .arg(redis_key(jti))
            .query_async::<_, bool>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Redis EXISTS failed: {e}")))
    }
}

/// Process-local denylist, used when no `REDIS_URL` is configured and in tests.
#[derive(Default)]
pub struct MemoryDenylist {
    revoked: Mutex<HashMap<Uuid, Instant>>,
}

#[async_trait]
impl TokenDenylist for MemoryDenylist {
    async fn revoke(&self, jti: Uuid, ttl: Duration) -> Result<(), AppError> {
        let now = Instant::now();
        let mut revoked = self
            .revoked
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("denylist lock poisoned")))?;
        revoked.retain(|_, expires| *expires > now);
        revoked.insert(jti, now + ttl);
        Ok(())
    }

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, AppError> {
        let revoked = self
            .revoked
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("denylist lock poisoned")))?;
        Ok(revoked
            .get(&jti)
            .is_some_and(|expires| *expires > Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_denylist_revokes() {
        let denylist = MemoryDenylist::default();
        let jti = Uuid::new_v4();
        assert!(!denylist.is_revoked(jti).await.unwrap());

        denylist.revoke(jti, Duration::from_secs(60)).await.unwrap();
        assert!(denylist.is_revoked(jti).await.unwrap());
        assert!(!denylist.is_revoked(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_denylist_entries_expire() {
        let denylist = MemoryDenylist::default();
        let jti = Uuid::new_v4();
        denylist.revoke(jti, Duration::ZERO).await.unwrap();
        assert!(!denylist.is_revoked(jti).await.unwrap());
    }

    #[test]
    fn test_redis_key_is_namespaced() {
        let jti = Uuid::nil();
        assert_eq!(
            redis_key(jti),
            "hireops:revoked:00000000-0000-0000-0000-000000000000"
        );
    }
}
