// db/db.rs
use std::sync::Arc;

use redis::aio::ConnectionManager;
use sqlx::{Pool, Postgres};

#[derive(Clone)]
pub struct DBClient {
    pub pool: Pool<Postgres>,
    pub redis_client: Option<Arc<ConnectionManager>>,
}

impl std::fmt::Debug for DBClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DBClient")
            .field("pool", &"Pool<Postgres>")
            .field("redis_client", &self.redis_client.is_some())
            .finish()
    }
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient {
            pool,
            redis_client: None,
        }
    }

    /// Connects Redis alongside Postgres. A Redis failure is logged and the
    /// client falls back to Postgres only.
    pub async fn with_redis(pool: Pool<Postgres>, redis_url: &str) -> Self {
        let client = match redis::Client::open(redis_url) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("Failed to create Redis client: {}. Continuing without Redis.", e);
                return DBClient::new(pool);
            }
        };

        match ConnectionManager::new(client).await {
            Ok(conn) => {
                tracing::info!("Redis connection established");
                DBClient {
                    pool,
                    redis_client: Some(Arc::new(conn)),
                }
            }
            Err(e) => {
                tracing::warn!("Failed to connect to Redis: {}. Continuing without Redis.", e);
                DBClient::new(pool)
            }
        }
    }

    pub fn is_redis_available(&self) -> bool {
        self.redis_client.is_some()
    }
}

/// True when `err` is a Postgres unique-constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}
