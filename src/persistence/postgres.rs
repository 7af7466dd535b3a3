//! PostgreSQL implementation of the notification store.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::NotificationStore;
use super::models::{NOTIFICATION_COLUMNS, NotificationRow, NotificationTuple};
use crate::config::BroadcasterConfig;
use crate::domain::{DeliveryStatus, MessageId, NotificationEvent, UserId};
use crate::error::BroadcasterError;

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool from configuration and applies the embedded
    /// migrations.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcasterError::Storage`] if the database is unreachable
    /// or a migration fails.
    pub async fn connect(config: &BroadcasterConfig) -> Result<Self, BroadcasterError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| BroadcasterError::Storage(e.to_string()))?;

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl NotificationStore for PostgresStore {
    async fn find(
        &self,
        message_id: &MessageId,
    ) -> Result<Option<NotificationEvent>, BroadcasterError> {
        let row = sqlx::query_as::<_, NotificationTuple>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE message_id = $1"
        ))
        .bind(message_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|tuple| NotificationEvent::try_from(NotificationRow::from(tuple)))
            .transpose()
    }

    async fn mark_delivered(&self, message_id: &MessageId) -> Result<bool, BroadcasterError> {
        let result = sqlx::query(
            "UPDATE notifications SET status = 'delivered', delivered_at = now() \
             WHERE message_id = $1 AND status = 'pending'",
        )
        .bind(message_id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_read(&self, message_id: &MessageId) -> Result<bool, BroadcasterError> {
        let result = sqlx::query(
            "UPDATE notifications SET status = 'read', read_at = now() \
             WHERE message_id = $1 AND status <> 'read'",
        )
        .bind(message_id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
        status: DeliveryStatus,
    ) -> Result<Vec<NotificationEvent>, BroadcasterError> {
        let rows = sqlx::query_as::<_, NotificationTuple>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE recipient_type = 'individual' AND recipient_id = $1 AND status = $2 \
             ORDER BY created_at DESC"
        ))
        .bind(user_id.as_str())
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|tuple| NotificationEvent::try_from(NotificationRow::from(tuple)))
            .collect()
    }

    async fn ping(&self) -> Result<(), BroadcasterError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
