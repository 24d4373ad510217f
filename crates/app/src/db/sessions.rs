//! `PostgreSQL`-backed shop session store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use saltline_core::{AccessToken, ShopDomain};

use crate::models::ShopSession;
use crate::sessions::{SessionStoreError, ShopSessionStore};

// =============================================================================
// Internal Row Type
// =============================================================================

/// Internal row type for `PostgreSQL` shop session queries.
#[derive(Debug, sqlx::FromRow)]
struct ShopSessionRow {
    id: Uuid,
    shop: String,
    access_token: String,
    scopes: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ShopSessionRow> for ShopSession {
    type Error = SessionStoreError;

    fn try_from(row: ShopSessionRow) -> Result<Self, Self::Error> {
        let shop = ShopDomain::parse(&row.shop).map_err(|e| {
            SessionStoreError::DataCorruption(format!("invalid shop domain in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            shop,
            access_token: AccessToken::new(row.access_token),
            scopes: row.scopes,
            created_at: row.created_at,
        })
    }
}

// =============================================================================
// Store
// =============================================================================

/// `PostgreSQL` implementation of [`ShopSessionStore`].
#[derive(Debug, Clone)]
pub struct PostgresSessionStore {
    pool: PgPool,
}

impl PostgresSessionStore {
    /// Create a new store over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShopSessionStore for PostgresSessionStore {
    async fn store(&self, session: ShopSession) -> Result<Uuid, SessionStoreError> {
        sqlx::query(
            r"
            INSERT INTO shop_session (id, shop, access_token, scopes, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
                SET shop = EXCLUDED.shop,
                    access_token = EXCLUDED.access_token,
                    scopes = EXCLUDED.scopes
            ",
        )
        .bind(session.id)
        .bind(session.shop.as_str())
        .bind(session.access_token.as_str())
        .bind(&session.scopes)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;

        Ok(session.id)
    }

    async fn retrieve(&self, id: Uuid) -> Result<Option<ShopSession>, SessionStoreError> {
        let row = sqlx::query_as::<_, ShopSessionRow>(
            r"
            SELECT id, shop, access_token, scopes, created_at
            FROM shop_session
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<(), SessionStoreError> {
        sqlx::query("DELETE FROM shop_session WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), SessionStoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
