//! PostgreSQL user repository implementation

use async_trait::async_trait;
use sqlx::PgPool;

use linkup_types::{User, UserId};

use crate::error::{DbError, DbResult};
use crate::models::UserRow;
use crate::repo::{CreateUser, UserRepository};

/// PostgreSQL user repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: UserId) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, full_name, email, role, is_verified, payout_account_id, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        user.map(User::try_from).transpose()
    }

    async fn create(&self, user: CreateUser) -> DbResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, full_name, email, role, is_verified, payout_account_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, full_name, email, role, is_verified, payout_account_id, created_at
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(user.role.to_string())
        .bind(user.is_verified)
        .bind(&user.payout_account_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from_insert)?;

        User::try_from(row)
    }
}
