//! PostgreSQL sponsorship package repository implementation

use async_trait::async_trait;
use sqlx::PgPool;

use linkup_types::{PackageId, PromotionKind, SponsorshipPackage};

use crate::error::{DbError, DbResult};
use crate::models::{convert_all, PackageRow};
use crate::repo::{CreatePackage, PackageRepository, UpdatePackage};

/// PostgreSQL package repository
#[derive(Clone)]
pub struct PgPackageRepository {
    pool: PgPool,
}

impl PgPackageRepository {
    /// Create a new package repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PackageRepository for PgPackageRepository {
    async fn find_by_id(&self, id: PackageId) -> DbResult<Option<SponsorshipPackage>> {
        let row = sqlx::query_as::<_, PackageRow>(
            r#"
            SELECT id, title, benefits, price_cents, kind, duration_days, created_at
            FROM sponsorship_packages
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(SponsorshipPackage::try_from).transpose()
    }

    async fn find_by_kind(&self, kind: PromotionKind) -> DbResult<Option<SponsorshipPackage>> {
        let row = sqlx::query_as::<_, PackageRow>(
            r#"
            SELECT id, title, benefits, price_cents, kind, duration_days, created_at
            FROM sponsorship_packages
            WHERE kind = $1
            "#,
        )
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(SponsorshipPackage::try_from).transpose()
    }

    async fn list(&self) -> DbResult<Vec<SponsorshipPackage>> {
        let rows = sqlx::query_as::<_, PackageRow>(
            r#"
            SELECT id, title, benefits, price_cents, kind, duration_days, created_at
            FROM sponsorship_packages
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn create(&self, package: CreatePackage) -> DbResult<SponsorshipPackage> {
        let row = sqlx::query_as::<_, PackageRow>(
            r#"
            INSERT INTO sponsorship_packages (id, title, benefits, price_cents, kind, duration_days)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, title, benefits, price_cents, kind, duration_days, created_at
            "#,
        )
        .bind(package.id.as_uuid())
        .bind(&package.title)
        .bind(&package.benefits)
        .bind(package.price_cents)
        .bind(package.kind.as_str())
        .bind(package.duration_days)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from_insert)?;

        SponsorshipPackage::try_from(row)
    }

    async fn update(
        &self,
        id: PackageId,
        update: UpdatePackage,
    ) -> DbResult<Option<SponsorshipPackage>> {
        let row = sqlx::query_as::<_, PackageRow>(
            r#"
            UPDATE sponsorship_packages
            SET title = COALESCE($1, title),
                benefits = COALESCE($2, benefits),
                price_cents = COALESCE($3, price_cents),
                duration_days = COALESCE($4, duration_days)
            WHERE id = $5
            RETURNING id, title, benefits, price_cents, kind, duration_days, created_at
            "#,
        )
        .bind(&update.title)
        .bind(&update.benefits)
        .bind(update.price_cents)
        .bind(update.duration_days)
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from_insert)?;

        row.map(SponsorshipPackage::try_from).transpose()
    }
}
