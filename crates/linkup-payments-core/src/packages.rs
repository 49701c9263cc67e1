//! Sponsorship package catalogue

use tracing::{info, instrument};

use linkup_db::{CreatePackage, DbError, UpdatePackage};
use linkup_types::{PackageId, PromotionKind, SponsorshipPackage};

use crate::error::{PaymentsError, PaymentsResult};
use crate::ledger::Ledger;

/// New package input
#[derive(Debug, Clone)]
pub struct NewPackage {
    pub title: String,
    pub benefits: Vec<String>,
    pub price_cents: i64,
    pub kind: PromotionKind,
    pub duration_days: i32,
}

fn validate_title(title: &str) -> PaymentsResult<()> {
    if title.trim().is_empty() {
        return Err(PaymentsError::BadRequest("title is required".into()));
    }
    Ok(())
}

fn validate_price(price_cents: i64) -> PaymentsResult<()> {
    if price_cents <= 0 {
        return Err(PaymentsError::BadRequest("price must be positive".into()));
    }
    Ok(())
}

fn validate_duration(days: i32) -> PaymentsResult<()> {
    if days <= 0 {
        return Err(PaymentsError::BadRequest("duration must be at least one day".into()));
    }
    Ok(())
}

/// Package management
#[derive(Clone)]
pub struct PackageService {
    ledger: Ledger,
}

impl PackageService {
    /// Create a new package service
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// All packages
    pub async fn list(&self) -> PaymentsResult<Vec<SponsorshipPackage>> {
        Ok(self.ledger.packages.list().await?)
    }

    /// Create a package; one per kind, titles unique
    #[instrument(skip(self, input), fields(kind = %input.kind))]
    pub async fn create(&self, input: NewPackage) -> PaymentsResult<SponsorshipPackage> {
        validate_title(&input.title)?;
        validate_price(input.price_cents)?;
        validate_duration(input.duration_days)?;

        if self.ledger.packages.find_by_kind(input.kind).await?.is_some() {
            return Err(PaymentsError::Conflict(format!(
                "A {} package already exists",
                input.kind.label().to_lowercase()
            )));
        }

        let package = self
            .ledger
            .packages
            .create(CreatePackage {
                id: PackageId::new(),
                title: input.title.trim().to_string(),
                benefits: input.benefits,
                price_cents: input.price_cents,
                kind: input.kind,
                duration_days: input.duration_days,
            })
            .await
            .map_err(|e| match e {
                DbError::Duplicate(_) => {
                    PaymentsError::Conflict("A package with this title already exists".into())
                }
                other => other.into(),
            })?;

        info!(package_id = %package.id, "Package created");
        Ok(package)
    }

    /// Apply a partial update
    #[instrument(skip(self, update))]
    pub async fn update(
        &self,
        id: PackageId,
        mut update: UpdatePackage,
    ) -> PaymentsResult<SponsorshipPackage> {
        if let Some(title) = update.title.as_mut() {
            validate_title(title)?;
            *title = title.trim().to_string();
        }
        if let Some(price) = update.price_cents {
            validate_price(price)?;
        }
        if let Some(days) = update.duration_days {
            validate_duration(days)?;
        }

        self.ledger
            .packages
            .update(id, update)
            .await
            .map_err(|e| match e {
                DbError::Duplicate(_) => {
                    PaymentsError::Conflict("A package with this title already exists".into())
                }
                other => other.into(),
            })?
            .ok_or(PaymentsError::NotFound("package"))
    }
}
