//! PostgreSQL implementation of the site repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{NewSite, Site, SiteId};
use crate::domain::repositories::SiteRepository;
use crate::error::AppError;

/// PostgreSQL repository for sites.
pub struct PgSiteRepository {
    pool: Arc<PgPool>,
}

impl PgSiteRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SiteRow {
    id: i64,
    domain: String,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<SiteRow> for Site {
    fn from(row: SiteRow) -> Self {
        Site::new(row.id, row.domain, row.name, row.created_at)
    }
}

#[async_trait]
impl SiteRepository for PgSiteRepository {
    async fn create(&self, new_site: NewSite) -> Result<Site, AppError> {
        let row = sqlx::query_as::<_, SiteRow>(
            r#"
            INSERT INTO sites (domain, name)
            VALUES (LOWER($1), $2)
            RETURNING id, domain, name, created_at
            "#,
        )
        .bind(&new_site.domain)
        .bind(&new_site.name)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: SiteId) -> Result<Option<Site>, AppError> {
        let row = sqlx::query_as::<_, SiteRow>(
            "SELECT id, domain, name, created_at FROM sites WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Site::from))
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Option<Site>, AppError> {
        let row = sqlx::query_as::<_, SiteRow>(
            "SELECT id, domain, name, created_at FROM sites WHERE domain = LOWER($1)",
        )
        .bind(domain)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Site::from))
    }

    async fn list(&self) -> Result<Vec<Site>, AppError> {
        let rows = sqlx::query_as::<_, SiteRow>(
            "SELECT id, domain, name, created_at FROM sites ORDER BY id",
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Site::from).collect())
    }
}
