//! PostgreSQL implementation of the redirect repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{NewRedirect, RedirectPatch, RedirectRule, SiteId};
use crate::domain::repositories::RedirectRepository;
use crate::error::AppError;

/// PostgreSQL repository for redirect rules.
///
/// Uniqueness of (site, old_path) is enforced by the
/// `redirects_site_old_path_key` constraint; violations surface as
/// [`AppError::Conflict`].
pub struct PgRedirectRepository {
    pool: Arc<PgPool>,
}

impl PgRedirectRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RedirectRow {
    id: i64,
    site_id: i64,
    old_path: String,
    new_path: String,
    response_code: String,
    catchall_redirect: bool,
    subpath_match: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RedirectRow> for RedirectRule {
    type Error = AppError;

    fn try_from(row: RedirectRow) -> Result<Self, Self::Error> {
        let response_code = row.response_code.parse().map_err(|e| {
            AppError::internal(
                "Stored redirect has an invalid response code",
                json!({ "id": row.id, "reason": format!("{}", e) }),
            )
        })?;

        Ok(RedirectRule {
            id: row.id,
            site: row.site_id,
            old_path: row.old_path,
            new_path: row.new_path,
            response_code,
            catchall_redirect: row.catchall_redirect,
            subpath_match: row.subpath_match,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl RedirectRepository for PgRedirectRepository {
    async fn create(&self, new_redirect: NewRedirect) -> Result<RedirectRule, AppError> {
        let row = sqlx::query_as::<_, RedirectRow>(
            r#"
            INSERT INTO redirects
                (site_id, old_path, new_path, response_code, catchall_redirect, subpath_match)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, site_id, old_path, new_path, response_code,
                      catchall_redirect, subpath_match, created_at, updated_at
            "#,
        )
        .bind(new_redirect.site)
        .bind(&new_redirect.old_path)
        .bind(&new_redirect.new_path)
        .bind(new_redirect.response_code.as_str())
        .bind(new_redirect.catchall_redirect)
        .bind(new_redirect.subpath_match)
        .fetch_one(self.pool.as_ref())
        .await?;

        row.try_into()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<RedirectRule>, AppError> {
        let row = sqlx::query_as::<_, RedirectRow>(
            r#"
            SELECT id, site_id, old_path, new_path, response_code,
                   catchall_redirect, subpath_match, created_at, updated_at
            FROM redirects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(RedirectRule::try_from).transpose()
    }

    async fn find_by_old_path(
        &self,
        site: SiteId,
        old_path: &str,
    ) -> Result<Option<RedirectRule>, AppError> {
        let row = sqlx::query_as::<_, RedirectRow>(
            r#"
            SELECT id, site_id, old_path, new_path, response_code,
                   catchall_redirect, subpath_match, created_at, updated_at
            FROM redirects
            WHERE site_id = $1 AND old_path = $2
            "#,
        )
        .bind(site)
        .bind(old_path)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(RedirectRule::try_from).transpose()
    }

    async fn list_for_site(&self, site: SiteId) -> Result<Vec<RedirectRule>, AppError> {
        let rows = sqlx::query_as::<_, RedirectRow>(
            r#"
            SELECT id, site_id, old_path, new_path, response_code,
                   catchall_redirect, subpath_match, created_at, updated_at
            FROM redirects
            WHERE site_id = $1
            ORDER BY old_path
            "#,
        )
        .bind(site)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.into_iter().map(RedirectRule::try_from).collect()
    }

    async fn update(&self, id: i64, patch: RedirectPatch) -> Result<RedirectRule, AppError> {
        let row = sqlx::query_as::<_, RedirectRow>(
            r#"
            UPDATE redirects SET
                old_path          = COALESCE($2, old_path),
                new_path          = COALESCE($3, new_path),
                response_code     = COALESCE($4, response_code),
                catchall_redirect = COALESCE($5, catchall_redirect),
                subpath_match     = COALESCE($6, subpath_match),
                updated_at        = NOW()
            WHERE id = $1
            RETURNING id, site_id, old_path, new_path, response_code,
                      catchall_redirect, subpath_match, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(patch.old_path)
        .bind(patch.new_path)
        .bind(patch.response_code.map(|c| c.as_str()))
        .bind(patch.catchall_redirect)
        .bind(patch.subpath_match)
        .fetch_optional(self.pool.as_ref())
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(AppError::not_found(
                "Redirect not found",
                json!({ "id": id }),
            )),
        }
    }

    async fn delete(&self, id: i64) -> Result<Option<RedirectRule>, AppError> {
        let row = sqlx::query_as::<_, RedirectRow>(
            r#"
            DELETE FROM redirects
            WHERE id = $1
            RETURNING id, site_id, old_path, new_path, response_code,
                      catchall_redirect, subpath_match, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(RedirectRule::try_from).transpose()
    }

    async fn count(&self, site: Option<SiteId>) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM redirects WHERE ($1::bigint IS NULL OR site_id = $1)",
        )
        .bind(site)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count)
    }
}
