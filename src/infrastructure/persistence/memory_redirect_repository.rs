//! In-process redirect repository.
//!
//! Used when no `DATABASE_URL` is configured and by tests. Rules are lost on
//! restart.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::entities::{NewRedirect, RedirectPatch, RedirectRule, SiteId};
use crate::domain::repositories::RedirectRepository;
use crate::error::AppError;

#[derive(Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, RedirectRule>,
}

impl Table {
    fn conflicts(&self, site: SiteId, old_path: &str, except: Option<i64>) -> bool {
        self.rows
            .values()
            .any(|r| r.site == site && r.old_path == old_path && Some(r.id) != except)
    }
}

/// Redirect repository holding rules in memory.
///
/// Enforces the same (site, old_path) uniqueness as the database schema.
#[derive(Default)]
pub struct MemoryRedirectRepository {
    table: RwLock<Table>,
    snapshot_reads: AtomicUsize,
}

impl MemoryRedirectRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of [`RedirectRepository::list_for_site`] calls served so far.
    pub fn snapshot_reads(&self) -> usize {
        self.snapshot_reads.load(Ordering::SeqCst)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Table>, AppError> {
        self.table
            .read()
            .map_err(|_| AppError::internal("Redirect table lock poisoned", json!({})))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Table>, AppError> {
        self.table
            .write()
            .map_err(|_| AppError::internal("Redirect table lock poisoned", json!({})))
    }
}

fn conflict(site: SiteId, old_path: &str) -> AppError {
    AppError::conflict(
        "Unique constraint violation",
        json!({ "constraint": "redirects_site_old_path_key", "site": site, "old_path": old_path }),
    )
}

#[async_trait]
impl RedirectRepository for MemoryRedirectRepository {
    async fn create(&self, new_redirect: NewRedirect) -> Result<RedirectRule, AppError> {
        let mut table = self.write()?;

        if table.conflicts(new_redirect.site, &new_redirect.old_path, None) {
            return Err(conflict(new_redirect.site, &new_redirect.old_path));
        }

        table.next_id += 1;
        let now = Utc::now();
        let rule = RedirectRule {
            id: table.next_id,
            site: new_redirect.site,
            old_path: new_redirect.old_path,
            new_path: new_redirect.new_path,
            response_code: new_redirect.response_code,
            catchall_redirect: new_redirect.catchall_redirect,
            subpath_match: new_redirect.subpath_match,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(rule.id, rule.clone());

        Ok(rule)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<RedirectRule>, AppError> {
        Ok(self.read()?.rows.get(&id).cloned())
    }

    async fn find_by_old_path(
        &self,
        site: SiteId,
        old_path: &str,
    ) -> Result<Option<RedirectRule>, AppError> {
        Ok(self
            .read()?
            .rows
            .values()
            .find(|r| r.site == site && r.old_path == old_path)
            .cloned())
    }

    async fn list_for_site(&self, site: SiteId) -> Result<Vec<RedirectRule>, AppError> {
        self.snapshot_reads.fetch_add(1, Ordering::SeqCst);

        Ok(self
            .read()?
            .rows
            .values()
            .filter(|r| r.site == site)
            .cloned()
            .collect())
    }

    async fn update(&self, id: i64, patch: RedirectPatch) -> Result<RedirectRule, AppError> {
        let mut table = self.write()?;

        let Some(current) = table.rows.get(&id).cloned() else {
            return Err(AppError::not_found("Redirect not found", json!({ "id": id })));
        };

        if let Some(old_path) = &patch.old_path
            && table.conflicts(current.site, old_path, Some(id))
        {
            return Err(conflict(current.site, old_path));
        }

        let updated = RedirectRule {
            old_path: patch.old_path.unwrap_or(current.old_path),
            new_path: patch.new_path.unwrap_or(current.new_path),
            response_code: patch.response_code.unwrap_or(current.response_code),
            catchall_redirect: patch.catchall_redirect.unwrap_or(current.catchall_redirect),
            subpath_match: patch.subpath_match.unwrap_or(current.subpath_match),
            updated_at: Utc::now(),
            ..current
        };
        table.rows.insert(id, updated.clone());

        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<Option<RedirectRule>, AppError> {
        Ok(self.write()?.rows.remove(&id))
    }

    async fn count(&self, site: Option<SiteId>) -> Result<i64, AppError> {
        let table = self.read()?;
        let count = table
            .rows
            .values()
            .filter(|r| site.is_none_or(|s| r.site == s))
            .count();

        Ok(count as i64)
    }
}
