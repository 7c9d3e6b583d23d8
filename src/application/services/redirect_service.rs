//! Rule management: validation, path cleaning and cache invalidation.

use std::sync::Arc;

use serde_json::json;
use url::Url;
use validator::Validate;

use crate::application::services::settings::SharedSettings;
use crate::domain::entities::{NewRedirect, RedirectPatch, RedirectRule, ResponseCode, SiteId};
use crate::domain::path::normalize_rule_path;
use crate::domain::repositories::RedirectRepository;
use crate::error::AppError;
use crate::infrastructure::cache::RedirectCache;

/// Service for creating, changing and removing redirect rules.
///
/// Every successful write invalidates the affected site's cached outcomes
/// before returning, so a request that starts after the call returns sees
/// the new rule set.
pub struct RedirectService {
    repository: Arc<dyn RedirectRepository>,
    cache: Arc<dyn RedirectCache>,
    settings: SharedSettings,
}

impl RedirectService {
    pub fn new(
        repository: Arc<dyn RedirectRepository>,
        cache: Arc<dyn RedirectCache>,
        settings: SharedSettings,
    ) -> Self {
        Self {
            repository,
            cache,
            settings,
        }
    }

    /// Creates a rule.
    ///
    /// `old_path` is cleaned before storing: a leading `/` is added, and a
    /// trailing `/` when `APPEND_SLASH` is on and the rule is not a prefix
    /// rule.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for malformed paths or targets.
    /// Returns [`AppError::Conflict`] if the site already has a rule for the
    /// cleaned path.
    /// Returns [`AppError::Internal`] on store errors or if the cache could
    /// not be invalidated.
    pub async fn create(&self, mut new_redirect: NewRedirect) -> Result<RedirectRule, AppError> {
        require_old_path(&new_redirect.old_path)?;
        new_redirect.old_path = self.clean_old_path(
            &new_redirect.old_path,
            new_redirect.is_prefix_rule(),
        );

        new_redirect.validate()?;
        validate_target(&new_redirect.new_path, new_redirect.response_code)?;

        let rule = self.repository.create(new_redirect).await?;
        self.invalidate(rule.site).await?;

        tracing::info!(id = rule.id, site = rule.site, rule = %rule, "Redirect created");
        Ok(rule)
    }

    /// Applies a partial update to a rule.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the rule does not exist.
    /// Otherwise see [`Self::create`].
    pub async fn update(
        &self,
        id: i64,
        mut patch: RedirectPatch,
    ) -> Result<RedirectRule, AppError> {
        let current = self.get(id).await?;

        let prefix_rule = patch.catchall_redirect.unwrap_or(current.catchall_redirect)
            || patch.subpath_match.unwrap_or(current.subpath_match);
        match patch.old_path.take() {
            Some(old_path) => {
                require_old_path(&old_path)?;
                patch.old_path = Some(self.clean_old_path(&old_path, prefix_rule));
            }
            None if prefix_rule != current.is_prefix_rule() => {
                let cleaned = self.clean_old_path(&current.old_path, prefix_rule);
                if cleaned != current.old_path {
                    patch.old_path = Some(cleaned);
                }
            }
            None => {}
        }

        patch.validate()?;

        let response_code = patch.response_code.unwrap_or(current.response_code);
        let new_path = patch.new_path.as_deref().unwrap_or(&current.new_path);
        validate_target(new_path, response_code)?;

        let rule = self.repository.update(id, patch).await?;
        self.invalidate(rule.site).await?;

        tracing::info!(id = rule.id, site = rule.site, rule = %rule, "Redirect updated");
        Ok(rule)
    }

    /// Deletes a rule and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the rule does not exist.
    /// Returns [`AppError::Internal`] on store or invalidation errors.
    pub async fn delete(&self, id: i64) -> Result<RedirectRule, AppError> {
        let rule = self
            .repository
            .delete(id)
            .await?
            .ok_or_else(|| AppError::not_found("Redirect not found", json!({ "id": id })))?;

        self.invalidate(rule.site).await?;

        tracing::info!(id = rule.id, site = rule.site, rule = %rule, "Redirect deleted");
        Ok(rule)
    }

    /// Retrieves a rule by id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the rule does not exist.
    pub async fn get(&self, id: i64) -> Result<RedirectRule, AppError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Redirect not found", json!({ "id": id })))
    }

    /// Finds a rule by its `old_path`, cleaned the same way as on create.
    pub async fn find(
        &self,
        site: SiteId,
        old_path: &str,
    ) -> Result<Option<RedirectRule>, AppError> {
        if let Some(rule) = self.repository.find_by_old_path(site, old_path).await? {
            return Ok(Some(rule));
        }

        let cleaned = self.clean_old_path(old_path, false);
        self.repository.find_by_old_path(site, &cleaned).await
    }

    /// Lists all rules of a site.
    pub async fn list(&self, site: SiteId) -> Result<Vec<RedirectRule>, AppError> {
        self.repository.list_for_site(site).await
    }

    /// Drops every cached outcome of a site.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the cache backend fails. The rule
    /// change has been stored at that point but readers may still see the
    /// previous outcome.
    pub async fn invalidate(&self, site: SiteId) -> Result<(), AppError> {
        self.cache.invalidate(site).await.map_err(|e| {
            tracing::error!(site, error = %e, "Cache invalidation failed");
            AppError::internal(
                "Cache invalidation failed",
                json!({ "site": site, "backend": self.cache.name(), "reason": e.to_string() }),
            )
        })
    }

    fn clean_old_path(&self, old_path: &str, prefix_rule: bool) -> String {
        let append_slash = self.settings.load().append_slash;
        normalize_rule_path(old_path, append_slash, prefix_rule)
    }
}

fn require_old_path(old_path: &str) -> Result<(), AppError> {
    if old_path.trim().is_empty() {
        return Err(AppError::bad_request(
            "Redirect source path is required",
            json!({ "field": "old_path" }),
        ));
    }
    Ok(())
}

/// Targets are site paths or absolute http(s) URLs. An empty target is only
/// meaningful for a gone rule.
fn validate_target(new_path: &str, response_code: ResponseCode) -> Result<(), AppError> {
    if new_path.is_empty() {
        return if response_code == ResponseCode::Gone {
            Ok(())
        } else {
            Err(AppError::bad_request(
                "Redirect target is required unless the response code is 410",
                json!({ "response_code": response_code.as_str() }),
            ))
        };
    }

    if new_path.starts_with('/') {
        return Ok(());
    }

    match Url::parse(new_path) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(AppError::bad_request(
            "Redirect target must be a path starting with '/' or an http(s) URL",
            json!({ "new_path": new_path }),
        )),
    }
}
