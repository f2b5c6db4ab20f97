//! Validation for access tokens, GitHub Apps, and app installations.

use super::checks::{
    ensure_unique, parse_repo_reference, require_positive_int, require_text, CheckResult,
};
use super::{AccessToken, AppInstallation, GitHubApp, ScenarioIndexes};
use crate::error::ValidationError;
use std::collections::BTreeSet;

/// Validate standalone tokens and return their values in declaration order.
pub(super) fn validate_tokens(
    tokens: &[AccessToken],
    indexes: &ScenarioIndexes,
) -> CheckResult<Vec<String>> {
    let mut values = Vec::with_capacity(tokens.len());
    for token in tokens {
        let value = require_text(&token.value, "Token value")?;
        let owner = require_text(&token.owner, "Token owner")?;
        if !indexes.is_account(owner) {
            return Err(ValidationError::new(format!(
                "Token owner must be a defined user or organization \
                 (got {owner:?} for token {value:?})"
            )));
        }
        values.push(value.to_string());

        for permission in &token.permissions {
            require_text(permission, "Token permission")?;
        }
        ensure_unique(&token.permissions, &format!("token permission for {value:?}"))?;

        for repo in &token.repositories {
            require_text(repo, "Token repository")?;
        }
        ensure_unique(
            &token.repositories,
            &format!("token repository reference for {value:?}"),
        )?;
        for repo in &token.repositories {
            let key = parse_repo_reference(repo, "Token repository")?;
            if !indexes.repositories.contains_key(&key) {
                return Err(ValidationError::new(format!(
                    "Token repository must reference a configured repository \
                     (missing {repo:?} for token {value:?})"
                )));
            }
        }
        // Visibility is an enum, so out-of-range values are rejected when the
        // scenario is parsed.
    }
    ensure_unique(&values, "token value")?;
    Ok(values)
}

/// Validate app definitions and return the set of known slugs.
pub(super) fn validate_apps(
    apps: &[GitHubApp],
    indexes: &ScenarioIndexes,
) -> CheckResult<BTreeSet<String>> {
    let mut slugs = Vec::with_capacity(apps.len());
    for app in apps {
        require_text(&app.app_slug, "App slug")?;
        require_text(&app.name, "App name")?;
        if let Some(app_id) = app.app_id {
            require_positive_int(app_id, "App ID")?;
        }
        if let Some(owner) = &app.owner {
            let owner = require_text(owner, "App owner")?;
            if !indexes.is_account(owner) {
                return Err(ValidationError::new(format!(
                    "App owner must be a defined user or organization \
                     (got {owner:?} for app {:?})",
                    app.app_slug
                )));
            }
        }
        slugs.push(app.app_slug.as_str());
    }
    ensure_unique(slugs, "app slug")
}

/// Validate installations and return the combined token pool.
///
/// `standalone_tokens` is copied; installation access tokens are appended to
/// the copy after checking they do not collide with anything already in it.
/// Installation permissions are labels only and do not filter the pool.
pub(super) fn validate_app_installations(
    installations: &[AppInstallation],
    indexes: &ScenarioIndexes,
    standalone_tokens: &[String],
) -> CheckResult<Vec<String>> {
    let mut pool = standalone_tokens.to_vec();
    let mut installation_ids = Vec::with_capacity(installations.len());
    for installation in installations {
        let id = require_positive_int(installation.installation_id, "Installation ID")?;
        installation_ids.push(id.to_string());

        let slug = require_text(&installation.app_slug, "Installation app slug")?;
        if !indexes.app_slugs.contains(slug) {
            return Err(ValidationError::new(format!(
                "Installation app must reference a defined GitHub App \
                 (got {slug:?} for installation {id})"
            )));
        }

        let account = require_text(&installation.account, "Installation account")?;
        if !indexes.is_account(account) {
            return Err(ValidationError::new(format!(
                "Installation account must be a defined user or organization \
                 (got {account:?} for installation {id})"
            )));
        }

        for repo_ref in &installation.repositories {
            require_text(repo_ref, "Installation repository")?;
            let key = parse_repo_reference(repo_ref, "Installation repository")?;
            if !indexes.repositories.contains_key(&key) {
                return Err(ValidationError::new(format!(
                    "Installation repository must reference a configured repository \
                     (missing {repo_ref:?} for installation {id})"
                )));
            }
        }

        for permission in &installation.permissions {
            require_text(permission, "Installation permission")?;
        }
        ensure_unique(
            &installation.permissions,
            &format!("installation permission for installation {id}"),
        )?;

        if let Some(access_token) = &installation.access_token {
            let value = require_text(access_token, "Installation access token")?;
            if pool.iter().any(|existing| existing == value) {
                return Err(ValidationError::new(format!(
                    "Duplicate token value: installation {id} access_token \
                     duplicates an existing token"
                )));
            }
            pool.push(value.to_string());
        }
    }
    ensure_unique(installation_ids, "installation ID")?;
    Ok(pool)
}
