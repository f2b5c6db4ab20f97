use super::access::{validate_app_installations, validate_apps, validate_tokens};
use super::checks::{
    ensure_unique, format_repo_key, require_optional_text, require_text, CheckResult,
};
use super::credentials::select_auth_token;
use super::issues::{validate_issues, validate_pull_requests};
use super::{Branch, DefaultBranch, Repository, RepositoryKey, Scenario, ScenarioIndexes};
use crate::error::ValidationError;
use std::collections::{BTreeMap, BTreeSet};

pub(super) type BranchIndex = BTreeMap<RepositoryKey, BTreeMap<String, Branch>>;

pub(super) fn build_indexes(scenario: &Scenario) -> CheckResult<ScenarioIndexes> {
    let org_logins = validate_organizations(scenario)?;
    let user_logins = validate_users(scenario, &org_logins)?;
    let mut indexes = ScenarioIndexes {
        org_logins,
        user_logins,
        ..ScenarioIndexes::default()
    };
    indexes.repositories = validate_repositories(scenario, &indexes)?;

    let token_values = validate_tokens(&scenario.tokens, &indexes)?;
    indexes.app_slugs = validate_apps(&scenario.apps, &indexes)?;
    let token_pool =
        validate_app_installations(&scenario.app_installations, &indexes, &token_values)?;
    select_auth_token(&token_pool, scenario.default_token())?;

    indexes.branches = validate_branches(scenario, &indexes.repositories)?;
    validate_issues(&scenario.issues, &indexes.repositories)?;
    validate_pull_requests(
        &scenario.pull_requests,
        &indexes.repositories,
        &indexes.branches,
    )?;
    Ok(indexes)
}

fn validate_organizations(scenario: &Scenario) -> CheckResult<BTreeSet<String>> {
    let mut logins = Vec::with_capacity(scenario.organizations.len());
    for org in &scenario.organizations {
        logins.push(require_text(&org.login, "Organization login")?);
    }
    ensure_unique(logins, "organization login")
}

fn validate_users(
    scenario: &Scenario,
    org_logins: &BTreeSet<String>,
) -> CheckResult<BTreeSet<String>> {
    let mut logins = Vec::with_capacity(scenario.users.len());
    for user in &scenario.users {
        logins.push(require_text(&user.login, "User login")?);
        for org in &user.organizations {
            require_text(org, "User organization")?;
            if !org_logins.contains(org) {
                return Err(ValidationError::new(format!(
                    "User organization must refer to a defined organization \
                     (missing {org:?} for user {:?})",
                    user.login
                )));
            }
        }
    }
    ensure_unique(logins, "user login")
}

fn validate_repositories(
    scenario: &Scenario,
    indexes: &ScenarioIndexes,
) -> CheckResult<BTreeMap<RepositoryKey, Repository>> {
    let mut repo_index = BTreeMap::new();
    for repo in &scenario.repositories {
        let owner = require_text(&repo.owner, "Repository owner")?;
        let name = require_text(&repo.name, "Repository name")?;
        if !indexes.is_account(owner) {
            return Err(ValidationError::new(format!(
                "Repository owner must be a defined user or organization \
                 (got {owner:?} for {owner}/{name})"
            )));
        }
        let key = (owner.to_string(), name.to_string());
        if repo_index.contains_key(&key) {
            return Err(ValidationError::new(format!(
                "Duplicate repository definition: {owner}/{name}"
            )));
        }
        if let Some(default_branch) = &repo.default_branch {
            require_text(&default_branch.name, "Default branch name")?;
            require_optional_text(default_branch.sha.as_deref(), "Default branch sha")?;
        }
        repo_index.insert(key, repo.clone());
    }
    Ok(repo_index)
}

fn validate_branches(
    scenario: &Scenario,
    repo_index: &BTreeMap<RepositoryKey, Repository>,
) -> CheckResult<BranchIndex> {
    let mut branch_index = BranchIndex::new();
    for branch in &scenario.branches {
        let key = validate_branch_core(branch, repo_index)?;
        let repo_branches = branch_index.entry(key.clone()).or_default();
        if repo_branches.contains_key(&branch.name) {
            return Err(ValidationError::new(format!(
                "Duplicate branch definition: {}:{}",
                format_repo_key(&key),
                branch.name
            )));
        }
        repo_branches.insert(branch.name.clone(), branch.clone());
    }

    for (key, repo) in repo_index {
        if let Some(default_branch) = &repo.default_branch {
            merge_default_branch(key, default_branch, &mut branch_index)?;
        }
    }
    Ok(branch_index)
}

fn validate_branch_core(
    branch: &Branch,
    repo_index: &BTreeMap<RepositoryKey, Repository>,
) -> CheckResult<RepositoryKey> {
    let owner = require_text(&branch.owner, "Branch owner")?;
    let repo = require_text(&branch.repository, "Branch repository")?;
    require_text(&branch.name, "Branch name")?;
    require_optional_text(branch.sha.as_deref(), "Branch sha")?;
    let key = (owner.to_string(), repo.to_string());
    if !repo_index.contains_key(&key) {
        return Err(ValidationError::new(format!(
            "Branch refers to unknown repository {owner}/{repo}"
        )));
    }
    Ok(key)
}

/// Fold a repository's default branch into the explicit branch index.
///
/// Values present on only one side are carried over; values present on both
/// sides must agree.
fn merge_default_branch(
    key: &RepositoryKey,
    default_branch: &DefaultBranch,
    branch_index: &mut BranchIndex,
) -> CheckResult<()> {
    let repo_branches = branch_index.entry(key.clone()).or_default();
    let incoming = default_branch.to_branch(&key.0, &key.1);
    let Some(existing) = repo_branches.get(&incoming.name) else {
        repo_branches.insert(incoming.name.clone(), incoming);
        return Ok(());
    };
    check_default_overlap(existing, &incoming, key)?;
    let merged = Branch {
        owner: existing.owner.clone(),
        repository: existing.repository.clone(),
        name: existing.name.clone(),
        sha: existing.sha.clone().or(incoming.sha),
        protected: existing.protected.or(incoming.protected),
    };
    repo_branches.insert(merged.name.clone(), merged);
    Ok(())
}

fn check_default_overlap(
    existing: &Branch,
    incoming: &Branch,
    key: &RepositoryKey,
) -> CheckResult<()> {
    let mut mismatch = Vec::new();
    if let (Some(left), Some(right)) = (&existing.sha, &incoming.sha) {
        if left != right {
            mismatch.push("sha");
        }
    }
    if let (Some(left), Some(right)) = (existing.protected, incoming.protected) {
        if left != right {
            mismatch.push("protected");
        }
    }
    if mismatch.is_empty() {
        return Ok(());
    }
    Err(ValidationError::new(format!(
        "Conflicting default branch metadata for {}:{} ({} differs)",
        format_repo_key(key),
        existing.name,
        mismatch.join(", ")
    )))
}
