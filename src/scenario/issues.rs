//! Validation for issues and pull requests.

use super::checks::{
    format_repo_key, require_optional_text, require_positive_int, require_text, CheckResult,
};
use super::validate::BranchIndex;
use super::{Issue, PullRequest, Repository, RepositoryKey};
use crate::error::ValidationError;
use std::collections::{BTreeMap, BTreeSet};

pub(super) fn validate_issues(
    issues: &[Issue],
    repo_index: &BTreeMap<RepositoryKey, Repository>,
) -> CheckResult<()> {
    let mut numbers: BTreeMap<RepositoryKey, BTreeSet<i64>> = BTreeMap::new();
    for issue in issues {
        let owner = require_text(&issue.owner, "Issue owner")?;
        let repo = require_text(&issue.repository, "Issue repository")?;
        let number = require_positive_int(issue.number, "Issue number")?;
        require_text(&issue.title, "Issue title")?;
        require_optional_text(issue.author.as_deref(), "Issue author")?;
        let key = (owner.to_string(), repo.to_string());
        if !repo_index.contains_key(&key) {
            return Err(ValidationError::new(format!(
                "Issue refers to unknown repository {owner}/{repo}"
            )));
        }
        if !numbers.entry(key).or_default().insert(number) {
            return Err(ValidationError::new(format!(
                "Duplicate issue number {number} for {owner}/{repo}"
            )));
        }
    }
    Ok(())
}

pub(super) fn validate_pull_requests(
    pull_requests: &[PullRequest],
    repo_index: &BTreeMap<RepositoryKey, Repository>,
    branch_index: &BranchIndex,
) -> CheckResult<()> {
    let mut numbers: BTreeMap<RepositoryKey, BTreeSet<i64>> = BTreeMap::new();
    for pr in pull_requests {
        let owner = require_text(&pr.owner, "Pull request owner")?;
        let repo = require_text(&pr.repository, "Pull request repository")?;
        let number = require_positive_int(pr.number, "Pull request number")?;
        require_text(&pr.title, "Pull request title")?;
        require_optional_text(pr.author.as_deref(), "Pull request author")?;
        let key = (owner.to_string(), repo.to_string());
        if !repo_index.contains_key(&key) {
            return Err(ValidationError::new(format!(
                "Pull request refers to unknown repository {owner}/{repo}"
            )));
        }
        if !numbers.entry(key.clone()).or_default().insert(number) {
            return Err(ValidationError::new(format!(
                "Duplicate pull request number {number} for {owner}/{repo}"
            )));
        }
        validate_pull_request_branches(pr, &key, branch_index)?;
    }
    Ok(())
}

fn validate_pull_request_branches(
    pr: &PullRequest,
    key: &RepositoryKey,
    branch_index: &BranchIndex,
) -> CheckResult<()> {
    let refs = [("base", &pr.base_branch), ("head", &pr.head_branch)];
    for (label, name) in refs {
        let Some(name) = name else {
            continue;
        };
        require_text(name, &format!("Pull request {label} branch"))?;
        let known = branch_index
            .get(key)
            .is_some_and(|branches| branches.contains_key(name));
        if !known {
            return Err(ValidationError::new(format!(
                "Pull request branch must reference a configured branch \
                 (missing {name:?} for {})",
                format_repo_key(key)
            )));
        }
    }
    Ok(())
}
