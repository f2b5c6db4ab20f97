//! Merging scenario fragments.
//!
//! Fragments merge left to right per collection. The first definition of an
//! identity key wins, identical repeats collapse, and a differing repeat is a
//! conflict. The merged scenario is *not* validated here.

use super::Scenario;
use crate::error::ValidationError;
use std::collections::BTreeMap;

fn merge_entries<'a, T, K>(
    items: impl Iterator<Item = &'a T>,
    label: &str,
    key: impl Fn(&T) -> K,
    format_key: impl Fn(&K) -> String,
) -> Result<Vec<T>, ValidationError>
where
    T: Clone + PartialEq + 'a,
    K: Ord,
{
    let mut merged: Vec<T> = Vec::new();
    let mut positions: BTreeMap<K, usize> = BTreeMap::new();
    for item in items {
        let item_key = key(item);
        match positions.get(&item_key) {
            None => {
                positions.insert(item_key, merged.len());
                merged.push(item.clone());
            }
            Some(&index) if merged[index] == *item => {}
            Some(_) => {
                return Err(ValidationError::new(format!(
                    "Conflicting {label} definition for {}",
                    format_key(&item_key)
                )));
            }
        }
    }
    Ok(merged)
}

fn repo_path(key: &(String, String)) -> String {
    format!("{}/{}", key.0, key.1)
}

fn numbered(key: &(String, String, i64)) -> String {
    format!("{}/{}#{}", key.0, key.1, key.2)
}

/// Merge scenario fragments into a single scenario.
pub fn merge_scenarios(scenarios: &[Scenario]) -> Result<Scenario, ValidationError> {
    if scenarios.is_empty() {
        return Ok(Scenario::default());
    }

    let users = merge_entries(
        scenarios.iter().flat_map(|s| &s.users),
        "user",
        |user| user.login.clone(),
        String::clone,
    )?;
    let organizations = merge_entries(
        scenarios.iter().flat_map(|s| &s.organizations),
        "organization",
        |org| org.login.clone(),
        String::clone,
    )?;
    let repositories = merge_entries(
        scenarios.iter().flat_map(|s| &s.repositories),
        "repository",
        |repo| (repo.owner.clone(), repo.name.clone()),
        repo_path,
    )?;
    let branches = merge_entries(
        scenarios.iter().flat_map(|s| &s.branches),
        "branch",
        |branch| {
            (
                branch.owner.clone(),
                branch.repository.clone(),
                branch.name.clone(),
            )
        },
        |key| format!("{}/{}:{}", key.0, key.1, key.2),
    )?;
    let issues = merge_entries(
        scenarios.iter().flat_map(|s| &s.issues),
        "issue",
        |issue| (issue.owner.clone(), issue.repository.clone(), issue.number),
        numbered,
    )?;
    let pull_requests = merge_entries(
        scenarios.iter().flat_map(|s| &s.pull_requests),
        "pull request",
        |pr| (pr.owner.clone(), pr.repository.clone(), pr.number),
        numbered,
    )?;
    let tokens = merge_entries(
        scenarios.iter().flat_map(|s| &s.tokens),
        "token",
        |token| token.value.clone(),
        String::clone,
    )?;
    let apps = merge_entries(
        scenarios.iter().flat_map(|s| &s.apps),
        "app",
        |app| app.app_slug.clone(),
        String::clone,
    )?;
    let app_installations = merge_entries(
        scenarios.iter().flat_map(|s| &s.app_installations),
        "app installation",
        |installation| installation.installation_id,
        |key| key.to_string(),
    )?;
    let default_token = merge_default_token(scenarios)?;

    tracing::debug!(
        fragments = scenarios.len(),
        users = users.len(),
        repositories = repositories.len(),
        "merged scenario fragments"
    );

    Ok(Scenario {
        users,
        organizations,
        repositories,
        branches,
        issues,
        pull_requests,
        tokens,
        apps,
        app_installations,
        default_token,
        ..Scenario::default()
    })
}

fn merge_default_token(scenarios: &[Scenario]) -> Result<Option<String>, ValidationError> {
    let mut selected: Option<&str> = None;
    for value in scenarios.iter().filter_map(Scenario::default_token) {
        match selected {
            None => selected = Some(value),
            Some(existing) if existing == value => {}
            Some(existing) => {
                return Err(ValidationError::new(format!(
                    "Conflicting default token definition ({existing:?} vs {value:?})"
                )));
            }
        }
    }
    Ok(selected.map(str::to_string))
}
