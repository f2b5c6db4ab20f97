//! The simulator's initial-state configuration.
//!
//! [`SimConfig`] is what gets written to `github-sim-config.json`. It is built
//! either from a validated [`Scenario`] or from a raw JSON mapping supplied by
//! the caller. Raw mappings may carry a `__simulacat__` metadata object whose
//! `auth_token` is split off here and never reaches the simulator.

use crate::error::ValidationError;
use crate::scenario::{
    Branch, Issue, PullRequest, RepositoryKey, Scenario, ScenarioIndexes, User,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Keys the simulator requires to be present (as arrays) in its config.
pub const REQUIRED_KEYS: [&str; 5] = [
    "users",
    "organizations",
    "repositories",
    "branches",
    "blobs",
];

/// Raw-config key holding metadata that is stripped before serialization.
pub const METADATA_KEY: &str = "__simulacat__";

const AUTH_TOKEN_KEY: &str = "auth_token";

/// Initial state handed to the simulator process.
///
/// Records are kept as JSON values so raw configurations pass through with
/// any extra fields the simulator understands. Unknown top-level keys are
/// preserved in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub users: Vec<Value>,
    #[serde(default)]
    pub organizations: Vec<Value>,
    #[serde(default)]
    pub repositories: Vec<Value>,
    #[serde(default)]
    pub branches: Vec<Value>,
    #[serde(default)]
    pub blobs: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_requests: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A raw configuration after the metadata split.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSimConfig {
    pub config: SimConfig,
    pub auth_token: Option<String>,
}

/// Minimal valid state: every required collection present and empty.
pub fn empty_initial_state() -> SimConfig {
    SimConfig::default()
}

impl SimConfig {
    /// Serialize a scenario.
    ///
    /// The scenario is validated first (memoized). Branches come from the
    /// merged branch index, grouped by repository in first-seen order.
    pub fn from_scenario(
        scenario: &Scenario,
        include_unsupported: bool,
    ) -> Result<Self, ValidationError> {
        let indexes = scenario.validate()?;

        let mut config = SimConfig {
            users: scenario.users().iter().map(user_record).collect(),
            organizations: scenario
                .organizations()
                .iter()
                .map(|org| {
                    let mut record = Map::new();
                    record.insert("login".into(), json!(org.login));
                    insert_opt(&mut record, "name", org.name.as_ref());
                    insert_opt(&mut record, "description", org.description.as_ref());
                    insert_opt(&mut record, "email", org.email.as_ref());
                    insert_opt(&mut record, "id", org.id.as_ref());
                    Value::Object(record)
                })
                .collect(),
            repositories: scenario
                .repositories()
                .iter()
                .map(|repo| {
                    let mut record = Map::new();
                    record.insert("owner".into(), json!(repo.owner));
                    record.insert("name".into(), json!(repo.name));
                    record.insert("private".into(), json!(repo.private));
                    insert_opt(&mut record, "description", repo.description.as_ref());
                    insert_opt(&mut record, "id", repo.id.as_ref());
                    insert_opt(
                        &mut record,
                        "default_branch",
                        repo.default_branch.as_ref().map(|branch| &branch.name),
                    );
                    Value::Object(record)
                })
                .collect(),
            branches: ordered_branches(scenario, indexes)
                .into_iter()
                .map(branch_record)
                .collect(),
            ..SimConfig::default()
        };

        if include_unsupported {
            config.issues = Some(scenario.issues().iter().map(issue_record).collect());
            config.pull_requests = Some(
                scenario
                    .pull_requests()
                    .iter()
                    .map(pull_request_record)
                    .collect(),
            );
        }
        Ok(config)
    }

    /// Accept a raw JSON mapping as simulator configuration.
    ///
    /// Missing required keys default to empty arrays; present required keys
    /// must be arrays. The `__simulacat__` object is removed and its
    /// `auth_token` returned alongside the config.
    pub fn from_value(value: Value) -> Result<RawSimConfig, ValidationError> {
        let Value::Object(mut map) = value else {
            return Err(ValidationError::new(
                "Simulator configuration must be a JSON object",
            ));
        };

        let auth_token = match map.remove(METADATA_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::Object(metadata)) => metadata_auth_token(&metadata)?,
            Some(_) => {
                return Err(ValidationError::new(format!(
                    "{METADATA_KEY} must be a mapping"
                )));
            }
        };

        let list_keys = REQUIRED_KEYS.iter().chain(&["issues", "pull_requests"]);
        for key in list_keys {
            if let Some(entry) = map.get(*key) {
                if !entry.is_array() {
                    return Err(ValidationError::new(format!(
                        "Simulator configuration key {key:?} must be a list"
                    )));
                }
            }
        }

        let config = serde_json::from_value(Value::Object(map)).map_err(|err| {
            ValidationError::new(format!("Invalid simulator configuration: {err}"))
        })?;
        Ok(RawSimConfig { config, auth_token })
    }

    /// Parse raw configuration text; see [`SimConfig::from_value`].
    pub fn from_json(text: &str) -> Result<RawSimConfig, ValidationError> {
        let value: Value = serde_json::from_str(text).map_err(|err| {
            ValidationError::new(format!("Invalid simulator configuration: {err}"))
        })?;
        Self::from_value(value)
    }
}

fn metadata_auth_token(metadata: &Map<String, Value>) -> Result<Option<String>, ValidationError> {
    match metadata.get(AUTH_TOKEN_KEY) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(token)) if !token.trim().is_empty() => Ok(Some(token.clone())),
        Some(_) => Err(ValidationError::new(format!(
            "{AUTH_TOKEN_KEY} must be a non-empty string"
        ))),
    }
}

/// Shallow merge of raw mappings; later layers override earlier keys.
pub fn merge_configs(layers: &[Value]) -> Result<Value, ValidationError> {
    let mut merged = Map::new();
    for (index, layer) in layers.iter().enumerate() {
        let Value::Object(map) = layer else {
            return Err(ValidationError::new(format!(
                "Simulator configuration layer {index} must be a JSON object"
            )));
        };
        for (key, value) in map {
            merged.insert(key.clone(), value.clone());
        }
    }
    Ok(Value::Object(merged))
}

fn insert_opt<T: Serialize>(record: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        record.insert(key.to_string(), json!(value));
    }
}

fn user_record(user: &User) -> Value {
    let mut record = Map::new();
    record.insert("login".into(), json!(user.login));
    record.insert("organizations".into(), json!(user.organizations));
    insert_opt(&mut record, "name", user.name.as_ref());
    insert_opt(&mut record, "bio", user.bio.as_ref());
    insert_opt(&mut record, "email", user.email.as_ref());
    insert_opt(&mut record, "id", user.id.as_ref());
    Value::Object(record)
}

fn branch_record(branch: &Branch) -> Value {
    let mut record = Map::new();
    record.insert("owner".into(), json!(branch.owner));
    record.insert("repository".into(), json!(branch.repository));
    record.insert("name".into(), json!(branch.name));
    insert_opt(&mut record, "protected", branch.protected.as_ref());
    insert_opt(&mut record, "sha", branch.sha.as_ref());
    Value::Object(record)
}

fn item_record(
    owner: &str,
    repository: &str,
    number: i64,
    title: &str,
    state: &str,
    body: Option<&String>,
    author: Option<&String>,
) -> Map<String, Value> {
    let mut record = Map::new();
    record.insert("owner".into(), json!(owner));
    record.insert("repository".into(), json!(repository));
    record.insert("number".into(), json!(number));
    record.insert("title".into(), json!(title));
    record.insert("state".into(), json!(state));
    insert_opt(&mut record, "body", body);
    insert_opt(&mut record, "user", author.map(|login| json!({ "login": login })));
    record
}

fn issue_record(issue: &Issue) -> Value {
    Value::Object(item_record(
        &issue.owner,
        &issue.repository,
        issue.number,
        &issue.title,
        issue.state.as_str(),
        issue.body.as_ref(),
        issue.author.as_ref(),
    ))
}

fn pull_request_record(pr: &PullRequest) -> Value {
    let mut record = item_record(
        &pr.owner,
        &pr.repository,
        pr.number,
        &pr.title,
        pr.state.as_str(),
        pr.body.as_ref(),
        pr.author.as_ref(),
    );
    insert_opt(&mut record, "base", pr.base_branch.as_ref().map(|name| json!({ "ref": name })));
    insert_opt(&mut record, "head", pr.head_branch.as_ref().map(|name| json!({ "ref": name })));
    if pr.draft {
        record.insert("draft".into(), json!(true));
    }
    Value::Object(record)
}

/// Merged branches in the order they were first declared.
///
/// Explicit branches open their repository's group; default branches then
/// join their repository's group (or open a new one, in repository order).
/// A default branch that merged into an explicit one keeps the explicit
/// branch's position.
fn ordered_branches<'a>(scenario: &Scenario, indexes: &'a ScenarioIndexes) -> Vec<&'a Branch> {
    let mut groups: Vec<(RepositoryKey, Vec<&str>)> = Vec::new();
    let mut note = |key: RepositoryKey, name| {
        let position = match groups.iter().position(|(existing, _)| *existing == key) {
            Some(position) => position,
            None => {
                groups.push((key, Vec::new()));
                groups.len() - 1
            }
        };
        let names = &mut groups[position].1;
        if !names.contains(&name) {
            names.push(name);
        }
    };

    for branch in scenario.branches() {
        note(
            (branch.owner.clone(), branch.repository.clone()),
            branch.name.as_str(),
        );
    }
    for repo in scenario.repositories() {
        if let Some(default_branch) = &repo.default_branch {
            note(
                (repo.owner.clone(), repo.name.clone()),
                default_branch.name.as_str(),
            );
        }
    }

    groups
        .iter()
        .filter_map(|(key, names)| {
            let branches = indexes.branches.get(key)?;
            Some(names.iter().filter_map(move |name| branches.get(*name)))
        })
        .flatten()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{DefaultBranch, ItemState, Repository};

    fn rocket() -> Scenario {
        Scenario::new()
            .with_user(User::new("alice"))
            .with_repository(Repository::new("alice", "rocket").with_default_branch(
                DefaultBranch {
                    sha: Some("abc123".to_string()),
                    ..DefaultBranch::new("main")
                },
            ))
            .with_branch(Branch::new("alice", "rocket", "dev"))
    }

    #[test]
    fn serializes_default_branch_metadata() {
        let config = SimConfig::from_scenario(&rocket(), false).unwrap();
        assert_eq!(config.repositories[0]["default_branch"], "main");
        let names: Vec<&str> = config
            .branches
            .iter()
            .filter_map(|branch| branch["name"].as_str())
            .collect();
        assert_eq!(names, ["dev", "main"]);
        assert_eq!(config.branches[1]["sha"], "abc123");
        assert!(config.blobs.is_empty());
        assert!(config.issues.is_none());
    }

    #[test]
    fn serialized_output_omits_credentials_and_apps() {
        use crate::scenario::{AccessToken, AppInstallation, GitHubApp, RepositoryVisibility};

        let mut token = AccessToken::new("ghp_secret", "alice");
        token.permissions = vec!["repo".to_string()];
        token.repository_visibility = Some(RepositoryVisibility::Private);
        let mut installation = AppInstallation::new(9, "bot", "alice");
        installation.access_token = Some("ghs_installation".to_string());
        installation.permissions = vec!["contents".to_string()];
        installation.repositories = vec!["alice/rocket".to_string()];
        let scenario = rocket()
            .with_token(token)
            .with_app(GitHubApp::new("bot", "Bot"))
            .with_app_installation(installation)
            .with_default_token("ghp_secret");

        for include_unsupported in [false, true] {
            let config = SimConfig::from_scenario(&scenario, include_unsupported).unwrap();
            let text = serde_json::to_string(&config).unwrap();
            for hidden in [
                "ghp_secret",
                "ghs_installation",
                "bot",
                "tokens",
                "apps",
                "app_installations",
                "repository_visibility",
                "permissions",
            ] {
                assert!(
                    !text.contains(hidden),
                    "{hidden} leaked with include_unsupported={include_unsupported}: {text}"
                );
            }
        }
    }

    #[test]
    fn include_unsupported_serializes_issues_and_pulls() {
        let mut pr = PullRequest::new("alice", "rocket", 2, "Add feature");
        pr.base_branch = Some("main".to_string());
        pr.head_branch = Some("dev".to_string());
        pr.author = Some("alice".to_string());
        let mut issue = Issue::new("alice", "rocket", 1, "Bug");
        issue.state = ItemState::Closed;
        let scenario = rocket().with_issue(issue).with_pull_request(pr);

        let config = SimConfig::from_scenario(&scenario, true).unwrap();
        let issues = config.issues.unwrap();
        assert_eq!(issues[0]["state"], "closed");
        assert!(issues[0].get("user").is_none());
        let pulls = config.pull_requests.unwrap();
        assert_eq!(pulls[0]["base"], json!({ "ref": "main" }));
        assert_eq!(pulls[0]["user"], json!({ "login": "alice" }));
        assert!(pulls[0].get("draft").is_none());
    }

    #[test]
    fn unsupported_collections_are_opt_in() {
        let scenario = rocket().with_issue(Issue::new("alice", "rocket", 1, "Bug"));
        let config = SimConfig::from_scenario(&scenario, false).unwrap();
        let value = serde_json::to_value(&config).unwrap();
        assert!(value.get("issues").is_none());
        assert!(value.get("pull_requests").is_none());
    }

    #[test]
    fn explicit_branch_keeps_position_when_default_merges() {
        let scenario = Scenario::new()
            .with_user(User::new("alice"))
            .with_repository(
                Repository::new("alice", "rocket").with_default_branch(DefaultBranch {
                    protected: Some(true),
                    ..DefaultBranch::new("main")
                }),
            )
            .with_branch(Branch::new("alice", "rocket", "zeta"))
            .with_branch(Branch {
                sha: Some("abc".to_string()),
                ..Branch::new("alice", "rocket", "main")
            });
        let config = SimConfig::from_scenario(&scenario, false).unwrap();
        assert_eq!(config.branches[0]["name"], "zeta");
        assert_eq!(
            config.branches[1],
            json!({
                "owner": "alice",
                "repository": "rocket",
                "name": "main",
                "protected": true,
                "sha": "abc",
            })
        );
    }

    #[test]
    fn empty_state_has_required_arrays() {
        let value = serde_json::to_value(empty_initial_state()).unwrap();
        for key in REQUIRED_KEYS {
            assert_eq!(value[key], json!([]), "{key}");
        }
    }

    #[test]
    fn raw_config_fills_missing_required_keys() {
        let raw = SimConfig::from_value(json!({ "users": [{ "login": "octocat" }] })).unwrap();
        assert_eq!(raw.config.users.len(), 1);
        assert!(raw.config.repositories.is_empty());
        assert_eq!(raw.auth_token, None);
    }

    #[test]
    fn raw_config_rejects_non_list_collections() {
        let err = SimConfig::from_value(json!({ "users": "octocat" })).unwrap_err();
        assert_eq!(
            err.message,
            "Simulator configuration key \"users\" must be a list"
        );
        let err = SimConfig::from_value(json!(["users"])).unwrap_err();
        assert_eq!(err.message, "Simulator configuration must be a JSON object");
    }

    #[test]
    fn raw_config_splits_metadata() {
        let raw = SimConfig::from_value(json!({
            "users": [],
            "__simulacat__": { "auth_token": "ghp_raw" },
            "custom": { "kept": true },
        }))
        .unwrap();
        assert_eq!(raw.auth_token.as_deref(), Some("ghp_raw"));
        let value = serde_json::to_value(&raw.config).unwrap();
        assert!(value.get(METADATA_KEY).is_none());
        assert_eq!(value["custom"], json!({ "kept": true }));
    }

    #[test]
    fn raw_config_rejects_bad_metadata() {
        let err = SimConfig::from_value(json!({ "__simulacat__": "token" })).unwrap_err();
        assert_eq!(err.message, "__simulacat__ must be a mapping");
        let err = SimConfig::from_value(json!({ "__simulacat__": { "auth_token": " " } }))
            .unwrap_err();
        assert_eq!(err.message, "auth_token must be a non-empty string");
    }

    #[test]
    fn merge_configs_is_shallow_and_ordered() {
        let merged = merge_configs(&[
            json!({ "users": [{ "login": "a" }], "branches": [] }),
            json!({ "users": [{ "login": "b" }] }),
        ])
        .unwrap();
        assert_eq!(merged["users"], json!([{ "login": "b" }]));
        assert_eq!(merged["branches"], json!([]));
        assert!(merge_configs(&[json!(1)]).is_err());
    }
}
