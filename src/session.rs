//! A running simulator bundled with its work directory and an HTTP client.
//!
//! [`SimulatorSession::start`] accepts either a [`Scenario`] or a raw JSON
//! configuration, resolves the credential that goes out of band as the
//! `Authorization` header, and starts the simulator in a fresh temporary
//! directory. Dropping the session stops the process.

use crate::error::{ProcessError, SessionError, ValidationError};
use crate::orchestration::{
    start_sim_process, stop_sim_process, SimulatorProcess, StartOptions, DEFAULT_STOP_TIMEOUT,
};
use crate::scenario::Scenario;
use crate::sim_config::SimConfig;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

/// Where a session's configuration comes from.
#[derive(Debug, Clone)]
pub enum SimSource {
    Scenario(Scenario),
    /// A raw mapping, optionally carrying `__simulacat__.auth_token`.
    Raw(Value),
}

impl From<Scenario> for SimSource {
    fn from(scenario: Scenario) -> Self {
        Self::Scenario(scenario)
    }
}

impl From<Value> for SimSource {
    fn from(value: Value) -> Self {
        Self::Raw(value)
    }
}

impl SimSource {
    /// The simulator configuration and the token to send, if any.
    pub fn resolve(self) -> Result<(SimConfig, Option<String>), ValidationError> {
        match self {
            Self::Scenario(scenario) => {
                let auth_token = scenario.resolve_auth_token()?;
                let config = scenario.to_simulator_config(false)?;
                Ok((config, auth_token))
            }
            Self::Raw(value) => {
                let raw = SimConfig::from_value(value)?;
                Ok((raw.config, raw.auth_token))
            }
        }
    }
}

/// Minimal JSON client bound to a simulator's base URL.
#[derive(Clone)]
pub struct SimClient {
    agent: ureq::Agent,
    base_url: String,
    authorization: Option<String>,
}

impl std::fmt::Debug for SimClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.authorization.is_some())
            .finish_non_exhaustive()
    }
}

impl SimClient {
    pub fn new(base_url: impl Into<String>, auth_token: Option<&str>) -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            base_url: base_url.into(),
            authorization: auth_token.map(|token| format!("token {token}")),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The `Authorization` header value sent with each request.
    pub fn authorization(&self) -> Option<&str> {
        self.authorization.as_deref()
    }

    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// `GET` a path and decode the JSON body.
    pub fn get_json(&self, path: &str) -> Result<Value, SessionError> {
        let url = self.url(path);
        let mut request = self
            .agent
            .get(&url)
            .header("Accept", "application/vnd.github+json");
        if let Some(authorization) = &self.authorization {
            request = request.header("Authorization", authorization);
        }
        tracing::debug!(%url, "simulator request");
        let mut response = request.call()?;
        Ok(response.body_mut().read_json::<Value>()?)
    }
}

/// A simulator process plus everything needed to talk to it.
#[derive(Debug)]
pub struct SimulatorSession {
    process: SimulatorProcess,
    client: SimClient,
    auth_token: Option<String>,
    // Dropped after `process` is stopped in `Drop`.
    work_dir: TempDir,
}

impl SimulatorSession {
    pub fn start(
        source: impl Into<SimSource>,
        options: &StartOptions,
    ) -> Result<Self, SessionError> {
        let (config, auth_token) = source.into().resolve()?;
        let work_dir = tempfile::Builder::new()
            .prefix("simulacat-")
            .tempdir()
            .map_err(|err| ProcessError::io("create simulator work directory", err))?;
        let process = start_sim_process(&config, work_dir.path(), options)?;
        let client = SimClient::new(process.base_url(), auth_token.as_deref());
        tracing::info!(
            port = process.port(),
            authenticated = auth_token.is_some(),
            "simulator session ready"
        );
        Ok(Self {
            process,
            client,
            auth_token,
            work_dir,
        })
    }

    pub fn port(&self) -> u16 {
        self.process.port()
    }

    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    pub fn client(&self) -> &SimClient {
        &self.client
    }

    pub fn work_dir(&self) -> &Path {
        self.work_dir.path()
    }

    pub fn process_mut(&mut self) -> &mut SimulatorProcess {
        &mut self.process
    }
}

impl Drop for SimulatorSession {
    fn drop(&mut self) {
        stop_sim_process(&mut self.process, DEFAULT_STOP_TIMEOUT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{single_repo_scenario, AccessToken};
    use serde_json::json;

    #[test]
    fn scenario_source_resolves_token_out_of_band() {
        let scenario = single_repo_scenario("octocat", "hello", false, "main")
            .unwrap()
            .with_token(AccessToken::new("ghp_octo", "octocat"));
        let (config, token) = SimSource::from(scenario).resolve().unwrap();
        assert_eq!(token.as_deref(), Some("ghp_octo"));
        let text = serde_json::to_string(&config).unwrap();
        assert!(!text.contains("ghp_octo"));
    }

    #[test]
    fn invalid_scenario_source_is_rejected() {
        let scenario = single_repo_scenario("octocat", "hello", false, "main")
            .unwrap()
            .with_token(AccessToken::new("a", "octocat"))
            .with_token(AccessToken::new("b", "octocat"));
        let err = SimSource::from(scenario).resolve().unwrap_err();
        assert_eq!(
            err.message,
            "Multiple tokens configured but no default_token set"
        );
    }

    #[test]
    fn raw_source_uses_metadata_token() {
        let (config, token) = SimSource::from(json!({
            "users": [{ "login": "octocat", "organizations": [] }],
            "__simulacat__": { "auth_token": "ghp_raw" },
        }))
        .resolve()
        .unwrap();
        assert_eq!(token.as_deref(), Some("ghp_raw"));
        assert_eq!(config.users.len(), 1);
    }

    #[test]
    fn client_joins_paths_and_formats_header() {
        let client = SimClient::new("http://127.0.0.1:4242/", Some("ghp_x"));
        assert_eq!(client.url("/repos/a/b"), "http://127.0.0.1:4242/repos/a/b");
        assert_eq!(client.url("user"), "http://127.0.0.1:4242/user");
        assert_eq!(client.authorization(), Some("token ghp_x"));
        assert_eq!(SimClient::new("http://x", None).authorization(), None);
    }
}
