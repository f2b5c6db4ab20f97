//! Selection of the active credential from a scenario's token pool.

use super::checks::require_text;
use super::Scenario;
use crate::error::ValidationError;

const DEFAULT_MISMATCH: &str = "Default token must match one of the configured tokens";
const AMBIGUOUS_POOL: &str = "Multiple tokens configured but no default_token set";

/// Pick the authorization token from `values`.
///
/// | pool      | default      | result            |
/// |-----------|--------------|-------------------|
/// | empty     | none         | `None`            |
/// | empty     | some         | error             |
/// | non-empty | member       | that member       |
/// | non-empty | non-member   | error             |
/// | one       | none         | the only value    |
/// | two+      | none         | error             |
pub fn select_auth_token(
    values: &[String],
    default_token: Option<&str>,
) -> Result<Option<String>, ValidationError> {
    if values.is_empty() {
        return match default_token {
            Some(_) => Err(ValidationError::new(DEFAULT_MISMATCH)),
            None => Ok(None),
        };
    }

    if let Some(default_token) = default_token {
        let selected = require_text(default_token, "Default token")?;
        if !values.iter().any(|value| value == selected) {
            return Err(ValidationError::new(DEFAULT_MISMATCH));
        }
        return Ok(Some(selected.to_string()));
    }

    match values {
        [only] => Ok(Some(only.clone())),
        _ => Err(ValidationError::new(AMBIGUOUS_POOL)),
    }
}

/// Standalone token values followed by installation access tokens.
pub fn collect_token_values(scenario: &Scenario) -> Vec<String> {
    scenario
        .tokens
        .iter()
        .map(|token| token.value.clone())
        .chain(
            scenario
                .app_installations
                .iter()
                .filter_map(|installation| installation.access_token.clone()),
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{AccessToken, AppInstallation, GitHubApp, User};

    fn pool(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn resolution_law() {
        assert_eq!(select_auth_token(&[], None).unwrap(), None);
        assert_eq!(
            select_auth_token(&[], Some("x")).unwrap_err().message,
            DEFAULT_MISMATCH
        );
        assert_eq!(
            select_auth_token(&pool(&["a"]), None).unwrap(),
            Some("a".to_string())
        );
        assert_eq!(
            select_auth_token(&pool(&["a", "b"]), None)
                .unwrap_err()
                .message,
            AMBIGUOUS_POOL
        );
        assert_eq!(
            select_auth_token(&pool(&["a", "b"]), Some("b")).unwrap(),
            Some("b".to_string())
        );
        assert_eq!(
            select_auth_token(&pool(&["a", "b"]), Some("c"))
                .unwrap_err()
                .message,
            DEFAULT_MISMATCH
        );
    }

    #[test]
    fn blank_default_is_a_text_error() {
        let err = select_auth_token(&pool(&["a"]), Some("  ")).unwrap_err();
        assert_eq!(err.message, "Default token must be a non-empty string");
    }

    #[test]
    fn pool_lists_standalone_tokens_first() {
        let mut installation = AppInstallation::new(1, "bot", "alice");
        installation.access_token = Some("ghs_inst".to_string());
        let scenario = Scenario::new()
            .with_user(User::new("alice"))
            .with_app(GitHubApp::new("bot", "Bot"))
            .with_app_installation(installation)
            .with_token(AccessToken::new("ghp_user", "alice"));
        assert_eq!(
            collect_token_values(&scenario),
            pool(&["ghp_user", "ghs_inst"])
        );
    }
}
