//! Low-level field checks shared by the scenario validators.

use super::RepositoryKey;
use crate::error::ValidationError;
use std::collections::BTreeSet;

pub(crate) type CheckResult<T> = Result<T, ValidationError>;

pub(crate) fn require_text<'a>(value: &'a str, label: &str) -> CheckResult<&'a str> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(format!(
            "{label} must be a non-empty string"
        )));
    }
    Ok(value)
}

pub(crate) fn require_optional_text(value: Option<&str>, label: &str) -> CheckResult<()> {
    if let Some(value) = value {
        require_text(value, label)?;
    }
    Ok(())
}

pub(crate) fn require_positive_int(value: i64, label: &str) -> CheckResult<i64> {
    if value <= 0 {
        return Err(ValidationError::new(format!(
            "{label} must be a positive integer"
        )));
    }
    Ok(value)
}

/// Collects `values` into a set, failing on the first repeat.
pub(crate) fn ensure_unique<I, S>(values: I, label: &str) -> CheckResult<BTreeSet<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = BTreeSet::new();
    for value in values {
        let value = value.as_ref();
        if !seen.insert(value.to_string()) {
            return Err(ValidationError::new(format!("Duplicate {label}: {value:?}")));
        }
    }
    Ok(seen)
}

/// Splits an `owner/name` reference on the first slash.
pub(crate) fn parse_repo_reference(value: &str, label: &str) -> CheckResult<RepositoryKey> {
    let Some((owner, name)) = value.split_once('/') else {
        return Err(ValidationError::new(format!(
            "{label} must be in the form 'owner/repo'"
        )));
    };
    let owner = require_text(owner, &format!("{label} owner"))?;
    let name = require_text(name, &format!("{label} name"))?;
    Ok((owner.to_string(), name.to_string()))
}

pub(crate) fn format_repo_key(key: &RepositoryKey) -> String {
    format!("{}/{}", key.0, key.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_text_rejects_whitespace() {
        let err = require_text("  \t", "User login").unwrap_err();
        assert_eq!(err.message, "User login must be a non-empty string");
        assert_eq!(require_text("alice", "User login").unwrap(), "alice");
    }

    #[test]
    fn require_positive_int_rejects_zero_and_negative() {
        assert!(require_positive_int(0, "Issue number").is_err());
        assert!(require_positive_int(-3, "Issue number").is_err());
        assert_eq!(require_positive_int(7, "Issue number").unwrap(), 7);
    }

    #[test]
    fn ensure_unique_reports_first_duplicate() {
        let err = ensure_unique(["a", "b", "a", "b"], "user login").unwrap_err();
        assert_eq!(err.message, "Duplicate user login: \"a\"");
    }

    #[test]
    fn parse_repo_reference_splits_on_first_slash() {
        let key = parse_repo_reference("alice/demo/extra", "Token repository").unwrap();
        assert_eq!(key, ("alice".to_string(), "demo/extra".to_string()));

        let err = parse_repo_reference("alice", "Token repository").unwrap_err();
        assert_eq!(
            err.message,
            "Token repository must be in the form 'owner/repo'"
        );

        let err = parse_repo_reference("/demo", "Token repository").unwrap_err();
        assert_eq!(err.message, "Token repository owner must be a non-empty string");
    }
}
