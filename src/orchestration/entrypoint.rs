//! Locating the simulator's JavaScript package and the Bun executable.

use crate::error::ProcessError;
use std::env;
use std::path::{Path, PathBuf};

/// Overrides the simulator package root.
pub const JS_ROOT_ENV: &str = "SIMULACAT_JS_ROOT";
/// Overrides the Bun executable.
pub const BUN_ENV: &str = "BUN";

const DEFAULT_BUN: &str = "bun";
const PACKAGE_MANIFEST: &str = "package.json";

/// The Bun executable: `$BUN` when set and non-blank, else `bun`.
pub fn bun_executable() -> String {
    env::var(BUN_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BUN.to_string())
}

/// Whether [`bun_executable`] resolves to a runnable program.
pub fn bun_available() -> bool {
    which::which(bun_executable()).is_ok()
}

/// Directory holding the simulator's `package.json`.
///
/// `$SIMULACAT_JS_ROOT` wins when set. Otherwise the crate's `sim/` directory
/// and then the current directory are tried.
pub fn sim_package_root() -> Result<PathBuf, ProcessError> {
    let override_root = env::var_os(JS_ROOT_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from);
    let mut candidates = vec![Path::new(env!("CARGO_MANIFEST_DIR")).join("sim")];
    if let Ok(cwd) = env::current_dir() {
        candidates.push(cwd);
    }
    resolve_package_root(override_root, &candidates)
}

/// Path to `src/github-sim-server.ts` under [`sim_package_root`].
pub fn sim_entrypoint() -> Result<PathBuf, ProcessError> {
    Ok(entrypoint_in(&sim_package_root()?))
}

pub(crate) fn entrypoint_in(root: &Path) -> PathBuf {
    root.join("src").join("github-sim-server.ts")
}

fn resolve_package_root(
    override_root: Option<PathBuf>,
    candidates: &[PathBuf],
) -> Result<PathBuf, ProcessError> {
    if let Some(root) = override_root {
        if root.join(PACKAGE_MANIFEST).is_file() {
            return Ok(root);
        }
        return Err(ProcessError::PackageRootMissing {
            checked: format!("{JS_ROOT_ENV}={}", root.display()),
        });
    }

    candidates
        .iter()
        .find(|candidate| candidate.join(PACKAGE_MANIFEST).is_file())
        .cloned()
        .ok_or_else(|| ProcessError::PackageRootMissing {
            checked: candidates
                .iter()
                .map(|candidate| candidate.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
}
