//! Shared test infrastructure for integration tests.

#![allow(dead_code)]

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// A scratch directory holding scenario files and fake simulator scripts.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_json(&self, name: &str, value: &Value) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, serde_json::to_string_pretty(value).expect("serialize"))
            .expect("write json");
        path
    }

    /// A `sh` script standing in for the simulator entry point.
    pub fn fake_simulator(&self, script: &str) -> PathBuf {
        let path = self.dir.path().join("fake-sim.sh");
        fs::write(&path, script).expect("write fake simulator");
        path
    }

    /// Run the simulacat binary with stdin closed.
    pub fn run(&self, args: &[&str]) -> Output {
        self.command(args)
            .output()
            .expect("run simulacat binary")
    }

    pub fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_simulacat"));
        command
            .args(args)
            .current_dir(self.dir.path())
            .env_remove("SIMULACAT_JS_ROOT")
            .env_remove("RUST_LOG")
            .stdin(Stdio::null());
        command
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Script body that announces `port` and then idles.
pub fn listening_script(port: u16) -> String {
    format!("echo '{{\"event\":\"listening\",\"port\":{port}}}'\nexec sleep 30\n")
}
