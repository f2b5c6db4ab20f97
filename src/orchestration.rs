//! Simulator process supervision.
//!
//! [`start_sim_process`] writes the configuration file, spawns
//! `<bun> <entrypoint> <config>`, and waits for the simulator to announce its
//! port on the combined stdout/stderr stream. [`stop_sim_process`] tears the
//! process down with a terminate-then-kill escalation.
//!
//! ```text
//! Idle -> Starting -> Listening -> Stopping -> Stopped
//!            |            |
//!            +-> Failed <-+
//! ```

use crate::error::ProcessError;
use crate::sim_config::SimConfig;
use std::fmt;
use std::io::PipeReader;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::Receiver;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

mod entrypoint;
mod handshake;
mod terminate;

pub use entrypoint::{
    bun_available, bun_executable, sim_entrypoint, sim_package_root, BUN_ENV, JS_ROOT_ENV,
};

/// Name of the configuration file written into the work directory.
pub const CONFIG_FILE_NAME: &str = "github-sim-config.json";
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a failed process gets to exit on its own before termination.
const DRAIN_WAIT: Duration = Duration::from_secs(1);
const READER_JOIN_WAIT: Duration = Duration::from_secs(1);
const FAILURE_OUTPUT_GRACE: Duration = Duration::from_millis(100);

/// Lifecycle of a supervised simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatorState {
    Idle,
    Starting,
    Listening,
    Stopping,
    Stopped,
    Failed,
}

impl fmt::Display for SimulatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Listening => "listening",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Knobs for [`start_sim_process`].
#[derive(Debug, Clone)]
pub struct StartOptions {
    /// Program to run; defaults to [`bun_executable`].
    pub executable: Option<String>,
    /// Script handed to the program; defaults to [`sim_entrypoint`].
    pub entrypoint: Option<PathBuf>,
    pub startup_timeout: Duration,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self {
            executable: None,
            entrypoint: None,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
        }
    }
}

impl StartOptions {
    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = Some(executable.into());
        self
    }

    pub fn with_entrypoint(mut self, entrypoint: impl Into<PathBuf>) -> Self {
        self.entrypoint = Some(entrypoint.into());
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }
}

/// A running simulator that has reported its port.
///
/// The handle owns the output reader thread. It keeps draining the pipe for
/// the life of the process and is joined by [`stop_sim_process`].
#[derive(Debug)]
pub struct SimulatorProcess {
    child: Child,
    port: u16,
    state: SimulatorState,
    config_path: PathBuf,
    reader: Option<JoinHandle<()>>,
}

impl SimulatorProcess {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Current state; a listening process that exited on its own is `Failed`.
    pub fn state(&mut self) -> SimulatorState {
        if self.state == SimulatorState::Listening && self.has_exited() {
            tracing::warn!(pid = self.pid(), "simulator exited unexpectedly");
            self.state = SimulatorState::Failed;
        }
        self.state
    }

    pub fn has_exited(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(Some(_)))
    }

    pub fn stop(&mut self, timeout: Duration) {
        stop_sim_process(self, timeout);
    }
}

/// Start the simulator and wait for it to report a listening port.
///
/// `config` is written to `<work_dir>/github-sim-config.json`. On any
/// handshake failure the process is stopped before the error is returned.
pub fn start_sim_process(
    config: &SimConfig,
    work_dir: &Path,
    options: &StartOptions,
) -> Result<SimulatorProcess, ProcessError> {
    let executable = options.executable.clone().unwrap_or_else(bun_executable);
    let entrypoint = match &options.entrypoint {
        Some(entrypoint) => entrypoint.clone(),
        None => sim_entrypoint()?,
    };
    if !entrypoint.is_file() {
        return Err(ProcessError::EntrypointMissing(entrypoint));
    }

    let config_path = write_config(config, work_dir)?;
    let argv = [
        executable.clone(),
        entrypoint.display().to_string(),
        config_path.display().to_string(),
    ];
    tracing::info!(
        state = %SimulatorState::Starting,
        command = %shell_words::join(&argv),
        "starting simulator"
    );

    let (mut child, output) = spawn(&executable, &entrypoint, &config_path)?;
    let (lines, reader) = match handshake::spawn_reader(output) {
        Ok(pair) => pair,
        Err(err) => {
            terminate::terminate(&mut child, terminate::KILL_WAIT_CAP);
            return Err(ProcessError::io("start simulator output reader", err));
        }
    };

    let deadline = Instant::now() + options.startup_timeout;
    let handshake = handshake::wait_for_port(&lines, deadline);
    match handshake.outcome {
        Ok(port) => {
            tracing::info!(
                state = %SimulatorState::Listening,
                pid = child.id(),
                port,
                "simulator listening"
            );
            Ok(SimulatorProcess {
                child,
                port,
                state: SimulatorState::Listening,
                config_path,
                reader: Some(reader),
            })
        }
        Err(failure) => Err(fail_startup(
            child,
            lines,
            reader,
            failure,
            handshake.output,
        )),
    }
}

/// Stop a simulator: terminate, wait up to `timeout`, then kill.
///
/// A no-op when the process has already exited or was already stopped.
/// Never fails; problems are logged.
pub fn stop_sim_process(process: &mut SimulatorProcess, timeout: Duration) {
    if process.state == SimulatorState::Stopped {
        return;
    }
    if process.has_exited() {
        if process.state != SimulatorState::Failed {
            tracing::debug!(pid = process.pid(), "simulator already exited");
        }
        process.state = SimulatorState::Failed;
        join_reader(process);
        return;
    }

    process.state = SimulatorState::Stopping;
    tracing::debug!(pid = process.pid(), state = %process.state, "stopping simulator");
    terminate::terminate(&mut process.child, timeout);
    process.state = SimulatorState::Stopped;
    join_reader(process);
    tracing::info!(pid = process.pid(), state = %process.state, "simulator stopped");
}

fn join_reader(process: &mut SimulatorProcess) {
    if let Some(reader) = process.reader.take() {
        terminate::join_bounded(reader, READER_JOIN_WAIT);
    }
}

fn write_config(config: &SimConfig, work_dir: &Path) -> Result<PathBuf, ProcessError> {
    let serialized = serde_json::to_string(config).map_err(ProcessError::Serialize)?;
    let path = work_dir.join(CONFIG_FILE_NAME);
    std::fs::write(&path, serialized)
        .map_err(|err| ProcessError::io(format!("write {}", path.display()), err))?;
    Ok(path)
}

/// Spawn with stderr merged into stdout through a single pipe.
fn spawn(
    executable: &str,
    entrypoint: &Path,
    config_path: &Path,
) -> Result<(Child, PipeReader), ProcessError> {
    let (output, stdout) =
        std::io::pipe().map_err(|err| ProcessError::io("create simulator output pipe", err))?;
    let stderr = stdout
        .try_clone()
        .map_err(|err| ProcessError::io("duplicate simulator output pipe", err))?;

    let mut command = Command::new(executable);
    command
        .arg(entrypoint)
        .arg(config_path)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr);
    let child = command.spawn().map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => ProcessError::ExecutableNotFound(executable.to_string()),
        _ => ProcessError::Spawn(err),
    })?;
    // Release the parent's copies of the write end so the reader sees EOF.
    drop(command);
    Ok((child, output))
}

fn fail_startup(
    mut child: Child,
    lines: Receiver<Option<String>>,
    reader: JoinHandle<()>,
    failure: handshake::Failure,
    mut output: String,
) -> ProcessError {
    let pid = child.id();
    if let Err(err) = terminate::wait_with_timeout(&mut child, DRAIN_WAIT) {
        tracing::warn!(pid, error = %err, "wait for failed simulator");
    }
    terminate::terminate(&mut child, terminate::KILL_WAIT_CAP);
    handshake::drain_pending(&lines, &mut output, FAILURE_OUTPUT_GRACE);
    drop(lines);
    terminate::join_bounded(reader, READER_JOIN_WAIT);

    let message = match failure {
        handshake::Failure::Reported(message) => message,
        handshake::Failure::NoPort => {
            let status = child.try_wait().ok().flatten();
            format!(
                "Simulator did not report a listening port.\nExit code: {}\nOutput:\n{}",
                terminate::describe_exit(status),
                output
            )
        }
    };
    tracing::warn!(pid, state = %SimulatorState::Failed, %message, "simulator failed to start");
    ProcessError::Simulator { message, output }
}

#[cfg(all(test, unix))]
#[path = "orchestration_tests.rs"]
mod tests;
