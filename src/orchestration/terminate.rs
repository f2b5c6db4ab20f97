//! Bounded waits and the terminate-then-kill escalation.

use std::io;
use std::process::{Child, ExitStatus};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Upper bound on the wait after a forced kill.
pub(crate) const KILL_WAIT_CAP: Duration = Duration::from_secs(1);

/// Poll `try_wait` until the child exits or `timeout` elapses.
pub(crate) fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
) -> io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(timeout - elapsed));
    }
}

/// Ask the child to exit: `SIGTERM` on unix, a hard kill elsewhere.
fn send_terminate(child: &mut Child) -> io::Result<()> {
    #[cfg(unix)]
    {
        let pid = libc::pid_t::try_from(child.id())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
        // SAFETY: `pid` belongs to a child we have not reaped yet.
        let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
    #[cfg(not(unix))]
    {
        child.kill()
    }
}

/// Terminate, wait up to `timeout`, then kill and wait up to
/// `min(timeout, KILL_WAIT_CAP)`. Failures are logged, never returned.
pub(crate) fn terminate(child: &mut Child, timeout: Duration) {
    let pid = child.id();
    match child.try_wait() {
        Ok(Some(status)) => {
            tracing::debug!(pid, %status, "simulator already exited");
            return;
        }
        Ok(None) => {}
        Err(err) => tracing::warn!(pid, error = %err, "check simulator status"),
    }

    if let Err(err) = send_terminate(child) {
        tracing::warn!(pid, error = %err, "terminate simulator");
        return;
    }
    match wait_with_timeout(child, timeout) {
        Ok(Some(status)) => {
            tracing::debug!(pid, %status, "simulator exited after terminate");
            return;
        }
        Ok(None) => {}
        Err(err) => tracing::warn!(pid, error = %err, "wait for simulator exit"),
    }

    tracing::warn!(
        pid,
        timeout_ms = timeout.as_millis() as u64,
        "simulator ignored terminate; killing"
    );
    if let Err(err) = child.kill() {
        tracing::warn!(pid, error = %err, "kill simulator");
    }
    match wait_with_timeout(child, timeout.min(KILL_WAIT_CAP)) {
        Ok(Some(_)) => {}
        Ok(None) => tracing::warn!(pid, "simulator still running after kill"),
        Err(err) => tracing::warn!(pid, error = %err, "wait for killed simulator"),
    }
}

/// Join `handle` if it finishes within `timeout`; otherwise detach it.
pub(crate) fn join_bounded(handle: JoinHandle<()>, timeout: Duration) -> bool {
    let start = Instant::now();
    while !handle.is_finished() {
        if start.elapsed() >= timeout {
            tracing::debug!("output reader still running; detaching");
            return false;
        }
        thread::sleep(POLL_INTERVAL);
    }
    handle.join().is_ok()
}

/// Render an exit status the way a shell would report it.
pub(crate) fn describe_exit(status: Option<ExitStatus>) -> String {
    let Some(status) = status else {
        return "None".to_string();
    };
    if let Some(code) = status.code() {
        return code.to_string();
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("-{signal}");
        }
    }
    status.to_string()
}
