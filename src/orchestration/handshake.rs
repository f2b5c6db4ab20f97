//! Startup handshake: read the simulator's NDJSON events until it reports a
//! listening port, an error, or the deadline passes.

use serde_json::Value;
use std::io::{BufRead, BufReader, Read};
use std::sync::mpsc::{self, Receiver};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// A classified line of simulator output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    Listening(u16),
    InvalidListening(String),
    Error(String),
    /// Anything else; kept only for diagnostics.
    Other,
}

/// Why the handshake did not produce a port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Failure {
    /// The simulator said something definitive (error event, bad port).
    Reported(String),
    /// Deadline passed or the output stream ended first.
    NoPort,
}

/// Result of [`wait_for_port`].
#[derive(Debug)]
pub(crate) struct Handshake {
    pub(crate) outcome: Result<u16, Failure>,
    /// Every line consumed so far, newline-terminated.
    pub(crate) output: String,
}

/// Start a thread that forwards each output line into an unbounded channel.
///
/// `None` is sent once the stream reaches EOF. The thread keeps draining
/// after the receiver is dropped so the child never blocks on a full pipe.
pub(crate) fn spawn_reader<R>(
    stream: R,
) -> std::io::Result<(Receiver<Option<String>>, JoinHandle<()>)>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let handle = std::thread::Builder::new()
        .name("simulator-output-reader".to_string())
        .spawn(move || {
            let mut reader = BufReader::new(stream);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf).into_owned();
                        tracing::trace!(line = line.trim_end(), "simulator output");
                        // The controller may already be gone; keep draining.
                        let _ = tx.send(Some(line));
                    }
                    Err(err) => {
                        tracing::debug!(error = %err, "simulator output read failed");
                        break;
                    }
                }
            }
            let _ = tx.send(None);
        })?;
    Ok((rx, handle))
}

/// Pull lines until a decisive event, end of stream, or `deadline`.
pub(crate) fn wait_for_port(lines: &Receiver<Option<String>>, deadline: Instant) -> Handshake {
    let mut output = String::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Handshake {
                outcome: Err(Failure::NoPort),
                output,
            };
        }
        let line = match lines.recv_timeout(remaining) {
            Ok(Some(line)) => line,
            Ok(None) | Err(_) => {
                return Handshake {
                    outcome: Err(Failure::NoPort),
                    output,
                };
            }
        };
        push_line(&mut output, &line);

        let outcome = match classify(&line) {
            Event::Listening(port) => Ok(port),
            Event::InvalidListening(record) => Err(Failure::Reported(format!(
                "Invalid listening event from simulator: {record}"
            ))),
            Event::Error(message) => {
                Err(Failure::Reported(format!("Simulator error: {message}")))
            }
            Event::Other => continue,
        };
        return Handshake { outcome, output };
    }
}

/// Append whatever is already queued, waiting at most `grace` for more.
pub(crate) fn drain_pending(
    lines: &Receiver<Option<String>>,
    output: &mut String,
    grace: Duration,
) {
    let deadline = Instant::now() + grace;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match lines.recv_timeout(remaining) {
            Ok(Some(line)) => push_line(output, &line),
            _ => return,
        }
    }
}

fn push_line(output: &mut String, line: &str) {
    output.push_str(line);
    if !line.ends_with('\n') {
        output.push('\n');
    }
}

pub(crate) fn classify(line: &str) -> Event {
    let Ok(Value::Object(record)) = serde_json::from_str::<Value>(line.trim()) else {
        return Event::Other;
    };
    match record.get("event").and_then(Value::as_str) {
        Some("listening") => match record.get("port").and_then(parse_port) {
            Some(port) => Event::Listening(port),
            None => Event::InvalidListening(Value::Object(record.clone()).to_string()),
        },
        Some("error") => {
            let message = match record.get("message") {
                Some(Value::String(message)) => message.clone(),
                Some(Value::Null) | None => "Unknown error".to_string(),
                Some(other) => other.to_string(),
            };
            Event::Error(message)
        }
        _ => Event::Other,
    }
}

/// Integer ports in `1..=65535`.
///
/// Integer strings such as `"4242"` are also accepted, matching simulators
/// that report the port as text.
fn parse_port(value: &Value) -> Option<u16> {
    let port = match value {
        Value::Number(number) => number.as_u64()?,
        Value::String(text) => text.trim().parse().ok()?,
        _ => return None,
    };
    u16::try_from(port).ok().filter(|port| *port != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_listening_event() {
        assert_eq!(
            classify("{\"event\":\"listening\",\"port\":4242}\n"),
            Event::Listening(4242)
        );
        assert_eq!(
            classify("{\"event\":\"listening\",\"port\":\"8080\"}"),
            Event::Listening(8080)
        );
    }

    #[test]
    fn classify_rejects_bad_ports() {
        for line in [
            "{\"event\":\"listening\"}",
            "{\"event\":\"listening\",\"port\":\"abc\"}",
            "{\"event\":\"listening\",\"port\":0}",
            "{\"event\":\"listening\",\"port\":70000}",
            "{\"event\":\"listening\",\"port\":42.5}",
        ] {
            assert!(
                matches!(classify(line), Event::InvalidListening(_)),
                "{line}"
            );
        }
    }

    #[test]
    fn classify_error_event() {
        assert_eq!(
            classify("{\"event\":\"error\",\"message\":\"boom\"}"),
            Event::Error("boom".to_string())
        );
        assert_eq!(
            classify("{\"event\":\"error\"}"),
            Event::Error("Unknown error".to_string())
        );
    }

    #[test]
    fn classify_ignores_noise() {
        assert_eq!(classify("starting up"), Event::Other);
        assert_eq!(classify("[1, 2]"), Event::Other);
        assert_eq!(classify("{\"event\":\"ready\"}"), Event::Other);
    }

    #[test]
    fn earliest_decisive_line_wins() {
        let (tx, rx) = mpsc::channel();
        for line in [
            "booting\n",
            "{\"event\":\"listening\",\"port\":4242}\n",
            "{\"event\":\"error\",\"message\":\"late\"}\n",
        ] {
            tx.send(Some(line.to_string())).unwrap();
        }
        let handshake = wait_for_port(&rx, Instant::now() + Duration::from_secs(1));
        assert_eq!(handshake.outcome, Ok(4242));
        assert_eq!(
            handshake.output,
            "booting\n{\"event\":\"listening\",\"port\":4242}\n"
        );
    }

    #[test]
    fn end_of_stream_fails_without_waiting_for_deadline() {
        let (tx, rx) = mpsc::channel();
        tx.send(Some("hello".to_string())).unwrap();
        tx.send(None).unwrap();
        let started = Instant::now();
        let handshake = wait_for_port(&rx, Instant::now() + Duration::from_secs(30));
        assert_eq!(handshake.outcome, Err(Failure::NoPort));
        assert_eq!(handshake.output, "hello\n");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn silent_stream_times_out() {
        let (_tx, rx) = mpsc::channel::<Option<String>>();
        let handshake = wait_for_port(&rx, Instant::now() + Duration::from_millis(50));
        assert_eq!(handshake.outcome, Err(Failure::NoPort));
        assert!(handshake.output.is_empty());
    }

    #[test]
    fn reader_sends_lines_then_sentinel() {
        let input: &'static [u8] = b"one\ntwo";
        let (rx, handle) = spawn_reader(input).unwrap();
        handle.join().unwrap();
        let received: Vec<Option<String>> = rx.try_iter().collect();
        assert_eq!(
            received,
            vec![Some("one\n".to_string()), Some("two".to_string()), None]
        );
    }
}
