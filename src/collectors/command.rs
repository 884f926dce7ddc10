use crate::error::{ProbeError, ProbeResult};
use std::io::Read;
use std::process::{Child, Command, Output, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

const POLL_STEP: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

/// Run `program args..` and give up after `timeout`, killing the child.
/// The bound covers reading the output too: a background process that keeps
/// the pipes open past the deadline is a timeout.
///
/// The exit status is returned as-is: several tools (smartctl) report useful
/// output with a non-zero status. Use [`run_checked`] when success is required.
pub fn run(program: &str, args: &[&str], timeout: Duration) -> ProbeResult<Output> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ProbeError::unavailable(format!("`{}` not found", program)),
            _ => ProbeError::from(e),
        })?;

    let started = Instant::now();
    let deadline = started + timeout;

    // Drain pipes on their own threads so a chatty child can't fill the
    // pipe buffer and stall until the timeout.
    let (tx, rx) = mpsc::channel();
    let drained = drain(child.stdout.take(), Stream::Stdout, tx.clone())
        .and_then(|()| drain(child.stderr.take(), Stream::Stderr, tx));
    if let Err(e) = drained {
        kill(&mut child);
        return Err(e);
    }

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                kill(&mut child);
                return Err(timed_out(program, started));
            }
            Ok(None) => thread::sleep(POLL_STEP),
            Err(e) => {
                kill(&mut child);
                return Err(e.into());
            }
        }
    };

    let (mut stdout, mut stderr) = (None, None);
    while stdout.is_none() || stderr.is_none() {
        match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok((Stream::Stdout, buf)) => stdout = Some(buf),
            Ok((Stream::Stderr, buf)) => stderr = Some(buf),
            Err(RecvTimeoutError::Timeout) => {
                debug!(program, "output still open after the command exited");
                return Err(timed_out(program, started));
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(Output {
        status,
        stdout: stdout.unwrap_or_default(),
        stderr: stderr.unwrap_or_default(),
    })
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn timed_out(program: &str, started: Instant) -> ProbeError {
    let elapsed = started.elapsed();
    debug!(program, ?elapsed, "command timed out");
    ProbeError::Timeout { command: program.to_string(), elapsed }
}

/// Like [`run`], but a non-zero exit becomes a transient failure and stdout
/// is returned as text.
pub fn run_checked(program: &str, args: &[&str], timeout: Duration) -> ProbeResult<String> {
    let out = run(program, args, timeout)?;
    if !out.status.success() {
        let stderr = String::from_utf8_lossy(&out.stderr);
        let stderr = stderr.trim();
        if stderr.contains("Permission denied") || stderr.contains("Operation not permitted") {
            return Err(ProbeError::permission_denied(format!("{}: {}", program, stderr)));
        }
        return Err(ProbeError::transient(format!("`{} {}` failed: {}", program, args.join(" "), stderr)));
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

fn drain<R: Read + Send + 'static>(
    pipe: Option<R>,
    stream: Stream,
    tx: Sender<(Stream, Vec<u8>)>,
) -> ProbeResult<()> {
    let Some(mut pipe) = pipe else {
        let _ = tx.send((stream, Vec::new()));
        return Ok(());
    };
    thread::Builder::new()
        .name("xdmon-drain".to_string())
        .spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send((stream, buf));
        })
        .map(|_| ())
        .map_err(|e| ProbeError::transient(format!("cannot start output reader: {}", e)))
}
