//! Child-process execution that tees agent output to the console and a log.
//!
//! Output is drained concurrently while the child runs so neither pipe can
//! deadlock. Every byte of stdout/stderr goes to both the operator's console
//! and a freshly-truncated log file; the log file is then read back as the
//! classification input, so the classifier sees exactly what was logged.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Outcome of one teed invocation.
#[derive(Debug)]
pub struct TeeOutput {
    pub status: ExitStatus,
    /// Full combined stdout/stderr, identical to the log file contents.
    pub combined: String,
    pub timed_out: bool,
}

/// Run `cmd`, feeding `stdin` when given, streaming combined stdout/stderr to
/// both the console and the log file at `log_path` (truncated per attempt).
///
/// A non-zero exit is returned as data; only spawn and log I/O failures are
/// errors. With `timeout` set, a child still running at the deadline is
/// killed and reported via `timed_out`.
#[instrument(skip_all, fields(log = %log_path.display()))]
pub fn run_tee(
    mut cmd: Command,
    stdin: Option<&[u8]>,
    log_path: &Path,
    timeout: Option<Duration>,
) -> Result<TeeOutput> {
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log dir {}", parent.display()))?;
    }
    let log_file = File::create(log_path)
        .with_context(|| format!("create log file {}", log_path.display()))?;
    let log = Arc::new(Mutex::new(log_file));

    if stdin.is_some() {
        cmd.stdin(Stdio::piped());
    } else {
        cmd.stdin(Stdio::null());
    }
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

    debug!("spawning agent process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn agent");
            return Err(e).context("spawn agent command");
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    // Start draining before writing stdin so a chatty child cannot fill a
    // pipe while we are still blocked feeding the prompt.
    let out_handle = {
        let log = Arc::clone(&log);
        thread::spawn(move || tee_stream(stdout, std::io::stdout(), &log))
    };
    let err_handle = {
        let log = Arc::clone(&log);
        thread::spawn(move || tee_stream(stderr, std::io::stderr(), &log))
    };

    if let Some(input) = stdin {
        let mut child_stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("stdin was not piped"))?;
        child_stdin.write_all(input).context("write prompt to stdin")?;
    }

    let mut timed_out = false;
    let status = match timeout {
        Some(limit) => match child.wait_timeout(limit).context("wait for agent")? {
            Some(status) => status,
            None => {
                warn!(timeout_secs = limit.as_secs(), "agent timed out, killing");
                timed_out = true;
                child.kill().context("kill agent")?;
                child.wait().context("wait agent after kill")?
            }
        },
        None => child.wait().context("wait for agent")?,
    };

    join_tee(out_handle).context("tee stdout")?;
    join_tee(err_handle).context("tee stderr")?;

    log.lock()
        .map_err(|_| anyhow!("log writer poisoned"))?
        .flush()
        .context("flush log file")?;
    let combined = fs::read(log_path)
        .with_context(|| format!("read log file {}", log_path.display()))?;

    debug!(exit_code = ?status.code(), timed_out, "agent finished");
    Ok(TeeOutput {
        status,
        combined: String::from_utf8_lossy(&combined).into_owned(),
        timed_out,
    })
}

fn tee_stream<R: Read, W: Write>(
    mut reader: R,
    mut console: W,
    log: &Mutex<File>,
) -> Result<()> {
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).context("read agent output")?;
        if n == 0 {
            break;
        }
        let bytes = &chunk[..n];
        console.write_all(bytes).context("write console")?;
        let _ = console.flush();
        match log.lock() {
            Ok(mut file) => file.write_all(bytes).context("write log file")?,
            Err(_) => warn!("log writer poisoned, dropping output chunk"),
        }
    }
    Ok(())
}

fn join_tee(handle: thread::JoinHandle<Result<()>>) -> Result<()> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output tee thread panicked")),
    }
}
