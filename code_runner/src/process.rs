//! Supervised child processes.
//!
//! [`run_supervised`] owns the child for its whole life: stdin is fed and
//! closed, both output streams are drained concurrently under a byte cap, and
//! the wall-clock limit covers everything. On timeout or overflow the child is
//! killed, and it is always reaped before returning.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::time::timeout;

/// Captured result of a process that ran to completion.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    Completed(ProcessOutput),
    TimedOut { limit: Duration },
    OutputLimitExceeded { limit: usize },
}

enum Interrupt {
    OutputLimit,
    Io(io::Error),
}

pub async fn run_supervised(
    mut command: Command,
    stdin: &[u8],
    limit: Duration,
    max_output_bytes: usize,
) -> io::Result<ProcessOutcome> {
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn()?;
    let pipe_in = child.stdin.take();
    let pipe_out = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("stdout was not captured"))?;
    let pipe_err = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("stderr was not captured"))?;

    let input = stdin.to_vec();
    let feed = async move {
        if let Some(mut pipe) = pipe_in {
            // A child that exits without reading closes the pipe early.
            if let Err(e) = pipe.write_all(&input).await {
                tracing::debug!(error = %e, "stdin closed before all input was written");
            }
            drop(pipe);
        }
        Ok::<(), Interrupt>(())
    };

    let supervised = async {
        let ((), out, err) = tokio::try_join!(
            feed,
            read_capped(pipe_out, max_output_bytes),
            read_capped(pipe_err, max_output_bytes),
        )?;
        let status = child.wait().await.map_err(Interrupt::Io)?;
        Ok::<_, Interrupt>((status, out, err))
    };

    let result = timeout(limit, supervised).await;
    match result {
        Ok(Ok((status, out, err))) => Ok(ProcessOutcome::Completed(ProcessOutput {
            status,
            stdout: String::from_utf8_lossy(&out).into_owned(),
            stderr: String::from_utf8_lossy(&err).into_owned(),
        })),
        Ok(Err(Interrupt::OutputLimit)) => {
            reap(&mut child).await;
            Ok(ProcessOutcome::OutputLimitExceeded {
                limit: max_output_bytes,
            })
        }
        Ok(Err(Interrupt::Io(e))) => {
            reap(&mut child).await;
            Err(e)
        }
        Err(_) => {
            reap(&mut child).await;
            Ok(ProcessOutcome::TimedOut { limit })
        }
    }
}

async fn reap(child: &mut tokio::process::Child) {
    if let Err(e) = child.kill().await {
        tracing::warn!(error = %e, "failed to kill supervised process");
    }
}

async fn read_capped<R>(mut reader: R, cap: usize) -> Result<Vec<u8>, Interrupt>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await.map_err(Interrupt::Io)?;
        if n == 0 {
            return Ok(buf);
        }
        if buf.len() + n > cap {
            return Err(Interrupt::OutputLimit);
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}
