// src/exec/command.rs

use std::path::Path;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Build a shell command appropriate for the platform.
pub fn shell_command(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

/// Run `cmd` in `cwd` with `input` on stdin and return its stdout.
///
/// A non-zero exit is an error carrying the command's stderr.
pub async fn pipe_through(cmd: &str, input: &[u8], cwd: &Path) -> Result<Vec<u8>> {
    debug!(cmd = %cmd, bytes = input.len(), "piping through external command");

    let mut child = shell_command(cmd)
        .current_dir(cwd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("spawning '{cmd}'"))?;

    // Feed stdin concurrently so a command that writes before reading
    // everything cannot deadlock on a full pipe.
    let writer = child.stdin.take().map(|mut stdin| {
        let input = input.to_vec();
        tokio::spawn(async move {
            let res = stdin.write_all(&input).await;
            drop(stdin);
            res
        })
    });

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("waiting for '{cmd}'"))?;

    if let Some(writer) = writer {
        // A command may legitimately exit without reading all of stdin.
        if let Ok(Err(e)) = writer.await {
            debug!(cmd = %cmd, error = %e, "stdin closed early");
        }
    }

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("'{cmd}' exited with status {code}: {}", stderr.trim());
    }

    Ok(output.stdout)
}
