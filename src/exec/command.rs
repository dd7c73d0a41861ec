// src/exec/command.rs

//! Work items that run a shell command.

use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::cancel::Cancelled;
use crate::work::{WorkContext, WorkItem};

/// Work item that runs `cmd` through the platform shell.
///
/// - The child's stdout is inherited, so task output goes straight to the
///   terminal; stderr is forwarded line by line into the log.
/// - A non-zero exit status fails the task.
/// - If the generation's signal fires, the child is killed and the task is
///   recorded as cancelled.
pub fn shell_command(cmd: impl Into<String>) -> WorkItem<()> {
    let cmd = cmd.into();
    WorkItem::from_async(move |ctx| async move { run_command(&ctx, &cmd).await })
}

fn shell(cmd: &str) -> Command {
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

async fn run_command(ctx: &WorkContext, cmd: &str) -> Result<()> {
    info!(task = %ctx.title(), cmd = %cmd, "starting task process");

    let mut command = shell(cmd);
    command
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .with_context(|| format!("spawning process for task '{}'", ctx.title()))?;

    if let Some(stderr) = child.stderr.take() {
        let task_name = ctx.title().to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(task = %task_name, "stderr: {}", line);
            }
        });
    }

    tokio::select! {
        status = child.wait() => {
            let status = status
                .with_context(|| format!("waiting for process of task '{}'", ctx.title()))?;
            let code = status.code().unwrap_or(-1);

            info!(
                task = %ctx.title(),
                exit_code = code,
                success = status.success(),
                "task process exited"
            );

            if !status.success() {
                bail!("command `{cmd}` exited with status {code}");
            }
            Ok(())
        }

        _ = ctx.cancelled() => {
            info!(task = %ctx.title(), "cancellation requested; killing process");
            if let Err(e) = child.kill().await {
                warn!(task = %ctx.title(), error = %e, "failed to kill child process on cancellation");
            } else {
                debug!(task = %ctx.title(), "child process killed");
            }
            Err(Cancelled.into())
        }
    }
}
