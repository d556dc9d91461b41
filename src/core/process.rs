//! Process execution utilities with timeout support
//!
//! yt-dlp is spawned with `kill_on_drop`, so a timed-out child is killed
//! when its future is dropped instead of lingering in the background.

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use crate::download::error::{summarize_stderr, FetchError};

/// Run an async Command with a timeout.
///
/// Returns the process Output (whatever its exit status), or a FetchError on
/// timeout or spawn failure.
pub async fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<Output, FetchError> {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(FetchError::Spawn(e.to_string())),
        Err(_) => Err(FetchError::Timeout {
            secs: timeout.as_secs(),
        }),
    }
}

/// Like [`run_with_timeout`] but treats a non-zero exit as [`FetchError::Tool`]
/// and returns stdout as text.
pub async fn run_for_stdout(cmd: &mut Command, timeout: Duration) -> Result<String, FetchError> {
    let output = run_with_timeout(cmd, timeout).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(FetchError::Tool(summarize_stderr(&stderr)));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
