#![forbid(unsafe_code)]

use anyhow::Context;

/// Detach from the controlling terminal and continue in the background.
///
/// Standard streams are redirected to `/dev/null` and the working directory
/// changes to `/`. Must be called before any thread, including the async
/// runtime, is started.
pub fn daemonize() -> anyhow::Result<()> {
    nix::unistd::daemon(false, false).context("failed to fork into background")?;
    Ok(())
}
