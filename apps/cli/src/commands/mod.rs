//! Command implementations for the Sitewright CLI.

pub mod plan;
pub mod render;
pub mod resume;
pub mod run;
pub mod status;
pub mod types;

use colored::Colorize;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// A token cancelled on the first Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if let Ok(()) = signal::ctrl_c().await {
            eprintln!("{}", "Interrupted, saving progress...".yellow());
            trigger.cancel();
        }
    });
    token
}
