use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Ok,
    Failed,
    /// Conventional SIGINT status, also used when a batch stopped early.
    Interrupted,
}

impl ExitStatus {
    pub fn after_run(batch_cancelled: bool, cancel: &CancellationToken) -> Self {
        if batch_cancelled || cancel.is_cancelled() {
            ExitStatus::Interrupted
        } else {
            ExitStatus::Ok
        }
    }

    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Ok => 0,
            ExitStatus::Failed => 1,
            ExitStatus::Interrupted => 130,
        }
    }
}

/// Token cancelled by the first SIGINT or SIGTERM.
pub fn cancel_on_signal() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        let name = wait_for_signal().await;
        info!(signal = name, "Cancelling batch");
        trigger.cancel();
    });
    cancel
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use signal::unix::{SignalKind, signal as unix_signal};

    match unix_signal(SignalKind::terminate()) {
        Ok(mut terminate) => tokio::select! {
            _ = ctrl_c() => "SIGINT",
            _ = terminate.recv() => "SIGTERM",
        },
        Err(e) => {
            warn!(error = %e, "SIGTERM handler unavailable");
            ctrl_c().await;
            "SIGINT"
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    ctrl_c().await;
    "Ctrl+C"
}

async fn ctrl_c() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "SIGINT handler unavailable");
        std::future::pending::<()>().await;
    }
}
