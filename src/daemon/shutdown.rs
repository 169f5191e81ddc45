use tokio::select;
use tokio_util::sync::CancellationToken;

/// Waits for a termination signal and trips the shared cancellation token.
/// SIGTERM matters here because `sidekick stop` terminates the daemon that
/// way; the socket file only gets cleaned up on a cooperative shutdown.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(terminate) => terminate,
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler {e:?}");
                let _ = tokio::signal::ctrl_c().await;
                cancelation.cancel();
                return;
            }
        };

        select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = terminate.recv() => {},
        };
        cancelation.cancel();
    }
    #[cfg(not(unix))]
    {
        select! {
            _ = tokio::signal::ctrl_c() => {
                cancelation.cancel();
            },
        };
    }
}
