//! Termination signal handling.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancel `token` when `signal` completes.
///
/// Returns without cancelling if the token is cancelled elsewhere first.
pub async fn cancel_on<F>(token: CancellationToken, signal: F)
where
    F: Future<Output = ()>,
{
    tokio::select! {
        _ = signal => {
            info!("Shutdown signal received, stopping");
            token.cancel();
        }
        _ = token.cancelled() => {}
    }
}

/// Cancel `token` on `first`, then call `force` if `second` completes while
/// shutdown is still in progress.
pub async fn escalate_on<F, G, X>(token: CancellationToken, first: F, second: G, force: X)
where
    F: Future<Output = ()>,
    G: Future<Output = ()>,
    X: FnOnce(),
{
    cancel_on(token, first).await;
    second.await;
    warn!("Second shutdown signal received, exiting immediately");
    force();
}

/// Spawn a task that cancels `token` on the first SIGINT or SIGTERM.
///
/// The signal handlers stay installed after that, so a second signal exits
/// the process with status 130 instead of waiting for a stuck shutdown.
pub fn spawn_signal_handler(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(escalate_on(
        token,
        termination_signal(),
        termination_signal(),
        || std::process::exit(130),
    ))
}

async fn termination_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_signal_cancels_token() {
        let token = CancellationToken::new();
        let (tx, rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(cancel_on(token.clone(), async {
            let _ = rx.await;
        }));
        assert!(!token.is_cancelled());

        tx.send(()).unwrap();
        handle.await.unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_returns_when_cancelled_elsewhere() {
        let token = CancellationToken::new();
        let handle = tokio::spawn(cancel_on(token.clone(), std::future::pending()));

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_spawned_handler_outlives_cancel() {
        let token = CancellationToken::new();
        let handle = spawn_signal_handler(token.clone());
        token.cancel();

        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        // Still listening for a second signal
        assert!(!handle.is_finished());
        handle.abort();
    }

    #[tokio::test]
    async fn test_second_signal_forces_exit() {
        let token = CancellationToken::new();
        let forced = Arc::new(AtomicBool::new(false));
        let (first_tx, first_rx) = oneshot::channel::<()>();
        let (second_tx, second_rx) = oneshot::channel::<()>();

        let flag = Arc::clone(&forced);
        let handle = tokio::spawn(escalate_on(
            token.clone(),
            async move {
                let _ = first_rx.await;
            },
            async move {
                let _ = second_rx.await;
            },
            move || flag.store(true, Ordering::SeqCst),
        ));

        first_tx.send(()).unwrap();
        token.cancelled().await;
        assert!(!forced.load(Ordering::SeqCst));

        second_tx.send(()).unwrap();
        handle.await.unwrap();
        assert!(forced.load(Ordering::SeqCst));
    }
}
