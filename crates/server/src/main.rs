use std::future::IntoFuture;

use anyhow::{Context, Error as AnyhowError};
use db::ConnectionTrait;
use deployment::{Deployment, DeploymentError};
use server::{DeploymentImpl, http};
use strip_ansi_escapes::strip;
use thiserror::Error;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, prelude::*};

const GRACEFUL_SHUTDOWN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);
const CLEANUP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum KanbanError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error(transparent)]
    Other(#[from] AnyhowError),
}

#[tokio::main]
async fn main() -> Result<(), KanbanError> {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_string = format!(
        "warn,server={level},services={level},db={level},deployment={level},local_deployment={level},utils={level},tower_http={level}",
        level = log_level
    );
    let env_filter = EnvFilter::try_new(filter_string).context("invalid RUST_LOG filter")?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    let deployment = DeploymentImpl::new().await?;
    let config = deployment.config().read().await.clone();

    let app_router = http::router(deployment.clone()).layer(http::cors_layer(&config.cors_origins));

    let port = resolve_port(
        std::env::var("BACKEND_PORT")
            .or_else(|_| std::env::var("PORT"))
            .ok(),
        config.port,
    );
    let host = std::env::var("HOST")
        .ok()
        .map(|host| host.trim().to_string())
        .filter(|host| !host.is_empty())
        .unwrap_or(config.host);

    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}"))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))?;
    let actual_port = listener.local_addr()?.port();

    tracing::info!("Server running on http://{host}:{actual_port}");

    let (shutdown_rx, force_exit_rx) = spawn_shutdown_watchers();

    let server = axum::serve(listener, app_router)
        .with_graceful_shutdown(wait_for_watch_true(shutdown_rx.clone()))
        .into_future();
    tokio::pin!(server);

    let serve_result = tokio::select! {
        res = &mut server => res,
        _ = wait_for_watch_true(force_exit_rx.clone()) => {
            tracing::warn!("Aborting before connections finished draining");
            std::process::exit(130);
        }
        _ = shutdown_deadline(shutdown_rx.clone(), GRACEFUL_SHUTDOWN_TIMEOUT) => {
            tracing::warn!(
                "Connections still open after {:?}, aborting",
                GRACEFUL_SHUTDOWN_TIMEOUT
            );
            std::process::exit(130);
        }
    };

    serve_result?;

    tokio::select! {
        _ = perform_cleanup_actions(&deployment) => {}
        _ = wait_for_watch_true(force_exit_rx.clone()) => {
            tracing::warn!("Aborting during cleanup");
            std::process::exit(130);
        }
        _ = tokio::time::sleep(CLEANUP_TIMEOUT) => {
            tracing::warn!("Cleanup still running after {:?}, aborting", CLEANUP_TIMEOUT);
            std::process::exit(130);
        }
    }

    Ok(())
}

/// Port from the environment when it parses, else the configured one. `0`
/// lets the OS pick a free port.
fn resolve_port(env_value: Option<String>, configured: u16) -> u16 {
    env_value
        .and_then(|raw| {
            // remove any ANSI codes some launchers wrap around the value
            let cleaned = String::from_utf8_lossy(&strip(raw.as_bytes())).into_owned();
            cleaned.trim().parse::<u16>().ok()
        })
        .unwrap_or_else(|| {
            if configured == 0 {
                tracing::info!("No PORT set, using port 0 for auto-assignment");
            }
            configured
        })
}

pub async fn perform_cleanup_actions(deployment: &DeploymentImpl) {
    // Fold the WAL back into the main file so a copied database is complete.
    if let Err(e) = deployment
        .db()
        .pool
        .execute_unprepared("PRAGMA wal_checkpoint(TRUNCATE);")
        .await
    {
        tracing::warn!("Failed to checkpoint database: {e}");
    }
}

/// Watches for stop signals. The first one flips the returned `drain` flag so
/// the server stops accepting connections; a second one flips `abort`.
fn spawn_shutdown_watchers() -> (watch::Receiver<bool>, watch::Receiver<bool>) {
    let (drain_tx, drain_rx) = watch::channel(false);
    let (abort_tx, abort_rx) = watch::channel(false);

    tokio::spawn(async move {
        let Some(mut signals) = StopSignals::install() else {
            return;
        };

        signals.next().await;
        tracing::info!("Stop requested, draining connections (signal again to abort)");
        let _ = drain_tx.send(true);

        signals.next().await;
        tracing::warn!("Stop requested twice, aborting");
        let _ = abort_tx.send(true);
    });

    (drain_rx, abort_rx)
}

/// SIGINT or SIGTERM on unix, Ctrl+C elsewhere.
struct StopSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: Option<tokio::signal::unix::Signal>,
}

impl StopSignals {
    #[cfg(unix)]
    fn install() -> Option<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        let interrupt = signal(SignalKind::interrupt())
            .inspect_err(|e| tracing::error!("Cannot listen for SIGINT: {e}"))
            .ok()?;
        // Without SIGTERM we still stop on SIGINT.
        let terminate = signal(SignalKind::terminate())
            .inspect_err(|e| tracing::error!("Cannot listen for SIGTERM: {e}"))
            .ok();

        Some(Self {
            interrupt,
            terminate,
        })
    }

    #[cfg(not(unix))]
    fn install() -> Option<Self> {
        Some(Self {})
    }

    #[cfg(unix)]
    async fn next(&mut self) {
        let Self {
            interrupt,
            terminate,
        } = self;
        let terminate = async {
            match terminate.as_mut() {
                Some(sig) => {
                    sig.recv().await;
                }
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            _ = interrupt.recv() => {}
            _ = terminate => {}
        }
    }

    #[cfg(not(unix))]
    async fn next(&mut self) {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Cannot listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    }
}

/// Resolves once the flag reads `true`. A dropped sender never resolves.
async fn wait_for_watch_true(mut rx: watch::Receiver<bool>) {
    let sender_dropped = rx.wait_for(|flag| *flag).await.is_err();
    if sender_dropped {
        std::future::pending::<()>().await;
    }
}

/// Fires `grace` after draining starts.
async fn shutdown_deadline(rx: watch::Receiver<bool>, grace: std::time::Duration) {
    wait_for_watch_true(rx).await;
    tokio::time::sleep(grace).await;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::watch;

    use super::{resolve_port, wait_for_watch_true};

    #[test]
    fn port_env_wins_and_ansi_codes_are_stripped() {
        assert_eq!(resolve_port(Some("4310".to_string()), 0), 4310);
        assert_eq!(resolve_port(Some("\u{1b}[32m4311\u{1b}[0m\n".to_string()), 0), 4311);
    }

    #[test]
    fn unparsable_or_missing_port_falls_back_to_config() {
        assert_eq!(resolve_port(Some("http".to_string()), 8080), 8080);
        assert_eq!(resolve_port(None, 8080), 8080);
        assert_eq!(resolve_port(None, 0), 0);
    }

    #[tokio::test]
    async fn watch_resolves_once_flag_flips() {
        let (tx, rx) = watch::channel(false);
        let waiter = tokio::spawn(wait_for_watch_true(rx));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn dropped_sender_never_resolves() {
        let (tx, rx) = watch::channel(false);
        drop(tx);

        let waited = tokio::time::timeout(Duration::from_millis(20), wait_for_watch_true(rx)).await;
        assert!(waited.is_err());
    }
}
