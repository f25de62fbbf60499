// Server loop module
// Accepts connections until shutdown is signalled

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Run the accept loop
///
/// Once `shutdown` fires no new connection is accepted. The call returns
/// after the open connections finish, or after the request timeout when
/// one is configured.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: Arc<Notify>,
) -> std::io::Result<()> {
    let active_connections = Arc::new(AtomicUsize::new(0));

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            () = shutdown.notified() => break,
        }
    }

    logger::log_shutdown();
    drop(listener);
    let limit = state.config.performance.request_timeout;
    let deadline = (limit > 0).then(|| Duration::from_secs(limit));
    wait_for_drain(&active_connections, deadline).await;
    Ok(())
}

/// Wait until no connection is open; returns whether that happened
async fn wait_for_drain(active: &AtomicUsize, deadline: Option<Duration>) -> bool {
    let drained = async {
        while active.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(DRAIN_POLL).await;
        }
    };

    match deadline {
        Some(limit) => {
            if tokio::time::timeout(limit, drained).await.is_err() {
                let open = active.load(Ordering::SeqCst);
                logger::log_warning(&format!("{open} connections still open at shutdown"));
                return false;
            }
            true
        }
        None => {
            drained.await;
            true
        }
    }
}
