// Connection handling module
// Accepts a single TCP connection and serves it over HTTP/1.1

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;

use super::service::handle_request;
use crate::config::AppState;
use crate::logger;

/// Admit a connection unless the configured limit is reached
///
/// Returns whether the connection was admitted.
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
) -> bool {
    // Increment first, then check, so concurrent accepts cannot both slip in
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection from {peer_addr} rejected."
            ));
            drop(stream);
            return false;
        }
    }

    handle_connection(stream, peer_addr, Arc::clone(state), Arc::clone(conn_counter));
    true
}

/// Serve a connection in a spawned task, releasing its slot when done
fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    conn_counter: Arc<AtomicUsize>,
) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);
        let performance = &state.config.performance;
        let timeout_secs = performance.request_timeout;

        let mut builder = http1::Builder::new();
        builder.keep_alive(performance.keep_alive);

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| handle_request(req, Arc::clone(&service_state), peer_addr)),
        );

        if timeout_secs == 0 {
            if let Err(err) = conn.await {
                logger::log_connection_error(&err);
            }
        } else {
            match tokio::time::timeout(Duration::from_secs(timeout_secs), conn).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => logger::log_connection_error(&err),
                Err(_) => logger::log_warning(&format!(
                    "Connection from {peer_addr} timed out after {timeout_secs} seconds"
                )),
            }
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}
