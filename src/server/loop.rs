// Server loop module
// Accepts connections until shutdown is requested

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Upper bound on waiting for in-flight connections after shutdown
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll interval while draining
const DRAIN_POLL: Duration = Duration::from_millis(20);

/// Accept connections on `listener` until `state.shutdown` is notified.
///
/// Must run inside a `LocalSet`; each connection is a local task. After
/// shutdown the listener is closed and in-flight connections get up to
/// `DRAIN_TIMEOUT` to finish before this returns.
#[allow(clippy::ignored_unit_patterns)]
pub async fn run(listener: TcpListener, state: Arc<AppState>) {
    let active_connections = Arc::new(AtomicUsize::new(0));
    let shutdown = Arc::clone(&state.shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            _ = shutdown.notified() => {
                logger::log_shutdown();
                break;
            }
        }
    }

    drop(listener);
    drain(&active_connections).await;
}

/// Wait for the active connection count to reach zero, bounded by `DRAIN_TIMEOUT`
async fn drain(active_connections: &AtomicUsize) {
    let idle = async {
        while active_connections.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(DRAIN_POLL).await;
        }
    };

    if tokio::time::timeout(DRAIN_TIMEOUT, idle).await.is_err() {
        logger::log_warning(&format!(
            "{} connection(s) still open after {}s, closing",
            active_connections.load(Ordering::SeqCst),
            DRAIN_TIMEOUT.as_secs()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::fixtures::catalogue_json;
    use crate::config::Config;
    use crate::fallback::{JsonDb, RewriteRules};
    use crate::server::create_listener;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_serves_over_tcp_and_shuts_down() {
        let dir = tempfile::tempdir().unwrap();
        let catalogue = dir.path().join("pokemon.json");
        std::fs::write(&catalogue, catalogue_json().to_string()).unwrap();

        let mut config = Config::build("/nonexistent/pokedex-config", None).unwrap();
        config.data.catalogue_file = catalogue.to_string_lossy().into_owned();
        config.logging.access_log = false;

        let state = Arc::new(AppState::new(
            &config,
            RewriteRules::default(),
            JsonDb::from_value(serde_json::json!({})),
        ));
        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();

        let local = tokio::task::LocalSet::new();
        local
            .run_until(async move {
                let server = tokio::task::spawn_local(run(listener, Arc::clone(&state)));

                let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
                stream
                    .write_all(
                        b"GET /t/pokemon-detail?pokemonId=25 HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
                    )
                    .await
                    .unwrap();
                let mut raw = String::new();
                stream.read_to_string(&mut raw).await.unwrap();

                assert!(raw.starts_with("HTTP/1.1 200 OK"), "{raw}");
                assert!(raw.to_ascii_lowercase().contains("access-control-allow-origin: *"));
                assert!(raw.contains("pikachu"));

                state.shutdown.notify_one();
                server.await.unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_in_flight_connection() {
        let dir = tempfile::tempdir().unwrap();
        let catalogue = dir.path().join("pokemon.json");
        std::fs::write(&catalogue, catalogue_json().to_string()).unwrap();

        let mut config = Config::build("/nonexistent/pokedex-config", None).unwrap();
        config.data.catalogue_file = catalogue.to_string_lossy().into_owned();
        config.logging.access_log = false;

        let state = Arc::new(AppState::new(
            &config,
            RewriteRules::default(),
            JsonDb::from_value(serde_json::json!({})),
        ));
        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();

        let local = tokio::task::LocalSet::new();
        local
            .run_until(async move {
                let server = tokio::task::spawn_local(run(listener, Arc::clone(&state)));

                // Connection accepted, request not yet sent
                let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
                tokio::time::sleep(Duration::from_millis(100)).await;

                state.shutdown.notify_one();
                tokio::time::sleep(Duration::from_millis(100)).await;
                assert!(!server.is_finished());

                stream
                    .write_all(
                        b"GET /t/pokemon-list HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
                    )
                    .await
                    .unwrap();
                let mut raw = String::new();
                stream.read_to_string(&mut raw).await.unwrap();
                assert!(raw.starts_with("HTTP/1.1 200 OK"), "{raw}");

                tokio::time::timeout(Duration::from_secs(2), server)
                    .await
                    .unwrap()
                    .unwrap();
            })
            .await;
    }
}
