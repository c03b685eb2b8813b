// Connection handling module
// Accepts a single TCP connection and serves it on a spawned task

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;

use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Accept a connection, enforcing `max_connections`.
///
/// The counter is incremented before the limit check so concurrent accepts
/// cannot both slip under the limit.
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
) {
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
            ));
            drop(stream);
            return;
        }
    }

    if state.config.logging.access_log {
        logger::log_connection_accepted(&peer_addr);
    }

    handle_connection(stream, peer_addr, Arc::clone(state), Arc::clone(conn_counter));
}

/// Serve one connection with HTTP/1.1 and decrement the counter when done
fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    conn_counter: Arc<AtomicUsize>,
) {
    tokio::spawn(async move {
        if let Err(e) = stream.set_nodelay(true) {
            logger::log_warning(&format!("Failed to set TCP_NODELAY for {peer_addr}: {e}"));
        }
        let io = TokioIo::new(stream);

        let performance = &state.config.performance;

        // Bounds the wait for each request head, idle keep-alive included.
        // A response in progress is not cut off.
        let mut builder = http1::Builder::new();
        builder.timer(TokioTimer::new());
        if performance.read_timeout > 0 {
            builder.header_read_timeout(Duration::from_secs(performance.read_timeout));
        }
        builder.keep_alive(performance.keep_alive_timeout > 0);

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| handler::handle_request(req, Arc::clone(&service_state), peer_addr)),
        );

        if let Err(err) = conn.await {
            logger::log_connection_error(&err);
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::server::create_listener;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_busy_connection_outlives_read_timeout() {
        let root = tempfile::tempdir().unwrap();
        let mut config = test_config(root.path().to_str().unwrap());
        config.performance.read_timeout = 1;
        let state = Arc::new(AppState::new(&config).unwrap());
        let counter = Arc::new(AtomicUsize::new(0));

        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let server_counter = Arc::clone(&counter);
        tokio::spawn(async move {
            let (stream, peer) = listener.accept().await.unwrap();
            accept_connection(stream, peer, &state, &server_counter);
        });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let keep = b"GET /missing HTTP/1.1\r\nHost: localhost\r\n\r\n";
        stream.write_all(keep).await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        stream.write_all(keep).await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        stream
            .write_all(b"GET /missing HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert_eq!(response.matches("HTTP/1.1 404").count(), 3);
    }

    #[tokio::test]
    async fn test_connection_limit_rejects() {
        let root = tempfile::tempdir().unwrap();
        let mut config = test_config(root.path().to_str().unwrap());
        config.performance.max_connections = Some(1);
        let state = Arc::new(AppState::new(&config).unwrap());
        let counter = Arc::new(AtomicUsize::new(1));

        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let client = tokio::spawn(TcpStream::connect(addr));
        let (stream, peer) = listener.accept().await.unwrap();
        accept_connection(stream, peer, &state, &counter);

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        let mut stream = client.await.unwrap().unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        assert!(buf.is_empty());
    }
}
