// HTTP commit/fetch server for the playback client.
//
// Architecture: one background thread owns the `tiny_http::Server` and polls
// it with `recv_timeout`, checking a `keep_running` flag between polls. The
// pending payload lives in a `PendingSlot` shared with the `ServerHandle`;
// the foreground commits into it, the server thread drains it on GET.
//
// Routes (any path):
// - GET: the pending payload as JSON, clearing it; `{}` when nothing is
//   pending.
// - HEAD: the same headers, no body, payload left in place.
// - OPTIONS: 204 for CORS preflight.
// - anything else: 405.
//
// Every response is JSON-typed and allows any origin, since the playback
// client is a browser page served from elsewhere.
//
// Shutdown: `ServerHandle::stop` clears the flag and joins the thread, which
// exits within one poll interval.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use bayz_protocol::{DEFAULT_PORT, Deployment, EMPTY_BODY};
use serde::{Deserialize, Serialize};
use tiny_http::{Header, Method, Request, Response, Server};

use crate::channel::PendingSlot;

/// Configuration for starting the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen port; 0 lets the OS pick one.
    pub port: u16,
    pub bind_address: String,
    /// How often the server thread checks for shutdown.
    pub poll_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_address: "127.0.0.1".into(),
            poll_interval_ms: 50,
        }
    }
}

type SharedSlot = Arc<Mutex<PendingSlot>>;

fn lock(slot: &SharedSlot) -> MutexGuard<'_, PendingSlot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle returned by `start_server` to commit payloads and stop the server.
pub struct ServerHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
    slot: SharedSlot,
}

impl ServerHandle {
    /// Make `deployment` the payload for the next fetch, replacing any
    /// payload not yet fetched.
    pub fn commit(&self, deployment: Deployment) {
        let lines = deployment.sound.len();
        if lock(&self.slot).commit(deployment).is_some() {
            tracing::debug!("replaced a payload that was never fetched");
        }
        tracing::info!(lines, "committed payload");
    }

    /// Whether a committed payload is waiting for a fetch.
    pub fn is_pending(&self) -> bool {
        lock(&self.slot).is_pending()
    }

    /// Signal the server to stop and wait for it to shut down.
    pub fn stop(self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread {
            let _ = handle.join();
        }
        tracing::info!("server stopped");
    }
}

/// Start the server on a background thread. Returns a handle and the bound
/// address (useful when port 0 is used).
pub fn start_server(config: ServerConfig) -> io::Result<(ServerHandle, SocketAddr)> {
    let server = Server::http(format!("{}:{}", config.bind_address, config.port))
        .map_err(io::Error::other)?;
    let addr = server
        .server_addr()
        .to_ip()
        .ok_or_else(|| io::Error::other("server is not bound to an IP address"))?;
    let keep_running = Arc::new(AtomicBool::new(true));
    let slot = SharedSlot::default();

    let thread = {
        let keep_running = keep_running.clone();
        let slot = slot.clone();
        let poll = Duration::from_millis(config.poll_interval_ms.max(1));
        thread::spawn(move || run_server(server, slot, keep_running, poll))
    };
    tracing::info!(%addr, "bayz server listening");

    Ok((
        ServerHandle {
            keep_running,
            thread: Some(thread),
            slot,
        },
        addr,
    ))
}

/// Server loop. Runs until `keep_running` is set to false.
fn run_server(server: Server, slot: SharedSlot, keep_running: Arc<AtomicBool>, poll: Duration) {
    while keep_running.load(Ordering::SeqCst) {
        match server.recv_timeout(poll) {
            Ok(Some(request)) => handle_request(request, &slot),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "failed to receive request");
                break;
            }
        }
    }
}

fn header(name: &str, value: &str) -> Option<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
}

/// Content type and CORS headers carried by every response.
fn common_headers() -> Vec<Header> {
    [
        header("Content-Type", "application/json; charset=utf-8"),
        header("Access-Control-Allow-Origin", "*"),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn json_response(status: u16, body: String) -> Response<io::Cursor<Vec<u8>>> {
    common_headers()
        .into_iter()
        .fold(Response::from_string(body).with_status_code(status), |r, h| {
            r.with_header(h)
        })
}

fn handle_request(request: Request, slot: &SharedSlot) {
    let method = request.method().clone();
    tracing::debug!(%method, url = request.url(), "request");

    let response = match method {
        Method::Get => json_response(200, fetch_body(|s| s.take(), slot)),
        // tiny_http leaves the body out of HEAD responses but keeps the
        // Content-Length of what a GET would return.
        Method::Head => json_response(
            200,
            fetch_body(|s| s.peek().cloned().into(), slot),
        ),
        Method::Options => {
            let mut response = json_response(204, String::new());
            for h in [
                header("Access-Control-Allow-Methods", "GET, HEAD, OPTIONS"),
                header("Access-Control-Allow-Headers", "*"),
            ]
            .into_iter()
            .flatten()
            {
                response.add_header(h);
            }
            response
        }
        _ => {
            let mut response = json_response(405, EMPTY_BODY.to_string());
            if let Some(h) = header("Allow", "GET, HEAD, OPTIONS") {
                response.add_header(h);
            }
            response
        }
    };

    if let Err(e) = request.respond(response) {
        tracing::warn!(error = %e, "failed to send response");
    }
}

/// Serialize whatever `read` pulls out of the slot.
fn fetch_body(
    read: impl FnOnce(&mut PendingSlot) -> bayz_protocol::FetchResponse,
    slot: &SharedSlot,
) -> String {
    let response = read(&mut lock(slot));
    serde_json::to_string(&response).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to serialize payload");
        EMPTY_BODY.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_the_well_known_port() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 42700);
        assert_eq!(config.bind_address, "127.0.0.1");
    }

    #[test]
    fn config_from_partial_json() {
        let config: ServerConfig = serde_json::from_str(r#"{ "port": 0 }"#).unwrap();
        assert_eq!(config.port, 0);
        assert_eq!(config.poll_interval_ms, 50);
    }

    #[test]
    fn every_response_carries_cors_and_json_headers() {
        let headers = common_headers();
        assert_eq!(headers.len(), 2);
        assert!(headers.iter().any(|h| h.field.equiv("Access-Control-Allow-Origin")
            && h.value.as_str() == "*"));
        assert!(headers.iter().any(|h| h.field.equiv("Content-Type")));
    }

    #[test]
    fn take_body_drains_and_peek_body_keeps() {
        use bayz_protocol::SoundLine;
        let slot = SharedSlot::default();
        assert_eq!(fetch_body(|s| s.take(), &slot), "{}");

        lock(&slot).commit(Deployment::new(
            2.0,
            vec![SoundLine::new("sine", vec![60], vec![1])],
        ));
        let peeked = fetch_body(|s| s.peek().cloned().into(), &slot);
        assert!(lock(&slot).is_pending());
        let taken = fetch_body(|s| s.take(), &slot);
        assert_eq!(peeked, taken);
        assert!(!lock(&slot).is_pending());
        assert_eq!(fetch_body(|s| s.take(), &slot), "{}");
    }
}
