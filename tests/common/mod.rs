//! Test helpers: a minimal in-process HTTP configuration service.
//!
//! Serves canned JSON responses from a route table and counts hits per
//! route, which lets tests assert how many network reads an operation
//! actually issued. Each response carries `Connection: close`, so every
//! client request is one TCP connection and one counted hit.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::Value;

#[derive(Clone)]
struct StoredResponse {
    status: u16,
    body: String,
}

#[derive(Default)]
struct State {
    routes: Mutex<HashMap<String, StoredResponse>>,
    hits: Mutex<HashMap<String, usize>>,
}

/// In-process stand-in for the remote configuration service.
pub struct MockConfigService {
    addr: SocketAddr,
    state: Arc<State>,
}

impl MockConfigService {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock service");
        let addr = listener.local_addr().expect("local addr");
        let state = Arc::new(State::default());

        let server_state = state.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let state = server_state.clone();
                thread::spawn(move || handle_connection(stream, state));
            }
        });

        Self { addr, state }
    }

    /// Base URL including the `/api` prefix, as a client would configure it.
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Install or replace the response for a method + service path.
    pub fn set_response(&self, method: &str, path: &str, status: u16, body: &Value) {
        let key = route_key(method, path);
        self.state.routes.lock().unwrap().insert(
            key,
            StoredResponse {
                status,
                body: body.to_string(),
            },
        );
    }

    pub fn set_config(&self, name: &str, body: &Value) {
        self.set_response("GET", &format!("config/{name}"), 200, body);
    }

    pub fn set_schema(&self, name: &str, body: &Value) {
        self.set_response("GET", &format!("schemas/{name}"), 200, body);
    }

    pub fn set_update_response(&self, name: &str, body: &Value) {
        self.set_response("PUT", &format!("config/{name}"), 200, body);
    }

    pub fn set_patch_response(&self, name: &str, body: &Value) {
        self.set_response("PATCH", &format!("config/{name}"), 200, body);
    }

    pub fn set_crud(&self, name: &str, body: &Value) {
        self.set_response("GET", &format!("crud/{name}"), 200, body);
    }

    /// Number of requests served for a method + service path.
    pub fn hits(&self, method: &str, path: &str) -> usize {
        let key = route_key(method, path);
        *self.state.hits.lock().unwrap().get(&key).unwrap_or(&0)
    }
}

fn route_key(method: &str, path: &str) -> String {
    format!("{} /api/{}", method, path.trim_start_matches('/'))
}

fn handle_connection(stream: TcpStream, state: Arc<State>) {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(path)) = (parts.next(), parts.next()) else {
        return;
    };
    let key = format!("{} {}", method, path);

    // Drain headers, honoring Content-Length so the request body is consumed
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => return,
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    break;
                }
                if let Some(value) = line
                    .to_ascii_lowercase()
                    .strip_prefix("content-length:")
                    .map(str::trim)
                {
                    content_length = value.parse().unwrap_or(0);
                }
            }
            Err(_) => return,
        }
    }
    if content_length > 0 {
        let mut body = vec![0u8; content_length];
        if reader.read_exact(&mut body).is_err() {
            return;
        }
    }

    *state.hits.lock().unwrap().entry(key.clone()).or_insert(0) += 1;

    let response = state
        .routes
        .lock()
        .unwrap()
        .get(&key)
        .cloned()
        .unwrap_or(StoredResponse {
            status: 404,
            body: r#"{"error":"not found"}"#.to_string(),
        });

    let reason = match response.status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    };
    let payload = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.status,
        reason,
        response.body.len(),
        response.body
    );
    let mut stream = reader.into_inner();
    let _ = stream.write_all(payload.as_bytes());
    let _ = stream.flush();
}
