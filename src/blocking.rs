//! Synchronous configuration client.
//!
//! Same contract as [`crate::client::AsyncConfigClient`], scheduled
//! differently: each watch runs on its own background thread and network
//! calls block that thread. Cancellation rides the watcher's mpsc channel so
//! a stop request also interrupts the inter-cycle wait.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;

use crate::cache::{CacheStats, ConfigCache};
use crate::client::lock;
use crate::config::ClientConfig;
use crate::document::{canonical_form, merge_documents};
use crate::error::{Result, SdkError};
use crate::schema::{SchemaRegistry, ValidationOutcome};
use crate::watch::{CancelSignal, WatchHandle, WatcherTable};

struct ThreadSignal {
    stop: mpsc::Sender<()>,
}

impl CancelSignal for ThreadSignal {
    fn cancel(&self) {
        // The watcher may have exited already; a dead receiver is fine
        let _ = self.stop.send(());
    }
}

struct Shared {
    http: reqwest::blocking::Client,
    config: ClientConfig,
    cache: Mutex<ConfigCache>,
    schemas: Mutex<SchemaRegistry>,
    watchers: Mutex<WatcherTable<ThreadSignal>>,
    closed: AtomicBool,
}

impl Shared {
    fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = self.config.endpoint(path);
        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(SdkError::HttpStatus {
                url,
                status: status.as_u16(),
                message: format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            });
        }

        Ok(response.json::<Value>()?)
    }

    fn fetch_config(&self, name: &str) -> Result<Value> {
        self.request(Method::GET, &format!("config/{name}"), None)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(SdkError::Closed)
        } else {
            Ok(())
        }
    }
}

/// Synchronous (thread-based) configuration client.
pub struct ConfigClient {
    shared: Arc<Shared>,
}

impl ConfigClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .default_headers(config.header_map()?)
            .build()?;

        Ok(Self {
            shared: Arc::new(Shared {
                http,
                config,
                cache: Mutex::new(ConfigCache::new()),
                schemas: Mutex::new(SchemaRegistry::new()),
                watchers: Mutex::new(WatcherTable::new()),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Fetch the schema for `name` and register it for validation,
    /// overwriting any prior entry. Returns the raw schema document.
    pub fn load_schema(&self, name: &str) -> Result<Value> {
        self.shared.ensure_open()?;
        let schema = self
            .shared
            .request(Method::GET, &format!("schemas/{name}"), None)?;
        lock(&self.shared.schemas).register(name, schema.clone())?;
        tracing::debug!(schema = %name, "schema loaded");
        Ok(schema)
    }

    /// Validate `data` against the schema registered under `name`. Fails
    /// with a usage error if no schema is registered.
    pub fn validate(&self, data: &Value, name: &str) -> Result<ValidationOutcome> {
        lock(&self.shared.schemas).validate(data, name)
    }

    /// Fetch the configuration `name`; see
    /// [`AsyncConfigClient::get`](crate::client::AsyncConfigClient::get).
    pub fn get(&self, name: &str, use_cache: bool, validate: bool) -> Result<Value> {
        self.shared.ensure_open()?;

        if use_cache {
            if let Some(cached) = lock(&self.shared.cache).get(name) {
                return Ok(cached);
            }
        }

        let data = self.shared.fetch_config(name)?;

        if validate && lock(&self.shared.schemas).contains(name) {
            lock(&self.shared.schemas).check(&data, name)?;
        }

        if use_cache {
            lock(&self.shared.cache).insert(name, data.clone());
        }

        Ok(data)
    }

    /// Replace the configuration `name` with `data`. The server's response
    /// is authoritative for both the cache and the return value.
    pub fn update(&self, name: &str, data: &Value, validate: bool) -> Result<Value> {
        self.shared.ensure_open()?;

        if validate && lock(&self.shared.schemas).contains(name) {
            lock(&self.shared.schemas).check(data, name)?;
        }

        let updated = self
            .shared
            .request(Method::PUT, &format!("config/{name}"), Some(data))?;

        lock(&self.shared.cache).overwrite_if_present(name, updated.clone());
        Ok(updated)
    }

    /// Partially update the configuration `name` with `updates`; the
    /// pre-send validation always re-fetches current server state.
    pub fn patch(&self, name: &str, updates: &Value, validate: bool) -> Result<Value> {
        self.shared.ensure_open()?;

        if validate {
            let current = self.get(name, false, true)?;
            let merged = merge_documents(&current, updates);
            if lock(&self.shared.schemas).contains(name) {
                lock(&self.shared.schemas).check(&merged, name)?;
            }
        }

        let updated = self
            .shared
            .request(Method::PATCH, &format!("config/{name}"), Some(updates))?;

        lock(&self.shared.cache).overwrite_if_present(name, updated.clone());
        Ok(updated)
    }

    /// Fetch the CRUD rules document for `name`.
    pub fn get_crud(&self, name: &str) -> Result<Value> {
        self.shared.ensure_open()?;
        self.shared
            .request(Method::GET, &format!("crud/{name}"), None)
    }

    /// Start polling `name` on a background thread; same change-detection
    /// and error-delivery contract as the async variant.
    pub fn watch<F>(&self, name: &str, callback: F, interval: Duration) -> Result<WatchHandle>
    where
        F: FnMut(Result<Value>) + Send + 'static,
    {
        self.shared.ensure_open()?;

        let (stop_tx, stop_rx) = mpsc::channel();
        let id = lock(&self.shared.watchers).insert(name, ThreadSignal { stop: stop_tx });

        let shared = self.shared.clone();
        let poll_name = name.to_string();
        thread::spawn(move || poll_loop(shared, poll_name, callback, interval, stop_rx));

        let shared = self.shared.clone();
        let name = name.to_string();
        Ok(WatchHandle::new(move || {
            lock(&shared.watchers).cancel_if_current(&name, id);
        }))
    }

    /// Remove one cache entry (`Some(name)`) or all entries (`None`).
    pub fn clear_cache(&self, name: Option<&str>) {
        lock(&self.shared.cache).clear(name);
    }

    pub fn cache_stats(&self) -> CacheStats {
        lock(&self.shared.cache).stats()
    }

    /// Number of currently active watchers.
    pub fn active_watchers(&self) -> usize {
        lock(&self.shared.watchers).len()
    }

    /// Cancel every active watcher and mark the client closed. Idempotent;
    /// subsequent operations fail with [`SdkError::Closed`]. Also runs on
    /// drop.
    pub fn destroy(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        lock(&self.shared.watchers).cancel_all();
    }
}

impl Drop for ConfigClient {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Build a client, run `f` with it, and destroy the client on every exit
/// path, including error returns.
pub fn scoped<T>(config: ClientConfig, f: impl FnOnce(&ConfigClient) -> Result<T>) -> Result<T> {
    let client = ConfigClient::new(config)?;
    let result = f(&client);
    client.destroy();
    result
}

fn cancelled(stop_rx: &mpsc::Receiver<()>) -> bool {
    matches!(stop_rx.try_recv(), Ok(()) | Err(TryRecvError::Disconnected))
}

fn poll_loop<F>(
    shared: Arc<Shared>,
    name: String,
    mut callback: F,
    interval: Duration,
    stop_rx: mpsc::Receiver<()>,
) where
    F: FnMut(Result<Value>) + Send + 'static,
{
    let mut last_observed: Option<String> = None;

    loop {
        if cancelled(&stop_rx) {
            break;
        }

        let event = match shared.fetch_config(&name) {
            Ok(document) => {
                let canonical = canonical_form(&document);
                if last_observed.as_deref() == Some(canonical.as_str()) {
                    None
                } else {
                    last_observed = Some(canonical);
                    Some(Ok(document))
                }
            }
            Err(e) => {
                tracing::warn!(config = %name, error = %e, "poll cycle failed");
                Some(Err(e))
            }
        };

        // Suppress a late event if cancellation arrived mid-request
        if cancelled(&stop_rx) {
            break;
        }
        if let Some(event) = event {
            callback(event);
        }

        match stop_rx.recv_timeout(interval) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }

    tracing::debug!(config = %name, "watcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn unreachable_client() -> ConfigClient {
        ConfigClient::new(ClientConfig::new("http://127.0.0.1:9/api").with_timeout_seconds(1))
            .unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = ConfigClient::new(ClientConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_validate_without_schema_is_usage_error() {
        let client = unreachable_client();
        match client.validate(&json!({}), "display") {
            Err(SdkError::SchemaNotLoaded { name }) => assert_eq!(name, "display"),
            other => panic!("Expected SchemaNotLoaded, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_operations_after_destroy_fail_closed() {
        let client = unreachable_client();
        client.destroy();

        match client.get("display", false, false) {
            Err(SdkError::Closed) => (),
            other => panic!("Expected Closed, got {:?}", other.map(|_| ())),
        }
        match client.watch("display", |_| {}, Duration::from_secs(1)) {
            Err(SdkError::Closed) => (),
            other => panic!("Expected Closed, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let client = unreachable_client();
        client.destroy();
        client.destroy();
        assert_eq!(client.active_watchers(), 0);
    }

    #[test]
    fn test_scoped_destroys_on_error_path() {
        let result: Result<()> = scoped(ClientConfig::default(), |client| {
            assert_eq!(client.active_watchers(), 0);
            Err(SdkError::Closed)
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_get_unreachable_is_transport_error() {
        let client = unreachable_client();
        let err = client.get("display", false, false).unwrap_err();
        assert!(err.is_transport());
    }
}
