//! Asynchronous configuration client.
//!
//! One tokio task per watcher; network calls suspend the task, not the
//! thread, so many watches can share one thread. The cache, schema registry
//! and watcher table are scoped to the client instance and shared with its
//! poller tasks through an `Arc`.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use tokio::sync::watch;

use crate::cache::{CacheStats, ConfigCache};
use crate::config::ClientConfig;
use crate::document::{canonical_form, merge_documents};
use crate::error::{Result, SdkError};
use crate::schema::{SchemaRegistry, ValidationOutcome};
use crate::watch::{CancelSignal, WatchHandle, WatcherTable};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

struct TaskSignal {
    stop: watch::Sender<bool>,
}

impl CancelSignal for TaskSignal {
    fn cancel(&self) {
        let _ = self.stop.send(true);
    }
}

struct Shared {
    http: reqwest::Client,
    config: ClientConfig,
    cache: Mutex<ConfigCache>,
    schemas: Mutex<SchemaRegistry>,
    watchers: Mutex<WatcherTable<TaskSignal>>,
    closed: AtomicBool,
}

impl Shared {
    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = self.config.endpoint(path);
        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
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

        Ok(response.json::<Value>().await?)
    }

    /// Non-caching, non-validating read; the poll loop and `get` both go
    /// through here.
    async fn fetch_config(&self, name: &str) -> Result<Value> {
        self.request(Method::GET, &format!("config/{name}"), None)
            .await
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(SdkError::Closed)
        } else {
            Ok(())
        }
    }
}

/// Asynchronous configuration client (see [`crate::blocking::ConfigClient`]
/// for the thread-based variant with the same contract).
pub struct AsyncConfigClient {
    shared: Arc<Shared>,
}

impl AsyncConfigClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
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

    /// Fetch the schema for `name` from the service and register it for
    /// validation, overwriting any prior entry. Returns the raw schema
    /// document.
    pub async fn load_schema(&self, name: &str) -> Result<Value> {
        self.shared.ensure_open()?;
        let schema = self
            .shared
            .request(Method::GET, &format!("schemas/{name}"), None)
            .await?;
        lock(&self.shared.schemas).register(name, schema.clone())?;
        tracing::debug!(schema = %name, "schema loaded");
        Ok(schema)
    }

    /// Validate `data` against the schema registered under `name`. Fails
    /// with a usage error if no schema is registered.
    pub fn validate(&self, data: &Value, name: &str) -> Result<ValidationOutcome> {
        lock(&self.shared.schemas).validate(data, name)
    }

    /// Fetch the configuration `name`.
    ///
    /// With `use_cache`, a cached entry is returned without a network call,
    /// and a fetched document is stored for next time. With `validate`, the
    /// response is validated when a schema is registered for `name`.
    pub async fn get(&self, name: &str, use_cache: bool, validate: bool) -> Result<Value> {
        self.shared.ensure_open()?;

        if use_cache {
            if let Some(cached) = lock(&self.shared.cache).get(name) {
                return Ok(cached);
            }
        }

        let data = self.shared.fetch_config(name).await?;

        if validate && lock(&self.shared.schemas).contains(name) {
            lock(&self.shared.schemas).check(&data, name)?;
        }

        if use_cache {
            lock(&self.shared.cache).insert(name, data.clone());
        }

        Ok(data)
    }

    /// Replace the configuration `name` with `data`.
    ///
    /// With `validate`, `data` is checked against a registered schema before
    /// any network call. The server's response is authoritative: it is what
    /// lands in the cache (when an entry already exists) and what is
    /// returned.
    pub async fn update(&self, name: &str, data: &Value, validate: bool) -> Result<Value> {
        self.shared.ensure_open()?;

        if validate && lock(&self.shared.schemas).contains(name) {
            lock(&self.shared.schemas).check(data, name)?;
        }

        let updated = self
            .shared
            .request(Method::PUT, &format!("config/{name}"), Some(data))
            .await?;

        lock(&self.shared.cache).overwrite_if_present(name, updated.clone());
        Ok(updated)
    }

    /// Partially update the configuration `name` with `updates`.
    ///
    /// With `validate`, the current document is re-fetched from the server
    /// (the cache is deliberately bypassed so validation always runs against
    /// true server state), `updates` is merged over it, and the merged
    /// result is checked against a registered schema before the PATCH is
    /// sent.
    pub async fn patch(&self, name: &str, updates: &Value, validate: bool) -> Result<Value> {
        self.shared.ensure_open()?;

        if validate {
            let current = self.get(name, false, true).await?;
            let merged = merge_documents(&current, updates);
            if lock(&self.shared.schemas).contains(name) {
                lock(&self.shared.schemas).check(&merged, name)?;
            }
        }

        let updated = self
            .shared
            .request(Method::PATCH, &format!("config/{name}"), Some(updates))
            .await?;

        lock(&self.shared.cache).overwrite_if_present(name, updated.clone());
        Ok(updated)
    }

    /// Fetch the CRUD rules document for `name`.
    pub async fn get_crud(&self, name: &str) -> Result<Value> {
        self.shared.ensure_open()?;
        self.shared
            .request(Method::GET, &format!("crud/{name}"), None)
            .await
    }

    /// Start polling `name` every `interval`, invoking `callback` with
    /// `Ok(document)` whenever the canonical form of the document changes
    /// (including the first successful poll) and with `Err(e)` when a poll
    /// fails. A failed poll does not stop the watch.
    ///
    /// Starting a watch for a name that already has one stops the existing
    /// watcher first; its callback fires no further events once this method
    /// returns. Must be called from within a tokio runtime.
    pub fn watch<F>(&self, name: &str, callback: F, interval: Duration) -> Result<WatchHandle>
    where
        F: FnMut(Result<Value>) + Send + 'static,
    {
        self.shared.ensure_open()?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let id = lock(&self.shared.watchers).insert(name, TaskSignal { stop: stop_tx });

        tokio::spawn(poll_loop(
            self.shared.clone(),
            name.to_string(),
            callback,
            interval,
            stop_rx,
        ));

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
    /// drop, so watchers are released on every exit path.
    pub fn destroy(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        lock(&self.shared.watchers).cancel_all();
    }
}

impl Drop for AsyncConfigClient {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Build a client, run `f` with it, and destroy the client on every exit
/// path, including error returns.
pub async fn scoped<T>(
    config: ClientConfig,
    f: impl AsyncFnOnce(&AsyncConfigClient) -> Result<T>,
) -> Result<T> {
    let client = AsyncConfigClient::new(config)?;
    let result = f(&client).await;
    client.destroy();
    result
}

async fn poll_loop<F>(
    shared: Arc<Shared>,
    name: String,
    mut callback: F,
    interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) where
    F: FnMut(Result<Value>) + Send + 'static,
{
    let mut last_observed: Option<String> = None;

    loop {
        if *stop_rx.borrow() {
            break;
        }

        let event = match shared.fetch_config(&name).await {
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

        // Cancellation may have been requested while the request was in
        // flight; the displaced watcher must not deliver a late event.
        if *stop_rx.borrow() {
            break;
        }
        if let Some(event) = event {
            callback(event);
        }

        tokio::select! {
            _ = stop_rx.changed() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    tracing::debug!(config = %name, "watcher stopped");
}
