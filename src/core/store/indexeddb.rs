//! Browser storage over IndexedDB.
//!
//! Records live in the `secrets` object store of the `vault-secrets`
//! database. Keys are the two-element array `[service, key]`, so no
//! separator can make two identities collide, and each record is
//! `{ value: <base64> }`.
//!
//! Schema version 2 keys records out-of-line. Version 1 databases used an
//! in-line `key` path, which rejects explicit keys, so upgrading from one
//! drops the old store and its records.
//!
//! IndexedDB is callback-driven and cannot be waited on synchronously from
//! the main thread, so this backend is async and sits behind its own facade,
//! [`BrowserVault`], instead of implementing [`Backend`](super::Backend).
//! Every request is turned into a one-shot promise and raced against a timer.
//!
//! Browser storage is readable by any script on the same origin and is
//! cleared with site data. Encrypt before storing if that matters.

use std::time::Duration;

use js_sys::{Array, Function, Object, Promise, Reflect};
use tracing::debug;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Event, IdbDatabase, IdbFactory, IdbObjectStore, IdbOpenDbRequest, IdbRequest,
    IdbTransactionMode,
};
use zeroize::Zeroizing;

use crate::core::config::Config;
use crate::core::constants::{BROWSER_STORE_NAME, DEFAULT_TIMEOUT_MS, STORAGE_DIR_NAME};
use crate::core::domain::Identity;
use crate::core::encoding;
use crate::core::validation::{validate_identity, validate_value};
use crate::error::{BackendError, Error, Result};

const DB_VERSION: u32 = 2;

/// Name reported in timeout errors.
const SOURCE: &str = "indexeddb";

/// Rejection reason used by the timer promise.
const TIMEOUT_REASON: &str = "vault: indexeddb timeout";

const VALUE_FIELD: &str = "value";

/// A request's promise plus the callbacks feeding it.
///
/// Dropping it detaches the callbacks, so a request that outlives a timeout
/// never calls into freed closures.
struct Pending {
    request: IdbRequest,
    promise: Promise,
    _callbacks: Vec<Closure<dyn FnMut(Event)>>,
}

impl Pending {
    fn new(request: &IdbRequest) -> Self {
        let mut callbacks = Vec::with_capacity(2);
        let promise = Promise::new(&mut |resolve: Function, reject: Function| {
            let source = request.clone();
            let on_success = Closure::once(move |_event: Event| {
                let result = source.result().unwrap_or(JsValue::UNDEFINED);
                let _ = resolve.call1(&JsValue::NULL, &result);
            });

            let source = request.clone();
            let on_error = Closure::once(move |_event: Event| {
                let reason = source
                    .error()
                    .ok()
                    .flatten()
                    .map(|e| e.message())
                    .unwrap_or_else(|| "request failed".to_string());
                let _ = reject.call1(&JsValue::NULL, &JsValue::from_str(&reason));
            });

            request.set_onsuccess(Some(on_success.as_ref().unchecked_ref()));
            request.set_onerror(Some(on_error.as_ref().unchecked_ref()));
            callbacks.push(on_success);
            callbacks.push(on_error);
        });

        Self {
            request: request.clone(),
            promise,
            _callbacks: callbacks,
        }
    }
}

impl Drop for Pending {
    fn drop(&mut self) {
        self.request.set_onsuccess(None);
        self.request.set_onerror(None);
    }
}

/// Promise that rejects with [`TIMEOUT_REASON`] after `timeout`.
fn timer(timeout: Duration) -> Promise {
    // setTimeout takes a signed 32-bit delay
    let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
    Promise::new(&mut |_resolve: Function, reject: Function| {
        let global = js_sys::global();
        let fire = Closure::once_into_js(move || {
            let _ = reject.call1(&JsValue::NULL, &JsValue::from_str(TIMEOUT_REASON));
        });
        if let Ok(set_timeout) = Reflect::get(&global, &JsValue::from_str("setTimeout"))
            .and_then(|f| f.dyn_into::<Function>())
        {
            let _ = set_timeout.call2(&global, &fire, &JsValue::from(millis));
        }
    })
}

fn js_error(context: &str, value: &JsValue) -> BackendError {
    let detail = value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| "unknown error".to_string());
    BackendError::Browser(format!("{context}: {detail}"))
}

fn record_key(id: &Identity<'_>) -> JsValue {
    Array::of2(&JsValue::from_str(id.service()), &JsValue::from_str(id.key())).into()
}

/// IndexedDB-backed secret store.
#[derive(Debug, Clone)]
pub struct IndexedDbStore {
    database: &'static str,
    timeout: Duration,
}

impl IndexedDbStore {
    pub fn new(timeout: Duration) -> Self {
        Self {
            database: STORAGE_DIR_NAME,
            timeout,
        }
    }

    fn factory() -> std::result::Result<IdbFactory, BackendError> {
        let factory = Reflect::get(&js_sys::global(), &JsValue::from_str("indexedDB"))
            .map_err(|e| js_error("indexedDB lookup", &e))?;
        if factory.is_undefined() || factory.is_null() {
            return Err(BackendError::Browser(
                "IndexedDB is not available in this context".to_string(),
            ));
        }
        factory
            .dyn_into::<IdbFactory>()
            .map_err(|e| js_error("indexedDB lookup", &e))
    }

    /// Wait for `pending` or the timer, whichever settles first.
    async fn settle(&self, pending: Pending) -> std::result::Result<JsValue, BackendError> {
        let outcome = self.race(&pending.promise).await;
        drop(pending);
        outcome
    }

    async fn race(&self, promise: &Promise) -> std::result::Result<JsValue, BackendError> {
        let race = Promise::race(&Array::of2(promise, &timer(self.timeout)));
        JsFuture::from(race).await.map_err(|reason| {
            if reason.as_string().as_deref() == Some(TIMEOUT_REASON) {
                BackendError::Timeout {
                    tool: SOURCE.to_string(),
                    timeout: self.timeout,
                }
            } else {
                js_error("request failed", &reason)
            }
        })
    }

    async fn open(&self) -> std::result::Result<IdbDatabase, BackendError> {
        let request: IdbOpenDbRequest = Self::factory()?
            .open_with_u32(self.database, DB_VERSION)
            .map_err(|e| js_error("open database", &e))?;

        let source = request.clone();
        let on_upgrade = Closure::once(move |_event: Event| {
            if let Ok(db) = source.result().and_then(|r| r.dyn_into::<IdbDatabase>()) {
                if db.object_store_names().contains(BROWSER_STORE_NAME) {
                    let _ = db.delete_object_store(BROWSER_STORE_NAME);
                }
                let _ = db.create_object_store(BROWSER_STORE_NAME);
            }
        });
        request.set_onupgradeneeded(Some(on_upgrade.as_ref().unchecked_ref()));

        let outcome = self.settle(Pending::new(&request)).await;
        request.set_onupgradeneeded(None);
        drop(on_upgrade);

        outcome?
            .dyn_into::<IdbDatabase>()
            .map_err(|e| js_error("open database", &e))
    }

    fn object_store(
        db: &IdbDatabase,
        mode: IdbTransactionMode,
    ) -> std::result::Result<IdbObjectStore, BackendError> {
        db.transaction_with_str_and_mode(BROWSER_STORE_NAME, mode)
            .and_then(|tx| tx.object_store(BROWSER_STORE_NAME))
            .map_err(|e| js_error("begin transaction", &e))
    }

    /// Insert or replace the value for `id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Backend` if the database cannot be opened, the write
    /// fails or the timer expires first.
    pub async fn store(&self, id: &Identity<'_>, value: &[u8]) -> Result<()> {
        let encoded = Zeroizing::new(encoding::encode(value));
        let record = Object::new();
        Reflect::set(
            &record,
            &JsValue::from_str(VALUE_FIELD),
            &JsValue::from_str(&encoded),
        )
        .map_err(|e| js_error("build record", &e))?;

        let db = self.open().await?;
        let outcome = async {
            let store = Self::object_store(&db, IdbTransactionMode::Readwrite)?;
            let request = store
                .put_with_key(&record, &record_key(id))
                .map_err(|e| js_error("put", &e))?;
            self.settle(Pending::new(&request)).await
        }
        .await;
        db.close();

        outcome?;
        debug!(service = id.service(), key = id.key(), "stored secret in IndexedDB");
        Ok(())
    }

    /// Read the value for `id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` when no record exists, otherwise
    /// `Error::Backend`.
    pub async fn retrieve(&self, id: &Identity<'_>) -> Result<Vec<u8>> {
        let db = self.open().await?;
        let outcome = async {
            let store = Self::object_store(&db, IdbTransactionMode::Readonly)?;
            let request = store
                .get(&record_key(id))
                .map_err(|e| js_error("get", &e))?;
            self.settle(Pending::new(&request)).await
        }
        .await;
        db.close();

        let record = outcome?;
        if record.is_undefined() || record.is_null() {
            return Err(Error::NotFound);
        }
        let encoded = Reflect::get(&record, &JsValue::from_str(VALUE_FIELD))
            .ok()
            .and_then(|v| v.as_string())
            .map(Zeroizing::new)
            .ok_or_else(|| BackendError::Browser("record has no string value".to_string()))?;
        Ok(encoding::decode(&encoded).map_err(BackendError::from)?)
    }

    /// Delete the value for `id`.
    ///
    /// The existence check and the delete run in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` when no record exists, otherwise
    /// `Error::Backend`.
    pub async fn remove(&self, id: &Identity<'_>) -> Result<()> {
        let db = self.open().await?;
        let outcome = async {
            let store = Self::object_store(&db, IdbTransactionMode::Readwrite)?;
            let key = record_key(id);
            // Requests on one transaction complete in issue order
            let count = store
                .count_with_key(&key)
                .map_err(|e| js_error("count", &e))?;
            let count = Pending::new(&count);
            let delete = store.delete(&key).map_err(|e| js_error("delete", &e))?;
            let delete = Pending::new(&delete);

            let existing = self.settle(count).await?.as_f64().unwrap_or(0.0);
            self.settle(delete).await?;
            Ok::<bool, BackendError>(existing > 0.0)
        }
        .await;
        db.close();

        if !outcome? {
            return Err(Error::NotFound);
        }
        debug!(service = id.service(), key = id.key(), "deleted secret from IndexedDB");
        Ok(())
    }
}

/// Async vault for browsers and web workers.
///
/// Mirrors [`Vault`](crate::Vault): input is validated before IndexedDB is
/// touched, and errors use the same taxonomy.
#[derive(Debug, Clone)]
pub struct BrowserVault {
    store: IndexedDbStore,
}

impl Default for BrowserVault {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowserVault {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }

    /// Bound each IndexedDB request by `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            store: IndexedDbStore::new(timeout),
        }
    }

    /// Take the timeout from `config`; other fields do not apply here.
    pub fn from_config(config: &Config) -> Self {
        Self::with_timeout(config.timeout())
    }

    /// Store `value` under `(service, key)`, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for empty arguments, otherwise
    /// `Error::Backend` on storage failure.
    pub async fn set(&self, service: &str, key: &str, value: &[u8]) -> Result<()> {
        validate_identity(service, key)?;
        validate_value(value)?;
        self.store.store(&Identity::new(service, key), value).await
    }

    /// Fetch the value stored under `(service, key)`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput`, `Error::NotFound` or `Error::Backend`.
    pub async fn get(&self, service: &str, key: &str) -> Result<Vec<u8>> {
        validate_identity(service, key)?;
        self.store.retrieve(&Identity::new(service, key)).await
    }

    /// Delete the value stored under `(service, key)`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput`, `Error::NotFound` or `Error::Backend`.
    pub async fn delete(&self, service: &str, key: &str) -> Result<()> {
        validate_identity(service, key)?;
        self.store.remove(&Identity::new(service, key)).await
    }
}
