//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! `AppState` is the authoritative home of every record the workflow
//! touches: shipments, requests, actors, hubs. Each lives in a generic
//! [`Store`]: an in-memory map behind a `parking_lot::RwLock` with
//! **bounded** lock acquisition. A store that cannot be locked within
//! [`STORE_LOCK_TIMEOUT`] reports [`StoreUnavailable`], which the error
//! layer surfaces as a retryable 503 rather than blocking the caller
//! indefinitely.
//!
//! Barcode values come from [`BarcodeSequence`], a process-wide atomic
//! counter: dense, monotone, never zero, never reused while the process
//! lives.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use thiserror::Error;
use uuid::Uuid;

use hubnet_channel::LocationChannels;
use hubnet_core::PricingScheme;
use hubnet_state::{Actor, Hub, Shipment, ShipmentRequest};

/// Upper bound on any single store lock acquisition. Exceeding it is
/// treated as a dependency failure, not a reason to queue forever.
pub const STORE_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// First barcode value issued when no floor is configured.
pub const DEFAULT_BARCODE_FLOOR: u64 = 202_000;

/// A store lock could not be acquired within [`STORE_LOCK_TIMEOUT`].
///
/// Retryable: nothing was read or written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("shared store unavailable: lock not acquired within {:?}", STORE_LOCK_TIMEOUT)]
pub struct StoreUnavailable;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not
/// `tokio::sync`) because the lock is never held across `.await`
/// points. `parking_lot::RwLock` is non-poisonable (a panicking writer
/// does not permanently corrupt the store), and its timed acquisition
/// backs the bounded-wait contract above.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn read(&self) -> Result<parking_lot::RwLockReadGuard<'_, HashMap<Uuid, T>>, StoreUnavailable> {
        self.data.try_read_for(STORE_LOCK_TIMEOUT).ok_or(StoreUnavailable)
    }

    fn write(
        &self,
    ) -> Result<parking_lot::RwLockWriteGuard<'_, HashMap<Uuid, T>>, StoreUnavailable> {
        self.data.try_write_for(STORE_LOCK_TIMEOUT).ok_or(StoreUnavailable)
    }

    /// Take the raw write guard, bounded like every other acquisition.
    ///
    /// For multi-store sequences that must commit together. Callers
    /// follow the fixed requests → shipments → actors lock order and
    /// never hold a guard across an `.await`.
    pub(crate) fn lock_write(
        &self,
    ) -> Result<parking_lot::RwLockWriteGuard<'_, HashMap<Uuid, T>>, StoreUnavailable> {
        self.write()
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: Uuid, value: T) -> Result<Option<T>, StoreUnavailable> {
        Ok(self.write()?.insert(id, value))
    }

    /// Insert a record only if `guard` passes against the current map.
    ///
    /// The guard inspection and the insertion run under one write lock,
    /// so uniqueness checks (duplicate pending print, duplicate hub
    /// code) cannot race with a concurrent insert.
    pub fn insert_if<E>(
        &self,
        id: Uuid,
        value: T,
        guard: impl FnOnce(&HashMap<Uuid, T>) -> Result<(), E>,
    ) -> Result<Result<(), E>, StoreUnavailable> {
        let mut map = self.write()?;
        Ok(guard(&map).map(|()| {
            map.insert(id, value);
        }))
    }

    /// Retrieve a record by ID.
    pub fn get(&self, id: &Uuid) -> Result<Option<T>, StoreUnavailable> {
        Ok(self.read()?.get(id).cloned())
    }

    /// List all records.
    pub fn list(&self) -> Result<Vec<T>, StoreUnavailable> {
        Ok(self.read()?.values().cloned().collect())
    }

    /// List records passing a filter, cloned out under one read lock.
    pub fn filter(&self, keep: impl Fn(&T) -> bool) -> Result<Vec<T>, StoreUnavailable> {
        Ok(self.read()?.values().filter(|v| keep(v)).cloned().collect())
    }

    /// Update a record in place. Returns the updated record, or `None`
    /// if not found.
    pub fn update(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut T),
    ) -> Result<Option<T>, StoreUnavailable> {
        let mut guard = self.write()?;
        Ok(if let Some(entry) = guard.get_mut(id) {
            f(entry);
            Some(entry.clone())
        } else {
            None
        })
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure receives a `&mut T` and may inspect the current
    /// state, validate preconditions, mutate the record, and return
    /// `Ok(R)` or `Err(E)`. The entire operation runs under this
    /// store's write lock, eliminating TOCTOU races between read and
    /// update; two racing callers serialize here, and the loser
    /// observes the winner's committed mutation.
    ///
    /// `Ok(None)` means the record does not exist.
    pub fn try_update<R, E>(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Result<Option<Result<R, E>>, StoreUnavailable> {
        Ok(self.write()?.get_mut(id).map(f))
    }

    /// Remove a record by ID.
    pub fn remove(&self, id: &Uuid) -> Result<Option<T>, StoreUnavailable> {
        Ok(self.write()?.remove(id))
    }

    /// Check if a record exists.
    pub fn contains(&self, id: &Uuid) -> Result<bool, StoreUnavailable> {
        Ok(self.read()?.contains_key(id))
    }

    /// Return the number of records.
    pub fn len(&self) -> Result<usize, StoreUnavailable> {
        Ok(self.read()?.len())
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> Result<bool, StoreUnavailable> {
        Ok(self.len()? == 0)
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Barcode Sequence ---------------------------------------------------------

/// Process-wide atomic issuer of shipment barcode values.
///
/// Dense and monotone: each call hands out the next integer. The floor
/// is clamped to at least 1 so the value 0, reserved as "no barcode"
/// on scan hardware, is never issued.
#[derive(Debug, Clone)]
pub struct BarcodeSequence(Arc<AtomicU64>);

impl BarcodeSequence {
    /// Create a sequence whose first issued value is `floor` (min 1).
    pub fn new(floor: u64) -> Self {
        Self(Arc::new(AtomicU64::new(floor.max(1))))
    }

    /// Issue the next barcode value.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }

    /// The value the next call to [`BarcodeSequence::next`] will issue.
    pub fn peek(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for BarcodeSequence {
    fn default() -> Self {
        Self::new(DEFAULT_BARCODE_FLOOR)
    }
}

// -- Application State --------------------------------------------------------

/// Application configuration.
///
/// Custom `Debug` redacts the `auth_token` to prevent credential
/// leakage in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer token secret. If `None`, authentication is
    /// disabled and every caller is treated as an administrator.
    pub auth_token: Option<String>,
    /// First barcode value to issue.
    pub barcode_floor: u64,
    /// Rate table used to price shipments at creation.
    pub pricing: PricingScheme,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("barcode_floor", &self.barcode_floor)
            .field("pricing", &self.pricing)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            barcode_floor: DEFAULT_BARCODE_FLOOR,
            pricing: PricingScheme::default(),
        }
    }
}

/// Shared application state accessible to all route handlers.
///
/// Clone-friendly via `Arc` internals in each member. The four stores
/// are independent locks; the approval gate acquires them in the fixed
/// order requests → shipments → actors, and nothing else takes more
/// than one write lock at a time, which keeps the order acyclic.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The shipment ledger.
    pub shipments: Store<Shipment>,
    /// The approval request queue, including decided requests (audit trail).
    pub requests: Store<ShipmentRequest>,
    /// Actor directory with cumulative counters.
    pub actors: Store<Actor>,
    /// Hub directory.
    pub hubs: Store<Hub>,
    /// Barcode issuer.
    pub barcodes: BarcodeSequence,
    /// Live-location topics.
    pub channels: Arc<LocationChannels>,
    /// Configuration.
    pub config: AppConfig,
}

impl AppState {
    /// Create application state with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Create application state with the given configuration.
    pub fn with_config(config: AppConfig) -> Self {
        Self {
            shipments: Store::new(),
            requests: Store::new(),
            actors: Store::new(),
            hubs: Store::new(),
            barcodes: BarcodeSequence::new(config.barcode_floor),
            channels: Arc::new(LocationChannels::default()),
            config,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
