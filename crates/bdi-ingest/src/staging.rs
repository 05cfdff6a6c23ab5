//! Staging cache for validated datasets
//!
//! Validation and upload arrive as separate HTTP requests, so the processing
//! object produced by the validate phase is parked here under an opaque
//! [`StagingId`] until the owning user commits it or it expires.
//!
//! The cache is safe for concurrent use from arbitrary request threads with
//! no caller-side locking. Entries are owned: a caller only gets an entry
//! back if the stored owner is 0 (unrestricted) or equal to the caller.
//! Unauthorized access is deliberately indistinguishable from absence so the
//! cache never leaks which ids exist.
//!
//! Construct one cache per embedding service and pass it where needed; it is
//! not a process-wide singleton, so tests get an isolated instance each.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

/// Default entry time-to-live
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Opaque, unguessable id for one staged entry (128-bit random)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StagingId(Uuid);

impl StagingId {
    /// Generate a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an id previously handed to a caller
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for StagingId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StagingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One staged entry: the object, its owner, and when it was staged
struct StagedEntry<T> {
    obj: Arc<T>,
    owner_user_id: u64,
    staged_at: Instant,
}

impl<T> StagedEntry<T> {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.staged_at.elapsed() > ttl
    }

    /// Owner 0 means unrestricted; otherwise the caller must match.
    fn authorized(&self, caller_user_id: u64) -> bool {
        self.owner_user_id == 0 || self.owner_user_id == caller_user_id
    }
}

/// Concurrent, expiring, ownership-checked store bridging the validate and
/// upload phases.
///
/// `T` is the processing object type (in this crate,
/// [`crate::processor::DatasetProcessor`]).
pub struct StagingCache<T> {
    store: DashMap<StagingId, StagedEntry<T>>,
    ttl: Duration,
}

impl<T> StagingCache<T> {
    /// Cache with the default 5 minute TTL
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Cache with a custom TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            store: DashMap::new(),
            ttl,
        }
    }

    /// Stage an object under `id`, owned by `owner_user_id` (0 = anyone may
    /// retrieve it).
    ///
    /// Overwrites any existing entry under the same id — this is the only
    /// way to "update" a staged object. Expired entries are swept out as a
    /// side effect.
    pub fn put(&self, id: StagingId, obj: T, owner_user_id: u64) -> StagingId {
        self.store.insert(
            id,
            StagedEntry {
                obj: Arc::new(obj),
                owner_user_id,
                staged_at: Instant::now(),
            },
        );
        self.remove_expired();

        debug!(id = %id, owner = owner_user_id, "Staged entry");
        id
    }

    /// Retrieve a staged object.
    ///
    /// Returns `None` when the id is unknown, the entry has expired, or the
    /// caller is not the owner. Expiry is checked here directly; it never
    /// depends on sweep timing.
    pub fn get(&self, id: &StagingId, caller_user_id: u64) -> Option<Arc<T>> {
        let entry = self.store.get(id)?;

        if entry.is_expired(self.ttl) {
            debug!(id = %id, "Staged entry expired");
            return None;
        }

        if !entry.authorized(caller_user_id) {
            // Reported identically to absence; this event is the audit hook.
            debug!(id = %id, caller = caller_user_id, "Unauthorized staging access");
            return None;
        }

        Some(Arc::clone(&entry.obj))
    }

    /// Remove the entry unconditionally. Idempotent on missing ids.
    pub fn invalidate(&self, id: &StagingId) {
        self.store.remove(id);
    }

    /// Number of entries physically present, expired ones included
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    fn remove_expired(&self) {
        let ttl = self.ttl;
        self.store.retain(|_, entry| !entry.is_expired(ttl));
    }
}

impl<T> Default for StagingCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
