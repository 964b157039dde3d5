//! # Stats Cache
//!
//! Short-lived, in-process cache for aggregation results.
//!
//! ## Lookup Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          StatsCache<V>                                  │
//! │                                                                         │
//! │  get("v1:commission_stats_quarter")                                    │
//! │       │                                                                 │
//! │       ├── absent ───────────────────────────────► None (miss)          │
//! │       │                                                                 │
//! │       ├── clock.now() − inserted_at ≥ TTL ──────► None (stale)         │
//! │       │                                                                 │
//! │       └── fresh ────────────────────────────────► Some(value.clone())  │
//! │                                                                         │
//! │  set(key, value, generation)                                           │
//! │       │                                                                 │
//! │       ├── cleared since generation was taken? ──► dropped              │
//! │       │                                                                 │
//! │       ├── at capacity? purge expired, then evict oldest insertion      │
//! │       │                                                                 │
//! │       └── insert / overwrite ◄── last write wins                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! Entries sit behind a `tokio::sync::RwLock`. Misses are not coalesced:
//! two requests missing the same key both compute and both write. The
//! computation is a pure read, so either value is correct.
//!
//! A miss takes the current [`Generation`] before reading the database and
//! hands it back to [`StatsCache::set`]. `clear` bumps the generation, so a
//! value computed before a write cannot land after the write's invalidation.
//!
//! ## Time
//! All time comes from an injected [`Clock`], so tests advance time by hand
//! instead of sleeping.

use chrono::{Local, NaiveDate};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use comtrack_core::PeriodKind;

/// Default time-to-live of a cached aggregation.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Default maximum number of entries per cache.
pub const DEFAULT_CAPACITY: usize = 256;

/// Bumped whenever the shape of a cached value changes.
pub const CACHE_SCHEMA_VERSION: &str = "v1";

// =============================================================================
// Clock
// =============================================================================

/// Source of time for TTL checks and for "today".
pub trait Clock: Send + Sync + 'static {
    /// Monotonic instant used for expiry.
    fn now(&self) -> Instant;

    /// Calendar date used as the default reference date.
    fn today(&self) -> NaiveDate;
}

/// Wall clock: monotonic `Instant` plus the local calendar date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock that only moves when told to.
///
/// ## Usage
/// ```rust,ignore
/// let clock = Arc::new(ManualClock::new(today));
/// let cache = StatsCache::new(clock.clone(), DEFAULT_TTL, DEFAULT_CAPACITY);
/// clock.advance(Duration::from_secs(300));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    state: Mutex<ManualState>,
}

#[derive(Debug)]
struct ManualState {
    elapsed: Duration,
    today: NaiveDate,
}

impl ManualClock {
    pub fn new(today: NaiveDate) -> Self {
        ManualClock {
            origin: Instant::now(),
            state: Mutex::new(ManualState {
                elapsed: Duration::ZERO,
                today,
            }),
        }
    }

    /// Moves `now()` forward.
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.elapsed += by;
    }

}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        self.origin + state.elapsed
    }

    fn today(&self) -> NaiveDate {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).today
    }
}

// =============================================================================
// Cache Key
// =============================================================================

/// Identifies one cached aggregation.
///
/// | Key | Rendered |
/// |---|---|
/// | `Overview` | `v1:commission_stats` |
/// | `Period(Quarter)` | `v1:commission_stats_quarter` |
/// | `CustomPeriod(Month, 2024-03-10)` | `v1:commission_stats_month_2024-03-10` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// All-time / financial year / month triad.
    Overview,
    /// Period stats relative to today.
    Period(PeriodKind),
    /// Period stats for an explicit reference date.
    CustomPeriod(PeriodKind, NaiveDate),
}

impl CacheKey {
    /// Key for period stats, with or without an explicit reference date.
    pub fn for_period(kind: PeriodKind, reference: Option<NaiveDate>) -> Self {
        match reference {
            Some(date) => CacheKey::CustomPeriod(kind, date),
            None => CacheKey::Period(kind),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Overview => write!(f, "{}:commission_stats", CACHE_SCHEMA_VERSION),
            CacheKey::Period(kind) => {
                write!(f, "{}:commission_stats_{}", CACHE_SCHEMA_VERSION, kind)
            }
            CacheKey::CustomPeriod(kind, date) => write!(
                f,
                "{}:commission_stats_{}_{}",
                CACHE_SCHEMA_VERSION,
                kind,
                date.format("%Y-%m-%d")
            ),
        }
    }
}

// =============================================================================
// StatsCache
// =============================================================================

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// Snapshot of how many times a cache has been cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

/// Typed TTL cache with bounded capacity.
pub struct StatsCache<V> {
    entries: RwLock<HashMap<String, Entry<V>>>,
    /// Only changed while `entries` is write-locked.
    generation: AtomicU64,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    capacity: usize,
}

impl<V: Clone + Send + Sync> StatsCache<V> {
    /// Creates an empty cache. A capacity of zero is treated as one.
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration, capacity: usize) -> Self {
        StatsCache {
            entries: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
            clock,
            ttl,
            capacity: capacity.max(1),
        }
    }

    fn is_fresh(&self, entry: &Entry<V>, now: Instant) -> bool {
        now.saturating_duration_since(entry.inserted_at) < self.ttl
    }

    /// Returns the cached value if it is younger than the TTL.
    ///
    /// Stale entries are ignored, not removed.
    pub async fn get(&self, key: &CacheKey) -> Option<V> {
        let key = key.to_string();
        let now = self.clock.now();
        let entries = self.entries.read().await;

        match entries.get(&key) {
            Some(entry) if self.is_fresh(entry, now) => {
                debug!(key = %key, "Stats cache hit");
                Some(entry.value.clone())
            }
            Some(_) => {
                debug!(key = %key, "Stats cache entry expired");
                None
            }
            None => {
                debug!(key = %key, "Stats cache miss");
                None
            }
        }
    }

    /// Take before computing a value that will be passed to [`set`](Self::set).
    pub fn generation(&self) -> Generation {
        Generation(self.generation.load(Ordering::Acquire))
    }

    /// Stores `value`, overwriting any previous entry for `key`.
    ///
    /// Returns `false` without storing if the cache was cleared after
    /// `generation` was taken.
    pub async fn set(&self, key: &CacheKey, value: V, generation: Generation) -> bool {
        let key = key.to_string();
        let now = self.clock.now();
        let mut entries = self.entries.write().await;

        if self.generation.load(Ordering::Acquire) != generation.0 {
            debug!(key = %key, "Discarding stats computed before invalidation");
            return false;
        }

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            entries.retain(|_, entry| self.is_fresh(entry, now));

            if entries.len() >= self.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.inserted_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    debug!(key = %oldest, "Evicting oldest stats cache entry");
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            key,
            Entry {
                value,
                inserted_at: now,
            },
        );
        true
    }

    /// Removes every entry and turns away values computed before this call.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Removes expired entries and returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| self.is_fresh(entry, now));
        before - entries.len()
    }

    /// Number of stored entries, fresh or stale.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()))
    }

    #[test]
    fn test_key_rendering() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();

        assert_eq!(CacheKey::Overview.to_string(), "v1:commission_stats");
        assert_eq!(
            CacheKey::Period(PeriodKind::Quarter).to_string(),
            "v1:commission_stats_quarter"
        );
        assert_eq!(
            CacheKey::for_period(PeriodKind::Month, Some(date)).to_string(),
            "v1:commission_stats_month_2024-03-10"
        );
        assert_eq!(
            CacheKey::for_period(PeriodKind::Year, None),
            CacheKey::Period(PeriodKind::Year)
        );
    }

    #[tokio::test]
    async fn test_fresh_until_ttl() {
        let clock = clock();
        let cache: StatsCache<u32> = StatsCache::new(clock.clone(), DEFAULT_TTL, 8);
        let key = CacheKey::Period(PeriodKind::Month);

        assert_eq!(cache.get(&key).await, None);
        cache.set(&key, 7, cache.generation()).await;
        assert_eq!(cache.get(&key).await, Some(7));

        clock.advance(DEFAULT_TTL - Duration::from_secs(1));
        assert_eq!(cache.get(&key).await, Some(7));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get(&key).await, None, "expires exactly at the TTL");
        assert_eq!(cache.len().await, 1, "stale entries are ignored, not removed");
    }

    #[tokio::test]
    async fn test_set_overwrites_and_restarts_ttl() {
        let clock = clock();
        let cache: StatsCache<&'static str> = StatsCache::new(clock.clone(), DEFAULT_TTL, 8);
        let key = CacheKey::Overview;

        cache.set(&key, "old", cache.generation()).await;
        clock.advance(Duration::from_secs(200));
        cache.set(&key, "new", cache.generation()).await;
        clock.advance(Duration::from_secs(200));

        assert_eq!(cache.get(&key).await, Some("new"));
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let cache: StatsCache<u32> = StatsCache::new(clock(), DEFAULT_TTL, 8);
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();

        cache.set(&CacheKey::Period(PeriodKind::Month), 1, cache.generation()).await;
        cache.set(&CacheKey::CustomPeriod(PeriodKind::Month, date), 2, cache.generation()).await;
        cache.set(&CacheKey::Period(PeriodKind::Year), 3, cache.generation()).await;

        assert_eq!(cache.get(&CacheKey::Period(PeriodKind::Month)).await, Some(1));
        assert_eq!(
            cache.get(&CacheKey::CustomPeriod(PeriodKind::Month, date)).await,
            Some(2)
        );
        assert_eq!(cache.get(&CacheKey::Period(PeriodKind::Quarter)).await, None);
    }

    #[tokio::test]
    async fn test_capacity_purges_expired_first() {
        let clock = clock();
        let cache: StatsCache<u32> = StatsCache::new(clock.clone(), DEFAULT_TTL, 2);
        let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();

        cache.set(&CacheKey::CustomPeriod(PeriodKind::Month, day(1)), 1, cache.generation()).await;
        clock.advance(DEFAULT_TTL);
        cache.set(&CacheKey::CustomPeriod(PeriodKind::Month, day(2)), 2, cache.generation()).await;
        cache.set(&CacheKey::CustomPeriod(PeriodKind::Month, day(3)), 3, cache.generation()).await;

        assert_eq!(cache.len().await, 2);
        assert_eq!(
            cache.get(&CacheKey::CustomPeriod(PeriodKind::Month, day(2))).await,
            Some(2)
        );
        assert_eq!(
            cache.get(&CacheKey::CustomPeriod(PeriodKind::Month, day(3))).await,
            Some(3)
        );
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let clock = clock();
        let cache: StatsCache<u32> = StatsCache::new(clock.clone(), DEFAULT_TTL, 2);

        cache.set(&CacheKey::Period(PeriodKind::Month), 1, cache.generation()).await;
        clock.advance(Duration::from_secs(1));
        cache.set(&CacheKey::Period(PeriodKind::Quarter), 2, cache.generation()).await;
        clock.advance(Duration::from_secs(1));
        cache.set(&CacheKey::Period(PeriodKind::Year), 3, cache.generation()).await;

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get(&CacheKey::Period(PeriodKind::Month)).await, None);
        assert_eq!(cache.get(&CacheKey::Period(PeriodKind::Year)).await, Some(3));
    }

    #[tokio::test]
    async fn test_purge_and_clear() {
        let clock = clock();
        let cache: StatsCache<u32> = StatsCache::new(clock.clone(), DEFAULT_TTL, 8);

        cache.set(&CacheKey::Overview, 1, cache.generation()).await;
        clock.advance(DEFAULT_TTL);
        cache.set(&CacheKey::Period(PeriodKind::Year), 2, cache.generation()).await;

        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.len().await, 1);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_value_computed_before_clear_is_discarded() {
        let cache: StatsCache<u32> = StatsCache::new(clock(), DEFAULT_TTL, 8);
        let key = CacheKey::Period(PeriodKind::Month);

        // A reader misses and starts computing from the old data
        assert_eq!(cache.get(&key).await, None);
        let generation = cache.generation();

        // A write lands and invalidates before the reader stores its result
        cache.clear().await;
        assert!(!cache.set(&key, 100, generation).await);
        assert_eq!(cache.get(&key).await, None);

        // The next reader starts after the write and is cached as usual
        assert!(cache.set(&key, 150, cache.generation()).await);
        assert_eq!(cache.get(&key).await, Some(150));
    }
}
