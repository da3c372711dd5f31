use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::time::MissedTickBehavior;

/// A loaded computational artifact managed by the cache
///
/// The cache is agnostic to the payload's shape beyond its memory footprint
/// and an optional cleanup hook. Consumers that need the concrete type
/// recover it through [`Artifact::as_any`].
pub trait Artifact: std::fmt::Debug + Send + Sync + 'static {
    /// Approximate resident memory footprint in bytes, used for budget
    /// accounting
    fn estimated_size(&self) -> usize;

    /// Best-effort cleanup hook invoked when the entry leaves the cache.
    /// Errors are logged by the cache, never propagated.
    fn on_release(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Eviction priority for a cache entry
///
/// Ordering matters: lower priorities sort first in the eviction order, so
/// `High` entries are evicted only when nothing else remains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePriority {
    Low,
    Normal,
    High,
}

/// Options for a single [`ArtifactCache::acquire`] call
pub struct AcquireOptions {
    pub priority: CachePriority,
    /// Per-call override of the configured load timeout
    pub timeout: Option<Duration>,
    /// Invoked at most once with `100` when the acquire succeeds
    pub on_progress: Option<Box<dyn Fn(u8) + Send + Sync>>,
}

impl Default for AcquireOptions {
    fn default() -> Self {
        Self {
            priority: CachePriority::Normal,
            timeout: None,
            on_progress: None,
        }
    }
}

impl AcquireOptions {
    pub fn with_priority(priority: CachePriority) -> Self {
        Self {
            priority,
            ..Default::default()
        }
    }
}

/// Configuration for [`ArtifactCache`]
///
/// All knobs default to values that make the cache usable with zero
/// configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Memory budget for resident artifacts in bytes
    pub memory_budget_bytes: usize,
    /// Fraction of the budget that resident artifacts must fit under after
    /// an eviction pass
    pub headroom_fraction: f64,
    /// Maximum number of resident entries
    pub max_entries: usize,
    /// Default timeout for a single load
    pub load_timeout: Duration,
    /// Interval between idle-eviction sweeps
    pub sweep_interval: Duration,
    /// Idle age past which a non-High entry is proactively released
    pub max_idle_age: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_budget_bytes: 512 * 1024 * 1024, // 512 MiB
            headroom_fraction: 0.8,
            max_entries: 5,
            load_timeout: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(60),
            max_idle_age: Duration::from_secs(300),
        }
    }
}

/// Errors produced by cache operations
///
/// Each variant carries the artifact identifier and maps to a stable
/// machine-readable code for callers that route on failure kind.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    #[error("artifact load failed for '{identifier}': {reason}")]
    LoadFailed { identifier: String, reason: String },

    #[error("artifact load timed out for '{identifier}' after {timeout_ms}ms")]
    Timeout { identifier: String, timeout_ms: u64 },
}

impl CacheError {
    pub fn identifier(&self) -> &str {
        match self {
            Self::LoadFailed { identifier, .. } => identifier,
            Self::Timeout { identifier, .. } => identifier,
        }
    }

    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::LoadFailed { .. } => "load_failed",
            Self::Timeout { .. } => "load_timeout",
        }
    }
}

/// Runtime counters for cache behavior
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Sum of resident entry sizes at snapshot time
    pub resident_bytes: usize,
    pub resident_entries: usize,
}

impl CacheStats {
    /// Hit rate as a fraction in [0.0, 1.0]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct CacheEntry {
    payload: Arc<dyn Artifact>,
    size_bytes: usize,
    last_accessed: Instant,
    priority: CachePriority,
}

type LoadResult = Result<Arc<dyn Artifact>, CacheError>;

#[derive(Default)]
struct Counters {
    hits: u64,
    misses: u64,
    evictions: u64,
}

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    in_flight: HashMap<String, broadcast::Sender<LoadResult>>,
    counters: Counters,
}

/// Process-wide, priority- and recency-aware artifact cache
///
/// Guarantees at most one resident copy and at most one in-flight load per
/// identifier: concurrent `acquire` calls for the same identifier share a
/// single loader invocation and its result. Memory and entry-count budgets
/// are enforced by evicting low-priority, least-recently-accessed entries
/// first; a background sweeper releases idle entries on a fixed interval.
///
/// Construct one instance per process and hand clones to every consumer;
/// clones share the same underlying store.
#[derive(Clone)]
pub struct ArtifactCache {
    config: CacheConfig,
    inner: Arc<Mutex<CacheInner>>,
    evicting: Arc<AtomicBool>,
}

/// Handle for gracefully shutting down the idle sweeper
pub struct SweeperHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl SweeperHandle {
    /// Signals the sweeper task to stop after its current pass
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache sweeper shutdown signal sent");
    }
}

impl ArtifactCache {
    /// Creates a cache and spawns its background idle sweeper
    pub fn new(config: CacheConfig) -> (Self, SweeperHandle) {
        let cache = Self {
            config: config.clone(),
            inner: Arc::new(Mutex::new(CacheInner {
                entries: HashMap::new(),
                in_flight: HashMap::new(),
                counters: Counters::default(),
            })),
            evicting: Arc::new(AtomicBool::new(false)),
        };

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        tokio::spawn(Self::sweeper_task(
            cache.inner.clone(),
            cache.evicting.clone(),
            config,
            shutdown_rx,
        ));

        (cache, SweeperHandle { shutdown_tx })
    }

    /// Returns the artifact for `identifier`, loading it if necessary
    ///
    /// A resident entry is returned immediately with its recency refreshed.
    /// If a load is already in flight, this call waits on the same pending
    /// result instead of starting a duplicate. Otherwise headroom is ensured
    /// and `loader` runs on a spawned task; the caller waits up to the
    /// configured (or per-call) timeout. A timeout aborts only this caller's
    /// wait, not the load itself.
    pub async fn acquire<F, Fut>(
        &self,
        identifier: &str,
        loader: F,
        options: AcquireOptions,
    ) -> Result<Arc<dyn Artifact>, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Arc<dyn Artifact>>> + Send + 'static,
    {
        let timeout = options.timeout.unwrap_or(self.config.load_timeout);

        let mut rx = {
            let mut inner = self.inner.lock().await;

            if let Some(entry) = inner.entries.get_mut(identifier) {
                entry.last_accessed = Instant::now();
                let payload = entry.payload.clone();
                inner.counters.hits += 1;
                if let Some(progress) = &options.on_progress {
                    progress(100);
                }
                return Ok(payload);
            }

            if let Some(pending) = inner.in_flight.get(identifier) {
                pending.subscribe()
            } else {
                inner.counters.misses += 1;
                self.evict_for_headroom(&mut inner, 0);

                let (tx, rx) = broadcast::channel(1);
                inner.in_flight.insert(identifier.to_string(), tx.clone());
                drop(inner);

                self.spawn_load(identifier.to_string(), loader(), options.priority, tx);
                rx
            }
        };

        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Ok(result)) => {
                let payload = result?;
                if let Some(progress) = &options.on_progress {
                    progress(100);
                }
                Ok(payload)
            }
            Ok(Err(_closed)) => Err(CacheError::LoadFailed {
                identifier: identifier.to_string(),
                reason: "load task terminated unexpectedly".to_string(),
            }),
            Err(_elapsed) => Err(CacheError::Timeout {
                identifier: identifier.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Removes a resident entry, invoking its cleanup hook
    ///
    /// Returns whether an entry was removed. Cleanup errors are logged, not
    /// propagated.
    pub async fn release(&self, identifier: &str) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.entries.remove(identifier) {
            Some(entry) => {
                Self::run_release_hook(identifier, &entry);
                tracing::debug!(identifier = %identifier, "Released cache entry");
                true
            }
            None => false,
        }
    }

    pub async fn contains(&self, identifier: &str) -> bool {
        self.inner.lock().await.entries.contains_key(identifier)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.entries.is_empty()
    }

    /// Snapshot of the cache's runtime counters
    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().await;
        CacheStats {
            hits: inner.counters.hits,
            misses: inner.counters.misses,
            evictions: inner.counters.evictions,
            resident_bytes: inner.entries.values().map(|e| e.size_bytes).sum(),
            resident_entries: inner.entries.len(),
        }
    }

    /// Runs the loader on its own task so caller timeouts do not cancel it
    fn spawn_load<Fut>(
        &self,
        identifier: String,
        load: Fut,
        priority: CachePriority,
        tx: broadcast::Sender<LoadResult>,
    ) where
        Fut: Future<Output = anyhow::Result<Arc<dyn Artifact>>> + Send + 'static,
    {
        let inner_handle = self.inner.clone();
        let config = self.config.clone();
        let evicting = self.evicting.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            let result = match load.await {
                Ok(payload) => {
                    let size_bytes = payload.estimated_size();
                    let mut inner = inner_handle.lock().await;
                    Self::evict_for_headroom_locked(&config, &evicting, &mut inner, size_bytes);
                    inner.entries.insert(
                        identifier.clone(),
                        CacheEntry {
                            payload: payload.clone(),
                            size_bytes,
                            last_accessed: Instant::now(),
                            priority,
                        },
                    );
                    inner.in_flight.remove(&identifier);
                    tracing::info!(
                        identifier = %identifier,
                        size_bytes,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Artifact loaded"
                    );
                    Ok(payload)
                }
                Err(e) => {
                    let mut inner = inner_handle.lock().await;
                    inner.in_flight.remove(&identifier);
                    tracing::error!(identifier = %identifier, error = %e, "Artifact load failed");
                    Err(CacheError::LoadFailed {
                        identifier: identifier.clone(),
                        reason: e.to_string(),
                    })
                }
            };
            // Waiters may all have timed out already; a send error is fine
            let _ = tx.send(result);
        });
    }

    fn evict_for_headroom(&self, inner: &mut CacheInner, incoming_bytes: usize) {
        Self::evict_for_headroom_locked(&self.config, &self.evicting, inner, incoming_bytes);
    }

    /// Evicts entries until `incoming_bytes` fits under the headroom
    /// watermark and a slot is free, or nothing evictable remains
    ///
    /// Candidates are ordered by (priority, last-accessed): High entries sort
    /// last and go only when no other choice exists.
    fn evict_for_headroom_locked(
        config: &CacheConfig,
        evicting: &AtomicBool,
        inner: &mut CacheInner,
        incoming_bytes: usize,
    ) {
        let watermark = (config.memory_budget_bytes as f64 * config.headroom_fraction) as usize;
        evicting.store(true, Ordering::SeqCst);
        loop {
            let resident: usize = inner.entries.values().map(|e| e.size_bytes).sum();
            let over_memory = resident + incoming_bytes > watermark;
            let over_count = inner.entries.len() >= config.max_entries;
            if !over_memory && !over_count {
                break;
            }

            let victim = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| (e.priority, e.last_accessed))
                .map(|(key, _)| key.clone());
            let Some(key) = victim else {
                break;
            };

            if let Some(entry) = inner.entries.remove(&key) {
                inner.counters.evictions += 1;
                Self::run_release_hook(&key, &entry);
                tracing::debug!(
                    identifier = %key,
                    priority = ?entry.priority,
                    size_bytes = entry.size_bytes,
                    "Evicted cache entry for headroom"
                );
            }
        }
        evicting.store(false, Ordering::SeqCst);
    }

    fn run_release_hook(identifier: &str, entry: &CacheEntry) {
        if let Err(e) = entry.payload.on_release() {
            tracing::warn!(identifier = %identifier, error = %e, "Artifact cleanup hook failed");
        }
    }

    /// Background task that periodically releases idle entries
    ///
    /// Skips a pass while a budget-pressure eviction is in progress.
    async fn sweeper_task(
        inner: Arc<Mutex<CacheInner>>,
        evicting: Arc<AtomicBool>,
        config: CacheConfig,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!(
            interval_ms = config.sweep_interval.as_millis() as u64,
            max_idle_ms = config.max_idle_age.as_millis() as u64,
            "Cache sweeper started"
        );
        let mut ticker = tokio::time::interval(config.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if evicting.load(Ordering::SeqCst) {
                        continue;
                    }
                    Self::sweep_idle(&inner, config.max_idle_age).await;
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Cache sweeper stopped");
                    break;
                }
            }
        }
    }

    async fn sweep_idle(inner: &Mutex<CacheInner>, max_idle_age: Duration) {
        let mut inner = inner.lock().await;
        let stale: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| {
                e.priority != CachePriority::High && e.last_accessed.elapsed() > max_idle_age
            })
            .map(|(key, _)| key.clone())
            .collect();

        for key in stale {
            if let Some(entry) = inner.entries.remove(&key) {
                Self::run_release_hook(&key, &entry);
                tracing::debug!(
                    identifier = %key,
                    idle_ms = entry.last_accessed.elapsed().as_millis() as u64,
                    "Swept idle cache entry"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU8, AtomicUsize};

    #[derive(Debug)]
    struct TestArtifact {
        size: usize,
        released: Arc<AtomicBool>,
        fail_release: bool,
    }

    impl TestArtifact {
        fn plain(size: usize) -> Arc<dyn Artifact> {
            Arc::new(Self {
                size,
                released: Arc::new(AtomicBool::new(false)),
                fail_release: false,
            })
        }
    }

    impl Artifact for TestArtifact {
        fn estimated_size(&self) -> usize {
            self.size
        }

        fn on_release(&self) -> anyhow::Result<()> {
            self.released.store(true, Ordering::SeqCst);
            if self.fail_release {
                anyhow::bail!("cleanup failed");
            }
            Ok(())
        }

        fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    fn test_config() -> CacheConfig {
        CacheConfig {
            memory_budget_bytes: 1024,
            max_entries: 8,
            ..Default::default()
        }
    }

    async fn acquire_simple(cache: &ArtifactCache, id: &str, priority: CachePriority) {
        cache
            .acquire(
                id,
                || async { Ok(TestArtifact::plain(10)) },
                AcquireOptions::with_priority(priority),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_acquire_loads_and_stores() {
        let (cache, _sweeper) = ArtifactCache::new(test_config());
        let payload = cache
            .acquire(
                "model-a",
                || async { Ok(TestArtifact::plain(64)) },
                AcquireOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(payload.estimated_size(), 64);
        assert!(cache.contains("model-a").await);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_resident_hit_skips_loader() {
        let (cache, _sweeper) = ArtifactCache::new(test_config());
        let loads = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let loads = loads.clone();
            cache
                .acquire(
                    "model-a",
                    move || async move {
                        loads.fetch_add(1, Ordering::SeqCst);
                        Ok(TestArtifact::plain(10))
                    },
                    AcquireOptions::default(),
                )
                .await
                .unwrap();
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        let stats = cache.stats().await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_concurrent_acquires_share_one_load() {
        let (cache, _sweeper) = ArtifactCache::new(test_config());
        let loads = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let loads = loads.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .acquire(
                        "shared-model",
                        move || async move {
                            loads.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok(TestArtifact::plain(10))
                        },
                        AcquireOptions::default(),
                    )
                    .await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_load_failure_leaves_no_entry_and_clears_in_flight() {
        let (cache, _sweeper) = ArtifactCache::new(test_config());

        let err = cache
            .acquire(
                "broken",
                || async { anyhow::bail!("source data missing") },
                AcquireOptions::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.code(), "load_failed");
        assert_eq!(err.identifier(), "broken");
        assert!(!cache.contains("broken").await);

        // The in-flight marker is gone, so a retry runs a fresh loader
        let loads = Arc::new(AtomicUsize::new(0));
        let loads_clone = loads.clone();
        cache
            .acquire(
                "broken",
                move || async move {
                    loads_clone.fetch_add(1, Ordering::SeqCst);
                    Ok(TestArtifact::plain(10))
                },
                AcquireOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(cache.contains("broken").await);
    }

    #[tokio::test]
    async fn test_caller_timeout_does_not_cancel_load() {
        let (cache, _sweeper) = ArtifactCache::new(test_config());

        let err = cache
            .acquire(
                "slow-model",
                || async {
                    tokio::time::sleep(Duration::from_millis(150)).await;
                    Ok(TestArtifact::plain(10))
                },
                AcquireOptions {
                    timeout: Some(Duration::from_millis(20)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.code(), "load_timeout");
        assert_eq!(err.identifier(), "slow-model");
        assert!(!cache.contains("slow-model").await);

        // The load keeps running in the background and lands eventually
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(cache.contains("slow-model").await);
    }

    #[tokio::test]
    async fn test_eviction_prefers_lru_normal_over_high() {
        let config = CacheConfig {
            max_entries: 3,
            ..test_config()
        };
        let (cache, _sweeper) = ArtifactCache::new(config);

        acquire_simple(&cache, "a", CachePriority::Normal).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        acquire_simple(&cache, "b", CachePriority::Normal).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        acquire_simple(&cache, "c", CachePriority::High).await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        // Touch "a" so "b" becomes the least-recently-accessed Normal entry
        acquire_simple(&cache, "a", CachePriority::Normal).await;

        acquire_simple(&cache, "d", CachePriority::Normal).await;

        assert!(cache.contains("a").await);
        assert!(!cache.contains("b").await);
        assert!(cache.contains("c").await);
        assert!(cache.contains("d").await);
    }

    #[tokio::test]
    async fn test_resident_count_never_exceeds_max() {
        let config = CacheConfig {
            max_entries: 2,
            ..test_config()
        };
        let (cache, _sweeper) = ArtifactCache::new(config);

        for i in 0..5 {
            acquire_simple(&cache, &format!("model-{i}"), CachePriority::Normal).await;
            assert!(cache.len().await <= 2);
        }
        assert_eq!(cache.len().await, 2);
        assert!(cache.stats().await.evictions >= 3);
    }

    #[tokio::test]
    async fn test_memory_budget_evicts_before_insert() {
        let config = CacheConfig {
            memory_budget_bytes: 100,
            headroom_fraction: 0.8,
            ..test_config()
        };
        let (cache, _sweeper) = ArtifactCache::new(config);

        cache
            .acquire(
                "big-a",
                || async { Ok(TestArtifact::plain(60)) },
                AcquireOptions::default(),
            )
            .await
            .unwrap();
        cache
            .acquire(
                "big-b",
                || async { Ok(TestArtifact::plain(60)) },
                AcquireOptions::default(),
            )
            .await
            .unwrap();

        // 60 + 60 exceeds the 80-byte watermark, so "big-a" must go
        assert!(!cache.contains("big-a").await);
        assert!(cache.contains("big-b").await);
        assert!(cache.stats().await.resident_bytes <= 80);
    }

    #[tokio::test]
    async fn test_release_reports_and_invokes_hook() {
        let (cache, _sweeper) = ArtifactCache::new(test_config());
        let released = Arc::new(AtomicBool::new(false));
        let flag = released.clone();

        cache
            .acquire(
                "model-a",
                move || async move {
                    Ok(Arc::new(TestArtifact {
                        size: 10,
                        released: flag,
                        fail_release: false,
                    }) as Arc<dyn Artifact>)
                },
                AcquireOptions::default(),
            )
            .await
            .unwrap();

        assert!(cache.release("model-a").await);
        assert!(released.load(Ordering::SeqCst));
        assert!(!cache.release("model-a").await);
        assert!(!cache.release("never-loaded").await);
    }

    #[tokio::test]
    async fn test_release_hook_error_is_contained() {
        let (cache, _sweeper) = ArtifactCache::new(test_config());

        cache
            .acquire(
                "fragile",
                || async {
                    Ok(Arc::new(TestArtifact {
                        size: 10,
                        released: Arc::new(AtomicBool::new(false)),
                        fail_release: true,
                    }) as Arc<dyn Artifact>)
                },
                AcquireOptions::default(),
            )
            .await
            .unwrap();

        // The hook error is logged, not propagated
        assert!(cache.release("fragile").await);
        assert!(!cache.contains("fragile").await);
    }

    #[tokio::test]
    async fn test_idle_sweep_releases_stale_entries_but_keeps_high() {
        let config = CacheConfig {
            sweep_interval: Duration::from_millis(25),
            max_idle_age: Duration::from_millis(50),
            ..test_config()
        };
        let (cache, _sweeper) = ArtifactCache::new(config);

        acquire_simple(&cache, "stale-normal", CachePriority::Normal).await;
        acquire_simple(&cache, "pinned-high", CachePriority::High).await;

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(!cache.contains("stale-normal").await);
        assert!(cache.contains("pinned-high").await);
    }

    #[tokio::test]
    async fn test_progress_callback_fires_once_with_100() {
        let (cache, _sweeper) = ArtifactCache::new(test_config());
        let reported = Arc::new(AtomicU8::new(0));
        let calls = Arc::new(AtomicUsize::new(0));

        let reported_clone = reported.clone();
        let calls_clone = calls.clone();
        cache
            .acquire(
                "model-a",
                || async { Ok(TestArtifact::plain(10)) },
                AcquireOptions {
                    on_progress: Some(Box::new(move |value| {
                        reported_clone.store(value, Ordering::SeqCst);
                        calls_clone.fetch_add(1, Ordering::SeqCst);
                    })),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(reported.load(Ordering::SeqCst), 100);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_load_not_reported_as_progress() {
        let (cache, _sweeper) = ArtifactCache::new(test_config());
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_clone = calls.clone();
        let result = cache
            .acquire(
                "broken",
                || async { anyhow::bail!("no data") },
                AcquireOptions {
                    on_progress: Some(Box::new(move |_| {
                        calls_clone.fetch_add(1, Ordering::SeqCst);
                    })),
                    ..Default::default()
                },
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
