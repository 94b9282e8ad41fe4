//! Time-bounded in-memory memoization shared by the upstream sources.
//!
//! One [`CacheStore`] is built per process and cloned into every source that
//! needs it; clones share the same map. Values are stored as JSON so a single
//! store can hold volume series, short-volume rows and snapshots side by side.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::Symbol;

/// Default validity of a cached upstream answer.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3_600);

/// How a pipeline run treats the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Read non-expired entries, write fresh answers. (Default)
    #[default]
    Use,
    /// Invalidate every entry before the run, then behave like `Use`.
    Refresh,
    /// Neither read nor write.
    Bypass,
}

/// Which upstream call a cached value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOperation {
    MarketVolume,
    ShortVolume,
    ShortInterest,
}

impl CacheOperation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MarketVolume => "market_volume",
            Self::ShortVolume => "short_volume",
            Self::ShortInterest => "short_interest",
        }
    }
}

/// Cache key: operation, symbol and an optional window (lookback or date).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub operation: CacheOperation,
    pub symbol: Symbol,
    pub window: Option<String>,
}

impl CacheKey {
    pub fn new(operation: CacheOperation, symbol: &Symbol) -> Self {
        Self {
            operation,
            symbol: symbol.clone(),
            window: None,
        }
    }

    pub fn with_window(mut self, window: impl Display) -> Self {
        self.window = Some(window.to_string());
        self
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.operation.as_str(), self.symbol)?;
        if let Some(window) = &self.window {
            write!(f, ":{window}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    body: String,
    expires_at: Instant,
}

#[derive(Debug)]
struct CacheInner {
    map: HashMap<CacheKey, CacheEntry>,
    default_ttl: Duration,
    bypass: bool,
}

impl CacheInner {
    fn new(default_ttl: Duration) -> Self {
        Self {
            map: HashMap::new(),
            default_ttl,
            bypass: false,
        }
    }

    fn get(&self, key: &CacheKey) -> Option<&str> {
        if self.bypass {
            return None;
        }
        self.map
            .get(key)
            .filter(|entry| Instant::now() < entry.expires_at)
            .map(|entry| entry.body.as_str())
    }

    fn put(&mut self, key: CacheKey, body: String, ttl_override: Option<Duration>) {
        let ttl = ttl_override.unwrap_or(self.default_ttl);
        let expires_at = Instant::now() + ttl;
        self.map.insert(key, CacheEntry { body, expires_at });
    }

    fn clear_expired(&mut self) {
        let now = Instant::now();
        self.map.retain(|_, entry| entry.expires_at > now);
    }
}

/// Thread-safe time-bounded cache for upstream answers.
#[derive(Debug, Clone)]
pub struct CacheStore {
    inner: Arc<tokio::sync::RwLock<CacheInner>>,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl CacheStore {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner::new(default_ttl))),
        }
    }

    /// A store that never keeps anything (TTL is zero).
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Returns the cached value when present, unexpired and decodable as `T`.
    pub async fn get<T>(&self, key: &CacheKey) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let store = self.inner.read().await;
        let body = store.get(key)?;
        match serde_json::from_str(body) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::debug!(%key, %error, "discarding undecodable cache entry");
                None
            }
        }
    }

    /// Stores `value` under `key`; the last writer wins.
    ///
    /// No-op when the store is disabled or the value cannot be serialized.
    pub async fn put<T>(&self, key: CacheKey, value: &T, ttl_override: Option<Duration>)
    where
        T: Serialize,
    {
        let body = match serde_json::to_string(value) {
            Ok(body) => body,
            Err(error) => {
                tracing::debug!(%key, %error, "value not cacheable");
                return;
            }
        };

        let mut store = self.inner.write().await;
        if store.default_ttl == Duration::ZERO || store.bypass {
            return;
        }
        store.put(key, body, ttl_override);
    }

    /// Drops every entry; the next lookups go to the network.
    pub async fn invalidate_all(&self) {
        let mut store = self.inner.write().await;
        store.map.clear();
    }

    pub async fn clear_expired(&self) {
        let mut store = self.inner.write().await;
        store.clear_expired();
    }

    /// Number of entries, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.inner.read().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn is_disabled(&self) -> bool {
        self.inner.read().await.default_ttl == Duration::ZERO
    }

    /// While set, lookups miss and writes are dropped; entries are kept.
    pub async fn set_bypass(&self, bypass: bool) {
        self.inner.write().await.bypass = bypass;
    }

    /// Applies a run's [`CacheMode`]. Returns `true` when the caller must
    /// lift the bypass after the run.
    pub async fn prepare(&self, mode: CacheMode) -> bool {
        match mode {
            CacheMode::Use => false,
            CacheMode::Refresh => {
                self.invalidate_all().await;
                false
            }
            CacheMode::Bypass => {
                self.set_bypass(true).await;
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(operation: CacheOperation, symbol: &str) -> CacheKey {
        CacheKey::new(operation, &Symbol::parse(symbol).expect("valid symbol"))
    }

    #[tokio::test]
    async fn stores_and_overwrites_typed_values() {
        let cache = CacheStore::new(Duration::from_secs(1));
        let aapl = key(CacheOperation::MarketVolume, "AAPL").with_window(60);

        assert!(cache.get::<Vec<u64>>(&aapl).await.is_none());

        cache.put(aapl.clone(), &vec![1_u64, 2, 3], None).await;
        assert_eq!(cache.get::<Vec<u64>>(&aapl).await, Some(vec![1, 2, 3]));

        cache.put(aapl.clone(), &vec![4_u64], None).await;
        assert_eq!(cache.get::<Vec<u64>>(&aapl).await, Some(vec![4]));
    }

    #[tokio::test]
    async fn keys_differ_by_operation_symbol_and_window() {
        let cache = CacheStore::default();
        cache
            .put(key(CacheOperation::ShortVolume, "AAPL").with_window("20240308"), &1_u64, None)
            .await;

        assert!(cache
            .get::<u64>(&key(CacheOperation::ShortVolume, "AAPL").with_window("20240307"))
            .await
            .is_none());
        assert!(cache
            .get::<u64>(&key(CacheOperation::ShortVolume, "MSFT").with_window("20240308"))
            .await
            .is_none());
        assert!(cache
            .get::<u64>(&key(CacheOperation::MarketVolume, "AAPL").with_window("20240308"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn expired_entries_are_not_returned() {
        let cache = CacheStore::new(Duration::from_millis(50));
        let tsla = key(CacheOperation::ShortInterest, "TSLA");

        cache.put(tsla.clone(), &"snapshot", None).await;
        assert!(cache.get::<String>(&tsla).await.is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cache.get::<String>(&tsla).await.is_none());

        cache.clear_expired().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn ttl_override_shortens_validity() {
        let cache = CacheStore::new(Duration::from_secs(60));
        let nvda = key(CacheOperation::MarketVolume, "NVDA");

        cache
            .put(nvda.clone(), &1_u64, Some(Duration::from_millis(50)))
            .await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cache.get::<u64>(&nvda).await.is_none());
    }

    #[tokio::test]
    async fn invalidate_all_drops_everything() {
        let cache = CacheStore::default();
        cache.put(key(CacheOperation::MarketVolume, "AAPL"), &1_u64, None).await;
        cache.put(key(CacheOperation::MarketVolume, "MSFT"), &2_u64, None).await;
        assert_eq!(cache.len().await, 2);

        cache.invalidate_all().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn disabled_store_keeps_nothing() {
        let cache = CacheStore::disabled();
        assert!(cache.is_disabled().await);

        cache.put(key(CacheOperation::MarketVolume, "AAPL"), &1_u64, None).await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn bypass_hides_entries_without_dropping_them() {
        let cache = CacheStore::default();
        let coin = key(CacheOperation::ShortInterest, "COIN");
        cache.put(coin.clone(), &1_u64, None).await;

        assert!(cache.prepare(CacheMode::Bypass).await);
        assert!(cache.get::<u64>(&coin).await.is_none());
        cache.put(coin.clone(), &2_u64, None).await;

        cache.set_bypass(false).await;
        assert_eq!(cache.get::<u64>(&coin).await, Some(1));
    }

    #[tokio::test]
    async fn refresh_mode_clears_before_the_run() {
        let cache = CacheStore::default();
        cache.put(key(CacheOperation::MarketVolume, "AAPL"), &1_u64, None).await;

        assert!(!cache.prepare(CacheMode::Refresh).await);
        assert!(cache.is_empty().await);
    }

    #[test]
    fn key_display_is_stable() {
        let display = key(CacheOperation::ShortVolume, "coin")
            .with_window("20240308")
            .to_string();
        assert_eq!(display, "short_volume:COIN:20240308");
    }

    #[test]
    fn default_mode_is_use() {
        assert_eq!(CacheMode::default(), CacheMode::Use);
    }
}
