//! Read-model cache in front of [`crate::api::ApiClient`].
//!
//! Each key tracks its last data plus loading/error metadata. Fresh data is
//! served without a request; stale data is refetched. A failed refetch keeps
//! the previous data so pages can still render it next to the error.
//!
//! Entries live in a bounded moka cache: at most `capacity` keys, each
//! dropped `ttl` after it was last written. Concurrent misses on one key
//! share a single load.

use chrono::{DateTime, Duration, Utc};
use moka::ops::compute::Op;
use serde::Serialize;
use std::future::Future;
use std::time::Duration as StdDuration;

use crate::api::{ApiError, ApiResult};

pub const DEFAULT_CAPACITY: u64 = 1_000;
pub const DEFAULT_TTL_MS: u64 = 600_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub status: QueryStatus,
    pub error: Option<String>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        QueryState {
            data: None,
            status: QueryStatus::Idle,
            error: None,
            fetched_at: None,
        }
    }
}

impl<T> QueryState<T> {
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    /// Stale when never fetched or older than `stale_after`
    pub fn is_stale(&self, now: DateTime<Utc>, stale_after: Duration) -> bool {
        match self.fetched_at {
            Some(at) => now - at >= stale_after,
            None => true,
        }
    }
}

pub struct QueryCache<T> {
    stale_after: Duration,
    entries: moka::future::Cache<String, QueryState<T>>,
    /// Keys with a load in progress; expire on their own if the load is dropped
    inflight: moka::sync::Cache<String, ()>,
}

impl<T: Clone + Send + Sync + 'static> QueryCache<T> {
    pub fn new(stale_ms: u64) -> Self {
        Self::with_limits(stale_ms, DEFAULT_CAPACITY, DEFAULT_TTL_MS)
    }

    pub fn with_limits(stale_ms: u64, capacity: u64, ttl_ms: u64) -> Self {
        QueryCache {
            stale_after: Duration::milliseconds(stale_ms as i64),
            entries: moka::future::Cache::builder()
                .max_capacity(capacity)
                .time_to_live(StdDuration::from_millis(ttl_ms))
                .build(),
            inflight: moka::sync::Cache::builder()
                .max_capacity(capacity)
                .time_to_live(StdDuration::from_millis(ttl_ms))
                .build(),
        }
    }

    pub async fn state(&self, key: &str) -> QueryState<T> {
        let mut state = self.entries.get(key).await.unwrap_or_default();
        if self.inflight.contains_key(key) {
            state.status = QueryStatus::Loading;
        }
        state
    }

    pub async fn is_stale(&self, key: &str, now: DateTime<Utc>) -> bool {
        self.state(key).await.is_stale(now, self.stale_after)
    }

    pub async fn fetch<F, Fut>(&self, key: &str, load: F) -> ApiResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        self.fetch_at(key, Utc::now(), load).await
    }

    /// Serve fresh data from the cache, otherwise run `load` and record the
    /// outcome. Callers racing on the same key wait for the first load and
    /// get its data.
    pub async fn fetch_at<F, Fut>(&self, key: &str, now: DateTime<Utc>, load: F) -> ApiResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let stale_after = self.stale_after;
        let inflight = &self.inflight;
        let mut outcome: Option<ApiResult<T>> = None;
        let slot = &mut outcome;

        self.entries
            .entry(key.to_string())
            .and_compute_with(|entry| async move {
                let current = entry.map(|e| e.into_value()).unwrap_or_default();
                if current.status == QueryStatus::Success && !current.is_stale(now, stale_after) {
                    if let Some(data) = &current.data {
                        log::debug!("[query] hit {key}");
                        *slot = Some(Ok(data.clone()));
                        return Op::Nop;
                    }
                }

                inflight.insert(key.to_string(), ());
                let result = load().await;
                inflight.invalidate(key);

                let next = match &result {
                    Ok(data) => QueryState {
                        data: Some(data.clone()),
                        status: QueryStatus::Success,
                        error: None,
                        fetched_at: Some(now),
                    },
                    Err(e) => {
                        log::warn!("[query] {key} failed: {e}");
                        QueryState {
                            status: QueryStatus::Error,
                            error: Some(e.user_message()),
                            ..current
                        }
                    }
                };
                *slot = Some(result);
                Op::Put(next)
            })
            .await;

        outcome.unwrap_or_else(|| Err(ApiError::Decode(format!("no result recorded for {key}"))))
    }

    /// Mark one key stale; its data stays as the error fallback
    pub async fn invalidate(&self, key: &str) {
        self.entries
            .entry(key.to_string())
            .and_compute_with(|entry| async move {
                match entry {
                    Some(e) => {
                        let mut state = e.into_value();
                        state.fetched_at = None;
                        Op::Put(state)
                    }
                    None => Op::Nop,
                }
            })
            .await;
    }

    /// Mark everything stale (after login/logout the whole page refetches)
    pub async fn invalidate_all(&self) {
        let keys: Vec<String> = self.entries.iter().map(|(k, _)| (*k).clone()).collect();
        for key in keys {
            self.invalidate(&key).await;
        }
    }

    /// Entries currently held, after pending evictions are applied
    pub async fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }
}

/// Keep `ApiError` usable where a cache result is turned into a page error
pub fn not_found_or<T>(res: ApiResult<Option<T>>) -> ApiResult<T> {
    res.and_then(|v| v.ok_or(ApiError::NotFound))
}
