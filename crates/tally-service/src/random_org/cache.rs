//! Bounded FIFO cache of random strings.
//!
//! ```text
//! Ready --(last string taken)--> Empty --(next request)--> Refilling
//! Refilling --(remote batch)--> Ready
//! Refilling --(empty batch or error)--> LocalFallback
//! ```
//!
//! A request never fails: when the remote source has nothing to give the cache
//! refills itself with locally generated lowercase strings.

use std::collections::VecDeque;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::Mutex;

use super::client::RandomSource;

/// Where the cache is in its refill cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Holding strings from the remote source.
    Ready,
    /// Nothing left; the next request refills.
    Empty,
    /// A refill is in flight.
    Refilling,
    /// Holding locally generated strings.
    LocalFallback,
}

struct Inner {
    strings: VecDeque<String>,
    state: CacheState,
}

/// Hands out random strings, refilling in batches.
pub struct RandomStringCache {
    source: Option<Arc<dyn RandomSource>>,
    batch: usize,
    length: usize,
    inner: Mutex<Inner>,
}

impl RandomStringCache {
    /// Create an empty cache. Without a `source` every batch is generated
    /// locally.
    #[must_use]
    pub fn new(source: Option<Arc<dyn RandomSource>>, batch: usize, length: usize) -> Self {
        Self {
            source,
            batch: batch.max(1),
            length: length.max(1),
            inner: Mutex::new(Inner {
                strings: VecDeque::with_capacity(batch),
                state: CacheState::Empty,
            }),
        }
    }

    /// Take the oldest cached string, refilling first if the cache is empty.
    pub async fn next(&self) -> String {
        let mut inner = self.inner.lock().await;

        if inner.strings.is_empty() {
            inner.state = CacheState::Refilling;
            let (strings, state) = self.refill().await;
            inner.strings.extend(strings.into_iter().take(self.batch));
            inner.state = state;
        }

        let value = inner
            .strings
            .pop_front()
            .unwrap_or_else(|| generate_local(1, self.length).concat());
        if inner.strings.is_empty() {
            inner.state = CacheState::Empty;
        }
        value
    }

    /// Current refill state.
    pub async fn state(&self) -> CacheState {
        self.inner.lock().await.state
    }

    /// Number of cached strings.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.strings.len()
    }

    /// Whether the cache holds no strings.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn refill(&self) -> (Vec<String>, CacheState) {
        let Some(source) = &self.source else {
            return (generate_local(self.batch, self.length), CacheState::LocalFallback);
        };

        match source.fetch(self.batch, self.length).await {
            Ok(strings) if !strings.is_empty() => {
                tracing::debug!(count = strings.len(), "Cached random strings from random.org");
                (strings, CacheState::Ready)
            }
            Ok(_) => {
                tracing::warn!("random.org returned no strings, quota likely exhausted; generating locally");
                (generate_local(self.batch, self.length), CacheState::LocalFallback)
            }
            Err(e) => {
                tracing::warn!(error = %e, "random.org unavailable; generating locally");
                (generate_local(self.batch, self.length), CacheState::LocalFallback)
            }
        }
    }
}

/// `count` strings of `length` lowercase ASCII letters.
#[must_use]
pub fn generate_local(count: usize, length: usize) -> Vec<String> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| {
            (0..length)
                .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
                .collect()
        })
        .collect()
}
