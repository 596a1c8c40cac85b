//! Application state.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use tally_core::Result;
use tally_store::Store;

use crate::config::ServiceConfig;
use crate::ledger::{Admission, BalanceResolver, Catalog, RecordQueries, Settlement};
use crate::queue::{self, DeadLetterSink, InProcessQueue, QueueReceivers};
use crate::random_org::{RandomOrgClient, RandomSource, RandomStringCache};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Balance resolution.
    pub resolver: BalanceResolver,

    /// Operation catalog.
    pub catalog: Catalog,

    /// Record polling and listing.
    pub records: RecordQueries,

    /// Request admission.
    pub admission: Admission,

    /// Settlement shared by the workers.
    pub settlement: Arc<Settlement>,

    /// Failed work items.
    pub dead_letters: Arc<DeadLetterSink>,

    receivers: Arc<Mutex<Option<QueueReceivers>>>,
}

impl AppState {
    /// Create a new application state, seeding the catalog if configured.
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Result<Self> {
        let catalog = Catalog::new(store.clone());
        if config.seed_operations {
            catalog.seed_if_empty()?;
        }

        let random_source: Option<Arc<dyn RandomSource>> =
            config.random_org_url.as_ref().and_then(|url| {
                match RandomOrgClient::new(
                    url.as_str(),
                    Duration::from_secs(config.random_org_timeout_seconds),
                ) {
                    Ok(client) => {
                        tracing::info!(random_org_url = %url, "random.org integration enabled");
                        Some(Arc::new(client.with_retry(
                            config.random_org_max_retries,
                            config.random_org_backoff_ms,
                        )) as Arc<dyn RandomSource>)
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to create random.org client");
                        None
                    }
                }
            });

        if random_source.is_none() {
            tracing::warn!("random.org not configured - random strings will be generated locally");
        }

        let random = Arc::new(RandomStringCache::new(
            random_source,
            config.random_string_batch,
            config.random_string_length,
        ));

        let resolver = BalanceResolver::new(store.clone(), config.initial_balance);
        let settlement = Arc::new(
            Settlement::new(store.clone(), resolver.clone(), random).with_guard(
                config.settlement_guard,
                config.settlement_conflict_retries,
            ),
        );

        let (queue, receivers) = InProcessQueue::new();
        let admission = Admission::new(resolver.clone(), catalog.clone(), Arc::new(queue));

        Ok(Self {
            records: RecordQueries::new(store.clone()),
            store,
            config,
            resolver,
            catalog,
            admission,
            settlement,
            dead_letters: Arc::new(DeadLetterSink::new()),
            receivers: Arc::new(Mutex::new(Some(receivers))),
        })
    }

    /// Start the settlement workers. Only the first call spawns anything.
    pub fn spawn_workers(&self) -> Vec<JoinHandle<()>> {
        let receivers = self
            .receivers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match receivers {
            Some(receivers) => {
                queue::spawn_workers(receivers, &self.settlement, &self.dead_letters)
            }
            None => {
                tracing::warn!("Settlement workers already started");
                Vec::new()
            }
        }
    }
}
