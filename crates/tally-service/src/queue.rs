//! In-process message transport.
//!
//! Admission publishes JSON work items onto one of two channels; one worker
//! per channel settles them. Items that fail settlement for any reason other
//! than insufficient funds end up in the [`DeadLetterSink`].

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use tally_core::{Channel, LedgerError, Result, WorkItem};

use crate::ledger::settlement::{Settlement, SettlementOutcome};

/// Publishes work items to a settlement channel.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Publish `payload` on `channel` and return the message id.
    async fn publish(&self, channel: Channel, payload: String) -> Result<String>;
}

/// A message as delivered to a worker.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    /// Transport-assigned id.
    pub message_id: String,
    /// JSON work item.
    pub payload: String,
}

/// Receiving ends of the two channels.
pub struct QueueReceivers {
    /// Arithmetic channel.
    pub arithmetic: mpsc::UnboundedReceiver<QueueMessage>,
    /// Random string channel.
    pub random_string: mpsc::UnboundedReceiver<QueueMessage>,
}

/// Unbounded tokio channels, one per [`Channel`].
#[derive(Clone)]
pub struct InProcessQueue {
    arithmetic: mpsc::UnboundedSender<QueueMessage>,
    random_string: mpsc::UnboundedSender<QueueMessage>,
}

impl InProcessQueue {
    /// Create the queue and its receivers.
    #[must_use]
    pub fn new() -> (Self, QueueReceivers) {
        let (arithmetic, arithmetic_rx) = mpsc::unbounded_channel();
        let (random_string, random_string_rx) = mpsc::unbounded_channel();
        (
            Self {
                arithmetic,
                random_string,
            },
            QueueReceivers {
                arithmetic: arithmetic_rx,
                random_string: random_string_rx,
            },
        )
    }
}

#[async_trait]
impl Transport for InProcessQueue {
    async fn publish(&self, channel: Channel, payload: String) -> Result<String> {
        let message_id = Uuid::new_v4().to_string();
        let sender = match channel {
            Channel::Arithmetic => &self.arithmetic,
            Channel::RandomString => &self.random_string,
        };

        sender
            .send(QueueMessage {
                message_id: message_id.clone(),
                payload,
            })
            .map_err(|_| LedgerError::Transport(format!("{channel} channel is closed")))?;

        tracing::debug!(channel = %channel, message_id = %message_id, "Work item published");
        Ok(message_id)
    }
}

/// A work item that could not be settled.
#[derive(Debug, Clone, Serialize)]
pub struct DeadLetter {
    /// Channel the item arrived on.
    pub channel: Channel,
    /// Transport message id.
    pub message_id: String,
    /// Raw message body.
    pub payload: String,
    /// Why settlement failed.
    pub reason: String,
    /// When it failed.
    pub failed_at: DateTime<Utc>,
}

/// Collects dead letters for the operational layer.
#[derive(Debug, Default)]
pub struct DeadLetterSink {
    letters: Mutex<Vec<DeadLetter>>,
}

impl DeadLetterSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed message.
    pub fn push(&self, letter: DeadLetter) {
        self.letters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(letter);
    }

    /// All dead letters so far, oldest first.
    #[must_use]
    pub fn list(&self) -> Vec<DeadLetter> {
        self.letters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of dead letters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.letters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no message has failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Settle messages from `rx` until the channel closes.
pub async fn run_worker(
    channel: Channel,
    mut rx: mpsc::UnboundedReceiver<QueueMessage>,
    settlement: Arc<Settlement>,
    dead_letters: Arc<DeadLetterSink>,
) {
    tracing::info!(channel = %channel, "Settlement worker started");

    while let Some(message) = rx.recv().await {
        let result = match WorkItem::from_message(&message.payload) {
            Ok(item) => settlement.settle(&item).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(SettlementOutcome::Settled(record)) => {
                tracing::info!(
                    channel = %channel,
                    message_id = %message.message_id,
                    record_id = %record.record_id,
                    "Work item settled"
                );
            }
            Ok(SettlementOutcome::Dropped { balance, required }) => {
                tracing::warn!(
                    channel = %channel,
                    message_id = %message.message_id,
                    balance = balance,
                    required = required,
                    "Work item dropped"
                );
            }
            Err(e) => {
                tracing::error!(
                    channel = %channel,
                    message_id = %message.message_id,
                    error = %e,
                    "Settlement failed, dead-lettering"
                );
                dead_letters.push(DeadLetter {
                    channel,
                    message_id: message.message_id,
                    payload: message.payload,
                    reason: e.to_string(),
                    failed_at: Utc::now(),
                });
            }
        }
    }

    tracing::info!(channel = %channel, "Settlement worker stopped");
}

/// Spawn one worker per channel.
pub fn spawn_workers(
    receivers: QueueReceivers,
    settlement: &Arc<Settlement>,
    dead_letters: &Arc<DeadLetterSink>,
) -> Vec<JoinHandle<()>> {
    vec![
        tokio::spawn(run_worker(
            Channel::Arithmetic,
            receivers.arithmetic,
            settlement.clone(),
            dead_letters.clone(),
        )),
        tokio::spawn(run_worker(
            Channel::RandomString,
            receivers.random_string,
            settlement.clone(),
            dead_letters.clone(),
        )),
    ]
}
