//! Request admission.
//!
//! Admission validates a request, resolves the user's balance and routes a
//! work item to the settlement channel for its operation type. It never writes
//! to the ledger.
//!
//! The balance check and the eventual record write are not atomic: two
//! requests admitted back to back both see the same balance. Settlement
//! re-checks before it writes.

use std::sync::Arc;

use tally_core::{
    check_sufficient_balance, Channel, OperationRequest, RecordId, Result, UserId, WorkItem,
};

use crate::ledger::balance::BalanceResolver;
use crate::ledger::catalog::Catalog;
use crate::queue::Transport;

/// An accepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admitted {
    /// Id the settled record will have.
    pub record_id: RecordId,
    /// Transport message id of the routed work item.
    pub message_id: String,
    /// Channel the work item was routed to.
    pub channel: Channel,
}

/// The request pipeline.
#[derive(Clone)]
pub struct Admission {
    resolver: BalanceResolver,
    catalog: Catalog,
    transport: Arc<dyn Transport>,
}

impl Admission {
    /// Create a pipeline routing through `transport`.
    pub fn new(resolver: BalanceResolver, catalog: Catalog, transport: Arc<dyn Transport>) -> Self {
        Self {
            resolver,
            catalog,
            transport,
        }
    }

    /// Validate, check funds and route one request.
    pub async fn admit(&self, user_id: UserId, request: &OperationRequest) -> Result<Admitted> {
        let validated = request.validate()?;
        let operation = self.catalog.find_by_type(validated.operation_type)?;

        let snapshot = self.resolver.snapshot(&user_id)?;
        if snapshot.is_first_operation() {
            tracing::debug!(user_id = %user_id, "First operation, initial balance applies");
        } else {
            check_sufficient_balance(snapshot.balance, operation.cost)?;
        }

        let record_id = RecordId::generate();
        let channel = validated.operation_type.channel();
        let cost = operation.cost;
        let item = WorkItem::new(user_id, record_id, validated.payload, operation);

        let message_id = self.transport.publish(channel, item.to_message()?).await?;

        tracing::info!(
            user_id = %user_id,
            record_id = %record_id,
            operation_type = %validated.operation_type,
            cost = cost,
            balance = snapshot.balance,
            channel = %channel,
            message_id = %message_id,
            "Operation request admitted"
        );

        Ok(Admitted {
            record_id,
            message_id,
            channel,
        })
    }
}
