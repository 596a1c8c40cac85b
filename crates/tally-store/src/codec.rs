//! Mapping between ledger entities and keyspace rows.
//!
//! # Keyspace
//!
//! | Entity    | PK          | SK                  | GSI1SK                | GSI2SK                |
//! |-----------|-------------|---------------------|-----------------------|-----------------------|
//! | Operation | `Operation` | `Operation#{id}`    | `Operation#{TYPE}`    |                       |
//! | Record    | `User#{id}` | `Record#{id}`       | `Record#{date}`       | `Record#{user_balance}` |
//!
//! Index partitions equal the row partition. Numeric sort values are zero
//! padded so that string order is numeric order. Entity ids are not stored as
//! attributes: they are recovered from the primary sort value.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use tally_core::{
    LedgerError, Operation, OperationId, OperationType, RecordId, Record, Result, UserId,
};

use crate::row::{PrimaryKey, Row};

/// Partition holding the operation catalog.
pub const OPERATION_PARTITION: &str = "Operation";

/// Sort value prefix of operation rows.
pub const OPERATION_PREFIX: &str = "Operation#";

/// Sort value prefix of record rows in every index.
pub const RECORD_PREFIX: &str = "Record#";

/// Partition value prefix of user partitions.
pub const USER_PREFIX: &str = "User#";

/// `entity` attribute of operation rows.
pub const OPERATION_ENTITY: &str = "OPERATION";

/// `entity` attribute of record rows.
pub const RECORD_ENTITY: &str = "RECORD";

const ENTITY: &str = "entity";

/// Partition value of a user's records.
#[must_use]
pub fn user_partition(user_id: &UserId) -> String {
    format!("{USER_PREFIX}{user_id}")
}

/// Zero-padded numeric sort value, e.g. `Record#00000000000000000042`.
///
/// Negative values clamp to zero; the keyspace has no negative dates or
/// balances.
#[must_use]
pub fn numeric_key(prefix: &str, value: i64) -> String {
    format!("{prefix}{:020}", value.max(0))
}

/// Secondary-1 sort value of a record settled at `date`.
#[must_use]
pub fn record_date_key(date: i64) -> String {
    numeric_key(RECORD_PREFIX, date)
}

/// Secondary-2 sort value of a record leaving `balance`.
#[must_use]
pub fn record_balance_key(balance: i64) -> String {
    numeric_key(RECORD_PREFIX, balance)
}

/// Primary key of a record.
#[must_use]
pub fn record_key(user_id: &UserId, record_id: &RecordId) -> PrimaryKey {
    PrimaryKey::new(user_partition(user_id), format!("{RECORD_PREFIX}{record_id}"))
}

/// Secondary-1 sort value of the operation of `operation_type`.
#[must_use]
pub fn operation_type_key(operation_type: OperationType) -> String {
    format!("{OPERATION_PREFIX}{operation_type}")
}

#[derive(Serialize, Deserialize)]
struct OperationAttributes {
    #[serde(rename = "type")]
    operation_type: OperationType,
    cost: i64,
}

#[derive(Serialize, Deserialize)]
struct RecordAttributes {
    operation_id: OperationId,
    amount: i64,
    user_balance: i64,
    operation_response: String,
    date: i64,
    #[serde(default)]
    deleted: bool,
}

/// Build the catalog row for a new operation, assigning a fresh id.
///
/// # Errors
///
/// Returns `Decode` if the attributes cannot be represented (never in practice).
pub fn encode_operation(operation_type: OperationType, cost: i64) -> Result<Row> {
    let operation_id = OperationId::generate();
    let attributes = to_attributes(
        OPERATION_ENTITY,
        &OperationAttributes {
            operation_type,
            cost,
        },
    )?;
    let mut row = Row::new(OPERATION_PARTITION, format!("{OPERATION_PREFIX}{operation_id}"))
        .with_gsi1(OPERATION_PARTITION, operation_type_key(operation_type));
    row.attributes = attributes;
    Ok(row)
}

/// Map a catalog row back to an [`Operation`].
///
/// # Errors
///
/// Returns `Decode` for a row that is not a well-formed operation.
pub fn decode_operation(row: &Row) -> Result<Operation> {
    check_entity(row, OPERATION_ENTITY)?;
    let operation_id = sort_suffix(&row.sk)?
        .parse::<OperationId>()
        .map_err(|e| LedgerError::decode(format!("operation id in {}: {e}", row.sk)))?;
    let attributes: OperationAttributes = from_attributes(row)?;
    Ok(Operation {
        operation_id,
        operation_type: attributes.operation_type,
        cost: attributes.cost,
    })
}

/// Build the row of a ledger record. A negative balance is stored as zero.
///
/// # Errors
///
/// Returns `Decode` if the attributes cannot be represented (never in practice).
pub fn encode_record(record: &Record) -> Result<Row> {
    let user_balance = record.user_balance.max(0);
    let key = record_key(&record.user_id, &record.record_id);
    let attributes = to_attributes(
        RECORD_ENTITY,
        &RecordAttributes {
            operation_id: record.operation_id,
            amount: record.amount,
            user_balance,
            operation_response: record.operation_response.clone(),
            date: record.date,
            deleted: record.deleted,
        },
    )?;
    let mut row = Row::new(key.partition.clone(), key.sort)
        .with_gsi1(key.partition.clone(), record_date_key(record.date))
        .with_gsi2(key.partition, record_balance_key(user_balance));
    row.attributes = attributes;
    Ok(row)
}

/// Map a ledger row back to a [`Record`].
///
/// # Errors
///
/// Returns `Decode` for a row that is not a well-formed record, including a
/// sort value without the `#` delimiter.
pub fn decode_record(row: &Row) -> Result<Record> {
    check_entity(row, RECORD_ENTITY)?;
    let record_id = sort_suffix(&row.sk)?
        .parse::<RecordId>()
        .map_err(|e| LedgerError::decode(format!("record id in {}: {e}", row.sk)))?;
    let user_id = row
        .pk
        .strip_prefix(USER_PREFIX)
        .ok_or_else(|| LedgerError::decode(format!("not a user partition: {}", row.pk)))?
        .parse::<UserId>()
        .map_err(|e| LedgerError::decode(format!("user id in {}: {e}", row.pk)))?;
    let attributes: RecordAttributes = from_attributes(row)?;
    Ok(Record {
        record_id,
        user_id,
        operation_id: attributes.operation_id,
        amount: attributes.amount,
        user_balance: attributes.user_balance,
        operation_response: attributes.operation_response,
        date: attributes.date,
        deleted: attributes.deleted,
    })
}

/// The id part of a `Prefix#{id}` sort value.
fn sort_suffix(sort: &str) -> Result<&str> {
    sort.split_once('#')
        .map(|(_, id)| id)
        .ok_or_else(|| LedgerError::decode(format!("sort key without delimiter: {sort}")))
}

fn check_entity(row: &Row, expected: &str) -> Result<()> {
    match row.attribute(ENTITY).and_then(Value::as_str) {
        Some(entity) if entity == expected => Ok(()),
        other => Err(LedgerError::decode(format!(
            "expected {expected} row at {}/{}, found {other:?}",
            row.pk, row.sk
        ))),
    }
}

fn to_attributes<T: Serialize>(entity: &str, value: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(value).map_err(|e| LedgerError::decode(e.to_string()))? {
        Value::Object(mut attributes) => {
            attributes.insert(ENTITY.into(), Value::from(entity));
            Ok(attributes)
        }
        other => Err(LedgerError::decode(format!("attributes must be an object: {other}"))),
    }
}

fn from_attributes<T: for<'de> Deserialize<'de>>(row: &Row) -> Result<T> {
    serde_json::from_value(Value::Object(row.attributes.clone()))
        .map_err(|e| LedgerError::decode(format!("{}/{}: {e}", row.pk, row.sk)))
}
