/// Decoding of configuration strings into LibSQL and sqlmap enums
///
/// Settings carry modes and transaction behaviours as plain strings; these helpers turn
/// them into typed values and report anything unrecognised as a configuration error.
use crate::error::{MapperError, Result};
use crate::models::Mode;
use libsql::TransactionBehavior;

/// Decode a connection mode name (`local`, `remote`, `remote_replica`).
pub fn decode_mode(name: &str) -> Option<Mode> {
    match name.trim().to_ascii_lowercase().as_str() {
        "remote_replica" | "replica" => Some(Mode::RemoteReplica),
        "remote" => Some(Mode::Remote),
        "local" => Some(Mode::Local),
        _ => None,
    }
}

/// Decode a transaction behaviour name (`deferred`, `immediate`, `exclusive`, `read_only`).
pub fn decode_transaction_behavior(name: &str) -> Option<TransactionBehavior> {
    match name.trim().to_ascii_lowercase().as_str() {
        "deferred" => Some(TransactionBehavior::Deferred),
        "immediate" => Some(TransactionBehavior::Immediate),
        "exclusive" => Some(TransactionBehavior::Exclusive),
        "read_only" | "readonly" => Some(TransactionBehavior::ReadOnly),
        _ => None,
    }
}

/// Like [`decode_mode`], but unknown names are a configuration error.
pub fn require_mode(name: &str) -> Result<Mode> {
    decode_mode(name)
        .ok_or_else(|| MapperError::configuration(format!("unknown connection mode '{name}'")))
}

/// Like [`decode_transaction_behavior`], but unknown names are a configuration error.
pub fn require_transaction_behavior(name: &str) -> Result<TransactionBehavior> {
    decode_transaction_behavior(name).ok_or_else(|| {
        MapperError::configuration(format!("unknown transaction behavior '{name}'"))
    })
}

/// The SQL that opens a transaction with the given behaviour.
pub fn begin_statement(behavior: TransactionBehavior) -> &'static str {
    match behavior {
        TransactionBehavior::Deferred => "BEGIN DEFERRED",
        TransactionBehavior::Immediate => "BEGIN IMMEDIATE",
        TransactionBehavior::Exclusive => "BEGIN EXCLUSIVE",
        TransactionBehavior::ReadOnly => "BEGIN READONLY",
    }
}
