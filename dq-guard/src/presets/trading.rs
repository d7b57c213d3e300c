//! The trading platform checkpoint: `users` then `trades`.
//!
//! `trades.server_hash` and `trades.login_hash` must appear in the values
//! extracted from the validated `users` batch, so `users` always runs first.
//!
//! ```rust
//! use dq_guard::presets::trading;
//!
//! let checkpoint = trading::checkpoint(vec![]).unwrap();
//! assert_eq!(checkpoint.steps().len(), 2);
//! ```

use crate::actions::ResultSink;
use crate::core::{Checkpoint, SemanticType, SuiteDefinition, Table};
use crate::prelude::*;
use std::sync::Arc;

pub const CHECKPOINT_NAME: &str = "trading";
pub const USERS_SUITE: &str = "users_suite";
pub const TRADES_SUITE: &str = "trades_suite";

const HEX: &str = "^[A-F0-9]+$";
const ALPHANUMERIC: &str = "^[A-Za-z0-9]+$";

pub fn users_table() -> Result<Table> {
    Table::builder("users")
        .column("login_hash", SemanticType::Text)
        .column("server_hash", SemanticType::Text)
        .column("country_hash", SemanticType::Text)
        .column("currency", SemanticType::Text)
        .column("enable", SemanticType::Integer)
        .build()
}

pub fn trades_table() -> Result<Table> {
    Table::builder("trades")
        .column("login_hash", SemanticType::Text)
        .column("ticket_hash", SemanticType::Text)
        .column("server_hash", SemanticType::Text)
        .column("symbol", SemanticType::Text)
        .column("digits", SemanticType::Integer)
        .column("cmd", SemanticType::Integer)
        .column("volume", SemanticType::Real)
        .column("open_time", SemanticType::Timestamp)
        .column("close_time", SemanticType::Timestamp)
        .column("contractsize", SemanticType::Real)
        .build()
}

pub fn users_suite() -> SuiteDefinition {
    SuiteDefinition::builder(USERS_SUITE, "users")
        .not_null("login_hash")
        .not_null("server_hash")
        .row_count_between(Some(1), None)
        .matches_regex("login_hash", HEX)
        .not_null("country_hash")
        .matches_regex("country_hash", HEX)
        .not_null("currency")
        .in_set("currency", ["AUD", "EUR", "NZD", "USD"])
        .not_null("enable")
        .in_set("enable", [0i64, 1])
        .build()
}

/// Suite for `trades`; its last two expectations reference `users`.
pub fn trades_suite() -> SuiteDefinition {
    SuiteDefinition::builder(TRADES_SUITE, "trades")
        .not_null("login_hash")
        .not_null("symbol")
        .not_null("contractsize")
        .not_null("open_time")
        .not_null("close_time")
        .matches_regex("symbol", ALPHANUMERIC)
        .between("volume", Some(0.0), None)
        .between("digits", Some(0.0), Some(10.0))
        .in_set("cmd", [0i64, 1])
        .not_null("ticket_hash")
        .matches_regex("ticket_hash", HEX)
        .column_greater_than("close_time", "open_time")
        .in_reference_set("server_hash", "users", "server_hash")
        .in_reference_set("login_hash", "users", "login_hash")
        .build()
}

/// Builds the trading checkpoint with the given actions, run in order.
pub fn checkpoint(actions: Vec<Arc<dyn ResultSink>>) -> Result<Checkpoint> {
    actions
        .into_iter()
        .fold(
            Checkpoint::builder(CHECKPOINT_NAME)
                .table(Arc::new(users_table()?), users_suite())
                .table(Arc::new(trades_table()?), trades_suite()),
            |builder, action| builder.action(action),
        )
        .build()
}
