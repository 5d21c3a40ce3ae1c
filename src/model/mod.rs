//! Domain entities and the closed status state machines.
//!
//! Every status field is a closed enum with one transition table validated in
//! one place; free-form status strings never cross a module boundary.

mod audit;
mod history;
mod order;
mod proof;
mod quote;
mod scope;

pub use audit::{
    AuditAction, AuditFilter, AuditRecord, AuditResource, AuditSeverity, AUDIT_RETENTION_YEARS,
};
pub use history::{replay_history, StatusChange, StatusChangeInput};
pub use order::{ApprovalPolicy, NewOrder, Order, OrderStatus};
pub use proof::{NewApproval, OrderApproval, Proof, ProofDecision, ProofStatus};
pub use quote::{NewQuote, Quote, QuoteStatus};
pub use scope::{CallerScope, Role};

/// Error for status strings that do not name a known variant.
///
/// Only the storage layer parses status strings; a parse failure there means
/// row corruption or schema drift, never user input.
#[derive(Debug, thiserror::Error)]
#[error("Unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
