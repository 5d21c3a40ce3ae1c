//! Carepost - regulated mail-production lifecycle core
//!
//! The order/proof lifecycle engine for a multi-tenant healthcare
//! communications service: quote conversion, the order status state machine,
//! proof revision rounds with customer decisions, tenant isolation, and the
//! append-only history/audit recorders required for compliance.

pub mod bus;
pub mod config;
pub mod interfaces;
pub mod model;
#[cfg(feature = "sqlite")]
pub mod runtime;
pub mod services;
#[cfg(feature = "sqlite")]
pub mod storage;
pub mod utils;
