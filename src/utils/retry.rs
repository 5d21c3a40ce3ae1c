//! Retry utilities: backoff builders for recoverable sinks.
//!
//! Uses `backon` for exponential backoff with jitter.

use std::time::Duration;

use backon::ExponentialBuilder;

use crate::config::AuditConfig;

/// Backoff for audit-sink writes.
///
/// Short and bounded: the audit write happens inside a request-scoped
/// operation, so exhaustion hands off to the fallback sink quickly instead
/// of holding the request.
pub fn audit_backoff(config: &AuditConfig) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(config.retry_min_delay_ms))
        .with_max_delay(Duration::from_millis(config.retry_max_delay_ms))
        .with_max_times(config.retry_attempts)
        .with_jitter()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_backoff_builds_from_config() {
        // Builder is opaque; this just pins that defaults construct cleanly.
        let _ = audit_backoff(&AuditConfig::default());
    }
}
