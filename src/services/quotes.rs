//! Quote lifecycle: creation, listing, and the one-way conversion.

use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::bus::{DomainEvent, EventBus};
use crate::config::TimeoutConfig;
use crate::interfaces::{CoreError, CoreResult, QuoteStore, StorageError};
use crate::model::{
    ApprovalPolicy, AuditAction, AuditRecord, AuditResource, AuditSeverity, CallerScope, NewOrder,
    NewQuote, Order, Quote, QuoteStatus, StatusChangeInput,
};

use super::{with_timeout, AuditRecorder};

/// Caller-supplied fields for a new quote.
#[derive(Debug, Clone)]
pub struct NewQuoteInput {
    pub service_type: String,
    pub recipient_count: i64,
    pub total_cost_cents: i64,
}

/// Quote operations.
pub struct QuoteService {
    quotes: Arc<dyn QuoteStore>,
    audit: Arc<AuditRecorder>,
    bus: Arc<dyn EventBus>,
    timeouts: TimeoutConfig,
}

impl QuoteService {
    pub fn new(
        quotes: Arc<dyn QuoteStore>,
        audit: Arc<AuditRecorder>,
        bus: Arc<dyn EventBus>,
        timeouts: TimeoutConfig,
    ) -> Self {
        Self {
            quotes,
            audit,
            bus,
            timeouts,
        }
    }

    /// Create a pending quote in the caller's practice.
    #[instrument(skip(self, input), fields(practice = ?scope.practice_id))]
    pub async fn create_quote(
        &self,
        scope: &CallerScope,
        input: NewQuoteInput,
    ) -> CoreResult<Quote> {
        let practice_id = scope.practice_id.ok_or_else(|| {
            CoreError::Validation("a practice is required to create a quote".to_string())
        })?;
        if input.service_type.trim().is_empty() {
            return Err(CoreError::Validation(
                "service type is required".to_string(),
            ));
        }
        if input.recipient_count <= 0 {
            return Err(CoreError::Validation(
                "recipient count must be positive".to_string(),
            ));
        }

        let quote = with_timeout(
            self.timeouts.storage(),
            self.quotes.create(NewQuote {
                practice_id,
                user_id: scope.user_id,
                service_type: input.service_type,
                recipient_count: input.recipient_count,
                total_cost_cents: input.total_cost_cents,
            }),
        )
        .await?;

        self.audit
            .record(AuditRecord::new(
                scope,
                AuditAction::Create,
                AuditResource::Quote,
                quote.id,
                AuditSeverity::Info,
                true,
                None,
            ))
            .await;

        info!(quote.id = %quote.id, quote.number = quote.quote_number, "Quote created");
        Ok(quote)
    }

    /// Fetch one quote visible to the scope.
    pub async fn get_quote(&self, scope: &CallerScope, id: Uuid) -> CoreResult<Quote> {
        with_timeout(self.timeouts.storage(), self.quotes.get(scope, id)).await
    }

    /// List quotes visible to the scope.
    pub async fn list_quotes(&self, scope: &CallerScope) -> CoreResult<Vec<Quote>> {
        with_timeout(self.timeouts.storage(), self.quotes.list(scope)).await
    }

    /// Archive a pending quote.
    pub async fn archive_quote(&self, scope: &CallerScope, id: Uuid) -> CoreResult<Quote> {
        let quote = self.get_quote(scope, id).await?;
        if quote.status != QuoteStatus::Pending {
            return Err(CoreError::InvalidState(format!(
                "only pending quotes can be archived; quote is {}",
                quote.status.as_str()
            )));
        }

        let archived =
            match with_timeout(self.timeouts.storage(), self.quotes.archive(id)).await {
                Ok(archived) => archived,
                Err(CoreError::Storage(StorageError::StaleStatus { .. })) => {
                    return Err(CoreError::InvalidState(
                        "quote is no longer pending".to_string(),
                    ))
                }
                Err(err) => return Err(err),
            };

        self.audit
            .record(AuditRecord::new(
                scope,
                AuditAction::Update,
                AuditResource::Quote,
                id,
                AuditSeverity::Info,
                true,
                Some("archived".to_string()),
            ))
            .await;

        Ok(archived)
    }

    /// Convert a pending quote into a draft order.
    ///
    /// One logical transaction: the order insert (with creation history row)
    /// and the quote flip commit together or not at all. The attempt is
    /// audited whether or not the business rules pass.
    #[instrument(skip(self), fields(practice = ?scope.practice_id))]
    pub async fn convert(&self, scope: &CallerScope, quote_id: Uuid) -> CoreResult<(Quote, Order)> {
        let outcome = self.convert_inner(scope, quote_id).await;

        let (success, detail) = match &outcome {
            Ok((_, order)) => (true, Some(format!("order {}", order.order_number))),
            Err(err) => (false, Some(err.to_string())),
        };
        self.audit
            .record(AuditRecord::new(
                scope,
                AuditAction::Convert,
                AuditResource::Quote,
                quote_id,
                AuditSeverity::Info,
                success,
                detail,
            ))
            .await;

        if let Ok((quote, order)) = &outcome {
            self.bus
                .publish(Arc::new(DomainEvent::QuoteConverted {
                    quote_id: quote.id,
                    order_id: order.id,
                    practice_id: quote.practice_id,
                }))
                .await;
            info!(
                quote.id = %quote.id,
                order.id = %order.id,
                order.number = order.order_number,
                "Quote converted"
            );
        }

        outcome
    }

    async fn convert_inner(
        &self,
        scope: &CallerScope,
        quote_id: Uuid,
    ) -> CoreResult<(Quote, Order)> {
        // Scoped read: a quote in another practice reads as absent.
        let quote = self.get_quote(scope, quote_id).await?;
        if !scope.owns(quote.practice_id) {
            return Err(CoreError::Forbidden(
                "quote belongs to another practice".to_string(),
            ));
        }
        if quote.status != QuoteStatus::Pending {
            return Err(CoreError::InvalidState(format!(
                "only pending quotes can be converted; quote is {}",
                quote.status.as_str()
            )));
        }

        let order = NewOrder {
            practice_id: quote.practice_id,
            user_id: scope.user_id,
            quote_id: Some(quote.id),
            approval_policy: ApprovalPolicy::default(),
            service_type: quote.service_type.clone(),
            recipient_count: quote.recipient_count,
            total_cost_cents: quote.total_cost_cents,
        };
        let change = StatusChangeInput {
            changed_by: scope.user_id,
            changed_by_role: scope.role,
            comments: Some(format!("created from quote {}", quote.quote_number)),
            metadata: None,
        };

        match with_timeout(
            self.timeouts.storage(),
            self.quotes.convert(quote_id, order, change),
        )
        .await
        {
            Ok(pair) => Ok(pair),
            // A concurrent conversion won the optimistic guard.
            Err(CoreError::Storage(StorageError::StaleStatus { .. })) => Err(
                CoreError::InvalidState("quote is no longer pending".to_string()),
            ),
            Err(err) => Err(err),
        }
    }
}
