//! Conflict recheck of an accepted request against live scheduling data.

use common::{Identity, ShiftRequestId};
use domain::{Aggregate, ExchangeShift, ShiftRequest};

use crate::backend::SchedulingBackend;
use crate::error::{MarketplaceError, Result};

/// Asks the scheduling validator whether an exchange can still be executed.
///
/// The result is informational: it never changes the status of the request.
#[derive(Debug, Clone)]
pub struct ConflictRecheckService<B: SchedulingBackend> {
    backend: B,
}

impl<B: SchedulingBackend> ConflictRecheckService<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the request with a freshly computed `is_execution_possible`.
    #[tracing::instrument(skip(self, caller, exchange), fields(exchange_shift_id = %exchange.id()))]
    pub async fn recheck(
        &self,
        caller: &Identity,
        request_id: ShiftRequestId,
        exchange: &ExchangeShift,
    ) -> Result<ShiftRequest> {
        let request = self.backend.request(caller, request_id).await?;
        if request.exchange_shift_id() != exchange.id() {
            return Err(MarketplaceError::Validation(format!(
                "request {request_id} does not belong to exchange {}",
                exchange.id()
            )));
        }

        let possible = self
            .backend
            .validate_execution(caller, &request, exchange)
            .await?;

        let result = if possible { "possible" } else { "conflict" };
        metrics::counter!("marketplace_conflict_rechecks_total", "result" => result).increment(1);
        if possible {
            tracing::debug!(%request_id, "exchange can be executed");
        } else {
            tracing::warn!(%request_id, "exchange would create a scheduling conflict");
        }

        Ok(request.with_execution_check(possible))
    }
}
