//! Concurrent fan-out of independent generation calls.
//!
//! A batch of N requests is dispatched concurrently; per-request failures
//! never abort the batch. The outcome preserves the original request
//! order, not completion order: a request at index 3 that succeeds lands
//! at output position 3 no matter when it finished, and failed indices are
//! omitted. Only a fully failed batch escalates, as [`BatchEmptyError`].

use std::future::Future;

use crate::error::{BatchEmptyError, ProviderError};

/// Result of one fan-out batch.
///
/// `items` holds index-tagged successes in original request order;
/// `failures` holds the error message per failed index. A non-empty
/// `failures` alongside non-empty `items` is a degraded success, not an
/// error.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    /// Successful results tagged with their original request index.
    pub items: Vec<(usize, T)>,
    /// Error messages tagged with their original request index.
    pub failures: Vec<(usize, String)>,
    /// Number of requests in the batch.
    pub total: usize,
}

impl<T> BatchOutcome<T> {
    /// Returns true if at least one request failed.
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Consumes the outcome, returning the successful values in original
    /// request order.
    pub fn into_values(self) -> Vec<T> {
        self.items.into_iter().map(|(_, value)| value).collect()
    }
}

/// Dispatches all `requests` concurrently and collects per-index results.
///
/// Requests are suspend-capable futures, typically provider calls already
/// wrapped in their own retry and rate-limit path. Returns
/// [`BatchEmptyError`] only when every request in a non-empty batch
/// failed; an empty batch yields an empty outcome.
pub async fn fan_out<T, Fut>(requests: Vec<Fut>) -> Result<BatchOutcome<T>, BatchEmptyError>
where
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let total = requests.len();

    // join_all polls every future concurrently and yields results in
    // input order, which is exactly the reassembly contract.
    let results = futures::future::join_all(requests).await;

    let mut items = Vec::new();
    let mut failures = Vec::new();
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(value) => items.push((index, value)),
            Err(e) => {
                tracing::warn!(index, error = %e, "Fan-out request failed");
                failures.push((index, e.to_string()));
            }
        }
    }

    if items.is_empty() && total > 0 {
        let first_error = failures
            .first()
            .map(|(_, msg)| msg.clone())
            .unwrap_or_default();
        return Err(BatchEmptyError {
            total,
            first_error,
            failures,
        });
    }

    Ok(BatchOutcome {
        items,
        failures,
        total,
    })
}
