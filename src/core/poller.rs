use crate::domain::model::ProductStatus;
use crate::domain::ports::ProductApi;
use std::time::Duration;

pub const DEFAULT_POLL_ATTEMPTS: u32 = 30;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_POLL_ATTEMPTS,
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    /// Last status seen, `None` if every request failed.
    pub status: Option<ProductStatus>,
    pub attempts: u32,
    pub timed_out: bool,
}

/// Poll a freshly created product until it reaches a terminal status or the
/// attempts run out. A failed request still uses up an attempt.
pub async fn wait_for_product<A: ProductApi + ?Sized>(
    api: &A,
    product_id: &str,
    policy: PollPolicy,
) -> PollOutcome {
    let mut last_status = None;

    for attempt in 1..=policy.attempts {
        match api.fetch_product(product_id).await {
            Ok(product) => {
                tracing::debug!(
                    "Product {} status on attempt {}/{}: {}",
                    product_id,
                    attempt,
                    policy.attempts,
                    product.status
                );
                if product.status.is_terminal() {
                    return PollOutcome {
                        status: Some(product.status),
                        attempts: attempt,
                        timed_out: false,
                    };
                }
                last_status = Some(product.status);
            }
            Err(e) => {
                tracing::warn!(
                    "Status check {}/{} for product {} failed: {}",
                    attempt,
                    policy.attempts,
                    product_id,
                    e
                );
            }
        }

        if attempt < policy.attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    tracing::warn!(
        "Product {} did not finish after {} attempts",
        product_id,
        policy.attempts
    );
    PollOutcome {
        status: last_status,
        attempts: policy.attempts,
        timed_out: true,
    }
}
