use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::payment::{PaymentMethod, TicketId};

/// What the wizard asks the gateway to collect.
///
/// The idempotency key identifies the booking attempt; a gateway must not
/// charge twice for the same key.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementRequest {
    pub idempotency_key: Uuid,
    pub amount: u64,
    pub method: PaymentMethod,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub ticket_id: TicketId,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("payment declined: {0}")]
    Declined(String),
    #[error("payment gateway timed out")]
    Timeout,
    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    /// Whether repeating the same request may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Timeout | GatewayError::Unavailable(_))
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn settle(&self, request: &SettlementRequest) -> Result<Settlement, GatewayError>;

    /// Returns the full amount paid for `ticket_id`.
    async fn refund(&self, ticket_id: &TicketId) -> Result<(), GatewayError>;
}

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(2000);
pub const DEFAULT_REFUND_DELAY: Duration = Duration::from_millis(1500);

/// Stand-in for a real gateway: waits a fixed time and always succeeds.
#[derive(Debug)]
pub struct SimulatedGateway {
    settle_delay: Duration,
    refund_delay: Duration,
    settled: Mutex<HashMap<Uuid, TicketId>>,
    issued: Mutex<HashSet<TicketId>>,
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE_DELAY, DEFAULT_REFUND_DELAY)
    }
}

impl SimulatedGateway {
    #[must_use]
    pub fn new(settle_delay: Duration, refund_delay: Duration) -> Self {
        Self {
            settle_delay,
            refund_delay,
            settled: Mutex::new(HashMap::new()),
            issued: Mutex::new(HashSet::new()),
        }
    }

    /// No delay at all, for tests.
    #[must_use]
    pub fn instant() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    async fn fresh_ticket(&self) -> TicketId {
        let mut issued = self.issued.lock().await;
        loop {
            let ticket_id = TicketId::generate();
            if issued.insert(ticket_id.clone()) {
                return ticket_id;
            }
        }
    }
}

async fn wait(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn settle(&self, request: &SettlementRequest) -> Result<Settlement, GatewayError> {
        wait(self.settle_delay).await;

        let mut settled = self.settled.lock().await;
        if let Some(ticket_id) = settled.get(&request.idempotency_key) {
            tracing::debug!(key = %request.idempotency_key, %ticket_id, "replaying settlement");
            return Ok(Settlement {
                ticket_id: ticket_id.clone(),
            });
        }

        let ticket_id = self.fresh_ticket().await;
        settled.insert(request.idempotency_key, ticket_id.clone());
        tracing::info!(
            amount = request.amount,
            method = %request.method,
            %ticket_id,
            "simulated settlement"
        );
        Ok(Settlement { ticket_id })
    }

    async fn refund(&self, ticket_id: &TicketId) -> Result<(), GatewayError> {
        wait(self.refund_delay).await;
        tracing::info!(%ticket_id, "simulated refund");
        Ok(())
    }
}

/// Exponential backoff for transient gateway failures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first; at least one is always made.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1 for the first retry).
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor)
    }
}

/// Wraps a gateway and retries transient failures. Declines are returned
/// straight away.
pub struct RetryingGateway<G> {
    inner: G,
    policy: RetryPolicy,
}

impl<G: PaymentGateway> RetryingGateway<G> {
    pub fn new(inner: G, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    #[cfg(test)]
    fn inner(&self) -> &G {
        &self.inner
    }

    async fn with_retries<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Err(err) if err.is_transient() && attempt < self.policy.max_attempts => {
                    let backoff = self.policy.backoff(attempt);
                    tracing::warn!(operation, attempt, ?backoff, error = %err, "retrying gateway call");
                    wait(backoff).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

#[async_trait]
impl<G: PaymentGateway> PaymentGateway for RetryingGateway<G> {
    async fn settle(&self, request: &SettlementRequest) -> Result<Settlement, GatewayError> {
        let inner = &self.inner;
        self.with_retries("settle", move || inner.settle(request))
            .await
    }

    async fn refund(&self, ticket_id: &TicketId) -> Result<(), GatewayError> {
        let inner = &self.inner;
        self.with_retries("refund", move || inner.refund(ticket_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn request() -> SettlementRequest {
        SettlementRequest {
            idempotency_key: Uuid::new_v4(),
            amount: 1500,
            method: PaymentMethod::Upi,
        }
    }

    /// Fails with `error` for the first `failures` calls.
    struct FlakyGateway {
        failures: u32,
        error: GatewayError,
        calls: AtomicU32,
    }

    impl FlakyGateway {
        fn new(failures: u32, error: GatewayError) -> Self {
            Self {
                failures,
                error,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        fn next(&self) -> Result<(), GatewayError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(self.error.clone())
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl PaymentGateway for FlakyGateway {
        async fn settle(&self, _request: &SettlementRequest) -> Result<Settlement, GatewayError> {
            self.next().map(|()| Settlement {
                ticket_id: TicketId::from("TKT-FLAKY0001"),
            })
        }

        async fn refund(&self, _ticket_id: &TicketId) -> Result<(), GatewayError> {
            self.next()
        }
    }

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            multiplier: 2,
        }
    }

    #[tokio::test]
    async fn simulated_gateway_issues_unique_tickets() {
        let gateway = SimulatedGateway::instant();
        let mut seen = HashSet::new();
        for _ in 0..50 {
            let settlement = gateway.settle(&request()).await.unwrap();
            assert!(settlement.ticket_id.is_well_formed());
            assert!(seen.insert(settlement.ticket_id));
        }
    }

    #[tokio::test]
    async fn simulated_gateway_is_idempotent_per_key() {
        let gateway = SimulatedGateway::instant();
        let request = request();
        let first = gateway.settle(&request).await.unwrap();
        let second = gateway.settle(&request).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn simulated_gateway_waits_for_its_delay() {
        let gateway = SimulatedGateway::new(Duration::from_millis(20), Duration::from_millis(10));
        let started = tokio::time::Instant::now();
        gateway.settle(&request()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));

        let started = tokio::time::Instant::now();
        gateway.refund(&TicketId::generate()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(10));
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let gateway = RetryingGateway::new(
            FlakyGateway::new(2, GatewayError::Timeout),
            quick_policy(3),
        );
        let settlement = gateway.settle(&request()).await.unwrap();
        assert_eq!(settlement.ticket_id.as_str(), "TKT-FLAKY0001");
        assert_eq!(gateway.inner().calls(), 3);
    }

    #[tokio::test]
    async fn retries_stop_at_max_attempts() {
        let gateway = RetryingGateway::new(
            FlakyGateway::new(5, GatewayError::Unavailable("maintenance".to_string())),
            quick_policy(3),
        );
        let err = gateway.refund(&TicketId::generate()).await.unwrap_err();
        assert_eq!(err, GatewayError::Unavailable("maintenance".to_string()));
        assert_eq!(gateway.inner().calls(), 3);
    }

    #[tokio::test]
    async fn declines_are_not_retried() {
        let gateway = RetryingGateway::new(
            FlakyGateway::new(1, GatewayError::Declined("insufficient funds".to_string())),
            quick_policy(5),
        );
        let err = gateway.settle(&request()).await.unwrap_err();
        assert!(!err.is_transient());
        assert_eq!(gateway.inner().calls(), 1);
    }

    #[test]
    fn backoff_grows_exponentially() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        assert_eq!(policy.backoff(3), Duration::from_millis(800));
        assert_eq!(RetryPolicy::none().max_attempts, 1);
    }
}
