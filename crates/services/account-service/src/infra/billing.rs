//! Subscription billing gateway.

use async_trait::async_trait;

use common::AppResult;
use domain::Subscription;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Cancels a subscription with the payment provider that issued it.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait BillingGateway: Send + Sync {
    async fn cancel(&self, subscription: &Subscription) -> AppResult<()>;
}

/// Gateway used when no payment provider is wired in. Only logs.
#[derive(Debug, Default, Clone)]
pub struct LoggingBillingGateway;

#[async_trait]
impl BillingGateway for LoggingBillingGateway {
    async fn cancel(&self, subscription: &Subscription) -> AppResult<()> {
        tracing::info!(
            subscription_id = %subscription.id,
            gateway = %subscription.gateway,
            gateway_id = %subscription.gateway_id,
            "Cancelling subscription"
        );
        Ok(())
    }
}
