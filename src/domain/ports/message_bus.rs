use async_trait::async_trait;

use crate::error::Result;

/// Durable message-bus publisher (§6): a non-exclusive, non-autodelete
/// durable queue, published with the default exchange and
/// routing-key = queue-name. The concrete transport is an external
/// collaborator; the audit sink (§4.H) only depends on this trait.
#[async_trait]
pub trait MessageBusPublisher: Send + Sync {
    /// Publishes `payload` to `queue`. Implementations must declare the
    /// queue durable on first use. Errors here are retried by the
    /// caller with exponential back-off; this call itself does not retry.
    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<()>;
}
