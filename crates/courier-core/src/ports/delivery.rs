use async_trait::async_trait;

use crate::domain::{AckError, ConsumeOutcome, InboundMessage};

/// One in-flight delivery of a broker message.
///
/// The consumer owns the delivery and must acknowledge it exactly once.
/// `acknowledge` takes `self: Box<Self>`, so a second acknowledgement does not
/// compile. Dropping a delivery without acknowledging it leaves redelivery
/// to the broker's own visibility timeout.
#[async_trait]
pub trait Delivery: Send + Sync {
    fn message(&self) -> &InboundMessage;

    /// `Accepted` maps to "consume success", `RetryLater` to "reconsume later".
    async fn acknowledge(self: Box<Self>, outcome: ConsumeOutcome) -> Result<(), AckError>;
}

/// Broker delivery primitive.
#[async_trait]
pub trait DeliverySource: Send + Sync {
    /// Wait for the next delivery. `None` means the source is closed.
    async fn receive(&self) -> Option<Box<dyn Delivery>>;
}
