use async_trait::async_trait;

use crate::domain::{BrokerAck, Envelope, PublishError};

/// Broker publish primitive.
///
/// Implementations build the broker's own message type from the envelope
/// (topic, tag, payload, key) and perform exactly one synchronous send. They
/// report the broker's acknowledgement as-is, including non-ok statuses;
/// classifying it is the producer's job.
#[async_trait]
pub trait BrokerPublisher: Send + Sync {
    async fn publish(&self, envelope: &Envelope) -> Result<BrokerAck, PublishError>;
}
