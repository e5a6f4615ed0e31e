//! Outcome model: how a publish attempt and a consume attempt end.
//!
//! Both sides are plain sum types. Faults are converted into them at the
//! producer and dispatcher boundaries; callers branch on the outcome, never
//! on an error.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::errors::PublishError;

/// Status reported by the broker for a synchronous send.
///
/// Serialized with the broker's own names (`SEND_OK`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SendStatus {
    SendOk,
    FlushDiskTimeout,
    FlushSlaveTimeout,
    SlaveNotAvailable,
}

impl SendStatus {
    /// Only an explicit `SEND_OK` counts. The timeout / availability statuses
    /// mean the message may or may not be durable.
    pub fn is_ok(self) -> bool {
        matches!(self, SendStatus::SendOk)
    }
}

/// Raw acknowledgement returned by the broker for one send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerAck {
    pub status: SendStatus,
    pub message_id: String,
    pub topic: String,
    pub queue_id: u32,
    pub queue_offset: u64,
}

impl BrokerAck {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

/// Why a send did not end in `Sent`.
///
/// Carried for diagnosis. Callers are expected to branch on
/// `DeliveryOutcome::is_sent`, not on the variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendFailure {
    #[error("broker answered {:?} for message {}", .0.status, .0.message_id)]
    Status(BrokerAck),

    #[error(transparent)]
    Transmission(#[from] PublishError),
}

/// Result of a single publish attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent { ack: BrokerAck },
    Failed { cause: SendFailure },
}

impl DeliveryOutcome {
    /// Classify the broker's answer to one send.
    pub fn classify(result: Result<BrokerAck, PublishError>) -> Self {
        match result {
            Ok(ack) if ack.status.is_ok() => DeliveryOutcome::Sent { ack },
            Ok(ack) => DeliveryOutcome::Failed {
                cause: SendFailure::Status(ack),
            },
            Err(err) => DeliveryOutcome::Failed { cause: err.into() },
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, DeliveryOutcome::Sent { .. })
    }

    pub fn ack(&self) -> Option<&BrokerAck> {
        match self {
            DeliveryOutcome::Sent { ack } => Some(ack),
            DeliveryOutcome::Failed { .. } => None,
        }
    }

    pub fn cause(&self) -> Option<&SendFailure> {
        match self {
            DeliveryOutcome::Sent { .. } => None,
            DeliveryOutcome::Failed { cause } => Some(cause),
        }
    }
}

/// Result of a single consume attempt; the only thing the broker is told.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsumeOutcome {
    /// Done: the broker may forget the message.
    #[serde(rename = "CONSUME_SUCCESS")]
    Accepted,

    /// Redeliver later, on the broker's own backoff and retry limit.
    #[serde(rename = "RECONSUME_LATER")]
    RetryLater,
}

impl ConsumeOutcome {
    pub fn is_accepted(self) -> bool {
        matches!(self, ConsumeOutcome::Accepted)
    }
}
