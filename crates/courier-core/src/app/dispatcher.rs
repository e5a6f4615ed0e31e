//! Dispatcher: one delivery in, one acknowledgement out.
//!
//! # Per delivery
//! 1. Resolve the handler from the registry (topic, then tag filter).
//! 2. Decode the raw body into the handler's type. Undecodable → `RetryLater`,
//!    handler not invoked.
//! 3. Invoke the handler on its own task, with the delivery's metadata. A panic is caught from the
//!    `JoinError` → `RetryLater`.
//! 4. Acknowledge the delivery with the resulting outcome, exactly once.

use std::sync::Arc;

use tracing::Instrument as _;

use crate::domain::{AckError, ConsumeOutcome, InboundMessage};
use crate::ports::Delivery;
use crate::typed::{HandlerRegistry, Route};

/// Stateless bridge between the broker's deliveries and the handlers.
///
/// Holds no per-message state; one `Dispatcher` behind an `Arc` serves every
/// consumer worker concurrently.
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
}

impl Dispatcher {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Decide the outcome for one message. Never panics, never errors.
    #[tracing::instrument(
        name = "dispatch",
        skip_all,
        fields(
            message_id = %message.message_id(),
            topic = %message.topic(),
            tag = %message.tag(),
            reconsume_times = message.reconsume_times(),
        )
    )]
    pub async fn dispatch(&self, message: &InboundMessage) -> ConsumeOutcome {
        let handler = match self.registry.resolve(message) {
            Route::Handler(handler) => handler,
            Route::Filtered => {
                tracing::debug!("tag excluded by subscription, skipping");
                return ConsumeOutcome::Accepted;
            }
            Route::Unrouted => {
                tracing::warn!("no handler subscribed to topic, message will be reconsumed");
                return ConsumeOutcome::RetryLater;
            }
        };

        let body_type = handler.body_type();
        let body = message.body().to_vec();
        let ctx = message.context();
        let invocation =
            tokio::spawn(async move { handler.handle_raw(&body, &ctx).await }.in_current_span());

        match invocation.await {
            Ok(Ok(outcome)) => {
                tracing::debug!(?outcome, "handler finished");
                outcome
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, body_type, "undecodable body, message will be reconsumed");
                ConsumeOutcome::RetryLater
            }
            Err(err) if err.is_panic() => {
                tracing::error!(body_type, "handler panicked, message will be reconsumed");
                ConsumeOutcome::RetryLater
            }
            Err(err) => {
                tracing::error!(error = %err, body_type, "handler task did not complete, message will be reconsumed");
                ConsumeOutcome::RetryLater
            }
        }
    }

    /// Dispatch one delivery and acknowledge it with the outcome.
    ///
    /// The only error is a failed acknowledgement; the broker then
    /// redelivers on its own timeout.
    pub async fn deliver(&self, delivery: Box<dyn Delivery>) -> Result<ConsumeOutcome, AckError> {
        let outcome = self.dispatch(delivery.message()).await;
        delivery.acknowledge(outcome).await?;
        Ok(outcome)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::domain::{AckError, ConsumeOutcome, InboundMessage};
    use crate::ports::Delivery;

    /// Delivery that records every acknowledgement it receives.
    pub(crate) struct RecordingDelivery {
        pub(crate) message: InboundMessage,
        pub(crate) acks: Arc<Mutex<Vec<ConsumeOutcome>>>,
        pub(crate) reject: bool,
    }

    impl RecordingDelivery {
        pub(crate) fn new(message: InboundMessage) -> (Box<Self>, Arc<Mutex<Vec<ConsumeOutcome>>>) {
            let acks = Arc::new(Mutex::new(Vec::new()));
            let delivery = Box::new(Self {
                message,
                acks: Arc::clone(&acks),
                reject: false,
            });
            (delivery, acks)
        }
    }

    #[async_trait]
    impl Delivery for RecordingDelivery {
        fn message(&self) -> &InboundMessage {
            &self.message
        }

        async fn acknowledge(self: Box<Self>, outcome: ConsumeOutcome) -> Result<(), AckError> {
            self.acks.lock().unwrap().push(outcome);
            if self.reject {
                return Err(AckError::Rejected {
                    message_id: self.message.message_id().to_string(),
                    reason: "offset commit failed".to_string(),
                });
            }
            Ok(())
        }
    }
}
