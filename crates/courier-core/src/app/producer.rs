//! Producer port: single-attempt publish with a classified outcome.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinError;
use tracing::Instrument as _;

use crate::domain::{DeliveryOutcome, Envelope, PublishError, SendFailure};
use crate::ports::BrokerPublisher;

/// Matches the broker client's default send timeout.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_millis(3000);

/// Publishes envelopes through a shared broker handle.
///
/// `send` never fails, never panics and never retries: every fault comes
/// back as `DeliveryOutcome::Failed`, once per call. That includes a non-ok
/// status, an unreachable broker, a timeout and a panicking publisher. Retrying is the caller's
/// decision.
///
/// Cloning is cheap; clones share the publisher.
#[derive(Clone)]
pub struct Producer {
    publisher: Arc<dyn BrokerPublisher>,
    send_timeout: Duration,
}

impl Producer {
    pub fn new(publisher: Arc<dyn BrokerPublisher>) -> Self {
        Self {
            publisher,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    pub fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    /// Publish one envelope and report how it went.
    #[tracing::instrument(
        name = "producer.send",
        skip_all,
        fields(topic = %envelope.topic(), tag = %envelope.tag())
    )]
    pub async fn send(&self, envelope: &Envelope) -> DeliveryOutcome {
        tracing::info!(
            key = envelope.key(),
            payload = %envelope.payload_lossy(),
            "sending message"
        );

        // own task: a panic inside the publisher surfaces as a JoinError
        let publisher = Arc::clone(&self.publisher);
        let owned = envelope.clone();
        let mut publish =
            tokio::spawn(async move { publisher.publish(&owned).await }.in_current_span());

        let result = match tokio::time::timeout(self.send_timeout, &mut publish).await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => Err(join_failure(err)),
            Err(_elapsed) => {
                publish.abort();
                Err(PublishError::Timeout(self.send_timeout))
            }
        };

        let outcome = DeliveryOutcome::classify(result);
        match &outcome {
            DeliveryOutcome::Sent { ack } => {
                tracing::info!(ack = %ack.to_json(), "send succeeded");
            }
            DeliveryOutcome::Failed {
                cause: SendFailure::Status(ack),
            } => {
                tracing::warn!(ack = %ack.to_json(), "send failed, broker status was not SEND_OK");
            }
            DeliveryOutcome::Failed { cause } => {
                tracing::error!(cause = %cause, "send failed");
            }
        }
        outcome
    }
}

fn join_failure(err: JoinError) -> PublishError {
    if err.is_panic() {
        PublishError::Panicked(panic_message(err.into_panic()))
    } else {
        PublishError::Unreachable(format!("publish task did not complete: {err}"))
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => message.to_string(),
            Err(_) => "non-string panic payload".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BrokerAck, SendStatus};
    use async_trait::async_trait;
    use rstest::rstest;
    use std::sync::Mutex;

    /// Publisher that answers a scripted result and records what it saw.
    struct ScriptedPublisher {
        answer: Result<SendStatus, PublishError>,
        seen: Mutex<Vec<Envelope>>,
    }

    impl ScriptedPublisher {
        fn new(answer: Result<SendStatus, PublishError>) -> Arc<Self> {
            Arc::new(Self {
                answer,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<Envelope> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BrokerPublisher for ScriptedPublisher {
        async fn publish(&self, envelope: &Envelope) -> Result<BrokerAck, PublishError> {
            let mut seen = self.seen.lock().unwrap();
            seen.push(envelope.clone());
            let status = self.answer.clone()?;
            Ok(BrokerAck {
                status,
                message_id: format!("m-{}", seen.len()),
                topic: envelope.topic().to_string(),
                queue_id: 0,
                queue_offset: seen.len() as u64 - 1,
            })
        }
    }

    /// Publisher that never answers.
    struct HangingPublisher;

    #[async_trait]
    impl BrokerPublisher for HangingPublisher {
        async fn publish(&self, _envelope: &Envelope) -> Result<BrokerAck, PublishError> {
            std::future::pending().await
        }
    }

    /// Publisher whose encoder is broken.
    struct PanickingPublisher;

    #[async_trait]
    impl BrokerPublisher for PanickingPublisher {
        async fn publish(&self, _envelope: &Envelope) -> Result<BrokerAck, PublishError> {
            panic!("encoder blew up");
        }
    }

    fn hello() -> Envelope {
        Envelope::new("T", "hello").unwrap()
    }

    #[tokio::test]
    async fn send_ok_yields_sent() {
        let publisher = ScriptedPublisher::new(Ok(SendStatus::SendOk));
        let producer = Producer::new(publisher.clone());

        let outcome = producer.send(&hello()).await;

        assert!(outcome.is_sent());
        assert_eq!(outcome.ack().unwrap().message_id, "m-1");
        assert_eq!(publisher.seen(), vec![hello()]);
    }

    #[rstest]
    #[case(SendStatus::FlushDiskTimeout)]
    #[case(SendStatus::FlushSlaveTimeout)]
    #[case(SendStatus::SlaveNotAvailable)]
    #[tokio::test]
    async fn non_ok_status_yields_failed(#[case] status: SendStatus) {
        let producer = Producer::new(ScriptedPublisher::new(Ok(status)));

        let outcome = producer.send(&hello()).await;

        assert!(matches!(
            outcome,
            DeliveryOutcome::Failed { cause: SendFailure::Status(ref ack) } if ack.status == status
        ));
    }

    #[tokio::test]
    async fn connection_error_yields_failed_with_cause() {
        let err = PublishError::Unreachable("connection refused".to_string());
        let publisher = ScriptedPublisher::new(Err(err.clone()));
        let producer = Producer::new(publisher.clone());

        let outcome = producer.send(&hello()).await;

        assert_eq!(
            outcome,
            DeliveryOutcome::Failed {
                cause: SendFailure::Transmission(err)
            }
        );
        // single attempt, no internal retry
        assert_eq!(publisher.seen().len(), 1);
    }

    #[tokio::test]
    async fn slow_broker_yields_timeout() {
        let producer =
            Producer::new(Arc::new(HangingPublisher)).with_send_timeout(Duration::from_millis(20));

        let outcome = producer.send(&hello()).await;

        assert_eq!(
            outcome.cause(),
            Some(&SendFailure::Transmission(PublishError::Timeout(
                Duration::from_millis(20)
            )))
        );
    }

    #[tokio::test]
    async fn panicking_publisher_yields_failed() {
        let producer = Producer::new(Arc::new(PanickingPublisher));

        // send itself must not unwind, even when awaited on its own task
        let outcome = tokio::spawn(async move { producer.send(&hello()).await })
            .await
            .expect("send must not panic");

        assert_eq!(
            outcome.cause(),
            Some(&SendFailure::Transmission(PublishError::Panicked(
                "encoder blew up".to_string()
            )))
        );
    }

    #[tokio::test]
    async fn same_envelope_twice_gives_two_independent_outcomes() {
        let publisher = ScriptedPublisher::new(Ok(SendStatus::SendOk));
        let producer = Producer::new(publisher.clone());
        let envelope = hello().with_tag("tag").with_key("k-1");

        let first = producer.send(&envelope).await;
        let second = producer.send(&envelope).await;

        assert_ne!(first.ack().unwrap().message_id, second.ack().unwrap().message_id);
        assert_eq!(publisher.seen(), vec![envelope.clone(), envelope]);
    }

    #[test]
    fn default_timeout_matches_broker_client() {
        let producer = Producer::new(ScriptedPublisher::new(Ok(SendStatus::SendOk)));
        assert_eq!(producer.send_timeout(), Duration::from_secs(3));
    }
}
