//! Error types, one per concern.
//!
//! None of these ever reach the broker: the producer folds `PublishError`
//! into `DeliveryOutcome::Failed`, and the consumer side folds `DecodeError`
//! and `HandlerError` into `ConsumeOutcome::RetryLater`.

use std::time::Duration;

use thiserror::Error;

use super::envelope::MAX_TOPIC_LEN;

/// Rejected envelope construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("topic must not be empty")]
    EmptyTopic,

    #[error("topic is {0} characters long, the limit is {max}", max = MAX_TOPIC_LEN)]
    TopicTooLong(usize),

    #[error("topic contains invalid character {0:?}")]
    InvalidTopicChar(char),
}

/// Transmission fault raised by a broker publisher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("broker unreachable: {0}")]
    Unreachable(String),

    #[error("send timed out after {0:?}")]
    Timeout(Duration),

    #[error("payload could not be encoded: {0}")]
    Encoding(String),

    #[error("broker error {code}: {message}")]
    Broker { code: i32, message: String },

    #[error("publisher panicked: {0}")]
    Panicked(String),
}

/// Raw delivery bytes that do not match the handler's body type.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("body is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("json decode: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failed acknowledgement towards the broker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AckError {
    #[error("broker is closed, acknowledgement of message {0} was not recorded")]
    Closed(String),

    #[error("broker rejected acknowledgement of message {message_id}: {reason}")]
    Rejected { message_id: String, reason: String },
}

/// Fault raised inside a handler body.
///
/// Handlers written against `FallibleHandler` return this with `?`; the
/// `Guarded` adapter turns it into `RetryLater`.
#[derive(Debug)]
pub struct HandlerError {
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {}", self.message, source),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<DecodeError> for HandlerError {
    fn from(err: DecodeError) -> Self {
        Self::with_source("decode", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn handler_error_display_includes_source() {
        let io = std::io::Error::other("disk full");
        let err = HandlerError::with_source("write audit row", io);
        assert_eq!(err.to_string(), "write audit row: disk full");
        assert!(err.source().is_some());
    }

    #[test]
    fn handler_error_without_source() {
        let err = HandlerError::new("nope");
        assert_eq!(err.to_string(), "nope");
        assert!(err.source().is_none());
    }

    #[test]
    fn topic_length_message_names_the_limit() {
        let err = EnvelopeError::TopicTooLong(MAX_TOPIC_LEN + 3);
        assert_eq!(
            err.to_string(),
            format!("topic is {} characters long, the limit is {MAX_TOPIC_LEN}", MAX_TOPIC_LEN + 3)
        );
    }

    #[test]
    fn publish_error_messages() {
        let err = PublishError::Broker {
            code: 17,
            message: "topic not exist".to_string(),
        };
        assert_eq!(err.to_string(), "broker error 17: topic not exist");
    }
}
