//! Envelope: one logical message to publish.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use super::errors::EnvelopeError;

/// Longest topic name the broker accepts.
pub const MAX_TOPIC_LEN: usize = 127;

/// Immutable description of one message to publish.
///
/// Fields are private: once built, an envelope is only read. The producer
/// passes it by reference to the publisher, so the bytes that reach the broker
/// are exactly the ones the caller built.
///
/// # Example
/// ```
/// use courier_core::Envelope;
///
/// let envelope = Envelope::new("TEST_TOPIC", "hello")
///     .unwrap()
///     .with_tag("tag")
///     .with_key("order-42");
/// assert_eq!(envelope.payload(), b"hello");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEnvelope")]
pub struct Envelope {
    topic: String,
    tag: String,
    payload: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
}

impl Envelope {
    /// Build an envelope with an empty tag and no key.
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Result<Self, EnvelopeError> {
        let topic = topic.into();
        validate_topic(&topic)?;
        Ok(Self {
            topic,
            tag: String::new(),
            payload: payload.into(),
            key: None,
        })
    }

    /// An empty tag means "no filter" on the consuming side.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Key handed to the broker as a dedup / lookup hint.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Payload rendered for log records.
    pub fn payload_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// Wire shape of an envelope; deserialization goes through `Envelope::new`.
#[derive(Deserialize)]
struct RawEnvelope {
    topic: String,
    #[serde(default)]
    tag: String,
    payload: Vec<u8>,
    #[serde(default)]
    key: Option<String>,
}

impl TryFrom<RawEnvelope> for Envelope {
    type Error = EnvelopeError;

    fn try_from(raw: RawEnvelope) -> Result<Self, Self::Error> {
        let mut envelope = Envelope::new(raw.topic, raw.payload)?.with_tag(raw.tag);
        envelope.key = raw.key;
        Ok(envelope)
    }
}

fn validate_topic(topic: &str) -> Result<(), EnvelopeError> {
    if topic.is_empty() {
        return Err(EnvelopeError::EmptyTopic);
    }
    if topic.len() > MAX_TOPIC_LEN {
        return Err(EnvelopeError::TopicTooLong(topic.len()));
    }
    if let Some(c) = topic
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '%' | '|')))
    {
        return Err(EnvelopeError::InvalidTopicChar(c));
    }
    Ok(())
}
