//! InboundMessage: one delivery attempt as handed over by the broker.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A message delivered to this consumer.
///
/// `reconsume_times` is owned by the broker: it counts earlier deliveries of
/// the same message that ended in `RetryLater`. Handlers may read it (to
/// log, or to give up on a poison message by returning `Accepted`), but
/// the core never changes it. Handlers see it through `DeliveryContext`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InboundMessage {
    message_id: String,
    topic: String,
    tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    body: Vec<u8>,
    reconsume_times: u32,
    born_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn new(message_id: impl Into<String>, topic: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            message_id: message_id.into(),
            topic: topic.into(),
            tag: String::new(),
            key: None,
            body: body.into(),
            reconsume_times: 0,
            born_at: Utc::now(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_key(mut self, key: Option<String>) -> Self {
        self.key = key;
        self
    }

    pub fn with_reconsume_times(mut self, reconsume_times: u32) -> Self {
        self.reconsume_times = reconsume_times;
        self
    }

    pub fn with_born_at(mut self, born_at: DateTime<Utc>) -> Self {
        self.born_at = born_at;
        self
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn reconsume_times(&self) -> u32 {
        self.reconsume_times
    }

    pub fn born_at(&self) -> DateTime<Utc> {
        self.born_at
    }

    /// Everything about this delivery except the body.
    pub fn context(&self) -> DeliveryContext {
        DeliveryContext {
            message_id: self.message_id.clone(),
            topic: self.topic.clone(),
            tag: self.tag.clone(),
            key: self.key.clone(),
            reconsume_times: self.reconsume_times,
            born_at: self.born_at,
        }
    }

    /// Copy of this message for its next delivery attempt.
    pub(crate) fn redelivered(&self) -> Self {
        Self {
            reconsume_times: self.reconsume_times.saturating_add(1),
            ..self.clone()
        }
    }
}

/// Read-only metadata of the delivery a handler is working on.
///
/// A handler can use `reconsume_times` to stop retrying a message it will
/// never process: answering `Accepted` ends redelivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryContext {
    message_id: String,
    topic: String,
    tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    reconsume_times: u32,
    born_at: DateTime<Utc>,
}

impl DeliveryContext {
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn reconsume_times(&self) -> u32 {
        self.reconsume_times
    }

    pub fn born_at(&self) -> DateTime<Utc> {
        self.born_at
    }
}
