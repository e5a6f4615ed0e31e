//! InMemoryBroker: a single-process broker for development and tests.
//!
//! # Behaviour
//! - `publish` stores the message, assigns a ULID message id and a per-topic
//!   offset, and answers `SEND_OK`.
//! - `receive` leases the next ready message to exactly one worker.
//! - `Accepted` forgets the message. `RetryLater` schedules a redelivery with
//!   `reconsume_times + 1` after the `RetryPolicy` delay; once a message
//!   has been reconsumed `max_reconsume_times` times, its next `RetryLater`
//!   moves it to the dead-letter list instead.
//! - `close()` fails further publishes and ends every `receive`.

use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use ulid::Ulid;

use super::RetryPolicy;
use crate::domain::{
    AckError, BrokerAck, ConsumeOutcome, Envelope, InboundMessage, PublishError, SendStatus,
};
use crate::ports::{BrokerPublisher, Delivery, DeliverySource};

/// Matches the broker's default redelivery limit.
pub const DEFAULT_MAX_RECONSUME_TIMES: u32 = 16;

#[derive(Debug, Clone)]
pub struct BrokerOptions {
    pub max_reconsume_times: u32,
    pub retry_policy: RetryPolicy,
}

impl Default for BrokerOptions {
    fn default() -> Self {
        Self {
            max_reconsume_times: DEFAULT_MAX_RECONSUME_TIMES,
            retry_policy: RetryPolicy::broker_default(),
        }
    }
}

/// Snapshot of the broker's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerStats {
    pub published: u64,
    pub ready: usize,
    pub in_flight: usize,
    pub scheduled: usize,
    pub consumed: u64,
    pub reconsumed: u64,
    pub dead_lettered: usize,
}

/// Redelivery entry, ordered so the `BinaryHeap` pops the earliest first.
struct ScheduledMessage {
    deliver_at: Instant,
    seq: u64,
    message: InboundMessage,
}

impl PartialEq for ScheduledMessage {
    fn eq(&self, other: &Self) -> bool {
        self.deliver_at == other.deliver_at && self.seq == other.seq
    }
}

impl Eq for ScheduledMessage {}

impl PartialOrd for ScheduledMessage {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledMessage {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .deliver_at
            .cmp(&self.deliver_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct BrokerState {
    ready: VecDeque<InboundMessage>,
    scheduled: BinaryHeap<ScheduledMessage>,
    dead_letters: Vec<InboundMessage>,
    offsets: HashMap<String, u64>,
    next_seq: u64,
    in_flight: usize,
    published: u64,
    consumed: u64,
    reconsumed: u64,
    closed: bool,
}

impl BrokerState {
    /// Move redeliveries whose time has come to the ready queue.
    fn promote_due(&mut self, now: Instant) {
        while self
            .scheduled
            .peek()
            .is_some_and(|entry| entry.deliver_at <= now)
        {
            if let Some(entry) = self.scheduled.pop() {
                self.ready.push_back(entry.message);
            }
        }
    }

    fn schedule(&mut self, deliver_at: Instant, message: InboundMessage) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.scheduled.push(ScheduledMessage {
            deliver_at,
            seq,
            message,
        });
    }

    fn next_offset(&mut self, topic: &str) -> u64 {
        let offset = self.offsets.entry(topic.to_string()).or_insert(0);
        let current = *offset;
        *offset += 1;
        current
    }

    fn stats(&self) -> BrokerStats {
        BrokerStats {
            published: self.published,
            ready: self.ready.len(),
            in_flight: self.in_flight,
            scheduled: self.scheduled.len(),
            consumed: self.consumed,
            reconsumed: self.reconsumed,
            dead_lettered: self.dead_letters.len(),
        }
    }
}

/// Process-wide broker handle. Open it once at start, share it behind an
/// `Arc` with the producer and the consumer group, `close()` it at shutdown.
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
    notify: Arc<Notify>,
    options: BrokerOptions,
}

impl InMemoryBroker {
    pub fn new(options: BrokerOptions) -> Self {
        Self {
            state: Arc::new(Mutex::new(BrokerState::default())),
            notify: Arc::new(Notify::new()),
            options,
        }
    }

    pub fn options(&self) -> &BrokerOptions {
        &self.options
    }

    pub async fn stats(&self) -> BrokerStats {
        self.state.lock().await.stats()
    }

    pub async fn dead_letters(&self) -> Vec<InboundMessage> {
        self.state.lock().await.dead_letters.clone()
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    pub async fn close(&self) {
        {
            let mut state = self.state.lock().await;
            if state.closed {
                return;
            }
            state.closed = true;
            tracing::info!(stats = ?state.stats(), "closing in-memory broker");
        }
        self.notify.notify_waiters();
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new(BrokerOptions::default())
    }
}

#[async_trait]
impl BrokerPublisher for InMemoryBroker {
    async fn publish(&self, envelope: &Envelope) -> Result<BrokerAck, PublishError> {
        let ack = {
            let mut state = self.state.lock().await;
            if state.closed {
                return Err(PublishError::Unreachable("broker is closed".to_string()));
            }

            let message_id = Ulid::new().to_string();
            let queue_offset = state.next_offset(envelope.topic());
            let message = InboundMessage::new(message_id.clone(), envelope.topic(), envelope.payload())
                .with_tag(envelope.tag())
                .with_key(envelope.key().map(str::to_string));
            state.ready.push_back(message);
            state.published += 1;

            BrokerAck {
                status: SendStatus::SendOk,
                message_id,
                topic: envelope.topic().to_string(),
                queue_id: 0,
                queue_offset,
            }
        };

        self.notify.notify_one();
        Ok(ack)
    }
}

#[async_trait]
impl DeliverySource for InMemoryBroker {
    async fn receive(&self) -> Option<Box<dyn Delivery>> {
        loop {
            // Register interest before looking at the state so a publish or
            // close in between is not missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let next_wake = {
                let mut state = self.state.lock().await;
                if state.closed {
                    return None;
                }
                state.promote_due(Instant::now());

                if let Some(message) = state.ready.pop_front() {
                    state.in_flight += 1;
                    if !state.ready.is_empty() {
                        self.notify.notify_one();
                    }
                    return Some(Box::new(InMemoryDelivery {
                        message,
                        state: Arc::clone(&self.state),
                        notify: Arc::clone(&self.notify),
                        options: self.options.clone(),
                    }));
                }

                state.scheduled.peek().map(|entry| entry.deliver_at)
            };

            match next_wake {
                Some(wake_at) => {
                    tokio::select! {
                        _ = &mut notified => {},
                        _ = tokio::time::sleep_until(wake_at) => {},
                    }
                }
                None => notified.await,
            }
        }
    }
}

struct InMemoryDelivery {
    message: InboundMessage,
    state: Arc<Mutex<BrokerState>>,
    notify: Arc<Notify>,
    options: BrokerOptions,
}

#[async_trait]
impl Delivery for InMemoryDelivery {
    fn message(&self) -> &InboundMessage {
        &self.message
    }

    async fn acknowledge(self: Box<Self>, outcome: ConsumeOutcome) -> Result<(), AckError> {
        let should_notify = {
            let mut state = self.state.lock().await;
            state.in_flight = state.in_flight.saturating_sub(1);
            if state.closed {
                return Err(AckError::Closed(self.message.message_id().to_string()));
            }

            match outcome {
                ConsumeOutcome::Accepted => {
                    state.consumed += 1;
                    false
                }
                ConsumeOutcome::RetryLater
                    if self.message.reconsume_times() >= self.options.max_reconsume_times =>
                {
                    tracing::warn!(
                        message_id = %self.message.message_id(),
                        reconsume_times = self.message.reconsume_times(),
                        "max reconsume times reached, moving message to dead letters"
                    );
                    state.dead_letters.push(self.message.clone());
                    false
                }
                ConsumeOutcome::RetryLater => {
                    let next = self.message.redelivered();
                    let delay = self.options.retry_policy.next_delay(next.reconsume_times());
                    tracing::debug!(
                        message_id = %next.message_id(),
                        reconsume_times = next.reconsume_times(),
                        delay_ms = delay.as_millis() as u64,
                        "scheduling redelivery"
                    );
                    state.reconsumed += 1;
                    state.schedule(Instant::now() + delay, next);
                    true
                }
            }
        };

        // a worker may be sleeping until a later wake-up
        if should_notify {
            self.notify.notify_one();
        }
        Ok(())
    }
}
