//! Ports: the broker seams.
//!
//! The core only needs two primitives from a broker client: a synchronous
//! publish, and a delivery stream whose items are acknowledged with one of
//! two signals. A real client (RocketMQ, Kafka, ...) lives behind these
//! traits; `impls::InMemoryBroker` implements both for development.

pub mod delivery;
pub mod publisher;

pub use self::delivery::{Delivery, DeliverySource};
pub use self::publisher::BrokerPublisher;
