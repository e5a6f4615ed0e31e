//! Impls: port implementations for development and tests.
//!
//! - **InMemoryBroker**: `BrokerPublisher` + `DeliverySource` in one handle,
//!   with broker-side redelivery (backoff, reconsume counter, dead letters)
//! - **RetryPolicy**: the backoff it redelivers with
//!
//! Production brokers are adapted behind the same ports outside this crate.

pub mod inmem_broker;
pub mod retry;

pub use self::inmem_broker::{BrokerOptions, BrokerStats, DEFAULT_MAX_RECONSUME_TIMES, InMemoryBroker};
pub use self::retry::RetryPolicy;
