//! courier-core
//!
//! Reliable-delivery core of the courier bridge: one producer path that
//! publishes a message and reports the outcome, one consumer path that hands
//! each delivery to a pluggable handler and turns its answer into an
//! acknowledgement. Delivery is at-least-once.
//!
//! # Modules
//! - **domain**: value types (envelope, inbound message, outcomes, errors)
//! - **ports**: broker seams (`BrokerPublisher`, `DeliverySource`, `Delivery`)
//! - **typed**: body decoding, the `Handler` contract, `HandlerRegistry`
//! - **app**: `Producer`, `Dispatcher`, `DispatcherBuilder`, `ConsumerGroup`
//! - **impls**: `InMemoryBroker` for development and tests

pub mod domain;
pub mod ports;
pub mod typed;
pub mod app;
pub mod impls;

pub use domain::{
    BrokerAck, ConsumeOutcome, DeliveryContext, DeliveryOutcome, Envelope, InboundMessage, SendFailure, SendStatus,
};
pub use app::{ConsumerGroup, ConsumerSettings, Dispatcher, DispatcherBuilder, Producer};
