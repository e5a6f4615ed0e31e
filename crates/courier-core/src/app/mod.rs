//! Application layer: wires the ports into the two delivery paths.
//!
//! # Components
//! - **Producer**: publish one envelope, classify the broker's answer
//! - **Dispatcher**: decode → handler → `ConsumeOutcome` → acknowledgement
//! - **DispatcherBuilder**: subscription wiring with fail-fast checks
//! - **ConsumerGroup**: worker tasks pulling from a `DeliverySource`

pub mod builder;
pub mod consumer;
pub mod dispatcher;
pub mod producer;

pub use self::builder::{BuildError, DispatcherBuilder};
pub use self::consumer::{ConsumerGroup, ConsumerSettings};
pub use self::dispatcher::Dispatcher;
pub use self::producer::Producer;
