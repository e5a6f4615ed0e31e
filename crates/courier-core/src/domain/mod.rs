//! Domain model: what gets published, what gets delivered, and how each
//! attempt ends.

pub mod envelope;
pub mod errors;
pub mod message;
pub mod outcome;

pub use self::envelope::Envelope;
pub use self::errors::{AckError, DecodeError, EnvelopeError, HandlerError, PublishError};
pub use self::message::{DeliveryContext, InboundMessage};
pub use self::outcome::{BrokerAck, ConsumeOutcome, DeliveryOutcome, SendFailure, SendStatus};
