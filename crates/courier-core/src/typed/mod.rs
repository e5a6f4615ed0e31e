//! Typed consumer API.
//!
//! # Two layers
//! - **Typed surface**: `MessageBody`, `Handler<B>`, `FallibleHandler<B>`.
//!   A handler only ever sees a decoded body of its own type.
//! - **Erased layer**: `DynHandler`, stored in the `HandlerRegistry` as
//!   `Arc<dyn DynHandler>` and fed raw delivery bytes by the dispatcher.

pub mod body;
pub mod handler;
pub mod registry;
pub mod subscription;

pub use self::body::{Json, MessageBody};
pub use self::handler::{DynHandler, FallibleHandler, Guarded, Handler};
pub use self::registry::{HandlerRegistry, RegistryError, Route};
pub use self::subscription::{Subscription, TagFilter};
