//! HandlerRegistry: topic → (tag filter, handler).
//!
//! Built during startup (mutable), then shared immutably behind an `Arc`
//! by every consumer worker, so lookups take no lock.

use std::collections::HashMap;
use std::sync::Arc;

use super::body::MessageBody;
use super::handler::{DynHandler, Handler, TypedHandler};
use super::subscription::Subscription;
use crate::domain::InboundMessage;

struct Registration {
    subscription: Subscription,
    handler: Arc<dyn DynHandler>,
}

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Registration>,
}

/// Registry misuse, detected at startup.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("a handler for topic '{0}' is already registered")]
    AlreadyRegistered(String),
}

/// Where an inbound message goes.
pub enum Route {
    /// Hand it to this handler.
    Handler(Arc<dyn DynHandler>),
    /// The topic is subscribed but the tag filter excludes the message.
    Filtered,
    /// Nobody subscribed to the topic.
    Unrouted,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Bind `handler` to a subscription. One handler per topic.
    pub fn register<B, H>(&mut self, subscription: Subscription, handler: H) -> Result<(), RegistryError>
    where
        B: MessageBody,
        H: Handler<B> + 'static,
    {
        let topic = subscription.topic().to_string();
        if self.handlers.contains_key(&topic) {
            return Err(RegistryError::AlreadyRegistered(topic));
        }
        let handler: Arc<dyn DynHandler> = Arc::new(TypedHandler::<B, H>::new(handler));
        self.handlers.insert(
            topic,
            Registration {
                subscription,
                handler,
            },
        );
        Ok(())
    }

    pub fn resolve(&self, message: &InboundMessage) -> Route {
        match self.handlers.get(message.topic()) {
            None => Route::Unrouted,
            Some(reg) if !reg.subscription.filter().matches(message.tag()) => Route::Filtered,
            Some(reg) => Route::Handler(Arc::clone(&reg.handler)),
        }
    }

    pub fn subscriptions(&self) -> Vec<&Subscription> {
        self.handlers.values().map(|r| &r.subscription).collect()
    }

    pub fn topics(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
