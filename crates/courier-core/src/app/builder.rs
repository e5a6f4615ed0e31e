//! DispatcherBuilder: subscription wiring with start-up checks.
//!
//! Subscriptions are resolved once, at start. `build()` fails fast if a topic
//! the process is expected to consume has no handler, so a
//! misconfigured consumer never starts pulling messages it would only bounce.

use crate::app::Dispatcher;
use crate::typed::{FallibleHandler, Guarded, Handler, HandlerRegistry, MessageBody, RegistryError, Subscription};

/// Builds a `Dispatcher`.
///
/// # Example
/// ```ignore
/// let dispatcher = DispatcherBuilder::new()
///     .subscribe::<String, _>(Subscription::new("TEST_TOPIC", "*"), AuditHandler)?
///     .expect_topics(&["TEST_TOPIC"])
///     .build()?;
/// ```
pub struct DispatcherBuilder {
    registry: HandlerRegistry,
    expected_topics: Option<Vec<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing handlers for topics: {0:?}. These topics were expected but not subscribed.")]
    MissingTopics(Vec<String>),
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistry::new(),
            expected_topics: None,
        }
    }

    /// Subscribe a handler whose contract is already infallible.
    pub fn subscribe<B, H>(mut self, subscription: Subscription, handler: H) -> Result<Self, RegistryError>
    where
        B: MessageBody,
        H: Handler<B> + 'static,
    {
        tracing::info!(%subscription, body = std::any::type_name::<B>(), "subscribing handler");
        self.registry.register::<B, H>(subscription, handler)?;
        Ok(self)
    }

    /// Subscribe a handler that returns `Result`; errors become `RetryLater`.
    pub fn subscribe_fallible<B, H>(self, subscription: Subscription, handler: H) -> Result<Self, RegistryError>
    where
        B: MessageBody,
        H: FallibleHandler<B> + 'static,
    {
        self.subscribe::<B, _>(subscription, Guarded::new(handler))
    }

    pub fn expect_topics(mut self, topics: &[&str]) -> Self {
        self.expected_topics = Some(topics.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn build(self) -> Result<Dispatcher, BuildError> {
        if let Some(expected) = &self.expected_topics {
            let registered = self.registry.topics();
            let missing: Vec<String> = expected
                .iter()
                .filter(|t| !registered.contains(t))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingTopics(missing));
            }
        }
        Ok(Dispatcher::new(self.registry))
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
