//! Handler contract.
//!
//! - `Handler<B>`: decoded body plus `DeliveryContext` in, `ConsumeOutcome` out. Infallible by
//!   signature, so nothing but an outcome can cross the handler boundary.
//! - `FallibleHandler<B>` + `Guarded`: for bodies that want `?`. `Guarded`
//!   is the handler's outermost catch: it logs the error and answers
//!   `RetryLater`.
//! - `DynHandler`: object-safe form stored in the registry (type erasure via
//!   `TypedHandler<B, H>`).

use std::marker::PhantomData;

use async_trait::async_trait;

use super::body::MessageBody;
use crate::domain::{ConsumeOutcome, DecodeError, DeliveryContext, HandlerError};

/// A unit of consumer behaviour bound to one body type.
///
/// Handlers are registered once and then shared across workers, so they are
/// invoked concurrently for unrelated messages. Keep them stateless or
/// synchronize internally. Delivery is at-least-once: the same message may
/// arrive again after `RetryLater`.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use courier_core::{ConsumeOutcome, DeliveryContext};
/// use courier_core::typed::Handler;
///
/// struct Audit;
///
/// #[async_trait]
/// impl Handler<String> for Audit {
///     async fn handle(&self, body: String, ctx: &DeliveryContext) -> ConsumeOutcome {
///         // an empty body will not get better, stop after three tries
///         if body.is_empty() && ctx.reconsume_times() < 3 {
///             return ConsumeOutcome::RetryLater;
///         }
///         ConsumeOutcome::Accepted
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<B: MessageBody>: Send + Sync {
    async fn handle(&self, body: B, ctx: &DeliveryContext) -> ConsumeOutcome;
}

/// Handler body that may fail with a `HandlerError`.
///
/// Register it through `Guarded` (or `DispatcherBuilder::subscribe_fallible`)
/// so every `Err` becomes `RetryLater`.
#[async_trait]
pub trait FallibleHandler<B: MessageBody>: Send + Sync {
    async fn try_handle(&self, body: B, ctx: &DeliveryContext) -> Result<ConsumeOutcome, HandlerError>;
}

/// Fault boundary around a `FallibleHandler`.
pub struct Guarded<H> {
    inner: H,
}

impl<H> Guarded<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> H {
        self.inner
    }
}

#[async_trait]
impl<B, H> Handler<B> for Guarded<H>
where
    B: MessageBody,
    H: FallibleHandler<B>,
{
    async fn handle(&self, body: B, ctx: &DeliveryContext) -> ConsumeOutcome {
        match self.inner.try_handle(body, ctx).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(error = %err, "handler failed, message will be reconsumed");
                ConsumeOutcome::RetryLater
            }
        }
    }
}

/// Object-safe handler fed with raw delivery bytes.
///
/// Decoding happens before the typed handler runs: an undecodable body
/// returns `Err` and the handler is never invoked.
#[async_trait]
pub trait DynHandler: Send + Sync {
    async fn handle_raw(&self, raw: &[u8], ctx: &DeliveryContext) -> Result<ConsumeOutcome, DecodeError>;

    /// Name of the body type, for log records.
    fn body_type(&self) -> &'static str;
}

pub(crate) struct TypedHandler<B, H> {
    handler: H,
    _marker: PhantomData<fn() -> B>,
}

impl<B, H> TypedHandler<B, H>
where
    B: MessageBody,
    H: Handler<B>,
{
    pub(crate) fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<B, H> DynHandler for TypedHandler<B, H>
where
    B: MessageBody,
    H: Handler<B>,
{
    async fn handle_raw(&self, raw: &[u8], ctx: &DeliveryContext) -> Result<ConsumeOutcome, DecodeError> {
        let body = B::decode(raw)?;
        Ok(self.handler.handle(body, ctx).await)
    }

    fn body_type(&self) -> &'static str {
        std::any::type_name::<B>()
    }
}
