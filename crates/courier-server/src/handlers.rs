use async_trait::async_trait;
use courier_core::{ConsumeOutcome, DeliveryContext};
use courier_core::domain::HandlerError;
use courier_core::typed::FallibleHandler;

/// Logs every text message it is given and accepts it.
#[derive(Debug, Clone, Default)]
pub struct LogHandler;

#[async_trait]
impl FallibleHandler<String> for LogHandler {
    async fn try_handle(&self, body: String, ctx: &DeliveryContext) -> Result<ConsumeOutcome, HandlerError> {
        tracing::info!(
            message_id = %ctx.message_id(),
            tag = %ctx.tag(),
            reconsume_times = ctx.reconsume_times(),
            body = %body,
            "message received"
        );
        Ok(ConsumeOutcome::Accepted)
    }
}
