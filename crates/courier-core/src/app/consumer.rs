use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument as _;

use crate::app::Dispatcher;
use crate::ports::DeliverySource;

/// Matches the broker client's default consume thread count.
pub const DEFAULT_CONSUME_THREADS: usize = 20;

/// Identity and sizing of one consumer instance.
#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    pub group: String,
    pub instance_id: String,
    pub threads: usize,
}

impl ConsumerSettings {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            instance_id: "DEFAULT".to_string(),
            threads: DEFAULT_CONSUME_THREADS,
        }
    }

    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = instance_id.into();
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }
}

/// Consumer worker group handle.
/// - workers pull from the source concurrently; one delivery is only ever
///   handled by one worker
/// - `request_shutdown()` stops taking new deliveries
/// - `shutdown_and_join()` also waits for in-flight handlers to finish
pub struct ConsumerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl ConsumerGroup {
    /// Spawn `settings.threads` workers (at least one).
    pub fn spawn(
        settings: ConsumerSettings,
        source: Arc<dyn DeliverySource>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let threads = settings.threads.max(1);

        tracing::info!(
            group = %settings.group,
            instance = %settings.instance_id,
            threads,
            "starting consumer group"
        );

        let mut joins = Vec::with_capacity(threads);
        for worker_id in 0..threads {
            let source = Arc::clone(&source);
            let dispatcher = Arc::clone(&dispatcher);
            let rx = shutdown_rx.clone();
            let span = tracing::info_span!(
                "consumer",
                group = %settings.group,
                instance = %settings.instance_id,
                worker = worker_id,
            );

            let join = tokio::spawn(consume_loop(source, dispatcher, rx).instrument(span));
            joins.push(join);
        }

        Self { shutdown_tx, joins }
    }

    /// Stop taking new deliveries. In-flight handlers are not interrupted.
    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for join in self.joins {
            if let Err(err) = join.await {
                tracing::error!(error = %err, "consumer worker ended abnormally");
            }
        }
        tracing::info!("consumer group stopped");
    }
}

async fn consume_loop(
    source: Arc<dyn DeliverySource>,
    dispatcher: Arc<Dispatcher>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let delivery = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            delivery = source.receive() => delivery,
        };

        let Some(delivery) = delivery else {
            tracing::debug!("delivery source closed");
            break;
        };

        match dispatcher.deliver(delivery).await {
            Ok(outcome) => tracing::debug!(?outcome, "delivery acknowledged"),
            Err(err) => tracing::warn!(error = %err, "acknowledgement failed, broker will redeliver"),
        }
    }
}
