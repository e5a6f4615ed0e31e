//! courier-server: HTTP producer endpoint plus a consumer group on one broker.

pub mod config;
pub mod handlers;
pub mod http;
pub mod telemetry;

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use courier_core::impls::{BrokerOptions, InMemoryBroker};
use courier_core::{ConsumerGroup, ConsumerSettings, DispatcherBuilder, Producer};
use courier_core::typed::Subscription;

pub use config::{BrokerConfig, ServerConfig};

/// Run until `shutdown` resolves, then stop consumers and close the broker.
pub async fn run(config: ServerConfig, shutdown: impl Future<Output = ()> + Send + 'static) -> anyhow::Result<()> {
    tracing::info!(
        namesrv = ?config.broker.namesrv_addrs,
        group = %config.broker.group,
        topic = %config.topic,
        "starting courier"
    );

    // bind before anything is spawned, so a taken port leaves nothing running
    let listener = tokio::net::TcpListener::bind(config.http_addr)
        .await
        .with_context(|| format!("cannot bind {}", config.http_addr))?;
    tracing::info!(addr = %config.http_addr, "http listening");

    let broker = Arc::new(InMemoryBroker::new(BrokerOptions {
        max_reconsume_times: config.max_reconsume_times,
        ..BrokerOptions::default()
    }));

    let producer = Producer::new(broker.clone()).with_send_timeout(config.send_timeout);

    let dispatcher = DispatcherBuilder::new()
        .subscribe_fallible::<String, _>(Subscription::new(config.topic.as_str(), "*"), handlers::LogHandler)?
        .expect_topics(&[config.topic.as_str()])
        .build()?;

    let consumers = ConsumerGroup::spawn(
        ConsumerSettings::new(config.broker.group.as_str())
            .with_instance_id(config.broker.instance_id.as_str())
            .with_threads(config.consume_threads),
        broker.clone(),
        Arc::new(dispatcher),
    );

    let app = http::router(http::AppState {
        producer,
        topic: Arc::from(config.topic.as_str()),
        tag: Arc::from(config.tag.as_str()),
    });

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("http server failed");

    tracing::info!("shutting down");
    consumers.shutdown_and_join().await;
    broker.close().await;

    served
}
