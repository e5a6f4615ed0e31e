use courier_server::{ServerConfig, run, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let config = ServerConfig::from_env()?;

    run(config, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "cannot listen for ctrl-c");
        }
    })
    .await
}
