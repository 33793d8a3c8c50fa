//! EnvMon Core - Main Entry Point
//!
//! MQTT sensor readings → classification → actuation command → history.

mod api;
mod logic;
pub mod constants;

use std::sync::Arc;

use anyhow::Context;

use logic::config::MonitorConfig;
use logic::context::MonitorContext;
use logic::transport::MqttPublisher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting {} v{}...", constants::APP_NAME, constants::APP_VERSION);

    let config = MonitorConfig::load().context("failed to load configuration")?;
    log::info!(
        "Broker {} | sensor '{}' | output '{}' | capacity {}",
        config.broker.address(),
        config.topics.sensor,
        config.topics.output,
        config.history.capacity
    );

    let ctx = MonitorContext::new(config);

    // History and model first, so the pipeline starts with both in place
    ctx.restore_history();
    ctx.load_model();
    if ctx.model_status().loaded {
        log::info!("ONNX model loaded - server-side classification active");
    } else {
        log::info!("No model - using device labels");
    }

    let publisher = Arc::new(MqttPublisher::start(&ctx.config().broker, ctx.shutdown_signal()));
    let pipeline = ctx.build_pipeline(publisher.clone());

    ctx.ensure_transport_started();

    let consumer = logic::consumer::start(ctx.clone(), pipeline).context("failed to spawn consumer thread")?;

    let http = if ctx.config().dashboard.http_enabled {
        let bind = ctx.config().dashboard.bind.clone();
        let http_ctx = ctx.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = api::server::serve(http_ctx, &bind).await {
                log::error!("Dashboard API stopped: {}", e);
            }
        }))
    } else {
        log::info!("Dashboard API disabled");
        None
    };

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    ctx.shutdown();

    if let Some(http) = http {
        let _ = http.await;
    }

    // Consumer flushes the queue once more before exiting
    let _ = tokio::task::spawn_blocking(move || consumer.join()).await;
    publisher.stop();

    let (sent, failed) = publisher.counts();
    log::info!(
        "{} stopped ({} records, {} commands sent, {} failed)",
        constants::APP_NAME,
        ctx.state().len(),
        sent,
        failed
    );
    Ok(())
}
