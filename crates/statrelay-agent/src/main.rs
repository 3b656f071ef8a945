use anyhow::Result;
use statrelay_agent::config::AgentConfig;
use statrelay_agent::pipeline::Pipeline;
use statrelay_agent::transport::ReportClient;
use statrelay_sampler::cpu::CpuSampler;
use statrelay_sampler::load::LoadSampler;
use statrelay_sampler::memory::MemorySampler;
use statrelay_sampler::Sampler;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("statrelay=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/agent.toml".to_string());
    let config = AgentConfig::load_or_default(&config_path)?;

    tracing::info!(
        endpoint = %config.endpoint,
        poll_secs = config.poll_interval_secs,
        report_secs = config.report_interval_secs,
        signing = config.sign_key.is_some(),
        "statrelay-agent starting"
    );

    let samplers: Vec<Box<dyn Sampler>> = vec![
        Box::new(MemorySampler::new()),
        Box::new(CpuSampler::new()),
        Box::new(LoadSampler::new()),
    ];
    let client = ReportClient::new(
        &config.base_url(),
        Duration::from_secs(config.request_timeout_secs),
        config.sign_key.clone(),
    )?;
    let pipeline = Pipeline::new(
        samplers,
        client,
        Duration::from_secs(config.poll_interval_secs),
        Duration::from_secs(config.report_interval_secs),
    );

    let token = CancellationToken::new();
    let run = tokio::spawn(pipeline.run(token.clone()));

    signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    token.cancel();
    let _ = run.await;

    tracing::info!("Agent work completed");
    Ok(())
}
