//! Slack incident-triage webhook: verify, classify, reply.

mod classifier;
mod config;
mod dedupe;
mod event;
mod pipeline;
mod server;
mod signature;
mod slack;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "triageclaw", version, about = "Slack incident-triage webhook")]
struct Cli {
    /// Address to bind the HTTP listener on.
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: String,

    /// Background classification workers.
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Pending-job queue depth; jobs beyond this are dropped with a warning.
    #[arg(long, default_value_t = 64)]
    queue_depth: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::Config::from_env()?;

    // Timeouts live at the client, not per call: the messaging API is quick,
    // the inference call is not.
    let slack_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .connect_timeout(Duration::from_secs(5))
        .build()
        .context("failed to build Slack HTTP client")?;
    let inference_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .connect_timeout(Duration::from_secs(5))
        .build()
        .context("failed to build inference HTTP client")?;

    let classifier = classifier::Classifier::new(
        inference_client,
        cfg.anthropic_api_base.clone(),
        cfg.anthropic_api_key.clone(),
        cfg.model.clone(),
    );
    let notifier = slack::Notifier::new(slack_client, cfg.slack_api_base.clone(), cfg.bot_token);
    let pipeline = pipeline::Pipeline::start(
        classifier,
        notifier,
        cli.workers,
        cli.queue_depth,
        None,
    );

    let state = server::AppState {
        signing_secret: cfg.signing_secret,
        pipeline: Arc::new(pipeline),
        seen: Arc::new(dedupe::SeenEvents::new()),
    };

    server::run(&cli.bind, state).await
}
