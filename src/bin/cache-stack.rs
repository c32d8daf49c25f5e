// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cache Stack CLI
//!
//! Synthesizes, deploys or destroys the cache stack described by the
//! `CACHE_STACK_*` environment variables.
//!
//! ```text
//! cache-stack synth     print the desired resource graph as JSON
//! cache-stack deploy    apply the graph and print the deployment report
//! cache-stack destroy   tear the stack down
//! cache-stack serve     answer provisioning requests with the in-memory engine
//! ```
//!
//! `--backend nats` (or `CACHE_STACK_BACKEND=nats`) sends engine calls to a
//! responder over NATS (`NATS_URL`, default localhost:4222). The default
//! `memory` backend is a deterministic dry run.

use anyhow::{bail, Context, Result};
use cim_cache_stack::{
    provisioning::ProvisioningResponder, InMemoryProvisioningEngine, NatsClient, NatsConfig,
    NatsProvisioningEngine, ProvisioningEngine, StackConfig, StackProvisioner,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "cache-stack")]
#[command(about = "Cache cluster and bastion stack for an existing network")]
#[command(version)]
struct Cli {
    /// Defaults to `synth`
    #[command(subcommand)]
    command: Option<Command>,

    /// Where engine calls go
    #[arg(short, long, global = true, env = "CACHE_STACK_BACKEND", default_value = "memory")]
    backend: Backend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum Command {
    /// Print the desired resource graph as JSON
    Synth,
    /// Apply the graph and print the deployment report
    Deploy,
    /// Tear the stack down
    Destroy,
    /// Answer provisioning requests over NATS with the in-memory engine
    Serve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// Deterministic dry run
    Memory,
    /// Remote responder over NATS
    Nats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Synth);

    let config = StackConfig::from_env().context("Invalid CACHE_STACK_* configuration")?;
    info!(
        "📋 Stack {} in {} on network {} ({})",
        config.stack_name,
        config.environment(),
        config.network_id,
        config.variant
    );

    if command == Command::Serve {
        return serve(&config).await;
    }

    match cli.backend {
        Backend::Memory => {
            let engine = InMemoryProvisioningEngine::with_reference_network(&config);
            run(command, StackProvisioner::new(config, engine)).await
        }
        Backend::Nats => {
            let nats = NatsConfig::from_env();
            info!("🔌 Connecting to NATS at {:?}", nats.servers);
            let engine = NatsProvisioningEngine::connect(nats)
                .await
                .context("Failed to connect to NATS")?;
            run(command, StackProvisioner::new(config, engine)).await
        }
    }
}

async fn run<E: ProvisioningEngine>(
    command: Command,
    mut provisioner: StackProvisioner<E>,
) -> Result<()> {
    match command {
        Command::Synth => {
            let graph = provisioner.synth().await.context("Synthesis failed")?;
            println!("{}", graph.to_json()?);
        }
        Command::Deploy => {
            let report = provisioner.deploy().await.context("Deployment failed")?;
            info!(
                "✅ Deploy {} finished ({} changes)",
                report.run_id,
                report.diff.actionable().count()
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Destroy => {
            provisioner.destroy().await.context("Destroy failed")?;
            info!("🗑️ Stack {} destroyed", provisioner.stack_name());
        }
        Command::Serve => bail!("serve runs its own engine"),
    }
    Ok(())
}

async fn serve(config: &StackConfig) -> Result<()> {
    let nats = NatsConfig::from_env();
    info!("🔌 Connecting to NATS at {:?}", nats.servers);
    let client = NatsClient::new(nats)
        .await
        .context("Failed to connect to NATS")?;

    let engine = Arc::new(InMemoryProvisioningEngine::with_reference_network(config));
    ProvisioningResponder::new(engine)
        .serve(&client)
        .await
        .context("Provisioning responder stopped")?;
    Ok(())
}
