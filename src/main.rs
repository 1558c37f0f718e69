// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kube::Client;
use std::io::Read;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use branchenv::cloud::gcp::GcpClient;
use branchenv::config::Config;
use branchenv::context::DeployContext;
use branchenv::kubernetes::Manifest;
use branchenv::progress::WriterProgress;
use branchenv::sync::Engine;

/// Per-branch ephemeral environments on Kubernetes
#[derive(Parser, Debug)]
#[command(name = "branchenv", version)]
struct Cli {
    /// OAuth bearer token for the GCP REST APIs
    #[arg(long, env = "GCP_ACCESS_TOKEN", hide_env_values = true)]
    access_token: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or update the environment from rendered manifests
    Apply {
        namespace: String,

        /// Manifest file, `-` or omitted for stdin
        manifests: Option<String>,

        /// Branch used for image tag resolution (defaults to the namespace)
        #[arg(long, env = "BRANCH")]
        branch: Option<String>,
    },
    /// Tear the environment down
    Delete { namespace: String },
}

/// Rendered manifests from a file, or stdin when no path (or `-`) is given
fn read_manifests(path: Option<&str>) -> Result<Vec<Manifest>> {
    let documents = match path {
        Some(p) if p != "-" => {
            std::fs::read_to_string(p).with_context(|| format!("Failed to read {}", p))?
        }
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read manifests from stdin")?;
            buf
        }
    };
    Ok(Manifest::from_yaml(&documents)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Progress goes to stdout, logs to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let gcp = Arc::new(GcpClient::new(cli.access_token)?);
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let engine = Engine::new(
        client,
        config.clone(),
        gcp.clone(),
        gcp.clone(),
        Arc::new(WriterProgress::stdout()),
    )
    .with_dns(gcp);

    match cli.command {
        Command::Apply {
            namespace,
            manifests,
            branch,
        } => {
            let branch = branch.unwrap_or_else(|| namespace.clone());
            let ctx = DeployContext::new(namespace, config.project_id).with_branch(branch);
            let manifests = read_manifests(manifests.as_deref())?;
            info!("Applying {} manifests to {}", manifests.len(), ctx.namespace);
            engine.apply(&ctx, manifests).await?;
        }
        Command::Delete { namespace } => {
            let ctx = DeployContext::new(namespace, config.project_id);
            engine.delete(&ctx).await?;
        }
    }

    Ok(())
}
