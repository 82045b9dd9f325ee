//! B-roll assembly worker binary.
//!
//! Reads one job request as JSON (from the file named by the first argument,
//! or stdin when absent or `-`), runs it and prints the outcome as JSON.

use anyhow::Context;
use serde::Serialize;
use std::io::Read;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use broll_models::{JobOutcome, JobRequest};
use broll_worker::{Pipeline, WorkerConfig};

/// Caller-facing response shape.
#[derive(Serialize)]
struct Response<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    job: &'a JobOutcome,
}

impl<'a> Response<'a> {
    fn from_outcome(outcome: &'a JobOutcome) -> Self {
        match outcome {
            JobOutcome::Done {
                reference,
                duration,
                ..
            } => Self {
                success: true,
                reference: Some(reference),
                duration: Some(*duration),
                error: None,
                job: outcome,
            },
            JobOutcome::Failed { reason, .. } => Self {
                success: false,
                reference: None,
                duration: None,
                error: Some(reason),
                job: outcome,
            },
        }
    }
}

fn read_request(arg: Option<String>) -> anyhow::Result<JobRequest> {
    let raw = match arg.as_deref() {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading job request from stdin")?;
            buf
        }
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading job request from {}", path))?,
    };
    serde_json::from_str(&raw).context("parsing job request")
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Logs go to stderr; stdout carries the JSON response.
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn run() -> anyhow::Result<bool> {
    let request = read_request(std::env::args().nth(1))?;

    let config = Arc::new(WorkerConfig::from_env());
    info!("Worker config: {:?}", config);

    let pipeline = Pipeline::from_config(config).context("building pipeline")?;
    let outcome = pipeline.run(request).await;

    println!(
        "{}",
        serde_json::to_string_pretty(&Response::from_outcome(&outcome))?
    );
    Ok(outcome.is_success())
}

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("rustls crypto provider already installed");
    }

    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting broll-worker");

    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(2);
        }
    }
}
