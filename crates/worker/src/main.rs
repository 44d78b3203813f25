//! `labelchain-worker` -- runs one step of the labeling job chain.
//!
//! Invoked by the event rule (`trigger`) or by a pipeline execution
//! (`preprocess`, `chain`, or both as `pipeline`). Each invocation re-reads
//! backend state, does its work and exits.
//!
//! # Environment variables
//!
//! | Variable      | Required | Default    | Description                                  |
//! |---------------|----------|------------|----------------------------------------------|
//! | `WORKER_STEP` | no       | `pipeline` | Step to run; the first CLI argument wins     |
//! | `LOG_FORMAT`  | no       | --         | `json` for JSON log lines                    |
//! | `RUST_LOG`    | no       | --         | Standard `EnvFilter` directives              |
//!
//! See [`labelchain_worker::config::WorkerConfig::from_env`] for the
//! project settings.
//!
//! # Exit codes
//!
//! `0` on success, `1` on fatal or configuration errors (including images
//! that cannot be decoded), `75` when a re-run may succeed.

use std::process::ExitCode;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tracing::Instrument;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use labelchain_cloud::s3::S3BlobStore;
use labelchain_cloud::sagemaker::SageMakerBackend;
use labelchain_worker::config::WorkerConfig;
use labelchain_worker::step::{error_exit_code, run_step, Step, EXIT_FATAL};

const DEFAULT_STEP: &str = "pipeline";

fn init_tracing() {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let (plain, structured) = if json {
        (None, Some(tracing_subscriber::fmt::layer().json()))
    } else {
        (Some(tracing_subscriber::fmt::layer()), None)
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "labelchain_worker=info,labelchain_pipeline=info".into()),
        )
        .with(plain)
        .with(structured)
        .init();
}

/// Read the trigger event from stdin. Empty input is a generic trigger.
async fn read_event() -> Result<Option<serde_json::Value>, String> {
    let mut raw = String::new();
    tokio::io::stdin()
        .read_to_string(&mut raw)
        .await
        .map_err(|e| format!("Failed to read event from stdin: {e}"))?;

    if raw.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| format!("Event is not valid JSON: {e}"))
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let step_name = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("WORKER_STEP").ok())
        .unwrap_or_else(|| DEFAULT_STEP.to_string());
    let step = match Step::from_name(&step_name) {
        Ok(step) => step,
        Err(e) => {
            tracing::error!(error = %e, "Invalid worker step");
            return ExitCode::from(EXIT_FATAL);
        }
    };

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::from(EXIT_FATAL);
        }
    };

    let event = if step.needs_event() {
        match read_event().await {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(error = %e, "Invalid trigger event");
                return ExitCode::from(EXIT_FATAL);
            }
        }
    } else {
        None
    };

    let invocation_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!(
        "invocation",
        %invocation_id,
        step = step.as_str(),
        project_prefix = %config.profile.project_prefix,
    );

    let code = async move {
        let sdk_config = labelchain_cloud::load_sdk_config(&config.profile.region).await;
        let ctx = config.into_context(
            Arc::new(S3BlobStore::from_sdk_config(&sdk_config)),
            Arc::new(SageMakerBackend::from_sdk_config(&sdk_config)),
        );

        tracing::info!("Starting worker step");

        match run_step(&ctx, step, event.as_ref(), chrono::Utc::now()).await {
            Ok(report) => {
                let code = report.exit_code();
                tracing::info!(exit_code = code, ?report, "Worker step finished");
                code
            }
            Err(e) => {
                let code = error_exit_code(&e);
                tracing::error!(
                    error = %e,
                    retryable = e.is_retryable(),
                    precondition = e.is_precondition(),
                    exit_code = code,
                    "Worker step failed",
                );
                code
            }
        }
    }
    .instrument(span)
    .await;

    ExitCode::from(code)
}
