pub mod config;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod submit;

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use config::ApiConfig;
use pipeline::{AssessmentRunner, HttpPageSource, PaginatedFetcher};
use submit::HttpSubmitter;

/// Entry point for the `vitals-triage` binary.
///
/// Only startup problems (bad configuration, HTTP client construction) fail
/// the process. Anything that goes wrong upstream degrades into a shorter
/// report instead.
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = match ApiConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    if config.api_key.is_none() {
        tracing::warn!("{} is not set, requests will be unauthenticated", config::ENV_API_KEY);
    }

    let source = match HttpPageSource::new(&config) {
        Ok(source) => source,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build retrieval client");
            return ExitCode::FAILURE;
        }
    };
    let submitter = match HttpSubmitter::new(&config) {
        Ok(submitter) => submitter,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build submission client");
            return ExitCode::FAILURE;
        }
    };

    let fetcher = PaginatedFetcher::new(source)
        .with_policy(config.retry.clone())
        .with_page_delay(config.page_delay);
    let summary = AssessmentRunner::new(fetcher, submitter).run();

    print!("{}", report::render_summary(&summary));
    print!("{}", report::render_data_quality(&summary.data_quality_details));
    print!("{}", report::render_submission(&summary.submission));

    ExitCode::SUCCESS
}
