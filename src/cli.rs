//! CLI helper functions

use crate::{
    client::{DEFAULT_HUBSPOT_URL, HubSpotClient},
    config::MigrationConfig,
    identity::IdentityIndex,
    jobs::{ImportSummary, JobReport, import_files},
};
use eyre::{Context, Result, bail};
use owo_colors::OwoColorize;
use url::Url;

/// Signature shared by the record migration jobs
pub type Job = fn(&MigrationConfig, &IdentityIndex) -> Result<JobReport>;

/// Load HubSpot client from environment variables
///
/// Expected environment variables:
/// - HUBSPOT_API_KEY: Private app access token (required)
/// - HUBSPOT_URL: API base URL (optional, defaults to https://api.hubapi.com)
pub fn load_hubspot_client() -> Result<HubSpotClient> {
    let api_key =
        std::env::var("HUBSPOT_API_KEY").context("HUBSPOT_API_KEY environment variable not set")?;
    let url_str = std::env::var("HUBSPOT_URL").unwrap_or_else(|_| DEFAULT_HUBSPOT_URL.to_string());
    let url = Url::parse(&url_str).with_context(|| format!("Invalid HUBSPOT_URL: {}", url_str))?;

    HubSpotClient::try_new(url, &api_key).context("Failed to create HubSpot client")
}

/// Convert a `--max-chunk-mb` value to bytes
pub fn chunk_bytes_from_mb(mb: u64) -> Result<u64> {
    if mb == 0 {
        bail!("--max-chunk-mb must be at least 1");
    }
    let Some(bytes) = mb.checked_mul(1024 * 1024) else {
        bail!("--max-chunk-mb {} is too large", mb);
    };
    Ok(bytes)
}

/// Build the identity index from the configured mapping tables
pub fn build_index(config: &MigrationConfig) -> IdentityIndex {
    let index = IdentityIndex::load(&config.mappings, &config.maps_dir);
    if index.is_empty() {
        log::warn!("No identifier mappings were loaded; every record will be skipped");
    }
    index
}

/// Build the identity index, run one record migration job and log its summary
pub fn run_job(config: &MigrationConfig, job: Job) -> Result<JobReport> {
    let index = build_index(config);
    let report = job(config, &index)?;
    report.log();
    if report.has_failures() {
        log::error!("{} finished with failed partitions", report.job.red());
    }
    Ok(report)
}

/// Upload the files listed in the manifests of the output directory
///
/// A dry run only needs the manifests and the renamed files; a real run
/// requires `HUBSPOT_API_KEY`.
pub async fn run_import(config: &MigrationConfig, dry_run: bool) -> Result<ImportSummary> {
    if dry_run {
        return import_files::<HubSpotClient>(&config.output_dir, &config.upload, None).await;
    }

    log::info!("Connecting to HubSpot...");
    let client = load_hubspot_client()?;
    log::info!("Using {}", client.url().as_str().bright_black());
    import_files(&config.output_dir, &config.upload, Some(&client)).await
}
