//! AWS collaborators of the relay: Firehose delivery, SSM parameters for the watermark, and
//! Secrets Manager for the vendor credentials.
//!
//! Every client is built from one shared [`aws_config::SdkConfig`] (see [`load_sdk_config`]) so
//! region and credentials are resolved once per invocation.

use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_smithy_types::error::display::DisplayErrorContext;

/// Batched record delivery to a Kinesis Data Firehose stream.
pub mod firehose;

/// String parameters in SSM Parameter Store.
pub mod parameter;

/// Secret strings from Secrets Manager.
pub mod secrets;

/// Region used when neither the caller nor the environment provides one.
pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    #[error("Failed with Firehose error - {0}")]
    Firehose(String),

    #[error("Failed with SSM error - {0}")]
    Ssm(String),

    #[error("Failed with Secrets Manager error - {0}")]
    SecretsManager(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = core::result::Result<T, Error>;

/// Renders an SDK error with its whole source chain, which is where the service error code and
/// message live.
pub(crate) fn describe<E: std::error::Error>(err: &E) -> String {
    DisplayErrorContext(err).to_string()
}

/// Loads the shared AWS configuration from the standard provider chain. An explicit `region`
/// wins over the environment; [`DEFAULT_REGION`] is the last resort.
pub async fn load_sdk_config(region: Option<String>) -> SdkConfig {
    let region_provider = RegionProviderChain::first_try(region.map(Region::new))
        .or_default_provider()
        .or_else(Region::new(DEFAULT_REGION));

    let config = aws_config::defaults(BehaviorVersion::latest())
        .region(region_provider)
        .load()
        .await;

    tracing::info!(region = ?config.region(), "Loaded AWS configuration");
    config
}
