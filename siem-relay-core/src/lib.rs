//! Incremental relay of vendor SIEM records into a Firehose delivery stream.
//!
//! One invocation reads the stored watermark, drains every configured endpoint from that point
//! forward, delivers the records in batches and, if anything was relayed, records the run start
//! as the new watermark.

use tracing::info;

pub use crate::error::{Error, Result};

mod error;

/// Environment driven configuration.
pub mod config;

/// Vendor API session and single page fetch.
mod client;

/// Cursor driven draining of one endpoint.
mod pagination;

/// Sequences the endpoints and owns the watermark update.
pub mod coordinator;

/// Durable watermark and its store.
pub mod watermark;

/// Vendor credential resolution.
pub mod secrets;

/// Batched delivery of records.
pub mod sink;

#[cfg(test)]
mod test_utils;

pub use crate::client::SiemClient;
pub use crate::coordinator::{RunCoordinator, RunSummary};
pub use crate::pagination::EndpointSummary;

/// A single vendor record, relayed verbatim.
pub type Record = serde_json::Value;

/// Builds every collaborator from `env_vars` and the ambient AWS configuration, then performs
/// one run.
pub async fn run(
    env_vars: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
) -> Result<RunSummary> {
    let config = config::RelayConfig::load(env_vars)?;
    info!(
        endpoints = config.api.endpoints.len(),
        delivery_stream = %config.sink.delivery_stream,
        parameter = %config.watermark.parameter,
        "Loaded relay configuration"
    );

    let sdk_config = siem_relay_aws::load_sdk_config(None).await;

    let secrets = siem_relay_aws::secrets::SecretsManager::new(&sdk_config);
    let credentials = secrets::resolve_credentials(&secrets, &config.secrets).await?;

    let client = SiemClient::new(
        &config.api.base_url,
        &credentials,
        config.api.request_timeout,
    )?;
    let store = siem_relay_aws::parameter::ParameterStore::new(&sdk_config);
    let firehose = siem_relay_aws::firehose::FirehoseSink::new(
        &sdk_config,
        config.sink.delivery_stream.clone(),
    );

    let mut coordinator = RunCoordinator::new(
        pagination::Paginator::new(client, config.api),
        store,
        sink::SinkWriter::new(firehose, &config.sink),
        config.watermark,
    );
    let summary = coordinator.run().await?;

    for endpoint in &summary.endpoints {
        info!(
            endpoint = %endpoint.endpoint,
            pages = endpoint.pages,
            records = endpoint.records,
            "Endpoint summary"
        );
    }
    Ok(summary)
}
