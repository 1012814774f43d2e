use aws_config::SdkConfig;
use aws_sdk_firehose::Client;
use aws_sdk_firehose::primitives::Blob;
use aws_sdk_firehose::types::Record;
use bytes::Bytes;

use crate::{Error, Result, describe};

/// Upper bound Firehose places on the number of records in one `PutRecordBatch` call.
pub const MAX_RECORDS_PER_BATCH: usize = 500;

/// Outcome of one entry of a `PutRecordBatch` call, positionally aligned with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutStatus {
    Delivered { record_id: Option<String> },
    Rejected { code: String, message: String },
}

/// Writes raw payloads to one delivery stream.
#[derive(Clone, Debug)]
pub struct FirehoseSink {
    client: Client,
    delivery_stream: String,
}

impl FirehoseSink {
    pub fn new(sdk_config: &SdkConfig, delivery_stream: impl Into<String>) -> Self {
        Self::with_client(Client::new(sdk_config), delivery_stream)
    }

    pub fn with_client(client: Client, delivery_stream: impl Into<String>) -> Self {
        Self {
            client,
            delivery_stream: delivery_stream.into(),
        }
    }

    /// Submits `payloads` as a single `PutRecordBatch` call.
    ///
    /// A call-level failure is an error. Entries Firehose rejected individually come back as
    /// [`PutStatus::Rejected`] so the caller can decide what to resubmit.
    pub async fn put_records(&self, payloads: Vec<Bytes>) -> Result<Vec<PutStatus>> {
        if payloads.len() > MAX_RECORDS_PER_BATCH {
            return Err(Error::InvalidConfig(format!(
                "{} records exceed the PutRecordBatch limit of {MAX_RECORDS_PER_BATCH}",
                payloads.len()
            )));
        }
        let expected = payloads.len();

        let records = payloads
            .into_iter()
            .map(|payload| {
                Record::builder()
                    .data(Blob::new(payload.to_vec()))
                    .build()
                    .map_err(|e| Error::Other(format!("Failed to build record: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let output = self
            .client
            .put_record_batch()
            .delivery_stream_name(&self.delivery_stream)
            .set_records(Some(records))
            .send()
            .await
            .map_err(|e| Error::Firehose(describe(&e)))?;

        tracing::debug!(
            stream = %self.delivery_stream,
            failed = output.failed_put_count(),
            "PutRecordBatch response"
        );

        let statuses: Vec<PutStatus> = output
            .request_responses()
            .iter()
            .map(|entry| match entry.error_code() {
                Some(code) => PutStatus::Rejected {
                    code: code.to_string(),
                    message: entry.error_message().unwrap_or_default().to_string(),
                },
                None => PutStatus::Delivered {
                    record_id: entry.record_id().map(str::to_string),
                },
            })
            .collect();

        if statuses.len() != expected {
            return Err(Error::Firehose(format!(
                "expected {expected} entries in PutRecordBatch response, got {}",
                statuses.len()
            )));
        }
        Ok(statuses)
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_firehose::operation::put_record_batch::{PutRecordBatchError, PutRecordBatchOutput};
    use aws_sdk_firehose::types::PutRecordBatchResponseEntry;
    use aws_sdk_firehose::{Client, Config};
    use aws_smithy_mocks::{MockResponseInterceptor, Rule, RuleMode, mock};
    use aws_smithy_types::error::ErrorMetadata;
    use bytes::Bytes;
    use test_log::test;

    use super::*;
    use crate::test_utils;

    const STREAM: &str = "sophos-events";

    fn delivered(id: &str) -> PutRecordBatchResponseEntry {
        PutRecordBatchResponseEntry::builder().record_id(id).build()
    }

    fn rejected() -> PutRecordBatchResponseEntry {
        PutRecordBatchResponseEntry::builder()
            .error_code("ServiceUnavailableException")
            .error_message("Slow down.")
            .build()
    }

    fn put_output(entries: Vec<PutRecordBatchResponseEntry>) -> Rule {
        let failed = entries.iter().filter(|e| e.error_code().is_some()).count() as i32;
        mock!(aws_sdk_firehose::Client::put_record_batch)
            .match_requests(|inp| inp.delivery_stream_name() == Some(STREAM))
            .then_output(move || {
                PutRecordBatchOutput::builder()
                    .failed_put_count(failed)
                    .set_request_responses(Some(entries.clone()))
                    .build()
                    .unwrap()
            })
    }

    fn sink_with(rule: &Rule) -> FirehoseSink {
        let interceptor = MockResponseInterceptor::new()
            .rule_mode(RuleMode::MatchAny)
            .with_rule(rule);
        let config = Config::builder()
            .behavior_version(test_utils::behavior_version())
            .credentials_provider(test_utils::credentials())
            .region(test_utils::region())
            .interceptor(interceptor)
            .http_client(aws_smithy_mocks::create_mock_http_client())
            .build();
        FirehoseSink::with_client(Client::from_conf(config), STREAM)
    }

    fn payloads(n: usize) -> Vec<Bytes> {
        (0..n)
            .map(|i| Bytes::from(format!("{{\"id\":{i}}}\n")))
            .collect()
    }

    #[test(tokio::test)]
    async fn all_entries_delivered() {
        let rule = put_output(vec![delivered("r-0"), delivered("r-1")]);
        let sink = sink_with(&rule);

        let statuses = sink.put_records(payloads(2)).await.unwrap();
        assert_eq!(
            statuses,
            vec![
                PutStatus::Delivered {
                    record_id: Some("r-0".to_string())
                },
                PutStatus::Delivered {
                    record_id: Some("r-1".to_string())
                },
            ]
        );
        assert_eq!(rule.num_calls(), 1);
    }

    #[test(tokio::test)]
    async fn partial_rejection_is_reported_per_entry() {
        let rule = put_output(vec![delivered("r-0"), rejected(), delivered("r-2")]);
        let sink = sink_with(&rule);

        let statuses = sink.put_records(payloads(3)).await.unwrap();
        assert!(matches!(statuses[0], PutStatus::Delivered { .. }));
        assert_eq!(
            statuses[1],
            PutStatus::Rejected {
                code: "ServiceUnavailableException".to_string(),
                message: "Slow down.".to_string(),
            }
        );
        assert!(matches!(statuses[2], PutStatus::Delivered { .. }));
    }

    #[test(tokio::test)]
    async fn call_failure_is_an_error() {
        let rule = mock!(aws_sdk_firehose::Client::put_record_batch).then_error(|| {
            PutRecordBatchError::generic(
                ErrorMetadata::builder()
                    .code("ResourceNotFoundException")
                    .message("Firehose sophos-events not found")
                    .build(),
            )
        });
        let sink = sink_with(&rule);

        let err = sink.put_records(payloads(1)).await.unwrap_err();
        assert!(matches!(err, Error::Firehose(_)));
        assert!(err.to_string().contains("ResourceNotFoundException"));
    }

    #[test(tokio::test)]
    async fn response_length_mismatch_is_an_error() {
        let rule = put_output(vec![delivered("r-0")]);
        let sink = sink_with(&rule);

        let err = sink.put_records(payloads(2)).await.unwrap_err();
        assert!(err.to_string().contains("expected 2 entries"));
    }

    #[test(tokio::test)]
    async fn oversized_batch_is_refused_before_calling_firehose() {
        let rule = put_output(vec![]);
        let sink = sink_with(&rule);

        let err = sink
            .put_records(payloads(MAX_RECORDS_PER_BATCH + 1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert_eq!(rule.num_calls(), 0);
    }
}
