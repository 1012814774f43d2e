use std::time::Duration;

use backoff::strategy::fixed;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::Error;
use crate::Record;
use crate::config::SinkConfig;

/// Kinesis Data Firehose backed [`Sink`].
mod firehose;

/// Outcome of one payload of a delivery call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Delivered,
    Failed(String),
}

/// A managed stream that accepts a bounded batch of payloads per call.
#[trait_variant::make(Sink: Send)]
pub trait LocalSink {
    /// Submits all payloads in one call. The returned statuses are positionally aligned with
    /// `payloads`. Errors mean the call as a whole failed.
    async fn deliver(&mut self, payloads: Vec<Bytes>) -> crate::Result<Vec<DeliveryStatus>>;
}

/// Turns arbitrary-length lists of records into newline-delimited JSON delivery calls of at most
/// `batch_size` payloads each. Payloads the sink rejects are resubmitted on a fixed interval;
/// anything still rejected afterwards fails the write.
pub struct SinkWriter<S> {
    sink: S,
    batch_size: usize,
    max_retries: usize,
    retry_interval: Duration,
}

impl<S> SinkWriter<S>
where
    S: Sink,
{
    pub fn new(sink: S, config: &SinkConfig) -> Self {
        Self {
            sink,
            batch_size: config.batch_size.max(1),
            max_retries: config.max_retries,
            retry_interval: config.retry_interval,
        }
    }

    /// Delivers `records` in order, one call per chunk.
    pub async fn write(&mut self, records: Vec<Record>) -> crate::Result<()> {
        for chunk in records.chunks(self.batch_size) {
            let payloads = chunk.iter().map(encode).collect::<crate::Result<Vec<_>>>()?;
            debug!(count = payloads.len(), "Delivering batch");
            self.deliver_with_retry(payloads).await?;
        }
        Ok(())
    }

    async fn deliver_with_retry(&mut self, mut pending: Vec<Bytes>) -> crate::Result<()> {
        let mut waits = fixed::Interval::new(self.retry_interval).take(self.max_retries);
        loop {
            let reason = match self.sink.deliver(pending.clone()).await {
                Ok(statuses) => {
                    if statuses.len() != pending.len() {
                        return Err(Error::Sink(format!(
                            "sink returned {} statuses for {} payloads",
                            statuses.len(),
                            pending.len()
                        )));
                    }
                    let mut first_failure = None;
                    pending = pending
                        .into_iter()
                        .zip(statuses)
                        .filter_map(|(payload, status)| match status {
                            DeliveryStatus::Delivered => None,
                            DeliveryStatus::Failed(reason) => {
                                first_failure.get_or_insert(reason);
                                Some(payload)
                            }
                        })
                        .collect();
                    match first_failure {
                        None => return Ok(()),
                        Some(reason) => reason,
                    }
                }
                Err(e) => e.to_string(),
            };

            match waits.next() {
                Some(wait) => {
                    warn!(failed = pending.len(), %reason, ?wait, "Redelivering rejected records");
                    tokio::time::sleep(wait).await;
                }
                None => {
                    return Err(Error::Sink(format!(
                        "{} records not delivered after {} retries: {reason}",
                        pending.len(),
                        self.max_retries
                    )));
                }
            }
        }
    }
}

/// One JSON document per line, newline terminated.
fn encode(record: &Record) -> crate::Result<Bytes> {
    let mut line = serde_json::to_vec(record).map_err(|e| Error::Encode(e.to_string()))?;
    line.push(b'\n');
    Ok(Bytes::from(line))
}
