use bytes::Bytes;
use siem_relay_aws::firehose::{FirehoseSink, PutStatus};

use crate::Error;
use crate::sink::{DeliveryStatus, Sink};

impl From<PutStatus> for DeliveryStatus {
    fn from(value: PutStatus) -> Self {
        match value {
            PutStatus::Delivered { .. } => DeliveryStatus::Delivered,
            PutStatus::Rejected { code, message } => {
                DeliveryStatus::Failed(format!("{code}: {message}"))
            }
        }
    }
}

impl Sink for FirehoseSink {
    async fn deliver(&mut self, payloads: Vec<Bytes>) -> crate::Result<Vec<DeliveryStatus>> {
        let statuses = self
            .put_records(payloads)
            .await
            .map_err(|e| Error::Sink(e.to_string()))?;
        Ok(statuses.into_iter().map(DeliveryStatus::from).collect())
    }
}
