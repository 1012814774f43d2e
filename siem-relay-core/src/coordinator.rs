use chrono::{DateTime, Utc};
use tracing::info;

use crate::Error;
use crate::Result;
use crate::config::WatermarkConfig;
use crate::pagination::{EndpointSummary, Paginator};
use crate::sink::{Sink, SinkWriter};
use crate::watermark::{Watermark, WatermarkStore};

/// What one invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Captured before the first query; becomes the next watermark if records were seen.
    pub run_start: DateTime<Utc>,
    /// Lower bound used for every query of this run.
    pub since: Watermark,
    pub endpoints: Vec<EndpointSummary>,
    pub watermark_advanced: bool,
}

impl RunSummary {
    pub fn records(&self) -> usize {
        self.endpoints.iter().map(|e| e.records).sum()
    }

    pub fn pages(&self) -> usize {
        self.endpoints.iter().map(|e| e.pages).sum()
    }
}

/// Runs one incremental poll across all endpoints.
///
/// Only one invocation may run against a given watermark at a time; nothing here locks the
/// store, and concurrent runs would race on the final write.
pub struct RunCoordinator<W, S> {
    paginator: Paginator,
    store: W,
    writer: SinkWriter<S>,
    watermark: WatermarkConfig,
}

impl<W, S> RunCoordinator<W, S>
where
    W: WatermarkStore,
    S: Sink,
{
    pub(crate) fn new(
        paginator: Paginator,
        store: W,
        writer: SinkWriter<S>,
        watermark: WatermarkConfig,
    ) -> Self {
        Self {
            paginator,
            store,
            writer,
            watermark,
        }
    }

    pub async fn run(&mut self) -> Result<RunSummary> {
        self.run_at(Utc::now()).await
    }

    /// Polls every endpoint for records newer than the stored watermark and, only if any were
    /// relayed, stores `run_start` as the new watermark. Any error aborts the run with the
    /// watermark untouched.
    pub(crate) async fn run_at(&mut self, run_start: DateTime<Utc>) -> Result<RunSummary> {
        let since = self.current_watermark(run_start).await?;
        let from_date = since.query_window();
        info!(watermark = %since, from_date, "Starting run");

        let mut endpoints = Vec::with_capacity(self.paginator.endpoints().len());
        for endpoint in self.paginator.endpoints() {
            let summary = self
                .paginator
                .drain(&mut self.writer, endpoint, from_date)
                .await?;
            endpoints.push(summary);
        }

        let mut summary = RunSummary {
            run_start,
            since,
            endpoints,
            watermark_advanced: false,
        };

        // empty runs never move the watermark
        if summary.records() > 0 {
            let next = Watermark::from(run_start);
            self.store
                .put(&self.watermark.parameter, &next.to_iso())
                .await?;
            summary.watermark_advanced = true;
            info!(
                records = summary.records(),
                pages = summary.pages(),
                watermark = %next,
                "Run complete, watermark advanced"
            );
        } else {
            info!(
                pages = summary.pages(),
                watermark = %since,
                "Run complete, no records, watermark unchanged"
            );
        }

        Ok(summary)
    }

    /// The stored watermark, or `now - lookback` when none has been stored yet.
    async fn current_watermark(&self, now: DateTime<Utc>) -> Result<Watermark> {
        match self.store.get(&self.watermark.parameter).await? {
            Some(stored) => Watermark::parse(&stored),
            None => {
                let fallback = now
                    .checked_sub_signed(self.watermark.lookback)
                    .map(Watermark::from)
                    .ok_or_else(|| {
                        Error::Config(format!(
                            "lookback of {} reaches before the earliest representable instant",
                            self.watermark.lookback
                        ))
                    })?;
                info!(
                    parameter = %self.watermark.parameter,
                    fallback = %fallback,
                    "No stored watermark, using lookback"
                );
                Ok(fallback)
            }
        }
    }
}
