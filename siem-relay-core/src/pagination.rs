//! Drains one endpoint's result set for a query window.
//!
//! Per endpoint the driver walks `INIT -> FETCHING -> (more ? FETCHING : DONE)`. Every endpoint
//! starts from a fresh [`PageQuery`], so a cursor never carries over from one endpoint to the
//! next.
//!
//! Termination relies on the vendor contract that a cursor eventually leads to a page with
//! `has_more = false`; an API that keeps reporting more pages is not detected here.

use std::iter::Take;

use backoff::retry::Retry;
use backoff::strategy::exponential::Exponential;
use tracing::{debug, info, warn};

use crate::Error;
use crate::Result;
use crate::client::{PageQuery, SiemClient};
use crate::config::{ApiConfig, Endpoint};
use crate::sink::{Sink, SinkWriter};

/// What draining one endpoint produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSummary {
    pub endpoint: String,
    pub pages: usize,
    pub records: usize,
}

pub(crate) struct Paginator {
    client: SiemClient,
    config: ApiConfig,
}

impl Paginator {
    pub(crate) fn new(client: SiemClient, config: ApiConfig) -> Self {
        Self { client, config }
    }

    pub(crate) fn endpoints(&self) -> &[Endpoint] {
        &self.config.endpoints
    }

    fn first_query(&self, endpoint: &Endpoint, from_date: i64) -> PageQuery {
        let exclude_types = (endpoint.supports_exclude_types
            && !self.config.exclude_types.is_empty())
        .then(|| self.config.exclude_types.join(","));
        PageQuery {
            limit: self.config.page_limit,
            from_date,
            cursor: None,
            exclude_types,
        }
    }

    fn backoff(&self) -> Take<Exponential> {
        Exponential::new(self.config.retry_initial, self.config.retry_max)
            .jitter(0.2)
            .take(self.config.max_retries)
    }

    /// Fetches pages until the API reports no more, forwarding every non-empty page to `writer`
    /// before advancing the cursor. Any error, once transient retries of the current page are
    /// used up, aborts the endpoint.
    pub(crate) async fn drain<S: Sink>(
        &self,
        writer: &mut SinkWriter<S>,
        endpoint: &Endpoint,
        from_date: i64,
    ) -> Result<EndpointSummary> {
        let mut query = self.first_query(endpoint, from_date);
        let mut summary = EndpointSummary {
            endpoint: endpoint.name.clone(),
            pages: 0,
            records: 0,
        };

        loop {
            let client = &self.client;
            let path = endpoint.path.as_str();
            let current = &query;
            let page = Retry::new(
                self.backoff(),
                move || client.fetch_page(path, current),
                |e: &Error| {
                    let transient = e.is_transient();
                    if transient {
                        warn!(endpoint = %path, error = %e, "Transient failure fetching page, retrying");
                    }
                    transient
                },
            )
            .await?;
            summary.pages += 1;

            if !page.items.is_empty() {
                let count = page.items.len();
                info!(endpoint = %endpoint.name, records = count, "Forwarding records to sink");
                writer.write(page.items).await?;
                summary.records += count;
            }

            match page.next_cursor {
                Some(cursor) => {
                    debug!(endpoint = %endpoint.name, page = summary.pages, "More pages available");
                    query.cursor = Some(cursor);
                }
                None => break,
            }
        }

        info!(
            endpoint = %endpoint.name,
            pages = summary.pages,
            records = summary.records,
            "Endpoint drained"
        );
        Ok(summary)
    }
}
