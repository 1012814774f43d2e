//! Vendor SIEM API client. One authenticated session per run; each call fetches one page.

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;

use crate::Error;
use crate::Record;
use crate::Result;
use crate::secrets::ApiCredentials;

const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");
const LOCALE_HEADER: HeaderName = HeaderName::from_static("x-locale");
/// Error bodies are only kept for diagnostics.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Query parameters of one page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PageQuery {
    pub(crate) limit: u32,
    pub(crate) from_date: i64,
    pub(crate) cursor: Option<String>,
    /// Already joined with commas; `None` when the endpoint does not take the filter.
    pub(crate) exclude_types: Option<String>,
}

impl PageQuery {
    /// Pairs in the order they go on the wire: `limit`, `from_date`, `cursor`, `exclude_types`.
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("limit", self.limit.to_string()),
            ("from_date", self.from_date.to_string()),
        ];
        if let Some(cursor) = &self.cursor {
            pairs.push(("cursor", cursor.clone()));
        }
        if let Some(exclude_types) = &self.exclude_types {
            pairs.push(("exclude_types", exclude_types.clone()));
        }
        pairs
    }
}

#[derive(Debug, Deserialize)]
struct RawPage {
    items: Vec<Record>,
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

/// A decoded page. `next_cursor` is set exactly when the API reported more pages.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Page {
    pub(crate) items: Vec<Record>,
    pub(crate) next_cursor: Option<String>,
}

impl TryFrom<RawPage> for Page {
    type Error = Error;

    fn try_from(raw: RawPage) -> Result<Self> {
        let next_cursor = if raw.has_more {
            match raw.next_cursor.filter(|c| !c.is_empty()) {
                Some(cursor) => Some(cursor),
                None => {
                    return Err(Error::Protocol(
                        "has_more is true but next_cursor is missing".to_string(),
                    ));
                }
            }
        } else {
            None
        };
        Ok(Page {
            items: raw.items,
            next_cursor,
        })
    }
}

#[derive(Clone, Debug)]
pub struct SiemClient {
    http: reqwest::Client,
    base_url: String,
}

impl SiemClient {
    /// Builds the session. Authentication and locale headers are attached to every request made
    /// through it; `timeout` applies to each request as a whole.
    pub fn new(base_url: &str, credentials: &ApiCredentials, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(LOCALE_HEADER, HeaderValue::from_static("en"));
        headers.insert(
            AUTHORIZATION,
            sensitive(&format!("Basic {}", credentials.basic_auth))?,
        );
        headers.insert(API_KEY_HEADER, sensitive(&credentials.api_key)?);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// GETs one page of `path`. Non-2xx statuses and bodies that are not a page are errors.
    pub(crate) async fn fetch_page(&self, path: &str, query: &PageQuery) -> Result<Page> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.get(&url).query(&query.pairs()).send().await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            let body: String = String::from_utf8_lossy(&body)
                .chars()
                .take(MAX_ERROR_BODY_CHARS)
                .collect();
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        let raw: RawPage = serde_json::from_slice(&body)
            .map_err(|e| Error::Decode(format!("{path}: {e}")))?;
        Page::try_from(raw)
    }
}

fn sensitive(value: &str) -> Result<HeaderValue> {
    let mut header = HeaderValue::from_str(value)
        .map_err(|e| Error::Secret(format!("credential is not a valid header value: {e}")))?;
    header.set_sensitive(true);
    Ok(header)
}
