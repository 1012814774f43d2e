//! Relay configuration, read once per invocation from environment-style key/value pairs.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;

use crate::Error;
use crate::Result;

const ENV_DELIVERY_STREAM: &str = "FIREHOSE_DELIVERY_STREAM";
const ENV_BATCH_SIZE: &str = "FIREHOSE_BATCH_SIZE";
const ENV_SINK_MAX_RETRIES: &str = "FIREHOSE_MAX_RETRIES";
const ENV_SINK_RETRY_INTERVAL_MS: &str = "FIREHOSE_RETRY_INTERVAL_MS";
const ENV_API_KEY_NAME: &str = "SOPHOS_API_KEY_NAME";
const ENV_BASIC_AUTH_NAME: &str = "SOPHOS_BASIC_AUTH_STRING_NAME";
const ENV_API_URL: &str = "SOPHOS_API_URL";
const ENV_WATERMARK_PARAMETER: &str = "SOPHOS_WATERMARK_PARAMETER";
const ENV_PAGE_LIMIT: &str = "SOPHOS_PAGE_LIMIT";
const ENV_LOOKBACK_HOURS: &str = "SOPHOS_LOOKBACK_HOURS";
const ENV_EXCLUDE_TYPES: &str = "SOPHOS_EXCLUDE_TYPES";
const ENV_REQUEST_TIMEOUT_SECS: &str = "SOPHOS_REQUEST_TIMEOUT_SECS";
const ENV_API_MAX_RETRIES: &str = "SOPHOS_MAX_RETRIES";

const DEFAULT_DELIVERY_STREAM: &str = "test";
const DEFAULT_BATCH_SIZE: usize = 100;
const MAX_BATCH_SIZE: usize = siem_relay_aws::firehose::MAX_RECORDS_PER_BATCH;
const DEFAULT_SINK_MAX_RETRIES: usize = 3;
const DEFAULT_SINK_RETRY_INTERVAL_MS: u64 = 500;
const DEFAULT_SECRET_NAME: &str = "unknown";
const DEFAULT_API_URL: &str = "https://api1.central.sophos.com/gateway";
const DEFAULT_WATERMARK_PARAMETER: &str = "/sophos-events/lastquerytime";
const DEFAULT_PAGE_LIMIT: u32 = 1000;
const DEFAULT_LOOKBACK_HOURS: i64 = 12;
/// A century; anything longer predates any vendor data.
const MAX_LOOKBACK_HOURS: i64 = 24 * 366 * 100;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_API_MAX_RETRIES: usize = 3;
const DEFAULT_RETRY_INITIAL_MS: u64 = 500;
const DEFAULT_RETRY_MAX_MS: u64 = 10_000;

/// Endpoint event types that are high volume and low value.
const DEFAULT_EXCLUDE_TYPES: [&str; 5] = [
    "Event::Endpoint::UpdateFailure",
    "Event::Endpoint::UpdateSuccess",
    "Event::Endpoint::SavDisabled",
    "Event::Endpoint::SavEnabled",
    "Event::Endpoint::Enc::DiskEncryptionStatusChanged",
];

/// A vendor API collection that is drained on every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub name: String,
    /// Path relative to the API base URL, always starting with `/`.
    pub path: String,
    /// Whether the endpoint accepts the `exclude_types` filter.
    pub supports_exclude_types: bool,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, path: &str, supports_exclude_types: bool) -> Self {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        Self {
            name: name.into(),
            path,
            supports_exclude_types,
        }
    }

    pub fn events() -> Self {
        Self::new("events", "/siem/v1/events", true)
    }

    pub fn alerts() -> Self {
        Self::new("alerts", "/siem/v1/alerts", false)
    }
}

/// Vendor API session and paging settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    pub page_limit: u32,
    pub request_timeout: Duration,
    /// Drained in this order on every run.
    pub endpoints: Vec<Endpoint>,
    /// Ordered, de-duplicated event type identifiers sent as `exclude_types`.
    pub exclude_types: Vec<String>,
    /// Retries of a single page fetch on transient errors. Zero disables retrying.
    pub max_retries: usize,
    pub retry_initial: Duration,
    pub retry_max: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: DEFAULT_API_URL.to_string(),
            page_limit: DEFAULT_PAGE_LIMIT,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            endpoints: vec![Endpoint::events(), Endpoint::alerts()],
            exclude_types: DEFAULT_EXCLUDE_TYPES.iter().map(|t| t.to_string()).collect(),
            max_retries: DEFAULT_API_MAX_RETRIES,
            retry_initial: Duration::from_millis(DEFAULT_RETRY_INITIAL_MS),
            retry_max: Duration::from_millis(DEFAULT_RETRY_MAX_MS),
        }
    }
}

/// Identifiers of the two vendor credentials in the secret store. The values themselves never
/// live in configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretIds {
    pub api_key: String,
    pub basic_auth: String,
}

impl Default for SecretIds {
    fn default() -> Self {
        SecretIds {
            api_key: DEFAULT_SECRET_NAME.to_string(),
            basic_auth: DEFAULT_SECRET_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkConfig {
    /// Name of the parameter holding the watermark.
    pub parameter: String,
    /// Age of the watermark assumed when none has been stored yet.
    pub lookback: TimeDelta,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        WatermarkConfig {
            parameter: DEFAULT_WATERMARK_PARAMETER.to_string(),
            lookback: TimeDelta::hours(DEFAULT_LOOKBACK_HOURS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    pub delivery_stream: String,
    /// Records per delivery call.
    pub batch_size: usize,
    /// Redelivery attempts for rejected records before the run fails.
    pub max_retries: usize,
    pub retry_interval: Duration,
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig {
            delivery_stream: DEFAULT_DELIVERY_STREAM.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_SINK_MAX_RETRIES,
            retry_interval: Duration::from_millis(DEFAULT_SINK_RETRY_INTERVAL_MS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RelayConfig {
    pub api: ApiConfig,
    pub secrets: SecretIds,
    pub watermark: WatermarkConfig,
    pub sink: SinkConfig,
}

impl RelayConfig {
    /// Builds the configuration from environment-style pairs. Unset variables take their
    /// defaults; set but unparseable ones are errors.
    pub fn load(
        env_vars: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Result<Self> {
        let env_vars: HashMap<String, String> = env_vars
            .into_iter()
            .map(|(key, val)| (key.into(), val.into()))
            .collect();
        let var = |name: &str| env_vars.get(name).map(|v| v.trim()).filter(|v| !v.is_empty());

        let defaults = RelayConfig::default();

        let exclude_types = match env_vars.get(ENV_EXCLUDE_TYPES) {
            Some(csv) => parse_exclude_types(csv),
            None => defaults.api.exclude_types,
        };

        let api = ApiConfig {
            base_url: var(ENV_API_URL)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api.base_url),
            page_limit: parse_or(var(ENV_PAGE_LIMIT), ENV_PAGE_LIMIT, DEFAULT_PAGE_LIMIT)?,
            request_timeout: Duration::from_secs(parse_or(
                var(ENV_REQUEST_TIMEOUT_SECS),
                ENV_REQUEST_TIMEOUT_SECS,
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            exclude_types,
            max_retries: parse_or(
                var(ENV_API_MAX_RETRIES),
                ENV_API_MAX_RETRIES,
                DEFAULT_API_MAX_RETRIES,
            )?,
            ..defaults.api
        };
        if api.page_limit == 0 {
            return Err(Error::Config(format!("{ENV_PAGE_LIMIT} must be greater than 0")));
        }
        if !api.base_url.starts_with("http://") && !api.base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "{ENV_API_URL} must be an http(s) URL, got {}",
                api.base_url
            )));
        }

        let secrets = SecretIds {
            api_key: var(ENV_API_KEY_NAME)
                .map(str::to_string)
                .unwrap_or(defaults.secrets.api_key),
            basic_auth: var(ENV_BASIC_AUTH_NAME)
                .map(str::to_string)
                .unwrap_or(defaults.secrets.basic_auth),
        };

        let lookback_hours: i64 = parse_or(
            var(ENV_LOOKBACK_HOURS),
            ENV_LOOKBACK_HOURS,
            DEFAULT_LOOKBACK_HOURS,
        )?;
        if !(0..=MAX_LOOKBACK_HOURS).contains(&lookback_hours) {
            return Err(Error::Config(format!(
                "{ENV_LOOKBACK_HOURS} must be between 0 and {MAX_LOOKBACK_HOURS} hours, got {lookback_hours}"
            )));
        }
        let lookback = TimeDelta::hours(lookback_hours);
        let watermark = WatermarkConfig {
            parameter: var(ENV_WATERMARK_PARAMETER)
                .map(str::to_string)
                .unwrap_or(defaults.watermark.parameter),
            lookback,
        };

        let sink = SinkConfig {
            delivery_stream: var(ENV_DELIVERY_STREAM)
                .map(str::to_string)
                .unwrap_or(defaults.sink.delivery_stream),
            batch_size: parse_or(var(ENV_BATCH_SIZE), ENV_BATCH_SIZE, DEFAULT_BATCH_SIZE)?,
            max_retries: parse_or(
                var(ENV_SINK_MAX_RETRIES),
                ENV_SINK_MAX_RETRIES,
                DEFAULT_SINK_MAX_RETRIES,
            )?,
            retry_interval: Duration::from_millis(parse_or(
                var(ENV_SINK_RETRY_INTERVAL_MS),
                ENV_SINK_RETRY_INTERVAL_MS,
                DEFAULT_SINK_RETRY_INTERVAL_MS,
            )?),
        };
        if !(1..=MAX_BATCH_SIZE).contains(&sink.batch_size) {
            return Err(Error::Config(format!(
                "{ENV_BATCH_SIZE} must be between 1 and {MAX_BATCH_SIZE}, got {}",
                sink.batch_size
            )));
        }

        Ok(RelayConfig {
            api,
            secrets,
            watermark,
            sink,
        })
    }
}

fn parse_or<T>(value: Option<&str>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("invalid value {raw:?} for {name}: {e}"))),
    }
}

/// Splits a comma separated list, dropping blanks and repeats while keeping first-seen order.
fn parse_exclude_types(csv: &str) -> Vec<String> {
    let mut types: Vec<String> = Vec::new();
    for t in csv.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !types.iter().any(|seen| seen == t) {
            types.push(t.to_string());
        }
    }
    types
}
