use crate::error::{Result, StudioError};
use crate::retry::RetryPolicy;
use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/";

/// Object storage settings.
///
/// Every field may be absent at startup; [`StorageConfig::resolve`] is called
/// at upload time and fails there if anything required is missing.
#[derive(Clone, Default)]
pub struct StorageConfig {
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub bucket: Option<String>,
    /// Path-style endpoint for S3-compatible stores.
    pub endpoint_url: Option<String>,
}

/// Storage settings with every required value present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStorage {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    pub endpoint_url: Option<String>,
}

impl StorageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        StorageConfig {
            region: lookup("AWS_REGION"),
            access_key_id: lookup("AWS_KEY_ID"),
            secret_access_key: lookup("AWS_SECRET_ACCESS_KEY"),
            bucket: lookup("AWS_S3_BUCKET_NAME"),
            endpoint_url: lookup("AWS_S3_ENDPOINT_URL"),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    pub fn resolve(&self) -> Result<ResolvedStorage> {
        Ok(ResolvedStorage {
            region: required(&self.region, "AWS_REGION")?,
            access_key_id: required(&self.access_key_id, "AWS_KEY_ID")?,
            secret_access_key: required(&self.secret_access_key, "AWS_SECRET_ACCESS_KEY")?,
            bucket: required(&self.bucket, "AWS_S3_BUCKET_NAME")?,
            endpoint_url: self.endpoint_url.clone().filter(|url| !url.is_empty()),
        })
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field("bucket", &self.bucket)
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}

/// Everything the server binary needs, read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Base URL of the automation relay.
    pub relay_url: Option<String>,
    pub relay_poll_interval: Duration,
    pub relay_max_polls: u32,
    pub openai_base_url: String,
    /// Applied to job submission only.
    pub retry: RetryPolicy,
    pub storage: StorageConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            relay_url: None,
            relay_poll_interval: Duration::from_secs(2),
            relay_max_polls: 200,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = ServerConfig::default();
        let millis = |key: &str| lookup(key).and_then(|value| value.trim().parse::<u64>().ok());
        let count = |key: &str| lookup(key).and_then(|value| value.trim().parse::<u32>().ok());

        ServerConfig {
            bind_addr: lookup("STUDIO_BIND_ADDR").unwrap_or(defaults.bind_addr),
            relay_url: lookup("RELAY_URL"),
            relay_poll_interval: millis("RELAY_POLL_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.relay_poll_interval),
            relay_max_polls: count("RELAY_MAX_POLLS").unwrap_or(defaults.relay_max_polls),
            openai_base_url: lookup("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            retry: RetryPolicy {
                retries: count("RETRY_ATTEMPTS").unwrap_or(defaults.retry.retries),
                delay: millis("RETRY_DELAY_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.retry.delay),
            },
            storage: StorageConfig::from_lookup(&lookup),
        }
    }

    pub fn with_relay_url(mut self, relay_url: impl Into<String>) -> Self {
        self.relay_url = Some(relay_url.into());
        self
    }

    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.bind_addr.parse()?)
    }

    pub fn relay_url(&self) -> Result<&str> {
        self.relay_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or(StudioError::MissingConfig("RELAY_URL"))
    }
}

fn required(value: &Option<String>, name: &'static str) -> Result<String> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .ok_or(StudioError::MissingConfig(name))
}
