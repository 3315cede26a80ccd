//! Controller configuration
//!
//! Defines the cluster identity, the endpoints of the external collaborators,
//! storage settings and the per-invocation budget.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Controller configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Name of the cluster, shown in completion summaries
    pub cluster_name: String,

    /// Compute pool the controller scales
    pub pool_name: String,

    /// Fleet gateway base URL (e.g., "http://fleet-gateway:9000")
    pub fleet_url: String,

    /// Completion webhook; no summaries are sent when absent
    pub notify_url: Option<String>,

    /// Root directory of the local object store
    pub store_root: PathBuf,

    /// Bucket used by the job maintenance endpoints
    pub data_bucket: String,

    /// Externally reachable base URL used in download links
    pub public_url: String,

    /// HMAC key for download links; random per process when absent
    pub link_signing_key: Option<String>,

    /// Lifetime of download links
    pub link_ttl: Duration,

    /// Listing page size of the object store
    pub list_page_size: usize,

    /// Wall-clock budget for handling one notification batch
    pub invocation_timeout: Duration,

    /// Timeout for requests to the fleet gateway and webhook
    pub http_timeout: Duration,

    pub bind_addr: SocketAddr,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(cluster_name: String, fleet_url: String) -> Self {
        Self {
            pool_name: cluster_name.clone(),
            cluster_name,
            fleet_url,
            notify_url: None,
            store_root: PathBuf::from("/var/lib/sortie/store"),
            data_bucket: "sortie-data".to_string(),
            public_url: "http://localhost:8080".to_string(),
            link_signing_key: None,
            link_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            list_page_size: 1000,
            invocation_timeout: Duration::from_secs(300), // 5 minutes
            http_timeout: Duration::from_secs(10),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - CLUSTER_NAME (required, falls back to STACK_NAME)
    /// - FLEET_URL (required)
    /// - FLEET_POOL_NAME (optional, default: cluster name)
    /// - NOTIFY_URL (optional)
    /// - STORE_ROOT (optional, default: /var/lib/sortie/store)
    /// - DATA_BUCKET (optional, default: sortie-data)
    /// - PUBLIC_URL (optional, default: http://localhost:8080)
    /// - LINK_SIGNING_KEY (optional)
    /// - LINK_TTL_SECS (optional, default: 604800)
    /// - LIST_PAGE_SIZE (optional, default: 1000)
    /// - INVOCATION_TIMEOUT_SECS (optional, default: 300)
    /// - HTTP_TIMEOUT_SECS (optional, default: 10)
    /// - BIND_ADDR (optional, default: 0.0.0.0:8080)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Config::from_env`] with an arbitrary variable source
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let cluster_name = var("CLUSTER_NAME")
            .or_else(|| var("STACK_NAME"))
            .ok_or_else(|| anyhow::anyhow!("CLUSTER_NAME environment variable not set"))?;

        let fleet_url = var("FLEET_URL")
            .ok_or_else(|| anyhow::anyhow!("FLEET_URL environment variable not set"))?;

        let mut config = Self::new(cluster_name, fleet_url);

        if let Some(pool_name) = var("FLEET_POOL_NAME") {
            config.pool_name = pool_name;
        }
        config.notify_url = var("NOTIFY_URL").filter(|url| !url.is_empty());
        if let Some(root) = var("STORE_ROOT") {
            config.store_root = PathBuf::from(root);
        }
        if let Some(bucket) = var("DATA_BUCKET") {
            config.data_bucket = bucket;
        }
        if let Some(public_url) = var("PUBLIC_URL") {
            config.public_url = public_url;
        }
        config.link_signing_key = var("LINK_SIGNING_KEY").filter(|key| !key.is_empty());

        if let Some(secs) = parse::<u64>(&var, "LINK_TTL_SECS")? {
            config.link_ttl = Duration::from_secs(secs);
        }
        if let Some(size) = parse::<usize>(&var, "LIST_PAGE_SIZE")? {
            config.list_page_size = size;
        }
        if let Some(secs) = parse::<u64>(&var, "INVOCATION_TIMEOUT_SECS")? {
            config.invocation_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse::<u64>(&var, "HTTP_TIMEOUT_SECS")? {
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Some(addr) = parse::<SocketAddr>(&var, "BIND_ADDR")? {
            config.bind_addr = addr;
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.cluster_name.is_empty() {
            anyhow::bail!("cluster_name cannot be empty");
        }

        if self.pool_name.is_empty() {
            anyhow::bail!("pool_name cannot be empty");
        }

        for (name, url) in [
            ("fleet_url", Some(&self.fleet_url)),
            ("public_url", Some(&self.public_url)),
            ("notify_url", self.notify_url.as_ref()),
        ] {
            if let Some(url) = url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    anyhow::bail!("{} must start with http:// or https://", name);
                }
            }
        }

        if self.data_bucket.is_empty() || self.data_bucket.starts_with('.') || self.data_bucket.contains('/') {
            anyhow::bail!("data_bucket '{}' is not a valid bucket name", self.data_bucket);
        }

        if self.link_ttl.as_secs() == 0 {
            anyhow::bail!("link_ttl must be greater than 0");
        }

        if self.list_page_size == 0 {
            anyhow::bail!("list_page_size must be greater than 0");
        }

        if self.invocation_timeout.as_secs() == 0 {
            anyhow::bail!("invocation_timeout must be greater than 0");
        }

        Ok(())
    }
}

/// Parses an optional variable; present but malformed is an error
fn parse<T>(var: &impl Fn(&str) -> Option<String>, name: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", name, raw, e)),
    }
}
