use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use registry::PageSizes;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:6880";
const DEFAULT_AUTH_URL: &str = "http://127.0.0.1:6971";
const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LOG_FILTER: &str = "info,tower_http=info";

#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub bind_addr: SocketAddr,
    pub auth_url: String,
    pub auth_timeout: Duration,
    pub store_path: Option<PathBuf>,
    pub page_sizes: PageSizes,
    pub seed_sample: bool,
    /// Fallback directives when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl AdminConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let bind_addr = lookup("CONSOLE_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()?;
        let auth_url = lookup("CONSOLE_AUTH_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_AUTH_URL.to_string());
        let auth_timeout = lookup("CONSOLE_AUTH_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_AUTH_TIMEOUT_SECS));
        let store_path = lookup("CONSOLE_STORE_PATH")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);
        let page_sizes = match lookup("CONSOLE_PAGE_SIZE") {
            Some(raw) => {
                let size = raw
                    .parse::<usize>()
                    .map_err(|_| anyhow::anyhow!("CONSOLE_PAGE_SIZE must be a number, got '{raw}'"))?;
                PageSizes::default().with_default(size)?
            }
            None => PageSizes::default(),
        };
        let seed_sample = lookup("CONSOLE_SEED_SAMPLE")
            .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no"))
            .unwrap_or(true);
        let log_filter = lookup("CONSOLE_LOG")
            .filter(|filter| !filter.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            bind_addr,
            auth_url,
            auth_timeout,
            store_path,
            page_sizes,
            seed_sample,
            log_filter,
        })
    }
}
