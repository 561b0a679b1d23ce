use serde::Deserialize;

/// Main configuration structure for Rubric-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub interest: InterestConfig,
}

/// Remote catalog access configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Root URL of the catalog (e.g., "https://www.elibrary.ru")
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Number of rows the catalog renders per result page
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,

    /// Upper bound for any wait on page or element readiness (milliseconds)
    #[serde(rename = "wait-timeout-ms", default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,

    /// Minimum pause between consecutive requests (milliseconds)
    #[serde(rename = "courtesy-delay-ms", default = "default_courtesy_delay_ms")]
    pub courtesy_delay_ms: u64,

    /// Random extra pause added on top of the courtesy delay (milliseconds)
    #[serde(rename = "courtesy-jitter-ms", default)]
    pub courtesy_jitter_ms: u64,

    /// User agent presented to the catalog
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Bounded retry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Consecutive failures tolerated per guarded operation; one more gives up
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Whether plain transient failures also rotate the network identity
    #[serde(rename = "rotate-on-transient", default = "default_true")]
    pub rotate_on_transient: bool,

    /// Pause before the next attempt (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            rotate_on_transient: true,
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// Network identity configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum ProxyConfig {
    /// No proxy, a single fixed identity
    #[default]
    Direct,

    /// A single fixed proxy server
    Fixed {
        server: String,
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        password: Option<String>,
    },

    /// A rotating gateway where every port is a distinct exit identity
    Ports {
        host: String,
        #[serde(rename = "first-port")]
        first_port: u16,
        #[serde(rename = "pool-size")]
        pool_size: u32,
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        password: Option<String>,
    },

    /// An explicit list of proxy servers, used in order
    List { servers: Vec<ProxyServerEntry> },
}

/// One proxy server of an explicit list
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyServerEntry {
    pub server: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Durable state configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Pass loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DriverConfig {
    /// Pause between two full passes (seconds)
    #[serde(rename = "cooldown-secs", default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Number of passes to run, 0 runs until stopped
    #[serde(rename = "max-passes", default)]
    pub max_passes: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
            max_passes: 0,
        }
    }
}

/// Categories worth harvesting
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterestConfig {
    /// Category ids kept by the census; empty keeps every category
    #[serde(default)]
    pub categories: Vec<String>,
}

fn default_page_size() -> u32 {
    20
}

fn default_wait_timeout_ms() -> u64 {
    10_000
}

fn default_courtesy_delay_ms() -> u64 {
    1_000
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.5735.199 Safari/537.36".to_string()
}

fn default_max_attempts() -> u32 {
    50
}

fn default_true() -> bool {
    true
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

fn default_cooldown_secs() -> u64 {
    600
}
