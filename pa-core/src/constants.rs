// Well-known Prometheus label names
pub const JOB_LABEL_KEY: &str = "job";
pub const INSTANCE_LABEL_KEY: &str = "instance";
pub const NAMESPACE_LABEL_KEY: &str = "namespace";
pub const POD_LABEL_KEY: &str = "pod";
pub const SERVICE_LABEL_KEY: &str = "service";
pub const NODE_LABEL_KEY: &str = "node";
pub const METRIC_NAME_LABEL: &str = "__name__";

// Endpoint ports named "https" get the https scheme unless told otherwise
pub const HTTPS_PORT_NAME: &str = "https";

// Env vars
pub const HOME_ENV_VAR: &str = "WHATAP_HOME";
pub const OPEN_HOME_ENV_VAR: &str = "WHATAP_OPEN_HOME";

// Configuration sources
pub const SCRAPE_CONFIG_FILE_NAME: &str = "scrape_config.yaml";
pub const CONFIG_MAP_DATA_KEY: &str = "scrape_config.yaml";

// Scraping
pub const SCRAPE_ACCEPT_HEADER: &str = "text/plain; version=0.0.4";
pub const MAX_SCRAPE_BODY_BYTES: usize = 10 * 1024 * 1024;

// Timing and sizing defaults
pub const DEFAULT_DISCOVERY_INTERVAL_SECONDS: u64 = 15;
pub const DEFAULT_SCRAPING_INTERVAL_SECONDS: u64 = 30;
pub const DEFAULT_GLOBAL_INTERVAL_SECONDS: u64 = 60;
pub const DEFAULT_SCRAPE_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;
pub const DEFAULT_METRICS_PATH: &str = "/metrics";
pub const CONFIG_POLL_INTERVAL_SECONDS: u64 = 3;
pub const DEFAULT_SENDER_CAPACITY: usize = 256;
