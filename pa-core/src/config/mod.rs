mod types;

use std::path::{
    Path,
    PathBuf,
};
use std::sync::{
    Arc,
    Mutex,
};
use std::time::{
    Duration,
    SystemTime,
};

use tokio::sync::watch;
use tracing::*;
pub use types::*;
use xxhash_rust::xxh3::xxh3_64;

use crate::constants::*;
use crate::errors::*;
use crate::k8s::ClusterView;

// Single source of truth for tunables and target declarations.  Everything
// here is poll-based: downstream components re-read on their own tickers, so a
// bad document can never cascade further than one discovery or scrape cycle.
pub struct ConfigStore {
    source: ConfigSource,
    cached: Mutex<Cached>,
}

enum ConfigSource {
    File(PathBuf),
    ConfigMap {
        cluster: Arc<dyn ClusterView>,
        namespace: String,
        name: String,
    },

    // An immutable in-memory document; used by tests and by anything that
    // wants the accessor surface without a backing source.
    Fixed,
}

struct Cached {
    config: OpenAgentConfig,
    hash: u64,
    mtime: Option<SystemTime>,
}

impl ConfigStore {
    // The initial load must succeed; with no last-good document to fall back
    // on there is nothing sensible the agent could scrape.
    pub fn from_file(path: &Path) -> anyhow::Result<ConfigStore> {
        let text = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileUnreadable(path.display().to_string()))?;
        let config = parse_document(&text)?;
        let mtime = file_mtime(path);

        info!(path = %path.display(), targets = config.targets.len(), "loaded scrape configuration");
        Ok(ConfigStore {
            source: ConfigSource::File(path.to_path_buf()),
            cached: Mutex::new(Cached { config, hash: xxh3_64(text.as_bytes()), mtime }),
        })
    }

    pub fn from_config_map(cluster: Arc<dyn ClusterView>, namespace: &str, name: &str) -> anyhow::Result<ConfigStore> {
        let text = read_config_map(&*cluster, namespace, name)?;
        let config = parse_document(&text)?;

        info!(configmap = %format!("{namespace}/{name}"), targets = config.targets.len(), "loaded scrape configuration");
        Ok(ConfigStore {
            source: ConfigSource::ConfigMap {
                cluster,
                namespace: namespace.into(),
                name: name.into(),
            },
            cached: Mutex::new(Cached { config, hash: xxh3_64(text.as_bytes()), mtime: None }),
        })
    }

    pub fn fixed(config: OpenAgentConfig) -> ConfigStore {
        ConfigStore {
            source: ConfigSource::Fixed,
            cached: Mutex::new(Cached { config, hash: 0, mtime: None }),
        }
    }

    pub fn default_file_path() -> PathBuf {
        let home = std::env::var(HOME_ENV_VAR).unwrap_or_else(|_| ".".into());
        PathBuf::from(home).join(SCRAPE_CONFIG_FILE_NAME)
    }

    // Returns the current (enabled) target declarations, re-reading the
    // backing source first.  The ConfigMap path is served from the informer
    // cache, so this never blocks on the network.
    pub fn scrape_configs(&self) -> Vec<TargetDecl> {
        self.refresh();

        let cached = self.cached.lock().unwrap();
        if !cached.config.enabled {
            return vec![];
        }
        cached.config.targets.clone()
    }

    pub fn global_interval(&self) -> Duration {
        self.cached
            .lock()
            .unwrap()
            .config
            .global_interval
            .unwrap_or(Duration::from_secs(DEFAULT_GLOBAL_INTERVAL_SECONDS))
    }

    pub fn global_path(&self) -> String {
        self.cached
            .lock()
            .unwrap()
            .config
            .global_path
            .clone()
            .unwrap_or_else(|| DEFAULT_METRICS_PATH.into())
    }

    pub fn scraping_interval(&self) -> Duration {
        self.cached
            .lock()
            .unwrap()
            .config
            .scraping_interval
            .unwrap_or(Duration::from_secs(DEFAULT_SCRAPING_INTERVAL_SECONDS))
    }

    pub fn max_concurrency(&self) -> usize {
        self.cached
            .lock()
            .unwrap()
            .config
            .max_concurrency
            .unwrap_or(DEFAULT_MAX_CONCURRENCY)
            .max(1)
    }

    pub fn debug_enabled(&self) -> bool {
        self.cached.lock().unwrap().config.debug
    }

    // Lets callers cheaply tell whether the document changed between calls
    pub fn content_hash(&self) -> u64 {
        self.cached.lock().unwrap().hash
    }

    // Re-reads the backing source, swapping in a new document only when the
    // content actually changed.  Any load or parse error leaves the last-good
    // configuration in effect.
    pub fn refresh(&self) {
        match &self.source {
            ConfigSource::File(path) => self.refresh_from_file(path),
            ConfigSource::ConfigMap { cluster, namespace, name } => {
                self.refresh_from_config_map(&**cluster, namespace, name)
            },
            ConfigSource::Fixed => (),
        }
    }

    // File-mode change detection: wakes every few seconds and lets refresh()
    // compare mtimes.  ConfigMap mode needs no watcher, the informer cache is
    // already live.
    pub async fn run_file_watcher(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        if !matches!(self.source, ConfigSource::File(_)) {
            return;
        }

        let mut ticker = tokio::time::interval(Duration::from_secs(CONFIG_POLL_INTERVAL_SECONDS));
        loop {
            tokio::select! {
                _ = ticker.tick() => self.refresh(),
                _ = shutdown.changed() => break,
            }
        }
    }

    fn refresh_from_file(&self, path: &Path) {
        let mtime = file_mtime(path);
        {
            let cached = self.cached.lock().unwrap();
            if mtime.is_some() && mtime == cached.mtime {
                return;
            }
        }

        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(err) => {
                warn!(path = %path.display(), "could not re-read configuration file, keeping last-good: {err}");
                return;
            },
        };
        self.swap_if_changed(&text, mtime);
    }

    fn refresh_from_config_map(&self, cluster: &dyn ClusterView, namespace: &str, name: &str) {
        match read_config_map(cluster, namespace, name) {
            Ok(text) => self.swap_if_changed(&text, None),
            Err(err) => warn!("could not read configmap {namespace}/{name}, keeping last-good: {err}"),
        }
    }

    fn swap_if_changed(&self, text: &str, mtime: Option<SystemTime>) {
        let hash = xxh3_64(text.as_bytes());
        {
            let mut cached = self.cached.lock().unwrap();
            if hash == cached.hash {
                cached.mtime = mtime;
                return;
            }
        }

        match parse_document(text) {
            Ok(config) => {
                let mut cached = self.cached.lock().unwrap();
                info!(targets = config.targets.len(), "scrape configuration changed, reloading");
                *cached = Cached { config, hash, mtime };
            },
            Err(err) => warn!("new configuration failed to parse, keeping last-good: {err}"),
        }
    }
}

pub fn parse_document(text: &str) -> anyhow::Result<OpenAgentConfig> {
    let doc: ConfigDocument = serde_yaml::from_str(text).map_err(ConfigError::ParseFailed)?;
    let config = doc.features.open_agent;
    config.validate()?;
    Ok(config)
}

fn read_config_map(cluster: &dyn ClusterView, namespace: &str, name: &str) -> anyhow::Result<String> {
    let cm = cluster
        .config_map(namespace, name)
        .ok_or_else(|| ConfigError::ConfigMapMissing(namespace.into(), name.into()))?;
    let text = cm
        .data
        .as_ref()
        .and_then(|d| d.get(CONFIG_MAP_DATA_KEY))
        .ok_or_else(|| {
            ConfigError::ConfigMapKeyMissing(namespace.into(), name.into(), CONFIG_MAP_DATA_KEY.into())
        })?;
    Ok(text.clone())
}

fn file_mtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
