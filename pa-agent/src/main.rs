use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use pa_core::config::ConfigStore;
use pa_core::k8s::{
    ClusterView,
    InformerCache,
    UninitializedCluster,
};
use pa_core::logging;
use pa_core::prelude::*;
use pa_discovery::DiscoveryEngine;
use pa_scrape::{
    BatchSender,
    ScrapeScheduler,
};
use tokio::signal::unix::{
    SignalKind,
    signal,
};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::*;

const DEFAULT_VERBOSITY: &str = "info";

#[derive(Debug, Parser)]
#[command(name = "pa-agent", about = "Kubernetes-native Prometheus scrape agent")]
struct Options {
    /// Path to the scrape configuration file; defaults to
    /// $WHATAP_HOME/scrape_config.yaml
    #[arg(short, long)]
    config_file: Option<PathBuf>,

    /// Name of the ConfigMap holding the scrape configuration
    #[arg(long, default_value = "scrape-config")]
    config_map: String,

    /// Namespace the configuration ConfigMap lives in
    #[arg(long, default_value = "monitoring")]
    config_map_namespace: String,

    /// Skip cluster discovery entirely and run from the local file
    #[arg(long)]
    standalone: bool,

    #[arg(short, long, default_value = DEFAULT_VERBOSITY)]
    verbosity: String,
}

#[instrument(ret, err, skip_all)]
async fn run(opts: Options, log_filter: logging::FilterHandle) -> EmptyResult {
    // Informer watch tasks live in their own JoinSet so they can be torn down
    // last, after the scrape pipeline has wound down.
    let mut watchers = JoinSet::new();

    let cluster: Arc<dyn ClusterView> = if opts.standalone {
        info!("standalone mode requested, skipping kubernetes discovery");
        Arc::new(UninitializedCluster)
    } else {
        match kube::Client::try_default().await {
            Ok(client) => match InformerCache::start(client, &mut watchers).await {
                Ok(cache) => Arc::new(cache),
                Err(err) => {
                    warn!("informer caches failed to sync, running standalone: {err:#}");
                    Arc::new(UninitializedCluster)
                },
            },
            Err(err) => {
                warn!("could not build a kubernetes client, running standalone: {err:#}");
                Arc::new(UninitializedCluster)
            },
        }
    };

    // Failing to produce any initial configuration is the one fatal startup
    // error; everything after this point degrades and retries instead.
    let config = Arc::new(build_config_store(&opts, cluster.clone())?);
    info!(
        targets = config.scrape_configs().len(),
        scraping_interval = ?config.scraping_interval(),
        max_concurrency = config.max_concurrency(),
        debug = config.debug_enabled(),
        "agent configured"
    );

    // The configuration's debug flag widens the default filter; an explicit
    // CLI verbosity is never narrowed.
    if config.debug_enabled() && opts.verbosity == DEFAULT_VERBOSITY {
        log_filter.raise_to_debug();
        debug!("debug logging enabled by the scrape configuration");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (sender, mut batch_rx) = BatchSender::new(DEFAULT_SENDER_CAPACITY);

    let discovery = Arc::new(DiscoveryEngine::new(config.clone(), cluster.clone()));
    let scheduler = Arc::new(ScrapeScheduler::new(config.clone(), discovery.clone(), sender));

    // The tasks take ownership of the engine handles, so once the scheduler's
    // loop finishes, its sender handle goes with it and the channel consumer
    // below can run dry.
    let mut tasks = JoinSet::new();
    tasks.spawn(config.clone().run_file_watcher(shutdown_rx.clone()));
    tasks.spawn(discovery.run(Duration::from_secs(DEFAULT_DISCOVERY_INTERVAL_SECONDS), shutdown_rx.clone()));
    tasks.spawn(scheduler.run(shutdown_rx.clone()));

    // Stand-in consumer for the external transport: drains the channel and
    // exits once every sender handle is gone.
    tasks.spawn(async move {
        while let Some(batch) = batch_rx.recv().await {
            debug!(
                target_url = %batch.target_url,
                samples = batch.samples.len(),
                "handing batch to the sender"
            );
        }
    });

    wait_for_shutdown_signal().await?;
    info!("shutting down");

    // Stop intake first.  The scheduler task finishes its in-flight scrapes
    // within their own HTTP timeouts and then ends, releasing the last sender
    // handle; the channel consumer drains what remains and exits on its own.
    shutdown_tx.send(true).ok();
    while tasks.join_next().await.is_some() {}

    // informer watches go last
    watchers.shutdown().await;
    info!("shutdown complete");
    Ok(())
}

fn build_config_store(opts: &Options, cluster: Arc<dyn ClusterView>) -> anyhow::Result<ConfigStore> {
    if cluster.is_initialized() && !opts.config_map.is_empty() {
        match ConfigStore::from_config_map(cluster, &opts.config_map_namespace, &opts.config_map) {
            Ok(store) => return Ok(store),
            Err(err) => {
                warn!("could not load configuration from the configmap, trying the local file: {err:#}");
            },
        }
    }

    let path = opts.config_file.clone().unwrap_or_else(ConfigStore::default_file_path);
    ConfigStore::from_file(&path)
}

async fn wait_for_shutdown_signal() -> EmptyResult {
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> EmptyResult {
    let args = Options::parse();
    let log_filter = logging::setup(&args.verbosity);
    run(args, log_filter).await
}
