use tracing::warn;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::{
    EnvFilter,
    reload,
};

// The filter is installed behind a reload layer: the CLI verbosity seeds it,
// and the scrape configuration's debug flag can widen it once the first
// document has loaded (the config store does not exist yet when logging comes
// up).
pub struct FilterHandle {
    handle: reload::Handle<EnvFilter, Registry>,
}

pub fn setup(env_filter: &str) -> FilterHandle {
    let (filter, handle) = reload::Layer::new(EnvFilter::new(env_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::NEW)
                .with_target(false)
                .compact(),
        )
        .init();

    FilterHandle { handle }
}

impl FilterHandle {
    // Widening only; callers gate this so an explicit CLI verbosity is never
    // overridden downward.
    pub fn raise_to_debug(&self) {
        if let Err(err) = self.handle.reload(EnvFilter::new("debug")) {
            warn!("could not raise the log filter to debug: {err}");
        }
    }
}
