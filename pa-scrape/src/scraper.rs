use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::bail;
use clockabilly::{
    Clockable,
    UtcClock,
};
use pa_core::config::TlsConfig;
use pa_core::prelude::*;
use pa_discovery::{
    ScrapeMeta,
    Target,
};
use reqwest::header::ACCEPT;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("unexpected HTTP status {1} from {0}")]
    HttpStatus(String, u16),

    #[error("scrape body exceeded the {0}-byte cap")]
    BodyTooLarge(usize),

    #[error("could not read CA bundle {0}")]
    CaBundleUnreadable(String),
}

#[derive(Debug)]
pub struct ScrapeResponse {
    pub body: String,
    pub collected_at_ms: i64,
}

// Performs one HTTP GET per scrape job.  Clients are cached per
// (TLS config, timeout) tuple so connections to the same target get pooled
// instead of being re-established every cycle.
pub struct HttpScraper {
    clients: Mutex<HashMap<ClientKey, reqwest::Client>>,
    clock: Box<dyn Clockable + Send + Sync>,
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct ClientKey {
    insecure: bool,
    ca_file: Option<String>,
    timeout: Duration,
}

impl ClientKey {
    fn for_meta(meta: &ScrapeMeta) -> ClientKey {
        let (insecure, ca_file) = match &meta.tls {
            Some(TlsConfig { insecure_skip_verify, ca_file }) => (*insecure_skip_verify, ca_file.clone()),
            None => (false, None),
        };
        ClientKey { insecure, ca_file, timeout: meta.timeout }
    }
}

impl Default for HttpScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpScraper {
    pub fn new() -> HttpScraper {
        HttpScraper { clients: Mutex::new(HashMap::new()), clock: UtcClock::boxed() }
    }

    // The URL on the target is complete; only query params are added here.
    // The collection timestamp is taken when the response headers arrive.
    pub async fn fetch(&self, target: &Target) -> anyhow::Result<ScrapeResponse> {
        let client = self.client_for(&target.metadata)?;

        let mut request = client.get(&target.url).header(ACCEPT, SCRAPE_ACCEPT_HEADER);
        if !target.metadata.params.is_empty() {
            let pairs: Vec<(&String, &String)> = target
                .metadata
                .params
                .iter()
                .flat_map(|(k, vs)| vs.iter().map(move |v| (k, v)))
                .collect();
            request = request.query(&pairs);
        }

        let mut response = request.send().await?;
        let collected_at_ms = self.clock.now().timestamp_millis();

        let status = response.status();
        if !status.is_success() {
            bail!(ScrapeError::HttpStatus(target.url.clone(), status.as_u16()));
        }

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > MAX_SCRAPE_BODY_BYTES {
                bail!(ScrapeError::BodyTooLarge(MAX_SCRAPE_BODY_BYTES));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(ScrapeResponse { body: String::from_utf8_lossy(&body).into_owned(), collected_at_ms })
    }

    fn client_for(&self, meta: &ScrapeMeta) -> anyhow::Result<reqwest::Client> {
        let key = ClientKey::for_meta(meta);

        let mut clients = self.clients.lock().unwrap();
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let mut builder = reqwest::Client::builder().timeout(key.timeout);
        if key.insecure {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(ca_file) = &key.ca_file {
            let pem = std::fs::read(ca_file).map_err(|_| ScrapeError::CaBundleUnreadable(ca_file.clone()))?;
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
        }

        let client = builder.build()?;
        clients.insert(key, client.clone());
        Ok(client)
    }
}
