use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::AdapterConfig;

use super::error::RequestError;
use super::hosts::{select_host, HostType, NetworkHost};
use super::transport::{HttpResponse, HttpTransport};

/// Routes node requests to a host of the requested type and keeps the
/// per-host failure counters used by host selection.
///
/// Failure bookkeeping is best effort: two requests finishing at the same
/// time against one host may overwrite each other's update.
pub struct RequestRouter {
    hosts: RwLock<Vec<NetworkHost>>,
    fallback_to_default: bool,
    transport: Arc<dyn HttpTransport>,
}

impl RequestRouter {
    pub fn new(
        hosts: Vec<NetworkHost>,
        fallback_to_default: bool,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            hosts: RwLock::new(hosts),
            fallback_to_default,
            transport,
        }
    }

    pub fn from_config(config: &AdapterConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self::new(
            config.hosts(),
            config.settings.fallback_to_default_nodes,
            transport,
        )
    }

    /// Snapshot of the hosts and their failure counters.
    pub fn hosts(&self) -> Vec<NetworkHost> {
        self.hosts.read().clone()
    }

    pub fn failed_count(&self, host: &str) -> Option<u32> {
        self.hosts
            .read()
            .iter()
            .find(|candidate| candidate.host == host)
            .map(|candidate| candidate.failed_count)
    }

    pub fn select(&self, kind: HostType) -> Result<NetworkHost, RequestError> {
        let hosts = self.hosts.read();
        let mut rng = rand::thread_rng();
        select_host(&hosts, kind, self.fallback_to_default, &mut rng)
            .cloned()
            .ok_or(RequestError::NoHostAvailable(kind))
    }

    pub async fn get(&self, kind: HostType, path: &str) -> Result<HttpResponse, RequestError> {
        self.get_with_query(kind, path, &[]).await
    }

    /// GET with URL-encoded query parameters appended to `path`.
    pub async fn get_with_query(
        &self,
        kind: HostType,
        path: &str,
        query: &[(String, String)],
    ) -> Result<HttpResponse, RequestError> {
        let host = self.select(kind)?;
        let url = with_query(join_url(&host.host, path), query)?;
        debug!(host = %host.host, %url, "GET node request");
        let outcome = self.transport.get(&url).await;
        self.settle(&host, &url, outcome)
    }

    pub async fn post(
        &self,
        kind: HostType,
        path: &str,
        body: &Value,
    ) -> Result<HttpResponse, RequestError> {
        let host = self.select(kind)?;
        let url = join_url(&host.host, path);
        debug!(host = %host.host, %url, "POST node request");
        let outcome = self.transport.post(&url, body).await;
        self.settle(&host, &url, outcome)
    }

    fn settle(
        &self,
        host: &NetworkHost,
        url: &str,
        outcome: Result<HttpResponse, RequestError>,
    ) -> Result<HttpResponse, RequestError> {
        match outcome {
            Ok(response) if response.is_server_error() => {
                self.record_failure(host);
                Err(RequestError::HttpStatus {
                    status: response.status,
                    url: url.to_string(),
                })
            }
            Ok(response) => {
                self.record_success(host);
                Ok(response)
            }
            Err(err) => {
                self.record_failure(host);
                Err(err)
            }
        }
    }

    fn record_success(&self, host: &NetworkHost) {
        let mut hosts = self.hosts.write();
        for entry in hosts.iter_mut().filter(|entry| same_host(entry, host)) {
            entry.failed_count = 0;
        }
    }

    fn record_failure(&self, host: &NetworkHost) {
        let mut hosts = self.hosts.write();
        for entry in hosts.iter_mut().filter(|entry| same_host(entry, host)) {
            entry.failed_count = entry.failed_count.saturating_add(1);
            warn!(
                host = %entry.host,
                kind = %entry.kind,
                failed_count = entry.failed_count,
                "node request failed"
            );
        }
    }
}

fn same_host(entry: &NetworkHost, host: &NetworkHost) -> bool {
    entry.host == host.host && entry.kind == host.kind && entry.custom == host.custom
}

fn with_query(url: String, query: &[(String, String)]) -> Result<String, RequestError> {
    if query.is_empty() {
        return Ok(url);
    }
    let mut parsed =
        Url::parse(&url).map_err(|err| RequestError::InvalidRequest(format!("{url}: {err}")))?;
    parsed.query_pairs_mut().extend_pairs(query);
    Ok(parsed.into())
}

/// Joins a host base URL and an endpoint path with exactly one `/`.
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}
