use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::AdapterConfig;
use crate::engine::TransactionClassifier;
use crate::transactions::{
    ConfirmedTransactionData, DtoContext, SignedTransactionData, TransactionData,
    TransactionMeta, UnconfirmedTransactionData,
};

use super::dto::{
    BroadcastResponse, BroadcastResult, CryptoConfiguration, JsonRpcRequest, JsonRpcResponse,
    NodeFees, RawTransactionRecord, SyncStatus, WalletDto,
};
use super::error::RequestError;
use super::hosts::HostType;
use super::pagination::{Pagination, Paginator};
use super::router::RequestRouter;
use super::transport::{HttpResponse, HttpTransport};

/// Query parameters for list endpoints (`page`, `limit`, filters).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionQuery {
    params: Vec<(String, String)>,
}

impl TransactionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, page: u64) -> Self {
        self.param("page", page.to_string())
    }

    pub fn limit(self, limit: u64) -> Self {
        self.param("limit", limit.to_string())
    }

    pub fn address(self, address: impl Into<String>) -> Self {
        self.param("address", address)
    }

    /// Sets `key`, replacing an earlier value for it.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.params.retain(|(existing, _)| *existing != key);
        self.params.push((key, value.into()));
        self
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

/// Typed access to the node endpoints the wallet uses.
///
/// Reads go to `full` hosts, broadcasts to `tx` hosts and contract calls to
/// `evm` hosts, each through the shared [`RequestRouter`].
#[derive(Clone)]
pub struct NodeClient {
    router: Arc<RequestRouter>,
    context: Arc<DtoContext>,
}

impl NodeClient {
    pub fn new(router: Arc<RequestRouter>, context: Arc<DtoContext>) -> Self {
        Self { router, context }
    }

    /// Router over the configured default and custom hosts, with views
    /// using the manifest's decimals.
    pub fn from_config(config: &AdapterConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let router = RequestRouter::from_config(config, transport);
        let context =
            DtoContext::for_network(&config.network, TransactionClassifier::default());
        Self::new(Arc::new(router), Arc::new(context))
    }

    pub fn router(&self) -> &Arc<RequestRouter> {
        &self.router
    }

    pub fn context(&self) -> &Arc<DtoContext> {
        &self.context
    }

    pub async fn crypto_configuration(&self) -> Result<CryptoConfiguration, RequestError> {
        self.data("node/configuration/crypto", &[]).await
    }

    pub async fn syncing(&self) -> Result<SyncStatus, RequestError> {
        self.data("node/syncing", &[]).await
    }

    pub async fn fees(&self) -> Result<NodeFees, RequestError> {
        self.data("node/fees", &[]).await
    }

    pub async fn wallet(&self, id: &str) -> Result<WalletDto, RequestError> {
        if id.is_empty() || id.contains('/') {
            return Err(RequestError::InvalidRequest(format!("invalid wallet id `{id}`")));
        }
        self.data(&format!("wallets/{id}"), &[]).await
    }

    pub async fn validators(
        &self,
        query: &TransactionQuery,
    ) -> Result<Paginator<WalletDto>, RequestError> {
        self.page("validators", query).await
    }

    pub async fn transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<Paginator<ConfirmedTransactionData>, RequestError> {
        let page: Paginator<RawTransactionRecord> = self.page("transactions", query).await?;
        Ok(page.map(|raw| {
            let mut record = ConfirmedTransactionData::new(
                Arc::clone(&self.context),
                TransactionMeta::default(),
            );
            record.configure(raw);
            record
        }))
    }

    pub async fn unconfirmed_transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<Paginator<UnconfirmedTransactionData>, RequestError> {
        let page: Paginator<RawTransactionRecord> =
            self.page("transactions/unconfirmed", query).await?;
        Ok(page.map(|raw| {
            let mut record = UnconfirmedTransactionData::new(
                Arc::clone(&self.context),
                TransactionMeta::default(),
            );
            record.configure(raw);
            record
        }))
    }

    /// Posts signed transactions and maps the node's answer onto their
    /// hashes.
    pub async fn broadcast(
        &self,
        transactions: &[SignedTransactionData],
    ) -> Result<BroadcastResult, RequestError> {
        let mut hashes = Vec::with_capacity(transactions.len());
        let mut serialized = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            let payload = transaction.serialized().ok_or_else(|| {
                RequestError::InvalidRequest(format!(
                    "transaction {} has no serialized form",
                    transaction.hash()
                ))
            })?;
            hashes.push(transaction.hash().to_string());
            serialized.push(payload.to_string());
        }

        let body = json!({ "transactions": serialized });
        let response = self.router.post(HostType::Tx, "transactions", &body).await?;
        let has_outcome =
            response.body.get("data").is_some() || response.body.get("errors").is_some();
        if !response.is_success() && !has_outcome {
            return Err(status_error(&response, "transactions"));
        }
        let parsed: BroadcastResponse = serde_json::from_value(response.body)?;
        let result = BroadcastResult::from_response(&parsed, &hashes);
        info!(
            accepted = result.accepted.len(),
            rejected = result.rejected.len(),
            "broadcast finished"
        );
        Ok(result)
    }

    /// Read-only contract call; returns the hex encoded return data.
    pub async fn eth_call(&self, to: &str, data: &str) -> Result<String, RequestError> {
        let params = json!([{ "to": to, "data": data }, "latest"]);
        let request = JsonRpcRequest::new("eth_call", params);
        let body = serde_json::to_value(&request)?;
        let response = self.router.post(HostType::Evm, "", &body).await?;
        if !response.is_success() {
            return Err(status_error(&response, "eth_call"));
        }
        let response: JsonRpcResponse = serde_json::from_value(response.body)?;
        if let Some(error) = response.error {
            return Err(RequestError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        match response.result {
            Some(Value::String(result)) => Ok(result),
            other => Err(RequestError::UnexpectedResponse(format!(
                "eth_call result {other:?}"
            ))),
        }
    }

    async fn fetch(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Value, RequestError> {
        let response = self.router.get_with_query(HostType::Full, path, query).await?;
        if !response.is_success() {
            return Err(status_error(&response, path));
        }
        Ok(response.body)
    }

    async fn data<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, RequestError> {
        let mut body = self.fetch(path, query).await?;
        let data = body
            .get_mut("data")
            .map(Value::take)
            .ok_or_else(|| RequestError::UnexpectedResponse(format!("{path}: missing `data`")))?;
        Ok(serde_json::from_value(data)?)
    }

    async fn page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &TransactionQuery,
    ) -> Result<Paginator<T>, RequestError> {
        let body = self.fetch(path, query.params()).await?;
        let pagination = body
            .get("meta")
            .map(Pagination::from_meta)
            .unwrap_or_default();
        let items = match body.get("data") {
            Some(Value::Array(items)) => items
                .iter()
                .cloned()
                .map(serde_json::from_value)
                .collect::<Result<Vec<T>, _>>()?,
            _ => {
                return Err(RequestError::UnexpectedResponse(format!(
                    "{path}: `data` is not a list"
                )))
            }
        };
        debug!(path, items = items.len(), next = ?pagination.next, "fetched page");
        Ok(Paginator::new(items, pagination))
    }
}

fn status_error(response: &HttpResponse, path: &str) -> RequestError {
    RequestError::HttpStatus {
        status: response.status,
        url: path.to_string(),
    }
}
