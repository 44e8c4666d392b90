use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

mod common;

use async_trait::async_trait;
use serde_json::json;

use common::InMemoryTransport;
use wallet_adapter::config::{ContractAddresses, MilestoneConfig};
use wallet_adapter::crypto::{SignerError, TransactionSigner, UnsignedTransaction};
use wallet_adapter::multisig::MultiSignatureAsset;
use wallet_adapter::retry::RetryPolicy;
use wallet_adapter::rpc::{
    HostType, HttpResponse, NetworkHost, NodeClient, RawTransactionRecord, RequestError,
    RequestRouter, TransactionQuery,
};
use wallet_adapter::transactions::TransactionMeta;
use wallet_adapter::{
    AdapterError, DtoContext, SignedTransactionData, SigningOptions, TransactionData,
    TransactionEncoder, TransactionIntent, TransactionService,
};

const API: &str = "https://api.node.example/api";
const TX: &str = "https://tx.node.example/api";
const EVM: &str = "https://evm.node.example";
const RECIPIENT: &str = "0x2222222222222222222222222222222222222222";

fn default_hosts() -> Vec<NetworkHost> {
    vec![
        NetworkHost::new(API, HostType::Full),
        NetworkHost::new(TX, HostType::Tx),
        NetworkHost::new(EVM, HostType::Evm),
    ]
}

fn client(transport: Arc<InMemoryTransport>, hosts: Vec<NetworkHost>) -> NodeClient {
    let router = Arc::new(RequestRouter::new(hosts, true, transport));
    NodeClient::new(router, Arc::new(DtoContext::default()))
}

fn signed(hash: &str, serialized: &str) -> SignedTransactionData {
    let raw = RawTransactionRecord {
        hash: hash.to_string(),
        from: Some("0x1111111111111111111111111111111111111111".into()),
        to: Some(RECIPIENT.into()),
        value: 1_000_000_000_000_000_000,
        gas_price: 5,
        gas: 21_000,
        signature: Some("aa".repeat(65)),
        serialized: Some(serialized.to_string()),
        ..RawTransactionRecord::default()
    };
    let mut record =
        SignedTransactionData::new(Arc::new(DtoContext::default()), TransactionMeta::default());
    record.configure(raw);
    record
}

#[tokio::test]
async fn broadcast_maps_node_indexes_onto_hashes() {
    let transport = Arc::new(InMemoryTransport::default());
    transport.respond(
        &format!("{TX}/transactions"),
        Ok(HttpResponse::new(
            422,
            json!({
                "data": { "accept": [0], "broadcast": [0], "invalid": [1] },
                "errors": {
                    "1": [
                        { "type": "ERR_LOW_FEE", "message": "fee too low" },
                        { "type": "ERR_NONCE", "message": "nonce too low" }
                    ]
                }
            }),
        )),
    );
    let client = client(transport.clone(), default_hosts());

    let result = client
        .broadcast(&[signed("0xaaa", "f86b01"), signed("0xbbb", "f86b02")])
        .await
        .expect("broadcast");

    assert_eq!(result.accepted, vec!["0xaaa".to_string()]);
    assert_eq!(result.rejected, vec!["0xbbb".to_string()]);
    assert_eq!(
        result.errors.get("0xbbb").map(String::as_str),
        Some("fee too low")
    );
    assert!(!result.is_fully_accepted());

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, format!("{TX}/transactions"));
    assert_eq!(
        requests[0].1,
        Some(json!({ "transactions": ["f86b01", "f86b02"] }))
    );
}

#[tokio::test]
async fn failing_custom_host_falls_back_to_default() {
    let _ = tracing_subscriber::fmt::try_init();
    let custom = "https://mine.example/api";
    let transport = Arc::new(InMemoryTransport::default());
    let syncing = json!({ "data": { "syncing": false, "blocks": 0, "height": 77, "id": "abc" } });
    transport.respond(
        &format!("{API}/node/syncing"),
        Ok(HttpResponse::ok(syncing)),
    );
    let mut hosts = default_hosts();
    hosts.push(NetworkHost::custom(custom, HostType::Full));
    let client = client(transport.clone(), hosts);

    for attempt in 1..=3 {
        let err = client.syncing().await.expect_err("custom host is down");
        assert!(matches!(err, RequestError::Network(_)));
        assert_eq!(client.router().failed_count(custom), Some(attempt));
    }

    let status = client.syncing().await.expect("default host answers");
    assert_eq!(status.height, 77);
    let last = transport.requests().pop().expect("request");
    assert_eq!(last.0, format!("{API}/node/syncing"));
    assert_eq!(client.router().failed_count(custom), Some(3));
}

#[tokio::test]
async fn transaction_pages_follow_meta_links() {
    let transport = Arc::new(InMemoryTransport::default());
    transport.respond(
        &format!("{API}/transactions?page=2&limit=2"),
        Ok(HttpResponse::ok(json!({
            "meta": {
                "prev": "/transactions?page=1&limit=2",
                "self": "/transactions?page=2&limit=2",
                "next": "/transactions?page=3&limit=2",
                "last": "/transactions?page=5&limit=2"
            },
            "data": [
                {
                    "hash": "0x01",
                    "from": "0x1111111111111111111111111111111111111111",
                    "to": RECIPIENT,
                    "value": "2500000000000000000",
                    "gasPrice": "5",
                    "gasLimit": "21000",
                    "data": "",
                    "confirmations": 12,
                    "receipt": { "status": 1, "gasUsed": "21000" }
                },
                {
                    "hash": "0x02",
                    "from": RECIPIENT,
                    "to": "0x1111111111111111111111111111111111111111",
                    "value": "1",
                    "gasPrice": "5",
                    "gas": 21000,
                    "data": "0x",
                    "confirmations": 0
                }
            ]
        }))),
    );
    let client = client(transport, default_hosts());

    let page = client
        .transactions(&TransactionQuery::new().page(2).limit(2))
        .await
        .expect("page");

    assert_eq!(page.len(), 2);
    assert_eq!(page.previous_page(), Some(1));
    assert_eq!(page.current_page(), Some(2));
    assert_eq!(page.next_page(), Some(3));
    assert_eq!(page.last_page(), Some(5));
    assert!(page.has_more_pages());

    let first = &page.items()[0];
    assert!(first.is_transfer());
    assert!(first.is_confirmed());
    assert!(first.is_success());
    assert_eq!(first.value().to_string(), "2.5");
    assert_eq!(first.fee().base_units(), 5 * 21_000 * 1_000_000_000);
    assert!(!page.items()[1].is_confirmed());
}

#[tokio::test]
async fn eth_call_returns_result_and_surfaces_rpc_errors() {
    let transport = Arc::new(InMemoryTransport::default());
    transport.respond(
        EVM,
        Ok(HttpResponse::ok(
            json!({ "jsonrpc": "2.0", "id": 1, "result": "0x01" }),
        )),
    );
    transport.respond(
        EVM,
        Ok(HttpResponse::ok(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32000, "message": "execution reverted" }
        }))),
    );
    let client = client(transport.clone(), default_hosts());

    let result = client.eth_call(RECIPIENT, "0x12345678").await.expect("call");
    assert_eq!(result, "0x01");

    let err = client
        .eth_call(RECIPIENT, "0x12345678")
        .await
        .expect_err("reverted");
    assert!(matches!(err, RequestError::Rpc { code: -32000, .. }));

    let body = transport.requests()[0].1.clone().expect("body");
    assert_eq!(body["method"], "eth_call");
    assert_eq!(body["params"][0]["data"], "0x12345678");
    assert_eq!(body["params"][1], "latest");
}

/// Reports busy on the first request, then signs.
struct BusyOnceSigner {
    calls: AtomicU32,
    signatures: Vec<String>,
}

impl BusyOnceSigner {
    fn new(signatures: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            signatures,
        })
    }
}

#[async_trait]
impl TransactionSigner for BusyOnceSigner {
    async fn sign(
        &self,
        transaction: &UnsignedTransaction,
    ) -> Result<RawTransactionRecord, SignerError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(SignerError::Busy);
        }
        Ok(RawTransactionRecord {
            hash: "0xfeed".into(),
            from: Some("0x1111111111111111111111111111111111111111".into()),
            to: Some(transaction.call.to.clone()),
            nonce: transaction.nonce,
            value: transaction.call.value.unwrap_or_default(),
            gas_price: transaction.gas_price,
            gas: transaction.gas,
            data: transaction.call.data_hex(),
            signature: Some("bb".repeat(65)),
            signatures: self.signatures.clone(),
            serialized: Some("f86c0a".into()),
            ..RawTransactionRecord::default()
        })
    }
}

fn service(
    transport: Arc<InMemoryTransport>,
    signer: Arc<BusyOnceSigner>,
) -> TransactionService {
    let milestones = Arc::new(MilestoneConfig::new());
    let encoder =
        TransactionEncoder::with_default_codec(ContractAddresses::default(), milestones.clone());
    TransactionService::new(encoder, signer, client(transport, default_hosts()), milestones)
        .with_retry_policy(RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_millis(1),
        })
}

#[tokio::test]
async fn service_signs_after_busy_signer_and_broadcasts() {
    let _ = tracing_subscriber::fmt::try_init();
    let transport = Arc::new(InMemoryTransport::default());
    transport.respond(
        &format!("{TX}/transactions"),
        Ok(HttpResponse::ok(
            json!({ "data": { "accept": [0], "broadcast": [0], "invalid": [] } }),
        )),
    );
    let signer = BusyOnceSigner::new(Vec::new());
    let service = service(transport, signer.clone());
    let options = SigningOptions {
        nonce: 10,
        gas_price: 5,
        gas: 21_000,
        sender_public_key: "02aa".into(),
        multi_signature: None,
    };
    let intent = TransactionIntent::Transfer {
        to: RECIPIENT.into(),
        amount: 3_000_000_000_000_000_000,
    };

    let record = service.sign(&intent, &options).await.expect("signed");
    assert_eq!(signer.calls.load(Ordering::SeqCst), 2);
    assert_eq!(record.hash(), "0xfeed");
    assert!(record.is_transfer());
    assert_eq!(record.value().to_string(), "3");
    assert_eq!(record.raw().sender_public_key.as_deref(), Some("02aa"));

    let result = service.broadcast(&[record]).await.expect("broadcast");
    assert!(result.is_fully_accepted());
    assert_eq!(result.accepted, vec!["0xfeed".to_string()]);
}

#[tokio::test]
async fn incomplete_multi_signature_is_not_broadcast() {
    let _ = tracing_subscriber::fmt::try_init();
    let transport = Arc::new(InMemoryTransport::default());
    let signer = BusyOnceSigner::new(vec![format!("00{}", "cc".repeat(64))]);
    let service = service(transport.clone(), signer);
    let options = SigningOptions {
        nonce: 1,
        gas_price: 5,
        gas: 21_000,
        sender_public_key: "02aa".into(),
        multi_signature: Some(MultiSignatureAsset {
            min: 2,
            public_keys: vec!["02aa".into(), "02bb".into(), "02cc".into()],
        }),
    };
    let intent = TransactionIntent::Transfer {
        to: RECIPIENT.into(),
        amount: 1,
    };

    let record = service.sign(&intent, &options).await.expect("signed");
    let err = service.broadcast(&[record]).await.expect_err("pending");
    assert!(matches!(
        err,
        AdapterError::MultiSignaturePending { remaining: 1, .. }
    ));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn milestones_are_synced_from_the_node() {
    let transport = Arc::new(InMemoryTransport::default());
    transport.respond(
        &format!("{API}/node/configuration/crypto"),
        Ok(HttpResponse::ok(json!({
            "data": {
                "milestones": [
                    { "height": 1, "activeValidators": 53, "reward": "0" },
                    { "height": 54, "activeValidators": 53, "reward": "200000000" }
                ],
                "network": { "name": "devnet", "client": { "token": "DARK" } }
            }
        }))),
    );
    transport.respond(
        &format!("{API}/node/syncing"),
        Ok(HttpResponse::ok(
            json!({ "data": { "syncing": false, "blocks": 0, "height": 60, "id": "ff" } }),
        )),
    );
    let service = service(transport, BusyOnceSigner::new(Vec::new()));

    service.sync_milestones().await.expect("synced");

    let milestones = service.milestones();
    assert_eq!(milestones.get_height(), Some(60));
    let current = milestones.get_milestone(None).expect("milestone");
    assert_eq!(current.height(), 54);
    assert_eq!(current.reward(), Some(200_000_000));
    assert_eq!(
        milestones.get("network.client.token").expect("token"),
        json!("DARK")
    );
}
