use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{AdapterConfig, MilestoneConfig};
use crate::crypto::{TransactionSigner, UnsignedTransaction};
use crate::engine::{EncoderError, IntentFields, TransactionEncoder, TransactionIntent};
use crate::errors::{AdapterError, AdapterResult};
use crate::multisig::MultiSignatureAsset;
use crate::retry::{retry_transient, RetryPolicy};
use crate::rpc::{BroadcastResult, HttpTransport, NodeClient, ReqwestTransport};
use crate::transactions::{SignedTransactionData, TransactionData, TransactionMeta};

/// Sender-side parameters that are not part of the intent itself.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SigningOptions {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas: u64,
    pub sender_public_key: String,
    pub multi_signature: Option<MultiSignatureAsset>,
}

/// Intent to encoded call to signed record to broadcast.
pub struct TransactionService {
    encoder: TransactionEncoder,
    signer: Arc<dyn TransactionSigner>,
    client: NodeClient,
    milestones: Arc<MilestoneConfig>,
    retry: RetryPolicy,
}

impl TransactionService {
    pub fn new(
        encoder: TransactionEncoder,
        signer: Arc<dyn TransactionSigner>,
        client: NodeClient,
        milestones: Arc<MilestoneConfig>,
    ) -> Self {
        Self {
            encoder,
            signer,
            client,
            milestones,
            retry: RetryPolicy::default(),
        }
    }

    /// Wires every collaborator from a loaded configuration: hosts and
    /// fallback for the router, manifest decimals for the views, contract
    /// addresses for the encoder and the signer retry settings.
    pub fn from_config(
        config: &AdapterConfig,
        signer: Arc<dyn TransactionSigner>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let milestones = Arc::new(MilestoneConfig::new());
        let encoder = TransactionEncoder::with_default_codec(
            config.network.contracts.clone(),
            Arc::clone(&milestones),
        );
        let client = NodeClient::from_config(config, transport);
        Self::new(encoder, signer, client, milestones)
            .with_retry_policy(RetryPolicy::from_settings(&config.settings))
    }

    /// Like [`TransactionService::from_config`] over a `reqwest` transport
    /// honouring the configured request timeout.
    pub fn connect(
        config: &AdapterConfig,
        signer: Arc<dyn TransactionSigner>,
    ) -> AdapterResult<Self> {
        let transport = ReqwestTransport::from_settings(&config.settings)?;
        Ok(Self::from_config(config, signer, Arc::new(transport)))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn client(&self) -> &NodeClient {
        &self.client
    }

    pub fn milestones(&self) -> &Arc<MilestoneConfig> {
        &self.milestones
    }

    /// Loads protocol milestones from the node and moves the stored height
    /// to the node's current height.
    pub async fn sync_milestones(&self) -> AdapterResult<()> {
        let configuration = self.client.crypto_configuration().await?;
        configuration.apply_to(&self.milestones)?;
        let status = self.client.syncing().await?;
        self.milestones.set_height(status.height);
        debug!(height = status.height, syncing = status.syncing, "milestones synced");
        Ok(())
    }

    pub fn prepare(
        &self,
        intent: &TransactionIntent,
        options: &SigningOptions,
    ) -> AdapterResult<UnsignedTransaction> {
        let call = self.encoder.encode(intent)?;
        Ok(UnsignedTransaction {
            call,
            nonce: options.nonce,
            gas_price: options.gas_price,
            gas: options.gas,
            sender_public_key: options.sender_public_key.clone(),
            multi_signature: options.multi_signature.clone(),
        })
    }

    pub async fn sign(
        &self,
        intent: &TransactionIntent,
        options: &SigningOptions,
    ) -> AdapterResult<SignedTransactionData> {
        let unsigned = self.prepare(intent, options)?;
        let signer = &self.signer;
        let request = &unsigned;
        let mut raw = retry_transient(self.retry, "sign transaction", move || {
            signer.sign(request)
        })
        .await?;

        if raw.sender_public_key.is_none() {
            raw.sender_public_key = Some(options.sender_public_key.clone());
        }
        if raw.multi_signature.is_none() {
            raw.multi_signature = options.multi_signature.clone();
        }

        let meta = TransactionMeta {
            address: None,
            public_key: Some(options.sender_public_key.clone()),
        };
        let mut record = SignedTransactionData::new(Arc::clone(self.client.context()), meta);
        record.configure(raw);
        info!(
            hash = %record.hash(),
            kind = %record.transaction_type(),
            "transaction signed"
        );
        Ok(record)
    }

    /// Tag-based entry point; fails with the encoder's unknown-type error
    /// before anything is signed.
    pub async fn sign_by_type(
        &self,
        tag: &str,
        fields: &IntentFields,
        options: &SigningOptions,
    ) -> AdapterResult<SignedTransactionData> {
        let intent = TransactionIntent::from_fields(tag, fields).ok_or_else(|| {
            AdapterError::Encoder(EncoderError::UnknownTransactionType {
                tag: tag.to_string(),
                fields: fields.present_fields(),
            })
        })?;
        self.sign(&intent, options).await
    }

    /// Broadcasts records whose signatures are complete. A multi-signature
    /// record that still waits for cosigners fails the whole batch.
    pub async fn broadcast(
        &self,
        transactions: &[SignedTransactionData],
    ) -> AdapterResult<BroadcastResult> {
        for transaction in transactions {
            let tracker = transaction.multi_signature_tracker();
            if tracker.is_multi_signature() && !tracker.is_multi_signature_ready(false) {
                let remaining = tracker.remaining_signature_count();
                warn!(
                    hash = %transaction.hash(),
                    remaining,
                    "multi-signature transaction not ready"
                );
                return Err(AdapterError::MultiSignaturePending {
                    hash: transaction.hash().to_string(),
                    remaining,
                });
            }
        }
        Ok(self.client.broadcast(transactions).await?)
    }
}
