//! Read-only views over node transaction records.
//!
//! Each view binds one [`RawTransactionRecord`] plus the caller's own
//! address and public key. Every accessor is recomputed from the record on
//! each call; nothing is cached.

mod confirmed;
mod signed;
mod unconfirmed;

pub use confirmed::{ConfirmedTransactionData, TransactionReceipt};
pub use signed::SignedTransactionData;
pub use unconfirmed::UnconfirmedTransactionData;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::config::NetworkManifest;
use crate::crypto::AddressResolver;
use crate::engine::units::{scale_up, Amount, GAS_PRICE_DECIMALS, NATIVE_DECIMALS};
use crate::engine::{TransactionClassifier, TransactionKind, TransactionType};
use crate::rpc::RawTransactionRecord;

/// Shared collaborators for every transaction view of one network.
#[derive(Clone)]
pub struct DtoContext {
    pub classifier: TransactionClassifier,
    pub decimals: u32,
    pub gas_price_decimals: u32,
    resolver: Option<Arc<dyn AddressResolver>>,
}

impl Default for DtoContext {
    fn default() -> Self {
        Self::new(TransactionClassifier::default())
    }
}

impl fmt::Debug for DtoContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DtoContext")
            .field("decimals", &self.decimals)
            .field("gas_price_decimals", &self.gas_price_decimals)
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

impl DtoContext {
    pub fn new(classifier: TransactionClassifier) -> Self {
        Self {
            classifier,
            decimals: NATIVE_DECIMALS,
            gas_price_decimals: GAS_PRICE_DECIMALS,
            resolver: None,
        }
    }

    pub fn for_network(manifest: &NetworkManifest, classifier: TransactionClassifier) -> Self {
        Self {
            decimals: manifest.decimals,
            gas_price_decimals: manifest.gas_price_decimals,
            ..Self::new(classifier)
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn AddressResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Address for a sender public key, `None` without a resolver or when
    /// the key cannot be resolved.
    pub fn resolve_address(&self, public_key: &str) -> Option<String> {
        let resolver = self.resolver.as_ref()?;
        match resolver.address_from_public_key(public_key) {
            Ok(address) => Some(address),
            Err(err) => {
                warn!(public_key, error = %err, "failed to derive sender address");
                None
            }
        }
    }
}

/// The caller's own identity, used for sent/received decisions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionMeta {
    pub address: Option<String>,
    pub public_key: Option<String>,
}

impl TransactionMeta {
    pub fn new(address: impl Into<String>, public_key: Option<String>) -> Self {
        Self {
            address: Some(address.into()),
            public_key,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Signed,
    Confirmed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Signed => "signed",
            TransactionStatus::Confirmed => "confirmed",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecipientView {
    pub address: String,
    pub amount: Amount,
}

/// Typed snapshot of every accessor of a transaction view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionObject {
    pub hash: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub nonce: u64,
    pub value: Amount,
    pub fee: Amount,
    pub timestamp: Option<u64>,
    pub confirmations: u64,
    pub is_sent: bool,
    pub is_received: bool,
    pub is_return: bool,
    pub is_confirmed: bool,
    pub status: TransactionStatus,
    pub recipients: Vec<RecipientView>,
}

/// Computations shared by confirmed, unconfirmed and signed transactions.
pub trait TransactionData {
    fn raw(&self) -> &RawTransactionRecord;

    fn context(&self) -> &DtoContext;

    fn meta(&self) -> &TransactionMeta;

    fn status(&self) -> TransactionStatus;

    fn is_confirmed(&self) -> bool;

    fn confirmations(&self) -> u64 {
        0
    }

    fn hash(&self) -> &str {
        &self.raw().hash
    }

    fn from_address(&self) -> Option<&str> {
        self.raw().from.as_deref()
    }

    fn to_address(&self) -> Option<&str> {
        self.raw().to.as_deref()
    }

    fn nonce(&self) -> u64 {
        self.raw().nonce
    }

    fn timestamp(&self) -> Option<u64> {
        self.raw().timestamp
    }

    fn kind(&self) -> TransactionKind {
        self.context().classifier.classify(&self.raw().data)
    }

    fn transaction_type(&self) -> String {
        self.kind().label().to_string()
    }

    fn is_transfer(&self) -> bool {
        self.kind().is(TransactionType::Transfer)
    }

    fn is_multi_payment(&self) -> bool {
        self.kind().is(TransactionType::MultiPayment)
    }

    fn is_vote(&self) -> bool {
        self.kind().is(TransactionType::Vote)
    }

    fn is_unvote(&self) -> bool {
        self.kind().is(TransactionType::Unvote)
    }

    fn is_validator_registration(&self) -> bool {
        self.kind().is(TransactionType::ValidatorRegistration)
    }

    /// Validator address voted for, when this is a vote.
    fn vote_address(&self) -> Option<String> {
        self.context().classifier.vote_address(&self.raw().data)
    }

    /// Transferred amount in base units. Multi-payments report the sum of
    /// their legs.
    fn amount(&self) -> u128 {
        if self.is_multi_payment() {
            return self
                .context()
                .classifier
                .multi_payment_recipients(&self.raw().data)
                .iter()
                .fold(0u128, |total, leg| total.saturating_add(leg.amount));
        }
        self.raw().value
    }

    fn value(&self) -> Amount {
        Amount::new(self.amount(), self.context().decimals)
    }

    /// `gasPrice × gas`, with the gas price scaled from its own unit.
    /// Saturates at `u128::MAX`.
    fn fee(&self) -> Amount {
        let context = self.context();
        let raw = self.raw();
        let price = scale_up(raw.gas_price, context.gas_price_decimals);
        let base = price.checked_mul(u128::from(raw.gas)).unwrap_or_else(|| {
            warn!(
                hash = %raw.hash,
                gas_price = raw.gas_price,
                gas = raw.gas,
                "fee overflows u128, saturating"
            );
            u128::MAX
        });
        Amount::new(base, context.decimals)
    }

    fn recipients(&self) -> Vec<RecipientView> {
        let decimals = self.context().decimals;
        if self.is_multi_payment() {
            return self
                .context()
                .classifier
                .multi_payment_recipients(&self.raw().data)
                .into_iter()
                .map(|leg| RecipientView {
                    address: leg.address,
                    amount: Amount::new(leg.amount, decimals),
                })
                .collect();
        }
        vec![RecipientView {
            address: self.to_address().unwrap_or_default().to_string(),
            amount: self.value(),
        }]
    }

    fn is_sent(&self) -> bool {
        let meta = self.meta();
        same_address(meta.address.as_deref(), self.from_address())
            || matches!(
                (meta.public_key.as_deref(), self.raw().sender_public_key.as_deref()),
                (Some(own), Some(sender)) if own.eq_ignore_ascii_case(sender)
            )
    }

    fn is_received(&self) -> bool {
        let own = self.meta().address.as_deref();
        if same_address(own, self.to_address()) {
            return true;
        }
        self.is_multi_payment()
            && self
                .recipients()
                .iter()
                .any(|leg| same_address(own, Some(&leg.address)))
    }

    /// A transfer to oneself, or a multi-payment that pays the sender back
    /// in at least one leg.
    fn is_return(&self) -> bool {
        if self.is_transfer() {
            return self.is_sent() && self.is_received();
        }
        if self.is_multi_payment() {
            let sender = self.from_address();
            return self
                .recipients()
                .iter()
                .any(|leg| same_address(sender, Some(&leg.address)));
        }
        false
    }

    fn to_object(&self) -> TransactionObject {
        TransactionObject {
            hash: self.hash().to_string(),
            kind: self.transaction_type(),
            from: self.from_address().map(str::to_string),
            to: self.to_address().map(str::to_string),
            nonce: self.nonce(),
            value: self.value(),
            fee: self.fee(),
            timestamp: self.timestamp(),
            confirmations: self.confirmations(),
            is_sent: self.is_sent(),
            is_received: self.is_received(),
            is_return: self.is_return(),
            is_confirmed: self.is_confirmed(),
            status: self.status(),
            recipients: self.recipients(),
        }
    }

    /// Wire-safe form: every number is a string.
    fn to_json(&self) -> Value {
        render(&self.to_object(), |amount| amount.to_string())
    }

    /// Display form with grouped amounts, e.g. `1,234.5`.
    fn to_human(&self) -> Value {
        render(&self.to_object(), Amount::human)
    }
}

fn same_address(left: Option<&str>, right: Option<&str>) -> bool {
    match (left, right) {
        (Some(left), Some(right)) => left.eq_ignore_ascii_case(right),
        _ => false,
    }
}

fn render(object: &TransactionObject, amount: impl Fn(&Amount) -> String) -> Value {
    let recipients: Vec<Value> = object
        .recipients
        .iter()
        .map(|leg| json!({"address": leg.address, "amount": amount(&leg.amount)}))
        .collect();
    json!({
        "hash": object.hash,
        "type": object.kind,
        "from": object.from,
        "to": object.to,
        "nonce": object.nonce.to_string(),
        "value": amount(&object.value),
        "fee": amount(&object.fee),
        "timestamp": object.timestamp.map(|timestamp| timestamp.to_string()),
        "confirmations": object.confirmations.to_string(),
        "isSent": object.is_sent,
        "isReceived": object.is_received,
        "isReturn": object.is_return,
        "isConfirmed": object.is_confirmed,
        "status": object.status.as_str(),
        "recipients": recipients,
    })
}

/// Fields the three views share.
#[derive(Clone, Debug)]
pub(crate) struct RecordBinding {
    pub(crate) context: Arc<DtoContext>,
    pub(crate) meta: TransactionMeta,
    pub(crate) raw: RawTransactionRecord,
}

impl RecordBinding {
    pub(crate) fn new(context: Arc<DtoContext>, meta: TransactionMeta) -> Self {
        Self {
            context,
            meta,
            raw: RawTransactionRecord::default(),
        }
    }
}
