use std::sync::Arc;

use crate::multisig::{MultiSignatureSnapshot, MultiSignatureTracker};
use crate::rpc::RawTransactionRecord;

use super::{DtoContext, RecordBinding, TransactionData, TransactionMeta, TransactionStatus};

/// A locally signed transaction that has not been broadcast yet.
///
/// Signed payloads usually omit `from`; the sender address is derived from
/// `senderPublicKey` when the record is bound.
#[derive(Clone, Debug)]
pub struct SignedTransactionData {
    binding: RecordBinding,
    sender_address: Option<String>,
    multi_signature_registration: bool,
}

impl SignedTransactionData {
    pub fn new(context: Arc<DtoContext>, meta: TransactionMeta) -> Self {
        Self {
            binding: RecordBinding::new(context, meta),
            sender_address: None,
            multi_signature_registration: false,
        }
    }

    pub fn configure(&mut self, raw: RawTransactionRecord) -> &mut Self {
        self.sender_address = raw.from.clone().or_else(|| {
            raw.sender_public_key
                .as_deref()
                .and_then(|key| self.binding.context.resolve_address(key))
        });
        self.binding.raw = raw;
        self
    }

    pub fn with_meta(mut self, meta: TransactionMeta) -> Self {
        self.binding.meta = meta;
        self
    }

    /// Marks the record as the transaction that registers its sender's
    /// multi-signature wallet.
    pub fn set_multi_signature_registration(&mut self, registration: bool) -> &mut Self {
        self.multi_signature_registration = registration;
        self
    }

    pub fn is_multi_signature_registration(&self) -> bool {
        self.multi_signature_registration
    }

    pub fn serialized(&self) -> Option<&str> {
        self.binding.raw.serialized.as_deref()
    }

    pub fn signature(&self) -> Option<&str> {
        self.binding.raw.signature.as_deref()
    }

    pub fn signatures(&self) -> &[String] {
        &self.binding.raw.signatures
    }

    pub fn multi_signature_tracker(&self) -> MultiSignatureTracker {
        let raw = &self.binding.raw;
        MultiSignatureTracker::new(MultiSignatureSnapshot {
            asset: raw.multi_signature.clone(),
            signatures: raw.signatures.clone(),
            signature: raw.signature.clone(),
            sender_public_key: raw.sender_public_key.clone(),
            is_registration: self.multi_signature_registration,
        })
    }
}

impl TransactionData for SignedTransactionData {
    fn raw(&self) -> &RawTransactionRecord {
        &self.binding.raw
    }

    fn context(&self) -> &DtoContext {
        &self.binding.context
    }

    fn meta(&self) -> &TransactionMeta {
        &self.binding.meta
    }

    fn status(&self) -> TransactionStatus {
        TransactionStatus::Signed
    }

    fn is_confirmed(&self) -> bool {
        false
    }

    fn from_address(&self) -> Option<&str> {
        self.sender_address.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::AddressResolver;
    use crate::multisig::MultiSignatureAsset;
    use crate::transactions::fixtures::{transfer, ALICE, ALICE_KEY, BOB};

    struct StaticResolver;

    impl AddressResolver for StaticResolver {
        fn address_from_public_key(&self, public_key: &str) -> anyhow::Result<String> {
            match public_key {
                ALICE_KEY => Ok(ALICE.to_string()),
                other => Err(anyhow::anyhow!("unknown key {other}")),
            }
        }
    }

    fn context() -> Arc<DtoContext> {
        Arc::new(DtoContext::default().with_resolver(Arc::new(StaticResolver)))
    }

    #[test]
    fn sender_is_derived_from_public_key() {
        let mut raw = transfer(ALICE, ALICE, 3);
        raw.from = None;
        raw.serialized = Some("f86b".into());
        let mut record = SignedTransactionData::new(context(), TransactionMeta::new(ALICE, None));
        record.configure(raw);

        assert_eq!(record.from_address(), Some(ALICE));
        assert!(record.is_sent());
        assert!(record.is_return());
        assert_eq!(record.serialized(), Some("f86b"));
        assert_eq!(record.to_json()["status"], "signed");
    }

    #[test]
    fn unknown_key_leaves_sender_empty() {
        let mut raw = transfer(ALICE, BOB, 3);
        raw.from = None;
        raw.sender_public_key = Some("03ff".into());
        let mut record = SignedTransactionData::new(context(), TransactionMeta::default());
        record.configure(raw);
        assert_eq!(record.from_address(), None);
    }

    #[test]
    fn tracker_reflects_collected_signatures() {
        let mut raw = transfer(ALICE, BOB, 3);
        raw.multi_signature = Some(MultiSignatureAsset {
            min: 2,
            public_keys: vec![ALICE_KEY.into(), "02bb".into(), "02cc".into()],
        });
        raw.signatures = vec!["00aa".into()];
        let mut record = SignedTransactionData::new(context(), TransactionMeta::default());
        record.configure(raw);

        let tracker = record.multi_signature_tracker();
        assert!(tracker.is_multi_signature());
        assert!(tracker.needs_signatures());
        assert_eq!(tracker.remaining_signature_count(), 1);

        record.set_multi_signature_registration(true);
        assert_eq!(record.multi_signature_tracker().remaining_signature_count(), 2);
    }
}
