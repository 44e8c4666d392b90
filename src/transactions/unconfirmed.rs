use std::sync::Arc;

use crate::rpc::RawTransactionRecord;

use super::{DtoContext, RecordBinding, TransactionData, TransactionMeta, TransactionStatus};

/// A transaction sitting in the node's pool. Always reports `pending`.
#[derive(Clone, Debug)]
pub struct UnconfirmedTransactionData {
    binding: RecordBinding,
}

impl UnconfirmedTransactionData {
    pub fn new(context: Arc<DtoContext>, meta: TransactionMeta) -> Self {
        Self {
            binding: RecordBinding::new(context, meta),
        }
    }

    pub fn configure(&mut self, raw: RawTransactionRecord) -> &mut Self {
        self.binding.raw = raw;
        self
    }

    pub fn with_meta(mut self, meta: TransactionMeta) -> Self {
        self.binding.meta = meta;
        self
    }
}

impl TransactionData for UnconfirmedTransactionData {
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
        TransactionStatus::Pending
    }

    fn is_confirmed(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transactions::fixtures::{transfer, ALICE, BOB};

    #[test]
    fn pending_status_is_in_every_form() {
        let mut raw = transfer(ALICE, BOB, 10);
        raw.confirmations = Some(5);
        let mut record = UnconfirmedTransactionData::new(
            Arc::new(DtoContext::default()),
            TransactionMeta::new(BOB, None),
        );
        record.configure(raw);

        assert!(!record.is_confirmed());
        assert_eq!(record.confirmations(), 0);
        assert!(record.is_received());
        assert_eq!(record.to_object().status, TransactionStatus::Pending);
        assert_eq!(record.to_json()["status"], "pending");
        assert_eq!(record.to_human()["status"], "pending");
    }
}
