use std::sync::Arc;

use serde::Serialize;

use crate::abi::contracts::decode_revert_reason;
use crate::rpc::RawTransactionRecord;

use super::{DtoContext, RecordBinding, TransactionData, TransactionMeta, TransactionStatus};

/// Execution outcome of a confirmed transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub success: bool,
    pub gas_used: u64,
    pub gas_refunded: u64,
    pub revert_reason: Option<String>,
}

/// A transaction included in a block.
#[derive(Clone, Debug)]
pub struct ConfirmedTransactionData {
    binding: RecordBinding,
}

impl ConfirmedTransactionData {
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

    pub fn is_success(&self) -> bool {
        self.binding
            .raw
            .receipt
            .as_ref()
            .is_some_and(|receipt| receipt.status == 1)
    }

    pub fn block_height(&self) -> Option<u64> {
        self.binding.raw.block_number
    }

    pub fn receipt(&self) -> Option<TransactionReceipt> {
        let receipt = self.binding.raw.receipt.as_ref()?;
        let success = receipt.status == 1;
        let revert_reason = if success {
            None
        } else {
            receipt.output.as_deref().and_then(decode_revert_reason)
        };
        Some(TransactionReceipt {
            success,
            gas_used: receipt.gas_used,
            gas_refunded: receipt.gas_refunded,
            revert_reason,
        })
    }
}

impl TransactionData for ConfirmedTransactionData {
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
        match &self.binding.raw.receipt {
            Some(receipt) if receipt.status != 1 => TransactionStatus::Failed,
            _ => TransactionStatus::Confirmed,
        }
    }

    fn is_confirmed(&self) -> bool {
        self.confirmations() >= 1
    }

    fn confirmations(&self) -> u64 {
        self.binding.raw.confirmations.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::contracts::REVERT_ERROR;
    use crate::abi::{AbiCodec, AbiValue, SolidityAbi};
    use crate::rpc::RawReceipt;
    use crate::transactions::fixtures::{
        multi_payment, transfer, vote, ALICE, ALICE_KEY, BOB, CAROL,
    };

    fn bound(meta: TransactionMeta, raw: RawTransactionRecord) -> ConfirmedTransactionData {
        let mut record = ConfirmedTransactionData::new(Arc::new(DtoContext::default()), meta);
        record.configure(raw);
        record
    }

    fn alice() -> TransactionMeta {
        TransactionMeta::new(ALICE, Some(ALICE_KEY.into()))
    }

    #[test]
    fn overflowing_fee_saturates() {
        let mut raw = transfer(ALICE, BOB, 1);
        raw.gas_price = u128::MAX / 1_000_000;
        let record = bound(alice(), raw);
        assert_eq!(record.fee().base_units(), u128::MAX);

        let mut raw = transfer(ALICE, BOB, 1);
        raw.gas_price = u128::MAX / 1_000_000_000_000;
        raw.gas = u64::MAX;
        let record = bound(alice(), raw);
        assert_eq!(record.fee().base_units(), u128::MAX);
    }

    #[test]
    fn transfer_values_and_fee() {
        let mut raw = transfer(ALICE, BOB, 1_500_000_000_000_000_000);
        raw.confirmations = Some(3);
        raw.receipt = Some(RawReceipt {
            status: 1,
            gas_used: 21_000,
            ..RawReceipt::default()
        });
        let record = bound(alice(), raw);

        assert_eq!(record.transaction_type(), "transfer");
        assert_eq!(record.value().to_string(), "1.5");
        assert_eq!(record.fee().base_units(), 5 * 21_000 * 1_000_000_000);
        assert_eq!(record.fee().to_string(), "0.000105");
        assert!(record.is_sent());
        assert!(!record.is_received());
        assert!(!record.is_return());
        assert!(record.is_confirmed());
        assert!(record.is_success());
        assert_eq!(record.status(), TransactionStatus::Confirmed);

        let recipients = record.recipients();
        assert_eq!(recipients.len(), 1);
        assert_eq!(recipients[0].address, BOB);
    }

    #[test]
    fn transfer_to_self_is_a_return() {
        let record = bound(alice(), transfer(ALICE, ALICE, 1));
        assert!(record.is_sent());
        assert!(record.is_received());
        assert!(record.is_return());
        assert!(!record.is_confirmed());
    }

    #[test]
    fn multi_payment_sums_legs() {
        let raw = multi_payment(ALICE, &[(BOB, 10), (ALICE, 5), (CAROL, 7)]);
        let record = bound(TransactionMeta::new(BOB, None), raw);
        assert_eq!(record.transaction_type(), "multiPayment");
        assert_eq!(record.amount(), 22);
        assert_eq!(record.recipients().len(), 3);
        assert!(record.is_received());
        assert!(!record.is_sent());
        assert!(record.is_return());

        let without_sender = bound(alice(), multi_payment(ALICE, &[(BOB, 10), (CAROL, 7)]));
        assert!(!without_sender.is_return());
    }

    #[test]
    fn vote_exposes_the_validator() {
        let record = bound(alice(), vote(ALICE, BOB));
        assert!(record.is_vote());
        assert_eq!(record.vote_address().as_deref(), Some(BOB));
        assert!(!record.is_return());
    }

    #[test]
    fn failed_receipt_decodes_revert_reason() {
        let output = SolidityAbi
            .encode(&REVERT_ERROR, &[AbiValue::String("not enough funds".into())])
            .expect("encode");
        let mut raw = transfer(ALICE, BOB, 1);
        raw.block_number = Some(42);
        raw.confirmations = Some(1);
        raw.receipt = Some(RawReceipt {
            status: 0,
            gas_used: 30_000,
            gas_refunded: 100,
            output: Some(format!("0x{}", hex::encode(output))),
        });
        let record = bound(alice(), raw);
        let receipt = record.receipt().expect("receipt");
        assert!(!receipt.success);
        assert_eq!(receipt.gas_used, 30_000);
        assert_eq!(receipt.revert_reason.as_deref(), Some("not enough funds"));
        assert_eq!(record.block_height(), Some(42));
        assert_eq!(record.status(), TransactionStatus::Failed);
        assert!(!record.is_success());
    }

    #[test]
    fn serialized_forms_share_accessors() {
        let mut raw = transfer(ALICE, BOB, 1_234_500_000_000_000_000_000);
        raw.confirmations = Some(10);
        let record = bound(alice(), raw);

        let object = record.to_object();
        assert_eq!(object.nonce, 4);
        assert_eq!(object.value.to_string(), "1234.5");

        let json = record.to_json();
        assert_eq!(json["nonce"], "4");
        assert_eq!(json["value"], "1234.5");
        assert_eq!(json["timestamp"], "1700000000000");
        assert_eq!(json["confirmations"], "10");
        assert_eq!(json["type"], "transfer");

        let human = record.to_human();
        assert_eq!(human["value"], "1,234.5");
        assert_eq!(human["status"], "confirmed");
    }

    #[test]
    fn reconfigure_rebinds() {
        let mut record = bound(alice(), transfer(ALICE, BOB, 1));
        record.configure(transfer(BOB, ALICE, 2));
        assert!(record.is_received());
        assert_eq!(record.amount(), 2);
    }
}
