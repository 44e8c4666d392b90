use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::abi::contracts::{consensus, multi_payment, usernames};
use crate::abi::{decode_hex, AbiCodec, AbiError, AbiValue, FunctionSpec, SolidityAbi};
use crate::config::{ContractAddresses, MilestoneConfig};

use super::intents::{IntentFields, PaymentRecipient, TransactionIntent};

#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("unknown transaction type `{tag}` for fields [{}]", .fields.join(", "))]
    UnknownTransactionType {
        tag: String,
        fields: Vec<&'static str>,
    },
    #[error("abi error: {0}")]
    Abi(#[from] AbiError),
    #[error("multi-payment total overflows 128 bits")]
    AmountOverflow,
}

/// Destination, payload and native value of an encoded transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedCall {
    pub to: String,
    pub data: Option<Vec<u8>>,
    pub value: Option<u128>,
}

impl EncodedCall {
    /// `0x`-prefixed payload, `0x` when there is none.
    pub fn data_hex(&self) -> String {
        match &self.data {
            Some(data) => format!("0x{}", hex::encode(data)),
            None => "0x".to_string(),
        }
    }

    pub fn value_hex(&self) -> Option<String> {
        self.value.map(|value| format!("{value:#x}"))
    }
}

/// Turns transaction intents into contract calls.
#[derive(Clone)]
pub struct TransactionEncoder {
    codec: Arc<dyn AbiCodec>,
    contracts: ContractAddresses,
    milestones: Arc<MilestoneConfig>,
}

impl TransactionEncoder {
    pub fn new(
        codec: Arc<dyn AbiCodec>,
        contracts: ContractAddresses,
        milestones: Arc<MilestoneConfig>,
    ) -> Self {
        Self {
            codec,
            contracts,
            milestones,
        }
    }

    pub fn with_default_codec(
        contracts: ContractAddresses,
        milestones: Arc<MilestoneConfig>,
    ) -> Self {
        Self::new(Arc::new(SolidityAbi), contracts, milestones)
    }

    pub fn contracts(&self) -> &ContractAddresses {
        &self.contracts
    }

    pub fn encode(&self, intent: &TransactionIntent) -> Result<EncodedCall, EncoderError> {
        match intent {
            TransactionIntent::Transfer { to, amount } => Ok(self.transfer(to, *amount)),
            TransactionIntent::MultiPayment { recipients } => self.multi_payment(recipients),
            TransactionIntent::Vote { votes, unvotes } => self.vote(votes, unvotes),
            TransactionIntent::ValidatorRegistration { public_key } => {
                self.validator_registration(public_key)
            }
            TransactionIntent::ValidatorResignation => self.validator_resignation(),
            TransactionIntent::UpdateValidator { public_key } => self.update_validator(public_key),
            TransactionIntent::UsernameRegistration { username } => {
                self.username_registration(username)
            }
            TransactionIntent::UsernameResignation => self.username_resignation(),
        }
    }

    /// Validates `fields` against `tag` and encodes the resulting intent.
    pub fn by_type(&self, tag: &str, fields: &IntentFields) -> Result<EncodedCall, EncoderError> {
        let intent = TransactionIntent::from_fields(tag, fields).ok_or_else(|| {
            EncoderError::UnknownTransactionType {
                tag: tag.to_string(),
                fields: fields.present_fields(),
            }
        })?;
        self.encode(&intent)
    }

    pub fn transfer(&self, to: &str, amount: u128) -> EncodedCall {
        EncodedCall {
            to: to.to_string(),
            data: None,
            value: Some(amount),
        }
    }

    pub fn multi_payment(
        &self,
        recipients: &[PaymentRecipient],
    ) -> Result<EncodedCall, EncoderError> {
        let mut addresses = Vec::with_capacity(recipients.len());
        let mut amounts = Vec::with_capacity(recipients.len());
        let mut total: u128 = 0;
        for recipient in recipients {
            addresses.push(AbiValue::address(&recipient.address)?);
            amounts.push(AbiValue::Uint(recipient.amount));
            total = total
                .checked_add(recipient.amount)
                .ok_or(EncoderError::AmountOverflow)?;
        }
        let data = self.call(
            &multi_payment::PAY,
            &[AbiValue::Array(addresses), AbiValue::Array(amounts)],
        )?;
        Ok(EncodedCall {
            to: self.contracts.multi_payment.clone(),
            data: Some(data),
            value: Some(total),
        })
    }

    /// `vote(address)` for the first vote, `unvote()` when there is none.
    pub fn vote(&self, votes: &[String], unvotes: &[String]) -> Result<EncodedCall, EncoderError> {
        let data = match votes.first() {
            Some(address) => self.call(&consensus::VOTE, &[AbiValue::address(address)?])?,
            None => {
                debug!(unvotes = unvotes.len(), "encoding unvote");
                self.call(&consensus::UNVOTE, &[])?
            }
        };
        Ok(self.consensus_call(data, None))
    }

    /// Carries the registration fee of the current milestone as value.
    pub fn validator_registration(&self, public_key: &str) -> Result<EncodedCall, EncoderError> {
        let key = decode_hex(public_key)?;
        let data = self.call(&consensus::REGISTER_VALIDATOR, &[AbiValue::Bytes(key)])?;
        let fee = self
            .milestones
            .get_milestone(None)
            .ok()
            .and_then(|milestone| milestone.validator_registration_fee())
            .unwrap_or(0);
        Ok(self.consensus_call(data, Some(fee)))
    }

    pub fn update_validator(&self, public_key: &str) -> Result<EncodedCall, EncoderError> {
        let key = decode_hex(public_key)?;
        let data = self.call(&consensus::UPDATE_VALIDATOR, &[AbiValue::Bytes(key)])?;
        Ok(self.consensus_call(data, None))
    }

    pub fn validator_resignation(&self) -> Result<EncodedCall, EncoderError> {
        let data = self.call(&consensus::RESIGN_VALIDATOR, &[])?;
        Ok(self.consensus_call(data, None))
    }

    pub fn username_registration(&self, username: &str) -> Result<EncodedCall, EncoderError> {
        let data = self.call(
            &usernames::REGISTER_USERNAME,
            &[AbiValue::String(username.to_string())],
        )?;
        Ok(EncodedCall {
            to: self.contracts.usernames.clone(),
            data: Some(data),
            value: None,
        })
    }

    pub fn username_resignation(&self) -> Result<EncodedCall, EncoderError> {
        let data = self.call(&usernames::RESIGN_USERNAME, &[])?;
        Ok(EncodedCall {
            to: self.contracts.usernames.clone(),
            data: Some(data),
            value: None,
        })
    }

    fn call(&self, function: &FunctionSpec, args: &[AbiValue]) -> Result<Vec<u8>, EncoderError> {
        Ok(self.codec.encode(function, args)?)
    }

    fn consensus_call(&self, data: Vec<u8>, value: Option<u128>) -> EncodedCall {
        EncodedCall {
            to: self.contracts.consensus.clone(),
            data: Some(data),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::classifier::TransactionClassifier;
    use serde_json::json;

    const VALIDATOR: &str = "0x5a0b54d5dc17e0aadc383d2db43b0a0d3e029c4c";
    const PUBLIC_KEY: &str = "a08058db53e2665c84a40f5152e76dd2b652125a6079130d4c315e728bcf4dd1dfb44ac26e82302331d61977d3141118";

    fn encoder(milestones: Arc<MilestoneConfig>) -> TransactionEncoder {
        TransactionEncoder::with_default_codec(ContractAddresses::default(), milestones)
    }

    #[test]
    fn vote_round_trips_through_the_classifier() {
        let encoder = encoder(Arc::new(MilestoneConfig::new()));
        let call = encoder
            .vote(&[VALIDATOR.to_string()], &[])
            .expect("encode vote");
        assert_eq!(call.to, ContractAddresses::default().consensus);

        let classifier = TransactionClassifier::default();
        let payload = call.data_hex();
        assert_eq!(classifier.classify(&payload).label(), "vote");
        assert_eq!(classifier.vote_address(&payload).as_deref(), Some(VALIDATOR));
        assert_eq!(
            classifier.classify(payload.trim_start_matches("0x")).label(),
            "vote"
        );
    }

    #[test]
    fn empty_vote_encodes_unvote() {
        let encoder = encoder(Arc::new(MilestoneConfig::new()));
        let call = encoder.vote(&[], &[VALIDATOR.to_string()]).expect("unvote");
        assert_eq!(
            TransactionClassifier::default().classify(&call.data_hex()).label(),
            "unvote"
        );
    }

    #[test]
    fn multi_payment_value_is_the_total() {
        let encoder = encoder(Arc::new(MilestoneConfig::new()));
        let call = encoder
            .multi_payment(&[
                PaymentRecipient::new(VALIDATOR, 10),
                PaymentRecipient::new("0x000000000000000000000000000000000000dead", 32),
            ])
            .expect("encode");
        assert_eq!(call.value, Some(42));
        assert_eq!(call.value_hex().as_deref(), Some("0x2a"));
        assert_eq!(call.to, ContractAddresses::default().multi_payment);
        let recipients =
            TransactionClassifier::default().multi_payment_recipients(&call.data_hex());
        assert_eq!(recipients.len(), 2);
        assert_eq!(recipients[1].amount, 32);
    }

    #[test]
    fn registration_fee_comes_from_the_current_milestone() {
        let milestones = Arc::new(
            MilestoneConfig::from_payload(json!({
                "milestones": [
                    {
                        "height": 1,
                        "activeValidators": 53,
                        "validatorRegistrationFee": "250000000000000000000"
                    }
                ],
                "network": {}
            }))
            .expect("milestones"),
        );
        let call = encoder(milestones)
            .validator_registration(PUBLIC_KEY)
            .expect("encode");
        assert_eq!(call.value, Some(250_000_000_000_000_000_000));

        let unset = encoder(Arc::new(MilestoneConfig::new()))
            .validator_registration(PUBLIC_KEY)
            .expect("encode");
        assert_eq!(unset.value, Some(0));
    }

    #[test]
    fn transfer_has_no_payload() {
        let call = encoder(Arc::new(MilestoneConfig::new())).transfer(VALIDATOR, 5);
        assert_eq!(call.to, VALIDATOR);
        assert_eq!(call.data, None);
        assert_eq!(call.data_hex(), "0x");
    }

    #[test]
    fn by_type_names_tag_and_fields() {
        let encoder = encoder(Arc::new(MilestoneConfig::new()));
        let fields = IntentFields {
            username: Some("alice".into()),
            ..IntentFields::default()
        };
        let call = encoder
            .by_type("usernameRegistration", &fields)
            .expect("encode");
        assert_eq!(call.to, ContractAddresses::default().usernames);

        let err = encoder
            .by_type("validatorRegistration", &fields)
            .expect_err("missing public key");
        match err {
            EncoderError::UnknownTransactionType { tag, fields } => {
                assert_eq!(tag, "validatorRegistration");
                assert_eq!(fields, vec!["username"]);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(matches!(
            encoder.by_type("bogus", &IntentFields::default()),
            Err(EncoderError::UnknownTransactionType { .. })
        ));
    }
}
