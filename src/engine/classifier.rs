use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::abi::contracts::{consensus, known_functions, multi_payment, usernames};
use crate::abi::{
    decode_hex, method_identifier, strip_hex_prefix, AbiCodec, AbiError, DecodedCall,
    FunctionSpec, IdentifierRegistry, SolidityAbi,
};

use super::intents::PaymentRecipient;

/// Wallet transaction types, in classification priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionType {
    VoteCombination,
    MultiPayment,
    SecondSignature,
    Transfer,
    UsernameRegistration,
    UsernameResignation,
    Unvote,
    ValidatorRegistration,
    ValidatorResignation,
    Vote,
    UpdateValidator,
}

impl TransactionType {
    pub fn label(&self) -> &'static str {
        match self {
            TransactionType::VoteCombination => "voteCombination",
            TransactionType::MultiPayment => "multiPayment",
            TransactionType::SecondSignature => "secondSignature",
            TransactionType::Transfer => "transfer",
            TransactionType::UsernameRegistration => "usernameRegistration",
            TransactionType::UsernameResignation => "usernameResignation",
            TransactionType::Unvote => "unvote",
            TransactionType::ValidatorRegistration => "validatorRegistration",
            TransactionType::ValidatorResignation => "validatorResignation",
            TransactionType::Vote => "vote",
            TransactionType::UpdateValidator => "updateValidator",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a payload was recognised.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    /// Matched one of the wallet transaction types.
    Classified(TransactionType),
    /// Not a wallet type, but the method identifier has a registered name.
    Identified(String),
    /// Nothing known; carries the `0x`-prefixed method identifier.
    Unidentified(String),
}

impl TransactionKind {
    pub fn label(&self) -> &str {
        match self {
            TransactionKind::Classified(kind) => kind.label(),
            TransactionKind::Identified(name) => name,
            TransactionKind::Unidentified(identifier) => identifier,
        }
    }

    pub fn transaction_type(&self) -> Option<TransactionType> {
        match self {
            TransactionKind::Classified(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is(&self, kind: TransactionType) -> bool {
        self.transaction_type() == Some(kind)
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Matcher {
    /// Never matches. Keeps a slot in the order for encodings not yet in use.
    Reserved,
    EmptyPayload,
    /// Payload contains this lower-case method identifier (no `0x`).
    Identifier(String),
}

impl Matcher {
    pub fn identifier(function: &FunctionSpec) -> Self {
        Matcher::Identifier(method_identifier(function))
    }

    fn matches(&self, payload: &str) -> bool {
        match self {
            Matcher::Reserved => false,
            Matcher::EmptyPayload => payload.is_empty(),
            Matcher::Identifier(identifier) => payload.contains(identifier.as_str()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassificationRule {
    pub kind: TransactionType,
    pub matcher: Matcher,
}

impl ClassificationRule {
    pub fn new(kind: TransactionType, matcher: Matcher) -> Self {
        Self { kind, matcher }
    }
}

/// The rule list used by [`TransactionClassifier::default`]. First match wins.
pub fn default_rules() -> Vec<ClassificationRule> {
    use TransactionType::*;
    vec![
        ClassificationRule::new(VoteCombination, Matcher::Reserved),
        ClassificationRule::new(MultiPayment, Matcher::identifier(&multi_payment::PAY)),
        ClassificationRule::new(SecondSignature, Matcher::Reserved),
        ClassificationRule::new(Transfer, Matcher::EmptyPayload),
        ClassificationRule::new(
            UsernameRegistration,
            Matcher::identifier(&usernames::REGISTER_USERNAME),
        ),
        ClassificationRule::new(
            UsernameResignation,
            Matcher::identifier(&usernames::RESIGN_USERNAME),
        ),
        ClassificationRule::new(Unvote, Matcher::identifier(&consensus::UNVOTE)),
        ClassificationRule::new(
            ValidatorRegistration,
            Matcher::identifier(&consensus::REGISTER_VALIDATOR),
        ),
        ClassificationRule::new(
            ValidatorResignation,
            Matcher::identifier(&consensus::RESIGN_VALIDATOR),
        ),
        ClassificationRule::new(Vote, Matcher::identifier(&consensus::VOTE)),
        ClassificationRule::new(
            UpdateValidator,
            Matcher::identifier(&consensus::UPDATE_VALIDATOR),
        ),
    ]
}

/// Maps call payloads back to transaction types and decodes their arguments.
#[derive(Clone)]
pub struct TransactionClassifier {
    codec: Arc<dyn AbiCodec>,
    registry: IdentifierRegistry,
    rules: Vec<ClassificationRule>,
}

impl Default for TransactionClassifier {
    fn default() -> Self {
        Self::new(Arc::new(SolidityAbi), IdentifierRegistry::default())
    }
}

impl fmt::Debug for TransactionClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionClassifier")
            .field("registry", &self.registry)
            .field("rules", &self.rules)
            .finish()
    }
}

impl TransactionClassifier {
    pub fn new(codec: Arc<dyn AbiCodec>, registry: IdentifierRegistry) -> Self {
        Self {
            codec,
            registry,
            rules: default_rules(),
        }
    }

    pub fn with_rules(mut self, rules: Vec<ClassificationRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    pub fn registry(&self) -> &IdentifierRegistry {
        &self.registry
    }

    pub fn codec(&self) -> &Arc<dyn AbiCodec> {
        &self.codec
    }

    /// Classifies a payload. Accepts node payloads (`0x`-prefixed) and
    /// locally signed ones (bare hex) alike; never fails.
    pub fn classify(&self, data: &str) -> TransactionKind {
        let payload = normalize_payload(data);
        if let Some(rule) = self.rules.iter().find(|rule| rule.matcher.matches(&payload)) {
            return TransactionKind::Classified(rule.kind);
        }

        let identifier = payload.get(..8).unwrap_or(&payload);
        match self.registry.name_for(identifier) {
            Some(name) => TransactionKind::Identified(name.to_string()),
            None => TransactionKind::Unidentified(format!("0x{identifier}")),
        }
    }

    pub fn decode_call(&self, data: &str) -> Result<DecodedCall, AbiError> {
        let bytes = decode_hex(data)?;
        self.codec.decode(&known_functions(), &bytes)
    }

    /// Recipients of a `pay(address[],uint256[])` payload; empty when the
    /// payload is not a well-formed multi-payment, including address and
    /// amount lists of different lengths.
    pub fn multi_payment_recipients(&self, data: &str) -> Vec<PaymentRecipient> {
        let Ok(call) = self.decode_call(data) else {
            return Vec::new();
        };
        if call.name != multi_payment::PAY.name {
            return Vec::new();
        }
        let (Some(addresses), Some(amounts)) = (
            call.args.first().and_then(|arg| arg.as_array()),
            call.args.get(1).and_then(|arg| arg.as_array()),
        ) else {
            return Vec::new();
        };
        if addresses.len() != amounts.len() {
            warn!(
                addresses = addresses.len(),
                amounts = amounts.len(),
                "multi-payment legs do not line up"
            );
            return Vec::new();
        }
        addresses
            .iter()
            .zip(amounts)
            .filter_map(|(address, amount)| {
                Some(PaymentRecipient::new(address.as_address()?, amount.as_uint()?))
            })
            .collect()
    }

    /// Validator address of a `vote(address)` payload.
    pub fn vote_address(&self, data: &str) -> Option<String> {
        let call = self.decode_call(data).ok()?;
        if call.name != consensus::VOTE.name {
            return None;
        }
        call.args.first()?.as_address()
    }
}

fn normalize_payload(data: &str) -> String {
    strip_hex_prefix(data.trim()).to_ascii_lowercase()
}
