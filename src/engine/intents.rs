use serde::{Deserialize, Serialize};

use crate::rpc::dto::{option_quantity, quantity};

use super::classifier::TransactionType;

/// One `(address, amount)` leg of a multi-payment, amount in base units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecipient {
    pub address: String,
    #[serde(with = "quantity")]
    pub amount: u128,
}

impl PaymentRecipient {
    pub fn new(address: impl Into<String>, amount: u128) -> Self {
        Self {
            address: address.into(),
            amount,
        }
    }
}

/// What a caller wants a transaction to do, before it is encoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionIntent {
    Transfer { to: String, amount: u128 },
    MultiPayment { recipients: Vec<PaymentRecipient> },
    Vote { votes: Vec<String>, unvotes: Vec<String> },
    ValidatorRegistration { public_key: String },
    ValidatorResignation,
    UpdateValidator { public_key: String },
    UsernameRegistration { username: String },
    UsernameResignation,
}

impl TransactionIntent {
    pub fn transaction_type(&self) -> TransactionType {
        match self {
            TransactionIntent::Transfer { .. } => TransactionType::Transfer,
            TransactionIntent::MultiPayment { .. } => TransactionType::MultiPayment,
            TransactionIntent::Vote { votes, .. } if votes.is_empty() => TransactionType::Unvote,
            TransactionIntent::Vote { .. } => TransactionType::Vote,
            TransactionIntent::ValidatorRegistration { .. } => {
                TransactionType::ValidatorRegistration
            }
            TransactionIntent::ValidatorResignation => TransactionType::ValidatorResignation,
            TransactionIntent::UpdateValidator { .. } => TransactionType::UpdateValidator,
            TransactionIntent::UsernameRegistration { .. } => {
                TransactionType::UsernameRegistration
            }
            TransactionIntent::UsernameResignation => TransactionType::UsernameResignation,
        }
    }

    /// Builds an intent from a type tag and a loose field bag. Returns `None`
    /// for unknown tags or when a field the tag needs is missing.
    pub fn from_fields(tag: &str, fields: &IntentFields) -> Option<Self> {
        let intent = match tag {
            "transfer" => TransactionIntent::Transfer {
                to: fields.to.clone()?,
                amount: fields.amount?,
            },
            "multiPayment" => {
                let recipients = fields.recipients.clone()?;
                if recipients.is_empty() {
                    return None;
                }
                TransactionIntent::MultiPayment { recipients }
            }
            "vote" => {
                if fields.votes.is_none() && fields.unvotes.is_none() {
                    return None;
                }
                TransactionIntent::Vote {
                    votes: fields.votes.clone().unwrap_or_default(),
                    unvotes: fields.unvotes.clone().unwrap_or_default(),
                }
            }
            "unvote" => TransactionIntent::Vote {
                votes: Vec::new(),
                unvotes: fields.unvotes.clone().unwrap_or_default(),
            },
            "validatorRegistration" => TransactionIntent::ValidatorRegistration {
                public_key: fields.public_key.clone()?,
            },
            "validatorResignation" => TransactionIntent::ValidatorResignation,
            "updateValidator" => TransactionIntent::UpdateValidator {
                public_key: fields.public_key.clone()?,
            },
            "usernameRegistration" => TransactionIntent::UsernameRegistration {
                username: fields.username.clone()?,
            },
            "usernameResignation" => TransactionIntent::UsernameResignation,
            _ => return None,
        };
        Some(intent)
    }
}

/// Loose field bag accepted by the tag-based encoder entry point.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntentFields {
    pub to: Option<String>,
    #[serde(with = "option_quantity", skip_serializing_if = "Option::is_none")]
    pub amount: Option<u128>,
    pub recipients: Option<Vec<PaymentRecipient>>,
    pub votes: Option<Vec<String>>,
    pub unvotes: Option<Vec<String>>,
    pub public_key: Option<String>,
    pub username: Option<String>,
}

impl IntentFields {
    /// Names of the fields that carry a value, in declaration order.
    pub fn present_fields(&self) -> Vec<&'static str> {
        let mut present = Vec::new();
        if self.to.is_some() {
            present.push("to");
        }
        if self.amount.is_some() {
            present.push("amount");
        }
        if self.recipients.is_some() {
            present.push("recipients");
        }
        if self.votes.is_some() {
            present.push("votes");
        }
        if self.unvotes.is_some() {
            present.push("unvotes");
        }
        if self.public_key.is_some() {
            present.push("publicKey");
        }
        if self.username.is_some() {
            present.push("username");
        }
        present
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tags_build_intents() {
        let fields: IntentFields = serde_json::from_value(json!({
            "to": "0xabc",
            "amount": "1000",
        }))
        .expect("fields");
        assert_eq!(
            TransactionIntent::from_fields("transfer", &fields),
            Some(TransactionIntent::Transfer {
                to: "0xabc".into(),
                amount: 1000
            })
        );
        assert_eq!(fields.present_fields(), vec!["to", "amount"]);
    }

    #[test]
    fn missing_fields_and_unknown_tags_yield_none() {
        let fields = IntentFields {
            to: Some("0xabc".into()),
            ..IntentFields::default()
        };
        assert!(TransactionIntent::from_fields("transfer", &fields).is_none());
        assert!(TransactionIntent::from_fields("vote", &fields).is_none());
        assert!(TransactionIntent::from_fields("secondSignature", &fields).is_none());
        assert!(TransactionIntent::from_fields(
            "multiPayment",
            &IntentFields {
                recipients: Some(Vec::new()),
                ..IntentFields::default()
            }
        )
        .is_none());
    }

    #[test]
    fn vote_without_votes_is_an_unvote() {
        let unvote = TransactionIntent::from_fields(
            "vote",
            &IntentFields {
                unvotes: Some(vec!["0xdef".into()]),
                ..IntentFields::default()
            },
        )
        .expect("intent");
        assert_eq!(unvote.transaction_type(), TransactionType::Unvote);
        let resign = TransactionIntent::from_fields("usernameResignation", &IntentFields::default())
            .expect("intent");
        assert_eq!(resign.transaction_type(), TransactionType::UsernameResignation);
    }
}
