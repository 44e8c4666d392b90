pub mod classifier;
pub mod encoder;
pub mod intents;
pub mod units;

pub use classifier::{
    default_rules, ClassificationRule, Matcher, TransactionClassifier, TransactionKind,
    TransactionType,
};
pub use encoder::{EncodedCall, EncoderError, TransactionEncoder};
pub use intents::{IntentFields, PaymentRecipient, TransactionIntent};
pub use units::{format_human, format_units, parse_units, Amount, UnitsError};
