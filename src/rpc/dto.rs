use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::MilestoneConfig;
use crate::config::MilestoneError;
use crate::multisig::MultiSignatureAsset;

pub const JSONRPC_VERSION: &str = "2.0";

/// Parses a numeric quantity as nodes send it: a JSON number, a decimal
/// string or a `0x` hex string.
pub fn parse_quantity(value: &Value) -> Option<u128> {
    match value {
        Value::Number(number) => number.as_u64().map(u128::from),
        Value::String(text) => {
            let text = text.trim();
            match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                Some("") => Some(0),
                Some(hex) => u128::from_str_radix(hex, 16).ok(),
                None => text.parse().ok(),
            }
        }
        _ => None,
    }
}

/// Serde adapter for integer fields: accepts any [`parse_quantity`] form and
/// writes a decimal string.
pub mod quantity {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S, T>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: ToString,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<u128>,
    {
        let raw = Value::deserialize(deserializer)?;
        let parsed = super::parse_quantity(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid quantity {raw}")))?;
        T::try_from(parsed).map_err(|_| D::Error::custom(format!("quantity {parsed} out of range")))
    }
}

/// [`quantity`] for optional fields; `null` reads as `None`.
pub mod option_quantity {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: ToString,
    {
        match value {
            Some(value) => serializer.serialize_str(&value.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<u128>,
    {
        let raw = Value::deserialize(deserializer)?;
        if raw.is_null() {
            return Ok(None);
        }
        let parsed = super::parse_quantity(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid quantity {raw}")))?;
        T::try_from(parsed)
            .map(Some)
            .map_err(|_| D::Error::custom(format!("quantity {parsed} out of range")))
    }
}

/// Transaction as a node returns it or as it is prepared for broadcast.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransactionRecord {
    #[serde(default)]
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, with = "quantity")]
    pub nonce: u64,
    #[serde(default, with = "quantity")]
    pub value: u128,
    #[serde(default, with = "quantity")]
    pub gas_price: u128,
    #[serde(default, alias = "gasLimit", with = "quantity")]
    pub gas: u64,
    #[serde(default)]
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_public_key: Option<String>,
    #[serde(
        default,
        with = "option_quantity",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signatures: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_signature: Option<MultiSignatureAsset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<RawReceipt>,
    #[serde(
        default,
        with = "option_quantity",
        skip_serializing_if = "Option::is_none"
    )]
    pub confirmations: Option<u64>,
    #[serde(
        default,
        with = "option_quantity",
        skip_serializing_if = "Option::is_none"
    )]
    pub block_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serialized: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReceipt {
    #[serde(default, with = "quantity")]
    pub status: u8,
    #[serde(default, with = "quantity")]
    pub gas_used: u64,
    #[serde(default, with = "quantity")]
    pub gas_refunded: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// Envelope used by list and item endpoints: `{data, meta?}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(default)]
    pub meta: Option<Value>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BroadcastOutcome {
    #[serde(default)]
    pub accept: Vec<Value>,
    #[serde(default)]
    pub broadcast: Vec<Value>,
    #[serde(default)]
    pub invalid: Vec<Value>,
}

/// Raw `POST transactions` response.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BroadcastResponse {
    #[serde(default)]
    pub data: BroadcastOutcome,
    #[serde(default)]
    pub errors: BTreeMap<String, Value>,
}

/// Broadcast outcome keyed by transaction hash.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BroadcastResult {
    pub accepted: Vec<String>,
    pub rejected: Vec<String>,
    pub errors: BTreeMap<String, String>,
}

impl BroadcastResult {
    /// Maps the node's index-based answer onto the hashes that were sent,
    /// in the order they were sent.
    pub fn from_response(response: &BroadcastResponse, hashes: &[String]) -> Self {
        let mut result = Self::default();

        for entry in &response.data.accept {
            if let Some(hash) = resolve_entry(entry, hashes) {
                push_unique(&mut result.accepted, hash);
            }
        }
        for entry in &response.data.invalid {
            if let Some(hash) = resolve_entry(entry, hashes) {
                push_unique(&mut result.rejected, hash);
            }
        }
        for (key, error) in &response.errors {
            let hash = resolve_entry(&Value::String(key.clone()), hashes)
                .unwrap_or_else(|| key.clone());
            if !result.accepted.contains(&hash) {
                push_unique(&mut result.rejected, hash.clone());
            }
            result.errors.insert(hash, error_message(error));
        }
        result
    }

    pub fn is_fully_accepted(&self) -> bool {
        self.rejected.is_empty() && self.errors.is_empty()
    }
}

fn resolve_entry(entry: &Value, hashes: &[String]) -> Option<String> {
    match entry {
        Value::Number(number) => number
            .as_u64()
            .and_then(|index| hashes.get(index as usize))
            .cloned(),
        Value::String(text) => match text.parse::<usize>() {
            Ok(index) => hashes.get(index).cloned(),
            Err(_) => Some(text.clone()),
        },
        _ => None,
    }
}

fn push_unique(list: &mut Vec<String>, hash: String) {
    if !list.contains(&hash) {
        list.push(hash);
    }
}

/// Error text from a node error entry, which is either a string, an object
/// with `message`, or a list of those (the first one wins).
pub fn error_message(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        Value::Array(entries) => entries
            .first()
            .map(error_message)
            .unwrap_or_default(),
        Value::Object(object) => match object.get("message") {
            Some(Value::String(message)) => message.clone(),
            Some(other) => other.to_string(),
            None => error.to_string(),
        },
        other => other.to_string(),
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    #[serde(default)]
    pub syncing: bool,
    #[serde(default, with = "quantity")]
    pub blocks: u64,
    #[serde(default, with = "quantity")]
    pub height: u64,
    #[serde(default)]
    pub id: Option<String>,
}

/// Gas price statistics for one transaction kind, in gas price units.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeeStatistics {
    #[serde(default, with = "quantity")]
    pub min: u128,
    #[serde(default, with = "quantity")]
    pub avg: u128,
    #[serde(default, with = "quantity")]
    pub max: u128,
}

/// `GET node/fees` payload, keyed by transaction kind (e.g. `evmCall`).
pub type NodeFees = BTreeMap<String, FeeStatistics>;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WalletDto {
    pub address: String,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default, with = "quantity")]
    pub balance: u128,
    #[serde(default, with = "quantity")]
    pub nonce: u64,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl WalletDto {
    pub fn username(&self) -> Option<&str> {
        self.attributes.get("username").and_then(Value::as_str)
    }

    pub fn vote(&self) -> Option<&str> {
        self.attributes.get("vote").and_then(Value::as_str)
    }

    pub fn validator_public_key(&self) -> Option<&str> {
        self.attributes
            .get("validatorPublicKey")
            .and_then(Value::as_str)
    }

    pub fn is_validator(&self) -> bool {
        self.validator_public_key().is_some()
    }

    pub fn is_resigned_validator(&self) -> bool {
        self.attributes
            .get("validatorResigned")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn multi_signature(&self) -> Option<MultiSignatureAsset> {
        self.attributes
            .get("multiSignature")
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
    }
}

/// `GET node/configuration/crypto` payload.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CryptoConfiguration {
    #[serde(default)]
    pub milestones: Vec<Value>,
    #[serde(default)]
    pub network: Value,
    #[serde(default)]
    pub genesis_block: Option<Value>,
}

impl CryptoConfiguration {
    pub fn apply_to(&self, config: &MilestoneConfig) -> Result<(), MilestoneError> {
        config.set_config(self.milestones.clone(), self.network.clone())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Value,
    pub method: String,
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Value::from(1),
            method: method.into(),
            params,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}
