//! Contract-call payload codec.
//!
//! The wallet only needs a narrow slice of the Solidity ABI: the handful of
//! parameter kinds used by the consensus, multi-payment and username
//! contracts. [`AbiCodec`] is the seam; [`SolidityAbi`] is the default
//! implementation used when callers do not inject their own.

pub mod contracts;

use std::fmt;

use sha3::{Digest, Keccak256};
use thiserror::Error;

pub use contracts::{method_identifier, IdentifierRegistry};

const WORD: usize = 32;

/// Parameter kinds understood by [`SolidityAbi`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Address,
    Uint256,
    Bool,
    Bytes,
    String,
    AddressArray,
    Uint256Array,
}

impl ParamKind {
    pub fn canonical(&self) -> &'static str {
        match self {
            ParamKind::Address => "address",
            ParamKind::Uint256 => "uint256",
            ParamKind::Bool => "bool",
            ParamKind::Bytes => "bytes",
            ParamKind::String => "string",
            ParamKind::AddressArray => "address[]",
            ParamKind::Uint256Array => "uint256[]",
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(
            self,
            ParamKind::Bytes | ParamKind::String | ParamKind::AddressArray | ParamKind::Uint256Array
        )
    }

    fn element(&self) -> Option<ParamKind> {
        match self {
            ParamKind::AddressArray => Some(ParamKind::Address),
            ParamKind::Uint256Array => Some(ParamKind::Uint256),
            _ => None,
        }
    }
}

/// A contract function description: name plus ordered input kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub inputs: &'static [ParamKind],
}

impl FunctionSpec {
    pub const fn new(name: &'static str, inputs: &'static [ParamKind]) -> Self {
        Self { name, inputs }
    }

    /// Canonical signature, e.g. `pay(address[],uint256[])`.
    pub fn signature(&self) -> String {
        let inputs: Vec<&str> = self.inputs.iter().map(ParamKind::canonical).collect();
        format!("{}({})", self.name, inputs.join(","))
    }

    /// First four bytes of the Keccak-256 hash of the canonical signature.
    pub fn selector(&self) -> [u8; 4] {
        let digest = Keccak256::digest(self.signature().as_bytes());
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&digest[..4]);
        selector
    }
}

/// Values accepted and produced by the codec.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AbiValue {
    Address([u8; 20]),
    Uint(u128),
    Bool(bool),
    Bytes(Vec<u8>),
    String(String),
    Array(Vec<AbiValue>),
}

impl AbiValue {
    /// Parses a `0x`-prefixed (or bare) 20-byte hex address.
    pub fn address(text: &str) -> Result<Self, AbiError> {
        parse_address(text).map(AbiValue::Address)
    }

    pub fn as_address(&self) -> Option<String> {
        match self {
            AbiValue::Address(bytes) => Some(format!("0x{}", hex::encode(bytes))),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u128> {
        match self {
            AbiValue::Uint(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AbiValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            AbiValue::Bytes(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[AbiValue]> {
        match self {
            AbiValue::Array(values) => Some(values),
            _ => None,
        }
    }
}

/// Result of decoding a call payload against a contract interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedCall {
    pub name: &'static str,
    pub args: Vec<AbiValue>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AbiError {
    #[error("{function} expects {expected} argument(s), got {actual}")]
    ArgumentCount {
        function: String,
        expected: usize,
        actual: usize,
    },
    #[error("argument {index} does not match `{expected}`")]
    TypeMismatch { index: usize, expected: &'static str },
    #[error("invalid address `{0}`")]
    InvalidAddress(String),
    #[error("invalid hex payload: {0}")]
    InvalidHex(String),
    #[error("payload truncated at offset {0}")]
    Truncated(usize),
    #[error("value at offset {0} exceeds 128 bits")]
    Overflow(usize),
    #[error("string at offset {0} is not valid UTF-8")]
    InvalidUtf8(usize),
    #[error("no function matches method identifier 0x{0}")]
    UnknownSelector(String),
}

/// Encode/decode pair for contract-call payloads.
pub trait AbiCodec: Send + Sync {
    fn encode(&self, function: &FunctionSpec, args: &[AbiValue]) -> Result<Vec<u8>, AbiError>;

    fn decode(&self, functions: &[FunctionSpec], data: &[u8]) -> Result<DecodedCall, AbiError>;
}

/// Head/tail Solidity encoding for the parameter kinds in [`ParamKind`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SolidityAbi;

impl AbiCodec for SolidityAbi {
    fn encode(&self, function: &FunctionSpec, args: &[AbiValue]) -> Result<Vec<u8>, AbiError> {
        if function.inputs.len() != args.len() {
            return Err(AbiError::ArgumentCount {
                function: function.signature(),
                expected: function.inputs.len(),
                actual: args.len(),
            });
        }
        let mut payload = function.selector().to_vec();
        payload.extend(encode_params(function.inputs, args)?);
        Ok(payload)
    }

    fn decode(&self, functions: &[FunctionSpec], data: &[u8]) -> Result<DecodedCall, AbiError> {
        let selector = data.get(..4).ok_or(AbiError::Truncated(0))?;
        let function = functions
            .iter()
            .find(|function| function.selector() == selector)
            .ok_or_else(|| AbiError::UnknownSelector(hex::encode(selector)))?;
        let args = decode_params(function.inputs, &data[4..])?;
        Ok(DecodedCall {
            name: function.name,
            args,
        })
    }
}

/// Decodes a hex payload with or without the `0x` prefix.
pub fn decode_hex(payload: &str) -> Result<Vec<u8>, AbiError> {
    let trimmed = strip_hex_prefix(payload.trim());
    hex::decode(trimmed).map_err(|err| AbiError::InvalidHex(err.to_string()))
}

pub fn strip_hex_prefix(text: &str) -> &str {
    text.strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text)
}

pub fn parse_address(text: &str) -> Result<[u8; 20], AbiError> {
    let bytes = hex::decode(strip_hex_prefix(text.trim()))
        .map_err(|_| AbiError::InvalidAddress(text.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| AbiError::InvalidAddress(text.to_string()))
}

fn encode_params(kinds: &[ParamKind], args: &[AbiValue]) -> Result<Vec<u8>, AbiError> {
    let head_len = WORD * kinds.len();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();
    for (index, (kind, arg)) in kinds.iter().zip(args).enumerate() {
        if kind.is_dynamic() {
            head.extend(uint_word((head_len + tail.len()) as u128));
            tail.extend(encode_dynamic(index, *kind, arg)?);
        } else {
            head.extend(encode_static(index, *kind, arg)?);
        }
    }
    head.extend(tail);
    Ok(head)
}

fn encode_static(index: usize, kind: ParamKind, arg: &AbiValue) -> Result<[u8; WORD], AbiError> {
    match (kind, arg) {
        (ParamKind::Address, AbiValue::Address(address)) => {
            let mut word = [0u8; WORD];
            word[12..].copy_from_slice(address);
            Ok(word)
        }
        (ParamKind::Uint256, AbiValue::Uint(value)) => Ok(uint_word(*value)),
        (ParamKind::Bool, AbiValue::Bool(value)) => Ok(uint_word(u128::from(*value))),
        _ => Err(AbiError::TypeMismatch {
            index,
            expected: kind.canonical(),
        }),
    }
}

fn encode_dynamic(index: usize, kind: ParamKind, arg: &AbiValue) -> Result<Vec<u8>, AbiError> {
    match (kind, arg) {
        (ParamKind::Bytes, AbiValue::Bytes(bytes)) => Ok(length_prefixed(bytes)),
        (ParamKind::String, AbiValue::String(text)) => Ok(length_prefixed(text.as_bytes())),
        (ParamKind::AddressArray | ParamKind::Uint256Array, AbiValue::Array(values)) => {
            let element = kind.element().ok_or(AbiError::TypeMismatch {
                index,
                expected: kind.canonical(),
            })?;
            let mut encoded = uint_word(values.len() as u128).to_vec();
            for value in values {
                encoded.extend(encode_static(index, element, value)?);
            }
            Ok(encoded)
        }
        _ => Err(AbiError::TypeMismatch {
            index,
            expected: kind.canonical(),
        }),
    }
}

fn length_prefixed(bytes: &[u8]) -> Vec<u8> {
    let mut encoded = uint_word(bytes.len() as u128).to_vec();
    encoded.extend_from_slice(bytes);
    let padding = (WORD - bytes.len() % WORD) % WORD;
    encoded.extend(std::iter::repeat(0u8).take(padding));
    encoded
}

fn uint_word(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn decode_params(kinds: &[ParamKind], data: &[u8]) -> Result<Vec<AbiValue>, AbiError> {
    kinds
        .iter()
        .enumerate()
        .map(|(index, kind)| {
            let offset = index * WORD;
            if kind.is_dynamic() {
                let start = read_usize(data, offset)?;
                decode_dynamic(*kind, data, start)
            } else {
                decode_static(*kind, data, offset)
            }
        })
        .collect()
}

fn decode_static(kind: ParamKind, data: &[u8], offset: usize) -> Result<AbiValue, AbiError> {
    let word = read_word(data, offset)?;
    match kind {
        ParamKind::Address => {
            let mut address = [0u8; 20];
            address.copy_from_slice(&word[12..]);
            Ok(AbiValue::Address(address))
        }
        ParamKind::Uint256 => read_u128(data, offset).map(AbiValue::Uint),
        ParamKind::Bool => read_u128(data, offset).map(|value| AbiValue::Bool(value != 0)),
        _ => Err(AbiError::TypeMismatch {
            index: offset / WORD,
            expected: kind.canonical(),
        }),
    }
}

fn decode_dynamic(kind: ParamKind, data: &[u8], start: usize) -> Result<AbiValue, AbiError> {
    let length = read_usize(data, start)?;
    let body = start.checked_add(WORD).ok_or(AbiError::Truncated(start))?;
    match kind {
        ParamKind::Bytes | ParamKind::String => {
            let end = body.checked_add(length).ok_or(AbiError::Truncated(body))?;
            let bytes = data.get(body..end).ok_or(AbiError::Truncated(body))?.to_vec();
            if kind == ParamKind::Bytes {
                return Ok(AbiValue::Bytes(bytes));
            }
            String::from_utf8(bytes)
                .map(AbiValue::String)
                .map_err(|_| AbiError::InvalidUtf8(start))
        }
        _ => {
            let element = kind.element().ok_or(AbiError::TypeMismatch {
                index: start / WORD,
                expected: kind.canonical(),
            })?;
            (0..length)
                .map(|position| {
                    let offset = position
                        .checked_mul(WORD)
                        .and_then(|shift| body.checked_add(shift))
                        .ok_or(AbiError::Truncated(body))?;
                    decode_static(element, data, offset)
                })
                .collect::<Result<Vec<_>, _>>()
                .map(AbiValue::Array)
        }
    }
}

fn read_word(data: &[u8], offset: usize) -> Result<&[u8], AbiError> {
    let end = offset.checked_add(WORD).ok_or(AbiError::Truncated(offset))?;
    data.get(offset..end).ok_or(AbiError::Truncated(offset))
}

fn read_u128(data: &[u8], offset: usize) -> Result<u128, AbiError> {
    let word = read_word(data, offset)?;
    if word[..16].iter().any(|byte| *byte != 0) {
        return Err(AbiError::Overflow(offset));
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(low))
}

fn read_usize(data: &[u8], offset: usize) -> Result<usize, AbiError> {
    let value = read_u128(data, offset)?;
    usize::try_from(value).map_err(|_| AbiError::Overflow(offset))
}

impl fmt::Display for FunctionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}
