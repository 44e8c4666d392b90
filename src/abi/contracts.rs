//! Contract interfaces and method identifiers known to the wallet.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::{AbiCodec, FunctionSpec, ParamKind, SolidityAbi};

pub mod consensus {
    use super::{FunctionSpec, ParamKind};

    pub const VOTE: FunctionSpec = FunctionSpec::new("vote", &[ParamKind::Address]);
    pub const UNVOTE: FunctionSpec = FunctionSpec::new("unvote", &[]);
    pub const REGISTER_VALIDATOR: FunctionSpec =
        FunctionSpec::new("registerValidator", &[ParamKind::Bytes]);
    pub const RESIGN_VALIDATOR: FunctionSpec = FunctionSpec::new("resignValidator", &[]);
    pub const UPDATE_VALIDATOR: FunctionSpec =
        FunctionSpec::new("updateValidator", &[ParamKind::Bytes]);

    pub const FUNCTIONS: &[FunctionSpec] = &[
        VOTE,
        UNVOTE,
        REGISTER_VALIDATOR,
        RESIGN_VALIDATOR,
        UPDATE_VALIDATOR,
    ];
}

pub mod multi_payment {
    use super::{FunctionSpec, ParamKind};

    pub const PAY: FunctionSpec =
        FunctionSpec::new("pay", &[ParamKind::AddressArray, ParamKind::Uint256Array]);

    pub const FUNCTIONS: &[FunctionSpec] = &[PAY];
}

pub mod usernames {
    use super::{FunctionSpec, ParamKind};

    pub const REGISTER_USERNAME: FunctionSpec =
        FunctionSpec::new("registerUsername", &[ParamKind::String]);
    pub const RESIGN_USERNAME: FunctionSpec = FunctionSpec::new("resignUsername", &[]);

    pub const FUNCTIONS: &[FunctionSpec] = &[REGISTER_USERNAME, RESIGN_USERNAME];
}

pub mod erc20 {
    use super::{FunctionSpec, ParamKind};

    pub const TRANSFER: FunctionSpec =
        FunctionSpec::new("transfer", &[ParamKind::Address, ParamKind::Uint256]);
    pub const APPROVE: FunctionSpec =
        FunctionSpec::new("approve", &[ParamKind::Address, ParamKind::Uint256]);
    pub const TRANSFER_FROM: FunctionSpec = FunctionSpec::new(
        "transferFrom",
        &[ParamKind::Address, ParamKind::Address, ParamKind::Uint256],
    );

    pub const FUNCTIONS: &[FunctionSpec] = &[TRANSFER, APPROVE, TRANSFER_FROM];
}

/// `Error(string)`, the standard revert payload.
pub const REVERT_ERROR: FunctionSpec = FunctionSpec::new("Error", &[ParamKind::String]);

static METHOD_IDENTIFIERS: Lazy<HashMap<String, String>> = Lazy::new(|| {
    consensus::FUNCTIONS
        .iter()
        .chain(multi_payment::FUNCTIONS)
        .chain(usernames::FUNCTIONS)
        .chain(erc20::FUNCTIONS)
        .chain(std::iter::once(&REVERT_ERROR))
        .map(|function| (function.signature(), hex::encode(function.selector())))
        .collect()
});

/// Lower-case hex method identifier (no `0x`) for a function, cached for
/// the interfaces declared in this module.
pub fn method_identifier(function: &FunctionSpec) -> String {
    METHOD_IDENTIFIERS
        .get(&function.signature())
        .cloned()
        .unwrap_or_else(|| hex::encode(function.selector()))
}

/// Every contract function the wallet can decode.
pub fn known_functions() -> Vec<FunctionSpec> {
    consensus::FUNCTIONS
        .iter()
        .chain(multi_payment::FUNCTIONS)
        .chain(usernames::FUNCTIONS)
        .chain(erc20::FUNCTIONS)
        .copied()
        .collect()
}

/// Maps full method identifiers to human names for calls the classifier
/// does not recognise as a wallet transaction type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentifierRegistry {
    names: HashMap<String, String>,
}

impl IdentifierRegistry {
    pub fn empty() -> Self {
        Self {
            names: HashMap::new(),
        }
    }

    /// Registers `name` for a method identifier, with or without `0x`.
    pub fn register(&mut self, identifier: &str, name: impl Into<String>) {
        self.names
            .insert(normalize_identifier(identifier), name.into());
    }

    pub fn register_function(&mut self, function: &FunctionSpec, name: impl Into<String>) {
        self.register(&method_identifier(function), name);
    }

    pub fn name_for(&self, identifier: &str) -> Option<&str> {
        self.names
            .get(&normalize_identifier(identifier))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for IdentifierRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for function in consensus::FUNCTIONS
            .iter()
            .chain(multi_payment::FUNCTIONS)
            .chain(usernames::FUNCTIONS)
        {
            registry.register_function(function, function.name);
        }
        registry.register_function(&erc20::TRANSFER, "tokenTransfer");
        registry.register_function(&erc20::APPROVE, "tokenApproval");
        registry.register_function(&erc20::TRANSFER_FROM, "tokenTransferFrom");
        registry
    }
}

fn normalize_identifier(identifier: &str) -> String {
    super::strip_hex_prefix(identifier.trim()).to_ascii_lowercase()
}

/// Decodes the message of an `Error(string)` revert output.
pub fn decode_revert_reason(output: &str) -> Option<String> {
    let bytes = super::decode_hex(output).ok()?;
    let call = SolidityAbi.decode(&[REVERT_ERROR], &bytes).ok()?;
    call.args.first()?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::AbiValue;

    #[test]
    fn identifiers_are_cached_lowercase_hex() {
        let identifier = method_identifier(&erc20::TRANSFER);
        assert_eq!(identifier, "a9059cbb");
        assert_eq!(method_identifier(&REVERT_ERROR), "08c379a0");
        assert_eq!(method_identifier(&consensus::VOTE).len(), 8);
    }

    #[test]
    fn registry_lookup_ignores_prefix_and_case() {
        let registry = IdentifierRegistry::default();
        assert_eq!(registry.name_for("0xA9059CBB"), Some("tokenTransfer"));
        assert_eq!(
            registry.name_for(&method_identifier(&consensus::VOTE)),
            Some("vote")
        );
        assert_eq!(registry.name_for("0xdeadbeef"), None);
    }

    #[test]
    fn revert_reason_decodes_error_string() {
        let output = SolidityAbi
            .encode(&REVERT_ERROR, &[AbiValue::String("insufficient balance".into())])
            .expect("encode");
        let hex_output = format!("0x{}", hex::encode(output));
        assert_eq!(
            decode_revert_reason(&hex_output).as_deref(),
            Some("insufficient balance")
        );
        assert_eq!(decode_revert_reason("0x"), None);
        assert_eq!(decode_revert_reason("not-hex"), None);
    }
}
