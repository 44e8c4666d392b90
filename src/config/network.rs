use std::collections::BTreeMap;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::abi::parse_address;
use crate::engine::units::{GAS_PRICE_DECIMALS, NATIVE_DECIMALS};
use crate::rpc::hosts::{HostType, NetworkHost};

const DEFAULT_NETWORK_ID: &str = "mainsail.devnet";
const DEFAULT_NETWORK_NAME: &str = "Mainsail Devnet";
const DEFAULT_TICKER: &str = "DARK";
const DEFAULT_CONSENSUS_CONTRACT: &str = "0x535B3D7A252fa034Ed71F0C53ec0C6F784cB64E1";
const DEFAULT_MULTI_PAYMENT_CONTRACT: &str = "0x83769BeEB7e5405ef0B7dc3C66C43E3a51A6d27f";
const DEFAULT_USERNAMES_CONTRACT: &str = "0x2c1DE3b4Dbb4aDebEbB5dcECAe825bE2a9fc6eb6";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SIGNER_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_SIGNER_RETRY_BACKOFF_MS: u64 = 500;
const MAX_DECIMALS: u32 = 38;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigValidation {
    Relaxed,
    Strict,
}

#[derive(Debug, Error)]
pub enum NetworkConfigError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Complete adapter configuration: the network manifest plus user settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AdapterConfig {
    pub network: NetworkManifest,
    pub settings: WalletSettings,
}

impl AdapterConfig {
    pub fn load_from_path_with_validation(
        path: &Path,
        validation: ConfigValidation,
    ) -> Result<Self, NetworkConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => {
                let config: Self =
                    parse_toml(&content, "adapter configuration parse error", validation)?;
                config.validate()?;
                Ok(config)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self, NetworkConfigError> {
        Self::load_from_path_with_validation(path, ConfigValidation::Strict)
    }

    pub fn validate(&self) -> Result<(), NetworkConfigError> {
        self.network.validate()?;
        self.settings.validate()
    }

    /// Default hosts from the manifest followed by the user's custom hosts
    /// for this network, with the `custom` flag forced accordingly.
    pub fn hosts(&self) -> Vec<NetworkHost> {
        let defaults = self.network.hosts.iter().cloned().map(|mut host| {
            host.custom = false;
            host
        });
        let custom = self
            .settings
            .custom_hosts_for(&self.network.id)
            .iter()
            .cloned()
            .map(|mut host| {
                host.custom = true;
                host
            });
        defaults.chain(custom).collect()
    }
}

/// Static description of a network shipped with the wallet.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NetworkManifest {
    /// Identifier used to key custom hosts, e.g. `mainsail.mainnet`.
    pub id: String,
    pub name: String,
    pub ticker: String,
    /// Decimals between base units and display units of the native token.
    pub decimals: u32,
    /// Decimals of the unit gas prices are quoted in.
    pub gas_price_decimals: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    pub contracts: ContractAddresses,
    pub hosts: Vec<NetworkHost>,
}

impl Default for NetworkManifest {
    fn default() -> Self {
        Self {
            id: DEFAULT_NETWORK_ID.to_string(),
            name: DEFAULT_NETWORK_NAME.to_string(),
            ticker: DEFAULT_TICKER.to_string(),
            decimals: NATIVE_DECIMALS,
            gas_price_decimals: GAS_PRICE_DECIMALS,
            chain_id: None,
            contracts: ContractAddresses::default(),
            hosts: Vec::new(),
        }
    }
}

impl NetworkManifest {
    pub fn validate(&self) -> Result<(), NetworkConfigError> {
        if self.id.trim().is_empty() {
            return Err(NetworkConfigError::Config(
                "network id must not be empty".into(),
            ));
        }
        if self.decimals > MAX_DECIMALS || self.gas_price_decimals > self.decimals {
            return Err(NetworkConfigError::Config(format!(
                "network {} has invalid decimals ({} / gas price {})",
                self.id, self.decimals, self.gas_price_decimals
            )));
        }
        self.contracts.validate()?;
        self.hosts.iter().try_for_each(validate_host)
    }

    pub fn hosts_of(&self, kind: HostType) -> impl Iterator<Item = &NetworkHost> {
        self.hosts.iter().filter(move |host| host.kind == kind)
    }
}

/// Addresses of the system contracts the encoder targets.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContractAddresses {
    pub consensus: String,
    pub multi_payment: String,
    pub usernames: String,
}

impl Default for ContractAddresses {
    fn default() -> Self {
        Self {
            consensus: DEFAULT_CONSENSUS_CONTRACT.to_string(),
            multi_payment: DEFAULT_MULTI_PAYMENT_CONTRACT.to_string(),
            usernames: DEFAULT_USERNAMES_CONTRACT.to_string(),
        }
    }
}

impl ContractAddresses {
    pub fn validate(&self) -> Result<(), NetworkConfigError> {
        for (label, address) in [
            ("consensus", &self.consensus),
            ("multi_payment", &self.multi_payment),
            ("usernames", &self.usernames),
        ] {
            parse_address(address).map_err(|err| {
                NetworkConfigError::Config(format!("contracts.{label}: {err}"))
            })?;
        }
        Ok(())
    }
}

/// User preferences that influence host selection and signing.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WalletSettings {
    /// Fall back to the manifest's hosts when a custom host keeps failing.
    pub fallback_to_default_nodes: bool,
    /// Custom hosts keyed by network id.
    pub custom_hosts: BTreeMap<String, Vec<NetworkHost>>,
    /// Timeout applied by the HTTP transport to every request.
    pub request_timeout_secs: u64,
    /// Attempts made against a signer reporting it is busy.
    pub signer_retry_attempts: u32,
    /// Fixed delay between signer attempts.
    pub signer_retry_backoff_ms: u64,
}

impl Default for WalletSettings {
    fn default() -> Self {
        Self {
            fallback_to_default_nodes: true,
            custom_hosts: BTreeMap::new(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            signer_retry_attempts: DEFAULT_SIGNER_RETRY_ATTEMPTS,
            signer_retry_backoff_ms: DEFAULT_SIGNER_RETRY_BACKOFF_MS,
        }
    }
}

impl WalletSettings {
    pub fn validate(&self) -> Result<(), NetworkConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(NetworkConfigError::Config(
                "settings.request_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.signer_retry_attempts == 0 {
            return Err(NetworkConfigError::Config(
                "settings.signer_retry_attempts must be greater than zero".into(),
            ));
        }
        self.custom_hosts
            .values()
            .flatten()
            .try_for_each(validate_host)
    }

    pub fn custom_hosts_for(&self, network: &str) -> &[NetworkHost] {
        self.custom_hosts
            .get(network)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn signer_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.signer_retry_backoff_ms)
    }
}

fn validate_host(host: &NetworkHost) -> Result<(), NetworkConfigError> {
    let url = Url::parse(&host.host)
        .map_err(|err| NetworkConfigError::Config(format!("host `{}`: {err}", host.host)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(NetworkConfigError::Config(format!(
            "host `{}` must use http or https",
            host.host
        )));
    }
    Ok(())
}

fn parse_toml<T: DeserializeOwned>(
    content: &str,
    label: &str,
    validation: ConfigValidation,
) -> Result<T, NetworkConfigError> {
    match validation {
        ConfigValidation::Relaxed => toml::from_str(content)
            .map_err(|err| NetworkConfigError::Config(format!("{label}: {err}"))),
        ConfigValidation::Strict => {
            let mut unknown_keys = Vec::new();
            let deserializer = toml::de::Deserializer::new(content);

            let value = serde_ignored::deserialize(deserializer, |path| {
                unknown_keys.push(path.to_string());
            })
            .map_err(|err| NetworkConfigError::Config(format!("{label}: {err}")))?;

            if !unknown_keys.is_empty() {
                return Err(NetworkConfigError::Config(format!(
                    "{label}: unknown configuration key(s): {}",
                    unknown_keys.join(", ")
                )));
            }

            Ok(value)
        }
    }
}
