use std::sync::Arc;

use anyhow::Error as AnyError;
use async_trait::async_trait;
use thiserror::Error;

use crate::engine::EncodedCall;
use crate::multisig::MultiSignatureAsset;
use crate::rpc::RawTransactionRecord;

/// Derives the account address that belongs to a public key.
pub trait AddressResolver: Send + Sync {
    fn address_from_public_key(&self, public_key: &str) -> anyhow::Result<String>;
}

/// Everything a signer needs to produce a broadcastable transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub call: EncodedCall,
    pub nonce: u64,
    pub gas_price: u128,
    pub gas: u64,
    pub sender_public_key: String,
    pub multi_signature: Option<MultiSignatureAsset>,
}

/// Signs transactions: a local key, a hardware device or a cosigner.
///
/// The returned record carries the hash, the signature(s) and the
/// serialized form that is posted to the node.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    async fn sign(
        &self,
        transaction: &UnsignedTransaction,
    ) -> Result<RawTransactionRecord, SignerError>;
}

#[derive(Debug, Error, Clone)]
pub enum SignerError {
    /// The device is handling another request; worth retrying shortly.
    #[error("signer busy")]
    Busy,
    #[error("signing rejected: {0}")]
    Rejected(String),
    #[error("signer unavailable: {message}")]
    Device {
        message: String,
        #[source]
        source: Option<Arc<AnyError>>,
    },
}

impl SignerError {
    pub fn device(message: impl Into<String>, source: Option<AnyError>) -> Self {
        Self::Device {
            message: message.into(),
            source: source.map(Arc::new),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, SignerError::Busy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_busy_is_transient() {
        assert!(SignerError::Busy.is_transient());
        assert!(!SignerError::Rejected("user declined".into()).is_transient());
        let device = SignerError::device("usb disconnected", Some(anyhow::anyhow!("io")));
        assert!(!device.is_transient());
        assert_eq!(device.to_string(), "signer unavailable: usb disconnected");
    }
}
