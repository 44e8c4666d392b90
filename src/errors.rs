use thiserror::Error;

use crate::abi::AbiError;
use crate::config::{MilestoneError, NetworkConfigError};
use crate::crypto::SignerError;
use crate::engine::{EncoderError, UnitsError};
use crate::rpc::RequestError;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("milestone error: {0}")]
    Milestone(#[from] MilestoneError),
    #[error("configuration error: {0}")]
    Config(#[from] NetworkConfigError),
    #[error("abi error: {0}")]
    Abi(#[from] AbiError),
    #[error("encoder error: {0}")]
    Encoder(#[from] EncoderError),
    #[error("amount error: {0}")]
    Units(#[from] UnitsError),
    #[error("node request error: {0}")]
    Request(#[from] RequestError),
    #[error("signer error: {0}")]
    Signer(#[from] SignerError),
    #[error("transaction {hash} still needs {remaining} signature(s)")]
    MultiSignaturePending { hash: String, remaining: usize },
}

pub type AdapterResult<T> = Result<T, AdapterError>;
