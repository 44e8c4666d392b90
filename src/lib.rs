//! Protocol adapter core for an EVM-based validator chain wallet.
//!
//! [`config::MilestoneConfig`] answers which protocol parameters apply at a
//! height, [`engine::TransactionEncoder`] and [`engine::TransactionClassifier`]
//! translate between transaction intents and contract-call payloads,
//! [`multisig::MultiSignatureTracker`] follows cosigner progress, and
//! [`rpc::RequestRouter`] spreads node requests over default and custom hosts.
//! The views in [`transactions`] derive values, fees and recipients from raw
//! node records, and [`service::TransactionService`] ties the flow together.

pub mod abi;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod errors;
pub mod multisig;
pub mod retry;
pub mod rpc;
pub mod service;
pub mod transactions;

pub use config::{AdapterConfig, MilestoneConfig};
pub use engine::{TransactionClassifier, TransactionEncoder, TransactionIntent};
pub use errors::{AdapterError, AdapterResult};
pub use multisig::MultiSignatureTracker;
pub use rpc::{NodeClient, RequestRouter};
pub use service::{SigningOptions, TransactionService};
pub use transactions::{
    ConfirmedTransactionData, DtoContext, SignedTransactionData, TransactionData,
    UnconfirmedTransactionData,
};
