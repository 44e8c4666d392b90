pub mod client;
pub mod dto;
pub mod error;
pub mod hosts;
pub mod pagination;
pub mod router;
pub mod transport;

pub use client::{NodeClient, TransactionQuery};
pub use dto::{
    BroadcastResponse, BroadcastResult, CryptoConfiguration, FeeStatistics, NodeFees,
    RawReceipt, RawTransactionRecord, SyncStatus, WalletDto,
};
pub use error::RequestError;
pub use hosts::{select_host, HostType, NetworkHost, MAX_CUSTOM_HOST_FAILURES};
pub use pagination::{Pagination, Paginator};
pub use router::RequestRouter;
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
