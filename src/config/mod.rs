pub mod milestones;
pub mod network;

pub use milestones::{
    Milestone, MilestoneConfig, MilestoneCursor, MilestoneError, NextMilestone,
};
pub use network::{
    AdapterConfig, ConfigValidation, ContractAddresses, NetworkConfigError, NetworkManifest,
    WalletSettings,
};
