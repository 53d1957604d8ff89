pub mod auth;
pub mod config;
pub mod distribution;
pub mod error;
pub mod http;
pub mod ingest;
pub mod roster;
pub mod shutdown;

pub use distribution::{DistributionResult, Distributor, RunStatus};
pub use ingest::{LeadRecord, UploadFormat};
pub use roster::{Agent, AgentId, AgentRoster, MemoryRoster};
