pub mod commit;
pub mod partition;
pub mod run;

pub use partition::partition;
pub use run::{DistributionFault, DistributionResult, Distributor, RunStatus};
