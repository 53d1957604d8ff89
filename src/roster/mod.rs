pub mod agent;
pub mod store;

pub use agent::{Agent, AgentId, NewAgent};
pub use store::{AgentRoster, MemoryRoster};
