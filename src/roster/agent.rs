use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ingest::LeadRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One field agent. `assigned_tasks` is replaced wholesale by each
/// distribution run, never merged.
#[derive(Debug, Clone, Serialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub email: String,
    pub mobile_number: String,
    pub assigned_tasks: Vec<LeadRecord>,
    pub created_at: DateTime<Utc>,
}

/// Payload for registering a new agent.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAgent {
    pub name: String,
    pub email: String,
    pub mobile_number: String,
}

impl Agent {
    pub fn new(new_agent: NewAgent) -> Self {
        Self {
            id: AgentId::new(),
            name: new_agent.name,
            email: new_agent.email,
            mobile_number: new_agent.mobile_number,
            assigned_tasks: Vec::new(),
            created_at: Utc::now(),
        }
    }
}
