use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::RosterError;
use crate::ingest::LeadRecord;
use crate::roster::agent::{Agent, AgentId};

/// Collaborator seam for agent persistence.
///
/// `list_all` returns agents in creation order; that order is what makes
/// `per_agent_counts` in a distribution result meaningful.
/// `replace_assigned_tasks` is an atomic wholesale replace keyed by agent
/// id, so re-applying the same slice is idempotent.
#[async_trait]
pub trait AgentRoster: Send + Sync {
    async fn list_all(&self) -> Result<Vec<Agent>, RosterError>;

    async fn get(&self, id: AgentId) -> Result<Agent, RosterError>;

    async fn insert(&self, agent: Agent) -> Result<(), RosterError>;

    async fn replace_assigned_tasks(
        &self,
        id: AgentId,
        tasks: Vec<LeadRecord>,
    ) -> Result<(), RosterError>;
}

/// In-memory roster backed by a map plus an insertion-order index.
#[derive(Debug, Default)]
pub struct MemoryRoster {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    agents: HashMap<AgentId, Agent>,
    order: Vec<AgentId>,
}

impl MemoryRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.order.is_empty()
    }
}

#[async_trait]
impl AgentRoster for MemoryRoster {
    async fn list_all(&self) -> Result<Vec<Agent>, RosterError> {
        let inner = self.inner.read().await;
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.agents.get(id).cloned())
            .collect())
    }

    async fn get(&self, id: AgentId) -> Result<Agent, RosterError> {
        let inner = self.inner.read().await;
        inner
            .agents
            .get(&id)
            .cloned()
            .ok_or_else(|| RosterError::AgentNotFound(id.to_string()))
    }

    async fn insert(&self, agent: Agent) -> Result<(), RosterError> {
        let mut inner = self.inner.write().await;
        if inner.agents.values().any(|a| a.email == agent.email) {
            return Err(RosterError::DuplicateEmail(agent.email));
        }
        inner.order.push(agent.id);
        inner.agents.insert(agent.id, agent);
        Ok(())
    }

    async fn replace_assigned_tasks(
        &self,
        id: AgentId,
        tasks: Vec<LeadRecord>,
    ) -> Result<(), RosterError> {
        let mut inner = self.inner.write().await;
        let agent = inner
            .agents
            .get_mut(&id)
            .ok_or_else(|| RosterError::AgentNotFound(id.to_string()))?;
        agent.assigned_tasks = tasks;
        Ok(())
    }
}
