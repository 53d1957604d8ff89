use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::config::CommitConfig;
use crate::distribution::run::DistributionFault;
use crate::ingest::LeadRecord;
use crate::roster::{AgentId, AgentRoster};

/// Write every agent's slice, replacing its previous assignment.
///
/// Writes for different agents are independent and run concurrently,
/// bounded by `cfg.concurrency`. One agent's failure never rolls back the
/// others; it becomes a fault in the returned list and the remaining
/// agents keep committing. The order of records inside each slice is
/// untouched.
pub(crate) async fn commit_assignments(
    roster: Arc<dyn AgentRoster>,
    plan: Vec<(AgentId, Vec<LeadRecord>)>,
    cfg: &CommitConfig,
) -> Vec<DistributionFault> {
    let semaphore = Arc::new(Semaphore::new(cfg.concurrency.max(1)));

    // Handles stay paired with their agent id so even a write that panics
    // is attributed to the agent whose slice was lost.
    let writes: Vec<(AgentId, JoinHandle<std::result::Result<(), DistributionFault>>)> = plan
        .into_iter()
        .map(|(agent_id, slice)| {
            let semaphore = semaphore.clone();
            let roster = roster.clone();
            let cfg = cfg.clone();
            let handle = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("commit semaphore is never closed");
                commit_one(roster.as_ref(), agent_id, slice, &cfg).await
            });
            (agent_id, handle)
        })
        .collect();

    let mut faults = Vec::new();
    for (agent_id, handle) in writes {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(fault)) => faults.push(fault),
            Err(join_err) => faults.push(DistributionFault {
                agent_id: Some(agent_id.to_string()),
                stage: Some("commit".to_string()),
                message: format!("commit task failed: {join_err}"),
            }),
        }
    }
    faults
}

/// One agent's write: a timeout per attempt and at most `cfg.retries`
/// extra attempts for transient store failures.
async fn commit_one(
    roster: &dyn AgentRoster,
    agent_id: AgentId,
    slice: Vec<LeadRecord>,
    cfg: &CommitConfig,
) -> std::result::Result<(), DistributionFault> {
    let mut last_error = String::new();

    for attempt in 0..=cfg.retries {
        let write = roster.replace_assigned_tasks(agent_id, slice.clone());
        match timeout(cfg.timeout, write).await {
            Ok(Ok(())) => {
                tracing::debug!(agent_id = %agent_id, tasks = slice.len(), attempt, "Assignment committed");
                return Ok(());
            }
            Ok(Err(err)) => {
                last_error = err.to_string();
                tracing::warn!(agent_id = %agent_id, attempt, error = %err, "Assignment write failed");
            }
            Err(_) => {
                last_error = format!("write timed out after {:?}", cfg.timeout);
                tracing::warn!(agent_id = %agent_id, attempt, timeout = ?cfg.timeout, "Assignment write timed out");
            }
        }
    }

    Err(DistributionFault {
        agent_id: Some(agent_id.to_string()),
        stage: Some("commit".to_string()),
        message: last_error,
    })
}
