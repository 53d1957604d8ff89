use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::CommitConfig;
use crate::distribution::commit::commit_assignments;
use crate::distribution::partition::partition;
use crate::error::{DistributionError, Result};
use crate::ingest::{parse_leads, UploadFormat};
use crate::roster::{AgentId, AgentRoster};

/// Terminal classification of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every row parsed and every agent's slice committed.
    Success,
    /// The run completed, but some rows were skipped or some per-agent
    /// commits failed; details are in `errors`.
    Partial,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Success => write!(f, "success"),
            RunStatus::Partial => write!(f, "partial"),
        }
    }
}

/// One non-fatal problem observed during a run. Skipped rows carry `stage`,
/// failed commits carry `agent_id`.
#[derive(Debug, Clone, Serialize)]
pub struct DistributionFault {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    pub message: String,
}

/// Aggregate report returned to the caller after a run completes.
#[derive(Debug, Clone, Serialize)]
pub struct DistributionResult {
    pub status: RunStatus,
    pub total_records: usize,
    pub agent_count: usize,
    /// Slice sizes in roster (creation) order; sums to `total_records`.
    pub per_agent_counts: Vec<usize>,
    pub errors: Vec<DistributionFault>,
}

/// Stages of one distribution run. A run only ever moves forward; once
/// committing starts it always reaches completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunStage {
    Parsing,
    Partitioning,
    Committing,
}

impl std::fmt::Display for RunStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStage::Parsing => write!(f, "parsing"),
            RunStage::Partitioning => write!(f, "partitioning"),
            RunStage::Committing => write!(f, "committing"),
        }
    }
}

/// Sequences one upload through parse → partition → commit.
///
/// Fatal errors (`Parse`, `NoAgents`, `Infrastructure`, `Cancelled`)
/// short-circuit with nothing committed. Everything non-fatal ends in a
/// `DistributionResult`, with status `partial` when any fault was recorded.
///
/// A run replaces each agent's assignment wholesale, so two concurrent runs
/// race and the last writer wins; callers are expected to serialize runs.
pub struct Distributor {
    roster: Arc<dyn AgentRoster>,
    commit: CommitConfig,
}

impl Distributor {
    pub fn new(roster: Arc<dyn AgentRoster>, commit: CommitConfig) -> Self {
        Self { roster, commit }
    }

    /// Execute one distribution run over an uploaded file.
    ///
    /// `cancel` is honored up to the end of the partitioning stage. Once
    /// committing starts the run always finishes: aborting half of the
    /// per-agent writes would leave a worse state than the partial-failure
    /// outcome the result already describes.
    pub async fn run(
        &self,
        bytes: Vec<u8>,
        format: UploadFormat,
        cancel: &CancellationToken,
    ) -> Result<DistributionResult> {
        let mut stage = RunStage::Parsing;
        tracing::info!(format = format.as_str(), bytes = bytes.len(), stage = %stage, "Distribution run started");

        // Parsing is CPU/IO-bound and synchronous; keep it off the runtime
        // worker threads.
        let outcome = tokio::task::spawn_blocking(move || parse_leads(&bytes, format))
            .await
            .map_err(|e| DistributionError::Infrastructure(format!("parse task failed: {e}")))??;

        stage = RunStage::Partitioning;
        if cancel.is_cancelled() {
            tracing::info!(stage = %stage, "Distribution run cancelled");
            return Err(DistributionError::Cancelled);
        }

        let agents = self
            .roster
            .list_all()
            .await
            .map_err(|e| DistributionError::Infrastructure(e.to_string()))?;
        if agents.is_empty() {
            return Err(DistributionError::NoAgents);
        }
        let agent_ids: Vec<AgentId> = agents.iter().map(|a| a.id).collect();

        let total_records = outcome.records.len();
        let plan = partition(outcome.records, &agent_ids)?;
        let per_agent_counts: Vec<usize> = plan.iter().map(|(_, slice)| slice.len()).collect();

        // Last cancellation point: nothing has been written yet.
        if cancel.is_cancelled() {
            tracing::info!(stage = %stage, "Distribution run cancelled");
            return Err(DistributionError::Cancelled);
        }

        stage = RunStage::Committing;
        tracing::info!(
            stage = %stage,
            total_records,
            agent_count = agent_ids.len(),
            skipped_rows = outcome.skipped.len(),
            "Committing assignments"
        );

        let mut errors: Vec<DistributionFault> = outcome
            .skipped
            .iter()
            .map(|skip| DistributionFault {
                agent_id: None,
                stage: Some("parse".to_string()),
                message: format!("row {}: {}", skip.row, skip.message),
            })
            .collect();
        errors.extend(commit_assignments(self.roster.clone(), plan, &self.commit).await);

        let status = if errors.is_empty() {
            RunStatus::Success
        } else {
            RunStatus::Partial
        };
        tracing::info!(
            status = %status,
            total_records,
            agent_count = agent_ids.len(),
            errors = errors.len(),
            "Distribution run completed"
        );

        Ok(DistributionResult {
            status,
            total_records,
            agent_count: agent_ids.len(),
            per_agent_counts,
            errors,
        })
    }
}
