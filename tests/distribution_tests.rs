//! End-to-end distribution runs against an in-memory roster.
//!
//! Verifies that:
//! - slices land on agents in roster order, preserving file order
//! - prior assignments are replaced wholesale, including with empty slices
//! - the empty roster and missing header cases fail before any write
//! - per-agent commit failures downgrade the run to partial without
//!   touching the other agents


use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use leadsplit::config::CommitConfig;
use leadsplit::distribution::Distributor;
use leadsplit::error::DistributionError;
use leadsplit::ingest::{LeadRecord, UploadFormat};
use leadsplit::roster::AgentRoster;
use leadsplit::RunStatus;
use test_harness::{roster_with_agents, sample_csv, FailingRoster};

fn fast_commit() -> CommitConfig {
    CommitConfig {
        timeout: Duration::from_secs(1),
        ..CommitConfig::default()
    }
}

#[tokio::test]
async fn ten_leads_across_three_agents_end_to_end() {
    let (roster, ids) = roster_with_agents(3).await;
    let distributor = Distributor::new(roster.clone(), fast_commit());

    let result = distributor
        .run(sample_csv(10).into_bytes(), UploadFormat::Csv, &CancellationToken::new())
        .await
        .expect("run should complete");

    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(result.total_records, 10);
    assert_eq!(result.agent_count, 3);
    assert_eq!(result.per_agent_counts, vec![4, 4, 2]);
    assert!(result.errors.is_empty());

    // Slices are contiguous in roster order: agent 0 has rows 0..4, agent 2
    // has rows 8..10, each slice in file order.
    let first = roster.get(ids[0]).await.unwrap().assigned_tasks;
    assert_eq!(first.len(), 4);
    assert_eq!(first[0].first_name, "Lead0");
    assert_eq!(first[3].first_name, "Lead3");

    let last = roster.get(ids[2]).await.unwrap().assigned_tasks;
    assert_eq!(last.len(), 2);
    assert_eq!(last[0].first_name, "Lead8");
    assert_eq!(last[1].first_name, "Lead9");
}

#[tokio::test]
async fn small_upload_leaves_late_agents_empty_and_clears_stale_tasks() {
    let (roster, ids) = roster_with_agents(5).await;

    // Agent 4 still carries an assignment from an earlier run.
    roster
        .replace_assigned_tasks(
            ids[4],
            vec![LeadRecord {
                first_name: "Stale".into(),
                phone: "555-0000".into(),
                notes: String::new(),
            }],
        )
        .await
        .unwrap();

    let distributor = Distributor::new(roster.clone(), fast_commit());
    let result = distributor
        .run(sample_csv(2).into_bytes(), UploadFormat::Csv, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.per_agent_counts, vec![1, 1, 0, 0, 0]);
    assert_eq!(result.status, RunStatus::Success);

    // Wholesale replace: the stale assignment is gone, not merged.
    let tail = roster.get(ids[4]).await.unwrap().assigned_tasks;
    assert!(tail.is_empty());
}

#[tokio::test]
async fn empty_roster_fails_fast_before_any_write() {
    let (roster, _) = roster_with_agents(0).await;
    let distributor = Distributor::new(roster.clone(), fast_commit());

    let err = distributor
        .run(sample_csv(3).into_bytes(), UploadFormat::Csv, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DistributionError::NoAgents));
}

#[tokio::test]
async fn malformed_row_is_reported_and_the_rest_distributed() {
    let (roster, _) = roster_with_agents(2).await;
    let distributor = Distributor::new(roster.clone(), fast_commit());

    let body = "FirstName,Phone,Notes\nAda,555-0001,vip\nonly-one-field\n,extra,cols,here\nGrace,555-0002,callback\n";
    let result = distributor
        .run(body.as_bytes().to_vec(), UploadFormat::Csv, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.total_records, 2);
    assert_eq!(result.status, RunStatus::Partial);
    let parse_faults: Vec<_> = result
        .errors
        .iter()
        .filter(|f| f.stage.as_deref() == Some("parse"))
        .collect();
    assert_eq!(parse_faults.len(), 2);
    assert!(parse_faults[0].message.starts_with("row 3:"));
    assert!(parse_faults[1].message.starts_with("row 4:"));
}

#[tokio::test]
async fn missing_header_aborts_without_commits() {
    let (roster, ids) = roster_with_agents(2).await;
    let distributor = Distributor::new(roster.clone(), fast_commit());

    let err = distributor
        .run(
            b"name,number\nAda,555-0001\n".to_vec(),
            UploadFormat::Csv,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DistributionError::Parse(_)));

    for id in ids {
        assert!(roster.get(id).await.unwrap().assigned_tasks.is_empty());
    }
}

#[tokio::test]
async fn one_failing_agent_downgrades_to_partial_without_rollback() {
    let (inner, ids) = roster_with_agents(3).await;
    let failing = Arc::new(FailingRoster {
        inner: inner.clone(),
        fail_for: HashSet::from([ids[1]]),
    });
    let distributor = Distributor::new(failing, fast_commit());

    let result = distributor
        .run(sample_csv(10).into_bytes(), UploadFormat::Csv, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.status, RunStatus::Partial);
    assert_eq!(result.per_agent_counts, vec![4, 4, 2]);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].agent_id.as_deref(), Some(ids[1].to_string().as_str()));

    // The failing agent kept its old (empty) state; the others committed.
    assert_eq!(inner.get(ids[0]).await.unwrap().assigned_tasks.len(), 4);
    assert_eq!(inner.get(ids[1]).await.unwrap().assigned_tasks.len(), 0);
    assert_eq!(inner.get(ids[2]).await.unwrap().assigned_tasks.len(), 2);
}

#[tokio::test]
async fn rerunning_the_same_upload_is_idempotent() {
    let (roster, ids) = roster_with_agents(3).await;
    let distributor = Distributor::new(roster.clone(), fast_commit());
    let body = sample_csv(7).into_bytes();

    let first = distributor
        .run(body.clone(), UploadFormat::Csv, &CancellationToken::new())
        .await
        .unwrap();
    let snapshot: Vec<Vec<LeadRecord>> = {
        let mut v = Vec::new();
        for id in &ids {
            v.push(roster.get(*id).await.unwrap().assigned_tasks);
        }
        v
    };

    let second = distributor
        .run(body, UploadFormat::Csv, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(first.per_agent_counts, second.per_agent_counts);
    for (i, id) in ids.iter().enumerate() {
        assert_eq!(roster.get(*id).await.unwrap().assigned_tasks, snapshot[i]);
    }
}

#[tokio::test]
async fn cancellation_before_committing_writes_nothing() {
    let (roster, ids) = roster_with_agents(2).await;
    let distributor = Distributor::new(roster.clone(), fast_commit());

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = distributor
        .run(sample_csv(4).into_bytes(), UploadFormat::Csv, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, DistributionError::Cancelled));

    for id in ids {
        assert!(roster.get(id).await.unwrap().assigned_tasks.is_empty());
    }
}
