use crate::error::DistributionError;
use crate::ingest::LeadRecord;
use crate::roster::AgentId;

/// Split records into contiguous chunks across the roster, in roster order.
///
/// With `N` records and `M` agents, the chunk size is `ceil(N / M)`: agent
/// `i` receives `records[i*chunk .. min((i+1)*chunk, N)]`. Early agents can
/// get a full chunk while late ones get the remainder or nothing; the load
/// difference between two agents can reach `chunk - 1`. This is a
/// contiguous split, not a round-robin deal.
///
/// Fails with `NoAgents` before any division when the roster is empty; an
/// empty record set with a non-empty roster is fine and yields all-empty
/// slices.
pub fn partition(
    records: Vec<LeadRecord>,
    agents: &[AgentId],
) -> Result<Vec<(AgentId, Vec<LeadRecord>)>, DistributionError> {
    if agents.is_empty() {
        return Err(DistributionError::NoAgents);
    }

    let chunk = records.len().div_ceil(agents.len());
    let mut remaining = records.into_iter();
    Ok(agents
        .iter()
        .map(|&id| (id, remaining.by_ref().take(chunk).collect()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leads(n: usize) -> Vec<LeadRecord> {
        (0..n)
            .map(|i| LeadRecord {
                first_name: format!("lead-{i}"),
                phone: format!("555-{i:04}"),
                notes: String::new(),
            })
            .collect()
    }

    fn ids(m: usize) -> Vec<AgentId> {
        (0..m).map(|_| AgentId::new()).collect()
    }

    fn counts(plan: &[(AgentId, Vec<LeadRecord>)]) -> Vec<usize> {
        plan.iter().map(|(_, slice)| slice.len()).collect()
    }

    #[test]
    fn ten_leads_across_three_agents() {
        let agents = ids(3);
        let plan = partition(leads(10), &agents).unwrap();
        assert_eq!(counts(&plan), vec![4, 4, 2]);
    }

    #[test]
    fn two_leads_across_five_agents() {
        let agents = ids(5);
        let plan = partition(leads(2), &agents).unwrap();
        assert_eq!(counts(&plan), vec![1, 1, 0, 0, 0]);
    }

    #[test]
    fn zero_leads_gives_everyone_an_empty_slice() {
        let agents = ids(3);
        let plan = partition(leads(0), &agents).unwrap();
        assert_eq!(counts(&plan), vec![0, 0, 0]);
    }

    #[test]
    fn empty_roster_fails_before_any_division() {
        let err = partition(leads(10), &[]).unwrap_err();
        assert!(matches!(err, DistributionError::NoAgents));
        // Also with zero records: an empty roster is always a failure.
        let err = partition(leads(0), &[]).unwrap_err();
        assert!(matches!(err, DistributionError::NoAgents));
    }

    #[test]
    fn slices_are_contiguous_cover_everything_once_in_order() {
        for (n, m) in [(0usize, 1usize), (1, 1), (7, 3), (10, 3), (2, 5), (12, 4), (100, 7)] {
            let agents = ids(m);
            let plan = partition(leads(n), &agents).unwrap();

            assert_eq!(plan.len(), m, "one slice per agent");
            let rejoined: Vec<String> = plan
                .iter()
                .flat_map(|(_, slice)| slice.iter().map(|r| r.first_name.clone()))
                .collect();
            let expected: Vec<String> = (0..n).map(|i| format!("lead-{i}")).collect();
            assert_eq!(rejoined, expected, "N={n} M={m}: concatenation must rebuild the file order");

            let total: usize = counts(&plan).iter().sum();
            assert_eq!(total, n, "N={n} M={m}: counts must sum to N");
        }
    }

    #[test]
    fn roster_order_is_preserved_in_the_plan() {
        let agents = ids(4);
        let plan = partition(leads(9), &agents).unwrap();
        let plan_ids: Vec<AgentId> = plan.iter().map(|(id, _)| *id).collect();
        assert_eq!(plan_ids, agents);
    }
}
