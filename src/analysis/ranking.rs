use super::counts::{
    Finding,
    FindingCounts,
};

/// Findings by descending count. The sort is stable, so equal counts keep the
/// order in which their labels first occurred.
pub fn rank(counts: &FindingCounts) -> Vec<Finding> {
    let mut findings = counts.to_findings();
    findings.sort_by(|a, b| b.count.cmp(&a.count));
    findings
}

/// Competition ranks for an already sorted count column: 1, 2, 2, 4.
pub fn calculate_ranks(counts: &[u32]) -> Vec<u32> {
    let mut ranks = Vec::with_capacity(counts.len());
    let mut current_rank = 1u32;
    let mut prev_count: Option<u32> = None;

    for (idx, &count) in counts.iter().enumerate() {
        if prev_count != Some(count) {
            current_rank = (idx + 1) as u32;
        }
        prev_count = Some(count);
        ranks.push(current_rank);
    }

    ranks
}
