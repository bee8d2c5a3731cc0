use std::collections::BTreeMap;

use crate::model::{Bucket, BucketKind, ReconSummary, UnresolvedSlab};

/// Compute summary statistics from the finished buckets.
pub fn compute_summary(
    buckets: &[Bucket],
    driving_records: usize,
    unresolved_slabs: Vec<UnresolvedSlab>,
) -> ReconSummary {
    let mut bucket_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_members = 0;
    let mut perfect_matches = 0;
    let mut corrections = 0;
    let mut additions = 0;
    let mut offboards = 0;

    for bucket in buckets {
        let n = bucket.members.len();
        *bucket_counts.entry(bucket.kind.to_string()).or_insert(0) += n;
        total_members += n;

        match bucket.kind {
            BucketKind::PerfectMatch => perfect_matches += n,
            BucketKind::Correction => corrections += n,
            BucketKind::Addition | BucketKind::ManualAddition | BucketKind::Reactivate => {
                additions += n
            }
            kind if kind.is_offboard() => offboards += n,
            _ => {}
        }
    }

    ReconSummary {
        driving_records,
        total_members,
        perfect_matches,
        corrections,
        additions,
        offboards,
        bucket_counts,
        unresolved_slabs,
    }
}
