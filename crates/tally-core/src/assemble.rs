//! Turns store buckets into an ordered [`AggregationResult`].

use tally_types::{AggregatedBucket, AggregationResult, ContractError, GroupType};

use crate::granularity::reconstruct_label;

/// Sort `buckets` by key and label each with the first instant it covers.
///
/// Every key must have the shape of `group_type`, and no key may appear
/// twice; stores are expected to have grouped already. An empty input gives
/// an empty result.
pub fn assemble(
    mut buckets: Vec<AggregatedBucket>,
    group_type: GroupType,
) -> Result<AggregationResult, ContractError> {
    if buckets.is_empty() {
        return Ok(AggregationResult::empty());
    }

    if let Some(bad) = buckets.iter().find(|b| b.key.group_type() != group_type) {
        return Err(ContractError::GranularityMismatch {
            key: bad.key.to_string(),
            expected: group_type,
        });
    }

    buckets.sort_by(|a, b| a.key.cmp(&b.key));
    if let Some(pair) = buckets.windows(2).find(|w| w[0].key == w[1].key) {
        return Err(ContractError::DuplicateBucket(pair[0].key.to_string()));
    }

    let mut dataset = Vec::with_capacity(buckets.len());
    let mut labels = Vec::with_capacity(buckets.len());
    for bucket in buckets {
        labels.push(reconstruct_label(&bucket.key)?);
        dataset.push(bucket.total);
    }

    AggregationResult::try_new(dataset, labels)
}
