use std::cmp::Reverse;

use crate::OrderStatus;

pub type StatusCount = (OrderStatus, u64);

/// Deterministic ordering for status counts: count descending, then label descending.
pub fn sort_summary(mut counts: Vec<StatusCount>) -> Vec<StatusCount> {
    counts.sort_by_key(|(status, count)| (Reverse(*count), Reverse(status.as_str())));
    counts
}
