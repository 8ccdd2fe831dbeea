use std::collections::BTreeMap;

use crate::record::BadgeRecord;
use crate::store::BadgeStore;

/// Groups the store's records by exact reason code. Each group keeps the
/// store's ascending timestamp order.
pub fn by_reason(store: &BadgeStore) -> BTreeMap<&str, Vec<&BadgeRecord>> {
    let mut groups: BTreeMap<&str, Vec<&BadgeRecord>> = BTreeMap::new();
    for record in store {
        groups.entry(record.reason()).or_default().push(record);
    }
    groups
}

/// Splits the store into runs of records, starting a new run wherever two
/// consecutive timestamps are at least `min_gap` seconds apart.
pub fn grouped_by_time_gap(store: &BadgeStore, min_gap: i64) -> Vec<Vec<&BadgeRecord>> {
    let mut groups: Vec<Vec<&BadgeRecord>> = Vec::new();
    let mut previous: Option<i64> = None;

    for record in store {
        let starts_group = match previous {
            Some(prev) => record.timestamp() - prev >= min_gap,
            None => true,
        };
        if starts_group {
            groups.push(Vec::new());
        }
        if let Some(group) = groups.last_mut() {
            group.push(record);
        }
        previous = Some(record.timestamp());
    }
    groups
}
