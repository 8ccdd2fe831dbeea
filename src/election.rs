//! Per-election participation timelines.
//!
//! An election shows up as one reason code shared by several badges (e.g. the
//! caucus badge for visiting during the election, the constituent badge for
//! voting). Each badge is a role; each role gets its own bucketed counts over a
//! common window.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::bucket::{bucket_count, bucketize_into, cumulative};
use crate::diag::Diagnostics;
use crate::group::by_reason;
use crate::record::BadgeRecord;
use crate::store::BadgeStore;
use crate::Result;

const ELECTION_LINK: &str = "/election/";

/// How the end of an election window is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowEnd {
    /// The latest award seen in any role.
    #[default]
    LastObserved,
    /// A fixed number of seconds after the first award; later awards are dropped.
    FixedOffset(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleTimeline {
    pub role: String,
    pub counts: Vec<u64>,
    /// First bucket with any award, if there is one.
    pub first_active_bucket: Option<usize>,
}

impl RoleTimeline {
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn cumulative(&self) -> Vec<u64> {
        cumulative(&self.counts)
    }
}

/// Derived from a store on every run, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElectionWindow {
    pub event_id: Option<u64>,
    pub reason: String,
    pub start_timestamp: i64,
    pub end_timestamp: i64,
    pub bucket_width: i64,
    pub roles: Vec<RoleTimeline>,
}

impl ElectionWindow {
    /// Builds the window for one reason code. `roles` pairs a role name with
    /// that role's records for this reason. Returns `None` when every role is
    /// empty.
    pub fn build(
        reason: &str,
        roles: &[(&str, Vec<&BadgeRecord>)],
        bucket_width: i64,
        end: WindowEnd,
        diag: &mut dyn Diagnostics,
    ) -> Result<Option<Self>> {
        let all = roles.iter().flat_map(|(_, records)| records.iter());
        let Some(start_timestamp) = all.clone().map(|r| r.timestamp()).min() else {
            return Ok(None);
        };
        let end_timestamp = match end {
            WindowEnd::LastObserved => all.map(|r| r.timestamp()).max().unwrap_or(start_timestamp),
            WindowEnd::FixedOffset(secs) => start_timestamp + secs,
        };
        let count = bucket_count(start_timestamp, end_timestamp, bucket_width)?;

        let mut timelines = Vec::with_capacity(roles.len());
        for (role, records) in roles {
            let stamps: Vec<i64> = records.iter().map(|r| r.timestamp()).collect();
            let counts = bucketize_into(start_timestamp, bucket_width, count, &stamps, diag)?;
            let first_active_bucket = counts.iter().position(|&n| n > 0);
            timelines.push(RoleTimeline {
                role: role.to_string(),
                counts,
                first_active_bucket,
            });
        }

        Ok(Some(Self {
            event_id: event_id(reason),
            reason: reason.to_string(),
            start_timestamp,
            end_timestamp,
            bucket_width,
            roles: timelines,
        }))
    }

    pub fn role(&self, name: &str) -> Option<&RoleTimeline> {
        self.roles.iter().find(|t| t.role == name)
    }
}

/// The election number linked from a reason code, e.g. 6 for
/// `for an <a href="/election/6">election</a>`.
pub fn event_id(reason: &str) -> Option<u64> {
    let rest = &reason[reason.find(ELECTION_LINK)? + ELECTION_LINK.len()..];
    let digits: &str = rest.split(|c: char| !c.is_ascii_digit()).next()?;
    digits.parse().ok()
}

/// Joins several badge stores on reason code and builds one window per reason.
/// Windows are ordered by election number, unnumbered reasons last.
pub fn elections(
    roles: &[(&str, &BadgeStore)],
    bucket_width: i64,
    end: WindowEnd,
    diag: &mut dyn Diagnostics,
) -> Result<Vec<ElectionWindow>> {
    let grouped: Vec<_> = roles
        .iter()
        .map(|(name, store)| (*name, by_reason(store)))
        .collect();
    let reasons: BTreeSet<&str> = grouped
        .iter()
        .flat_map(|(_, groups)| groups.keys().copied())
        .collect();

    let mut windows = Vec::new();
    for reason in reasons {
        let per_role: Vec<(&str, Vec<&BadgeRecord>)> = grouped
            .iter()
            .map(|(name, groups)| (*name, groups.get(reason).cloned().unwrap_or_default()))
            .collect();
        if let Some(window) = ElectionWindow::build(reason, &per_role, bucket_width, end, diag)? {
            windows.push(window);
        }
    }
    windows.sort_by(|a, b| {
        let rank = |w: &ElectionWindow| (w.event_id.is_none(), w.event_id);
        rank(a).cmp(&rank(b)).then_with(|| a.reason.cmp(&b.reason))
    });
    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::{NullDiagnostics, Recorder};
    use crate::record::{BadgeFields, BadgeIdentity, Medals};

    fn election(n: u64) -> String {
        format!(r#"for an <a href="/election/{n}">election</a>"#)
    }

    fn store(badge_id: u64, rows: &[(u64, i64, &str)]) -> BadgeStore {
        let mut store = BadgeStore::new("stackoverflow.com", badge_id);
        store.merge(rows.iter().map(|&(user_id, timestamp, reason)| {
            BadgeRecord::from(BadgeFields {
                identity: BadgeIdentity {
                    timestamp,
                    user_id,
                    reason: reason.into(),
                    badge_id,
                },
                display_name: String::new(),
                reputation: 0,
                medals: Medals::default(),
            })
        }));
        store
    }

    #[test]
    fn extracts_event_id() {
        assert_eq!(event_id(&election(6)), Some(6));
        assert_eq!(event_id(&election(10)), Some(10));
        assert_eq!(event_id("for being awesome"), None);
    }

    #[test]
    fn joins_roles_on_reason() {
        let e6 = election(6);
        let e5 = election(5);
        let caucus = store(1973, &[(1, 0, &e6), (2, 3_600, &e6), (3, 50, &e5)]);
        let constituent = store(1974, &[(1, 7_200, &e6), (4, 7_300, &e6)]);

        let windows = elections(
            &[("caucus", &caucus), ("constituent", &constituent)],
            3_600,
            WindowEnd::LastObserved,
            &mut NullDiagnostics,
        )
        .unwrap();

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].event_id, Some(5));
        let six = &windows[1];
        assert_eq!(six.start_timestamp, 0);
        assert_eq!(six.end_timestamp, 7_300);
        assert_eq!(six.role("caucus").unwrap().counts, vec![1, 1, 0, 0]);
        assert_eq!(six.role("constituent").unwrap().counts, vec![0, 0, 2, 0]);
        assert_eq!(six.role("constituent").unwrap().first_active_bucket, Some(2));
        assert_eq!(six.role("constituent").unwrap().cumulative(), vec![0, 0, 2, 2]);

        let five = &windows[0];
        assert_eq!(five.role("constituent").unwrap().total(), 0);
        assert_eq!(five.role("constituent").unwrap().first_active_bucket, None);
    }

    #[test]
    fn fixed_offset_drops_late_awards() {
        let e7 = election(7);
        let caucus = store(1973, &[(1, 0, &e7), (2, 100, &e7), (3, 10_000, &e7)]);
        let mut recorder = Recorder::new();

        let windows = elections(
            &[("caucus", &caucus)],
            60,
            WindowEnd::FixedOffset(120),
            &mut recorder,
        )
        .unwrap();

        assert_eq!(windows[0].end_timestamp, 120);
        assert_eq!(windows[0].roles[0].total(), 2);
        assert_eq!(recorder.bucket_notices().len(), 1);
    }
}
