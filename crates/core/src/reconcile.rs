// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replica reconciliation
//!
//! Given one [`SequenceTracker`] per host, decide which host exports which
//! sequence numbers so that the union of every host's data is exported exactly
//! once.
//!
//! The first host in key order is the leader and exports everything it holds.
//! Leader gaps are filled by the first other host (again in key order) that
//! holds the missing rows. Every caller iterates hosts in the same order, so
//! independent invocations agree on ownership.
//!
//! The leader choice is not optimal: a leader with gaps may be picked over a
//! replica without any, in which case the replica fills gaps it could have
//! covered alone. Consumers depend only on the result being deterministic.

use crate::tracker::{SeqRange, SequenceTracker, INFINITE};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Compute per-host ownership assignments.
///
/// Every input host appears in the output, possibly with an empty tracker.
pub fn reconcile<K>(trackers: &BTreeMap<K, SequenceTracker>) -> BTreeMap<K, SequenceTracker>
where
    K: Ord + Clone + Debug,
{
    let mut assignments: BTreeMap<K, SequenceTracker> = trackers
        .keys()
        .map(|k| (k.clone(), SequenceTracker::new()))
        .collect();

    let mut hosts = trackers.iter();
    let Some((leader_id, leader)) = hosts.next() else {
        return assignments;
    };
    assignments.insert(leader_id.clone(), leader.clone());

    let replicas: Vec<(&K, &SequenceTracker)> = hosts.collect();
    if replicas.is_empty() {
        return assignments;
    }

    let mut safe_point = 0u64;
    while safe_point != INFINITE {
        let seq = safe_point + 1;

        let gap = match leader.first_gap(seq) {
            Some(gap) if gap.lo <= seq => gap,
            other => {
                // Leader is authoritative up to its next gap
                safe_point = other.map_or(INFINITE, |g| g.lo - 1);
                tracing::debug!(leader = ?leader_id, safe_point, "leader owns stretch");
                continue;
            }
        };

        tracing::debug!(leader = ?leader_id, seq, gap = %gap, "leader gap, looking for replica");

        match find_filler(&replicas, seq) {
            Filler::Found { host, covered_until } => {
                let end = gap.hi.min(covered_until);
                tracing::debug!(replica = ?host, range = %SeqRange::new(seq, end), "replica fills gap");
                if let Some(assignment) = assignments.get_mut(host) {
                    assignment.add_range(seq, end);
                }
                safe_point = end;
            }
            Filler::Missing { closest_gap_end } => {
                safe_point = gap.hi.min(closest_gap_end);
                tracing::debug!(seq, safe_point, "no host holds rows, gap left unfilled");
            }
        }
    }

    assignments
}

enum Filler<'a, K> {
    /// `host` holds data from `seq` through `covered_until`
    Found { host: &'a K, covered_until: u64 },
    /// Nobody holds `seq`; every replica's gap ends at or after `closest_gap_end`
    Missing { closest_gap_end: u64 },
}

fn find_filler<'a, K>(replicas: &[(&'a K, &SequenceTracker)], seq: u64) -> Filler<'a, K> {
    let mut closest_gap_end = INFINITE;
    for (host, tracker) in replicas {
        match tracker.first_gap(seq) {
            None => {
                return Filler::Found {
                    host,
                    covered_until: INFINITE,
                }
            }
            Some(gap) if gap.lo > seq => {
                return Filler::Found {
                    host,
                    covered_until: gap.lo - 1,
                }
            }
            Some(gap) => closest_gap_end = closest_gap_end.min(gap.hi),
        }
    }
    Filler::Missing { closest_gap_end }
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
