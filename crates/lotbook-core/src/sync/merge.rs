//! Last-write-wins merge of local and remote record sets.

use std::collections::BTreeMap;

use crate::models::Record;

/// Result of merging remote records into the local set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    /// Merged set, ordered by plate
    pub records: Vec<Record>,
    /// Remote records that must be written to the local store
    pub changed: Vec<Record>,
    /// Remote-only plates added
    pub inserted: usize,
    /// Local records replaced by newer remote ones
    pub updated: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Local,
    Inserted,
    Replaced,
}

/// Whether a remote timestamp overrides a local one.
///
/// An unparseable (absent) remote timestamp never wins. A present remote
/// timestamp wins over an absent local one, otherwise it must be strictly
/// greater.
#[must_use]
pub const fn remote_wins(local: Option<i64>, remote: Option<i64>) -> bool {
    match (local, remote) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(local), Some(remote)) => remote > local,
    }
}

/// Merge remote records into local ones keyed by plate.
#[must_use]
pub fn merge_records(local: Vec<Record>, remote: Vec<Record>) -> MergeOutcome {
    let mut merged: BTreeMap<String, (Record, Origin)> = local
        .into_iter()
        .map(|record| (record.plate.clone(), (record, Origin::Local)))
        .collect();

    for incoming in remote {
        match merged.get_mut(&incoming.plate) {
            None => {
                tracing::debug!("Adding remote-only record {}", incoming.plate);
                merged.insert(incoming.plate.clone(), (incoming, Origin::Inserted));
            }
            Some((existing, origin)) => {
                if remote_wins(existing.updated_at, incoming.updated_at) {
                    tracing::debug!(
                        "Remote record {} is newer ({:?} > {:?})",
                        incoming.plate,
                        incoming.updated_at,
                        existing.updated_at
                    );
                    *existing = incoming;
                    if *origin == Origin::Local {
                        *origin = Origin::Replaced;
                    }
                }
            }
        }
    }

    let mut outcome = MergeOutcome::default();
    for (record, origin) in merged.into_values() {
        match origin {
            Origin::Local => {}
            Origin::Inserted => {
                outcome.inserted += 1;
                outcome.changed.push(record.clone());
            }
            Origin::Replaced => {
                outcome.updated += 1;
                outcome.changed.push(record.clone());
            }
        }
        outcome.records.push(record);
    }
    outcome
}
