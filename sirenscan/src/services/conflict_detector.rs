//! Siren ID conflict detection
//!
//! A siren ID is in conflict when the records carrying it come from two or
//! more different groups. Reuse inside a single group is fine.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::extractor::Record;

/// A model that uses a given siren ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelUsage {
    pub model: String,
    pub group: String,
}

/// One siren ID shared across groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SirenConflict {
    pub siren_id: String,
    /// Every usage of the ID, in record order
    pub usages: Vec<ModelUsage>,
}

impl SirenConflict {
    /// Distinct groups, in first-seen order
    pub fn groups(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.usages
            .iter()
            .map(|u| u.group.as_str())
            .filter(|g| seen.insert(*g))
            .collect()
    }
}

/// Conflicting siren IDs keyed in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConflictMap {
    conflicts: Vec<SirenConflict>,
}

impl ConflictMap {
    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SirenConflict> {
        self.conflicts.iter()
    }

    pub fn get(&self, siren_id: &str) -> Option<&SirenConflict> {
        self.conflicts.iter().find(|c| c.siren_id == siren_id)
    }

    pub fn contains(&self, siren_id: &str) -> bool {
        self.get(siren_id).is_some()
    }
}

impl<'a> IntoIterator for &'a ConflictMap {
    type Item = &'a SirenConflict;
    type IntoIter = std::slice::Iter<'a, SirenConflict>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Group records by siren ID and keep the IDs used by more than one group
///
/// IDs are compared as exact strings; "7" and " 7" are different IDs.
pub fn find_conflicts(records: &[Record]) -> ConflictMap {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut by_siren: Vec<SirenConflict> = Vec::new();

    for record in records {
        let slot = *index.entry(record.siren_id.as_str()).or_insert_with(|| {
            by_siren.push(SirenConflict {
                siren_id: record.siren_id.clone(),
                usages: Vec::new(),
            });
            by_siren.len() - 1
        });

        by_siren[slot].usages.push(ModelUsage {
            model: record.model.clone(),
            group: record.group.clone(),
        });
    }

    let total_ids = by_siren.len();
    let conflicts: Vec<SirenConflict> = by_siren
        .into_iter()
        .filter(|entry| entry.groups().len() > 1)
        .collect();

    tracing::info!(
        "Conflict detection: {} records, {} distinct siren IDs, {} conflicts",
        records.len(),
        total_ids,
        conflicts.len()
    );

    ConflictMap { conflicts }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_group_reuse_is_conflict() {
        let records = vec![
            Record::new("CarA", "101", "vehicles"),
            Record::new("CarB", "101", "props"),
            Record::new("CarC", "202", "vehicles"),
        ];

        let conflicts = find_conflicts(&records);

        assert_eq!(conflicts.len(), 1);
        let conflict = conflicts.get("101").unwrap();
        assert_eq!(
            conflict.usages,
            vec![
                ModelUsage { model: "CarA".into(), group: "vehicles".into() },
                ModelUsage { model: "CarB".into(), group: "props".into() },
            ]
        );
        assert!(!conflicts.contains("202"));
    }

    #[test]
    fn test_same_group_reuse_is_not_conflict() {
        let records = vec![
            Record::new("CarA", "5", "pack"),
            Record::new("CarB", "5", "pack"),
            Record::new("CarA", "5", "pack"),
        ];

        assert!(find_conflicts(&records).is_empty());
    }

    #[test]
    fn test_empty_group_counts_as_distinct_group() {
        let records = vec![
            Record::new("Root", "9", ""),
            Record::new("Nested", "9", "pack"),
        ];

        let conflicts = find_conflicts(&records);
        assert_eq!(conflicts.get("9").unwrap().groups(), vec!["", "pack"]);
    }

    #[test]
    fn test_ids_compared_as_exact_strings() {
        let records = vec![
            Record::new("CarA", "7", "a"),
            Record::new("CarB", "07", "b"),
            Record::new("CarC", " 7", "c"),
        ];

        assert!(find_conflicts(&records).is_empty());
    }

    #[test]
    fn test_conflicts_in_first_seen_order_with_all_usages() {
        let records = vec![
            Record::new("M1", "300", "x"),
            Record::new("M2", "100", "x"),
            Record::new("M3", "300", "x"),
            Record::new("M4", "100", "y"),
            Record::new("M5", "300", "z"),
        ];

        let conflicts = find_conflicts(&records);
        let ids: Vec<&str> = conflicts.iter().map(|c| c.siren_id.as_str()).collect();
        assert_eq!(ids, vec!["300", "100"]);

        // Same-group usages stay in the list once the ID is in conflict
        let models: Vec<&str> = conflicts.get("300").unwrap().usages.iter().map(|u| u.model.as_str()).collect();
        assert_eq!(models, vec!["M1", "M3", "M5"]);
    }

    #[test]
    fn test_no_records_no_conflicts() {
        assert!(find_conflicts(&[]).is_empty());
    }
}
