//! Instance matching by identifier overlap
//!
//! Every identifier on every known instance of a work is indexed under
//! `"{type}/{value}"`. A candidate manifestation votes once for each indexed
//! instance per shared key; the instance with most votes wins, ties going to
//! the instance seen first. Classification codes (`ddc`, `lcc` by default)
//! are shared by many manifestations and never indexed.

use crate::db::identifiers::identifiers_for;
use crate::db::instances::{instances_for_work, Instance};
use crate::db::OwnerKind;
use crate::error::IngestResult;
use crate::models::record::{IdentifierRecord, InstanceRecord};
use sqlx::SqliteConnection;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use uuid::Uuid;

/// Pick the most-voted key; ties go to the key voted for first
pub fn pick_by_votes<K, I>(votes: I) -> Option<K>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let mut order: Vec<K> = Vec::new();
    let mut counts: HashMap<K, usize> = HashMap::new();

    for key in votes {
        let count = counts.entry(key.clone()).or_insert(0);
        if *count == 0 {
            order.push(key);
        }
        *count += 1;
    }

    let mut best: Option<(K, usize)> = None;
    for key in order {
        let count = counts[&key];
        if best.as_ref().map_or(true, |(_, c)| count > *c) {
            best = Some((key, count));
        }
    }

    best.map(|(key, _)| key)
}

/// Identifier index over one work's instances
#[derive(Debug, Clone)]
pub struct InstanceMatcher {
    excluded_types: HashSet<String>,
    instances: Vec<Instance>,
    index: HashMap<String, usize>,
}

impl InstanceMatcher {
    pub fn new(excluded_types: &[String]) -> Self {
        Self {
            excluded_types: excluded_types
                .iter()
                .map(|t| t.trim().to_lowercase())
                .collect(),
            instances: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Build the index from a work's stored instances
    pub async fn load(
        conn: &mut SqliteConnection,
        work_id: Uuid,
        excluded_types: &[String],
    ) -> IngestResult<Self> {
        let mut matcher = Self::new(excluded_types);

        for instance in instances_for_work(conn, work_id).await? {
            let identifiers = identifiers_for(conn, OwnerKind::Instance, instance.guid).await?;
            matcher.register(instance, &identifiers);
        }

        Ok(matcher)
    }

    fn indexable_keys<'r>(&'r self, identifiers: &'r [IdentifierRecord]) -> impl Iterator<Item = String> + 'r {
        identifiers
            .iter()
            .filter(|id| !id.identifier.trim().is_empty())
            .filter(|id| !self.excluded_types.contains(&id.id_type.trim().to_lowercase()))
            .map(IdentifierRecord::key)
    }

    /// Add or refresh an instance and index its identifiers; returns its slot
    pub fn register(&mut self, instance: Instance, identifiers: &[IdentifierRecord]) -> usize {
        let slot = match self.instances.iter().position(|i| i.guid == instance.guid) {
            Some(slot) => {
                self.instances[slot] = instance;
                slot
            }
            None => {
                self.instances.push(instance);
                self.instances.len() - 1
            }
        };

        let keys: Vec<String> = self.indexable_keys(identifiers).collect();
        for key in keys {
            self.index.insert(key, slot);
        }

        slot
    }

    /// Slot of the best-matching known instance, if any identifier is shared
    pub fn find_match(&self, identifiers: &[IdentifierRecord]) -> Option<usize> {
        let mut seen = HashSet::new();
        let votes = self
            .indexable_keys(identifiers)
            .filter(|key| seen.insert(key.clone()))
            .filter_map(|key| self.index.get(&key).copied());

        pick_by_votes(votes)
    }

    pub fn instance(&self, slot: usize) -> &Instance {
        &self.instances[slot]
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// Field-level merge: non-null, non-empty, changed values only
///
/// Returns the merged instance when anything changed.
pub fn merge_fields(existing: &Instance, incoming: &InstanceRecord) -> Option<Instance> {
    let mut merged = existing.clone();
    let mut changed = false;

    let fields: [(&mut Option<String>, &Option<String>); 9] = [
        (&mut merged.title, &incoming.title),
        (&mut merged.pub_place, &incoming.pub_place),
        (&mut merged.edition, &incoming.edition),
        (&mut merged.edition_statement, &incoming.edition_statement),
        (&mut merged.extent, &incoming.extent),
        (&mut merged.volume, &incoming.volume),
        (&mut merged.table_of_contents, &incoming.table_of_contents),
        (&mut merged.summary, &incoming.summary),
        (&mut merged.language, &incoming.language),
    ];

    for (stored, value) in fields {
        if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
            if stored.as_deref() != Some(value) {
                *stored = Some(value.to_string());
                changed = true;
            }
        }
    }

    changed.then_some(merged)
}
