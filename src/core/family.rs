use indexmap::IndexMap;
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::core::types::FamilyId;

/// Assignment of reference sequence names to families.
///
/// Families are kept in founding order and members in the order they joined.
/// Lookups try the exact name first, then fall back to a lowercase index in
/// which the earliest of several names differing only in case wins.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FamilyAssignment {
    families: IndexMap<FamilyId, Vec<String>>,

    #[serde(skip)]
    by_name: HashMap<String, FamilyId>,

    #[serde(skip)]
    by_folded_name: HashMap<String, FamilyId>,
}

impl FamilyAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new family with `founder` as its first member
    pub(crate) fn found(&mut self, id: FamilyId, founder: &str) {
        self.index(founder, &id);
        self.families.insert(id, vec![founder.to_string()]);
    }

    /// Add `name` to an existing family. Returns false if the family is unknown.
    pub(crate) fn join(&mut self, id: &FamilyId, name: &str) -> bool {
        let Some(members) = self.families.get_mut(id) else {
            return false;
        };
        members.push(name.to_string());
        self.index(name, id);
        true
    }

    fn index(&mut self, name: &str, id: &FamilyId) {
        self.by_name.insert(name.to_string(), id.clone());
        match self.by_folded_name.entry(name.to_lowercase()) {
            Entry::Vacant(entry) => {
                entry.insert(id.clone());
            }
            Entry::Occupied(entry) if entry.get() != id => warn!(
                "Reference '{name}' in {id} differs only in case from a reference in {kept}; \
                 inexact lookups resolve to {kept}",
                kept = entry.get()
            ),
            Entry::Occupied(_) => {}
        }
    }

    /// Family of a reference name. An exact match wins; otherwise case is ignored.
    pub fn family_of(&self, name: &str) -> Option<&FamilyId> {
        self.by_name
            .get(name)
            .or_else(|| self.by_folded_name.get(&name.to_lowercase()))
    }

    pub fn members(&self, id: &FamilyId) -> Option<&[String]> {
        self.families.get(id).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FamilyId, &[String])> {
        self.families.iter().map(|(id, m)| (id, m.as_slice()))
    }

    /// Number of families
    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Total number of assigned names across all families
    pub fn member_count(&self) -> usize {
        self.families.values().map(Vec::len).sum()
    }

    /// True if every name appears in exactly one family and no other names are assigned
    pub fn is_partition_of<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> bool {
        let expected: HashSet<&str> = names.into_iter().collect();
        let mut seen: HashSet<&str> = HashSet::with_capacity(expected.len());

        for members in self.families.values() {
            for name in members {
                if !expected.contains(name.as_str()) || !seen.insert(name.as_str()) {
                    return false;
                }
            }
        }

        seen.len() == expected.len()
    }
}
