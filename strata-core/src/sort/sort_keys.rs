//! Sort-tag reconciliation over `(name, sort)` tuples.
//!
//! Three passes, each pure over its input:
//! * **merge**: a name carrying several distinct sort keys converges on one,
//!   preferring the most recently changed tuple and then the source priority
//!   album artist > artist > composer;
//! * **copy**: tuples without a sort key inherit the one their name settled on;
//! * **compensate**: names with no sort key anywhere get their transliterated
//!   reading, but only when that reading differs from the name.

use std::collections::{BTreeMap, HashSet};

use strata_model::MediaFileId;

use super::Collator;
use crate::ports::{SortTuple, SortUpdate};

/// Updates produced by [`reconcile`], per pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortReconciliation {
    pub merged: Vec<SortUpdate>,
    pub copied: Vec<SortUpdate>,
    pub compensated: Vec<SortUpdate>,
}

impl SortReconciliation {
    pub fn is_empty(&self) -> bool {
        self.merged.is_empty() && self.copied.is_empty() && self.compensated.is_empty()
    }

    pub fn len(&self) -> usize {
        self.merged.len() + self.copied.len() + self.compensated.len()
    }

    /// All updates in application order.
    pub fn updates(&self) -> impl Iterator<Item = &SortUpdate> {
        self.merged
            .iter()
            .chain(self.copied.iter())
            .chain(self.compensated.iter())
    }

    /// Distinct rows touched by any pass.
    pub fn affected_ids(&self) -> Vec<MediaFileId> {
        let mut seen = HashSet::new();
        self.updates()
            .map(|update| update.id)
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

fn sort_of(tuple: &SortTuple) -> Option<&str> {
    tuple
        .sort
        .as_deref()
        .map(str::trim)
        .filter(|sort| !sort.is_empty())
}

fn group_by_name(tuples: &[SortTuple]) -> BTreeMap<&str, Vec<&SortTuple>> {
    let mut groups: BTreeMap<&str, Vec<&SortTuple>> = BTreeMap::new();
    for tuple in tuples {
        let name = tuple.name.trim();
        if name.is_empty() {
            continue;
        }
        groups.entry(name).or_default().push(tuple);
    }
    groups
}

/// Sort key a group of same-named tuples should settle on.
fn preferred_sort<'a>(group: &[&'a SortTuple]) -> Option<&'a str> {
    group
        .iter()
        .copied()
        .filter_map(|tuple| sort_of(tuple).map(|sort| (tuple, sort)))
        .min_by(|(a, a_sort), (b, b_sort)| {
            b.changed
                .cmp(&a.changed)
                .then_with(|| a.source.cmp(&b.source))
                .then_with(|| a_sort.cmp(b_sort))
        })
        .map(|(_, sort)| sort)
}

fn update(tuple: &SortTuple, sort: &str) -> SortUpdate {
    SortUpdate {
        id: tuple.id,
        source: tuple.source,
        sort: sort.to_string(),
    }
}

/// Converge names carrying several sort keys on one.
pub fn merge(tuples: &[SortTuple]) -> Vec<SortUpdate> {
    let mut updates = Vec::new();
    for group in group_by_name(tuples).values() {
        let distinct: HashSet<&str> = group.iter().filter_map(|t| sort_of(t)).collect();
        if distinct.len() < 2 {
            continue;
        }
        let Some(winner) = preferred_sort(group) else {
            continue;
        };
        updates.extend(
            group
                .iter()
                .filter(|tuple| sort_of(tuple).is_some_and(|sort| sort != winner))
                .map(|tuple| update(tuple, winner)),
        );
    }
    updates
}

/// Give unsorted tuples the key their name settled on.
pub fn copy(tuples: &[SortTuple]) -> Vec<SortUpdate> {
    let mut updates = Vec::new();
    for group in group_by_name(tuples).values() {
        let Some(sort) = preferred_sort(group) else {
            continue;
        };
        updates.extend(
            group
                .iter()
                .filter(|tuple| sort_of(tuple).is_none())
                .map(|tuple| update(tuple, sort)),
        );
    }
    updates
}

/// Transliterated readings for names with no sort key anywhere.
pub fn compensate(tuples: &[SortTuple], collator: &Collator) -> Vec<SortUpdate> {
    let mut updates = Vec::new();
    for (name, group) in group_by_name(tuples) {
        if group.iter().any(|tuple| sort_of(tuple).is_some()) {
            continue;
        }
        if !collator.needs_reading(name) {
            continue;
        }
        let reading = collator.transliterate(name);
        updates.extend(group.iter().map(|tuple| update(tuple, &reading)));
    }
    updates
}

/// Apply `updates` to the in-memory tuples so later passes see them.
pub fn apply(tuples: &mut [SortTuple], updates: &[SortUpdate]) {
    for update in updates {
        for tuple in tuples
            .iter_mut()
            .filter(|t| t.id == update.id && t.source == update.source)
        {
            tuple.sort = Some(update.sort.clone());
        }
    }
}

/// Run merge, copy and compensate in sequence.
pub fn reconcile(mut tuples: Vec<SortTuple>, collator: &Collator) -> SortReconciliation {
    let merged = merge(&tuples);
    apply(&mut tuples, &merged);
    let copied = copy(&tuples);
    apply(&mut tuples, &copied);
    let compensated = compensate(&tuples, collator);
    SortReconciliation {
        merged,
        copied,
        compensated,
    }
}
