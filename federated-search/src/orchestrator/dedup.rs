//! Collapsing of hits that are different versions of one reference.
//!
//! Providers index every version of a text separately, so one logical
//! reference can appear several times in a page. The preferred version
//! (lowest `version_priority`) represents the group and the others are
//! attached to it as `duplicates`.

use std::collections::{HashMap, HashSet};

use crate::types::Hit;

/// Collapse a page of hits by reference.
///
/// Repeated identifiers are dropped outright. Each group takes the position
/// of its first member, so the page order is otherwise unchanged.
pub fn collapse_versions(hits: Vec<Hit>) -> Vec<Hit> {
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut group_index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<Hit>> = Vec::new();

    for hit in hits {
        if !seen_ids.insert(hit.id.clone()) {
            continue;
        }
        match group_index.get(&hit.source.reference) {
            Some(&index) => groups[index].push(hit),
            None => {
                group_index.insert(hit.source.reference.clone(), groups.len());
                groups.push(vec![hit]);
            }
        }
    }

    groups
        .into_iter()
        .filter_map(|mut group| {
            group.sort_by_key(|h| h.source.version_priority.unwrap_or(i64::MAX));
            let mut rest = group.split_off(1);
            let mut head = group.pop()?;
            head.duplicates.append(&mut rest);
            Some(head)
        })
        .collect()
}
