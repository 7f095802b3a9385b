//! Dependency closure resolution.
//!
//! Given a set of requested type identifiers, find the minimal set of
//! source units that must accompany them: every declaring unit plus
//! everything reachable through persisted dependency ids. Unknown ids
//! and undeclared types are tolerated silently; a consumer embedding
//! only part of a multi-library graph is a common, valid scenario.

use std::collections::{HashSet, VecDeque};

use rayon::prelude::*;

use crate::core::catalog::Catalog;
use crate::core::source_unit::{cmp_unit_ids, SourceUnit};
use crate::resolver::{CancelToken, Interrupted};
use crate::util::InternedString;

/// Resolve the closure of units required by the requested types.
///
/// The result set is a reachability closure and thus independent of
/// traversal order; the returned list is sorted case-insensitive ordinal
/// by id so repeated runs are byte-identical.
pub fn resolve<'a, S: AsRef<str>>(requested_types: &[S], catalog: &'a Catalog) -> Vec<&'a SourceUnit> {
    let mut seen_types: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<&SourceUnit> = VecDeque::new();

    for type_id in requested_types {
        let type_id = type_id.as_ref();
        if seen_types.insert(type_id.to_string()) {
            queue.extend(catalog.units_declaring(type_id));
        }
    }

    resolve_from(queue, seen_types, catalog)
}

/// Resolve the closure seeded by one unit id (expanding a whole file).
pub fn resolve_unit<'a>(id: &str, catalog: &'a Catalog) -> Vec<&'a SourceUnit> {
    let mut queue = VecDeque::new();
    // A missing id is a soft miss, same as an undeclared type
    queue.extend(catalog.unit_by_id(id));

    resolve_from(queue, HashSet::new(), catalog)
}

fn resolve_from<'a>(
    mut queue: VecDeque<&'a SourceUnit>,
    mut seen_types: HashSet<String>,
    catalog: &'a Catalog,
) -> Vec<&'a SourceUnit> {
    let mut resolved: HashSet<InternedString> = HashSet::new();
    let mut units: Vec<&SourceUnit> = Vec::new();

    while let Some(unit) = queue.pop_front() {
        if !resolved.insert(unit.id()) {
            continue;
        }
        units.push(unit);

        for dep in unit.dependencies() {
            if resolved.contains(dep) {
                continue;
            }
            match catalog.unit_by_id(dep) {
                Some(next) => queue.push_back(next),
                // Partial graphs are expected; the id may live in a
                // library this consumer never referenced.
                None => tracing::debug!("dependency `{}` not in catalog, skipping", dep),
            }
        }

        // Freshly-parsed units carry usage facts instead of dependency
        // ids; chase their types the same way the request seeds were.
        for type_id in unit.used_types() {
            if seen_types.insert(type_id.clone()) {
                for declarer in catalog.units_declaring(type_id) {
                    if !resolved.contains(&declarer.id()) {
                        queue.push_back(declarer);
                    }
                }
            }
        }
    }

    units.sort_by(|a, b| cmp_unit_ids(&a.id(), &b.id()));
    units
}

/// Resolve many independent entry points on the rayon pool.
///
/// Each resolution reads the shared catalog and writes only its own
/// result; there is no locking. Cancellation is checked once per entry
/// point.
pub fn resolve_many<'a>(
    entry_points: &[Vec<String>],
    catalog: &'a Catalog,
    cancel: &CancelToken,
) -> Result<Vec<Vec<&'a SourceUnit>>, Interrupted> {
    entry_points
        .par_iter()
        .map(|types| {
            if cancel.is_cancelled() {
                return Err(Interrupted);
            }
            Ok(resolve(types, catalog))
        })
        .collect()
}
