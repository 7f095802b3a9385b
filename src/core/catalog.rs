//! Catalog - the immutable per-session unit index.
//!
//! Once built, a Catalog is read-only: resolution threads share it by
//! reference and nothing mutates it until the session is torn down. The
//! mutable form is the `CatalogBuilder`, consumed exactly once by
//! `finish()`; it never escapes construction.

use std::collections::{HashMap, HashSet};

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::core::library::EmbeddedLibrary;
use crate::core::source_unit::SourceUnit;
use crate::util::InternedString;

/// Structural error during catalog construction.
///
/// A duplicate id means the embedding is internally inconsistent and
/// cannot be trusted; the catalog is never returned partially built.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum CatalogError {
    #[error("duplicate source unit id `{id}`")]
    #[diagnostic(
        code(stowage::catalog::duplicate_unit),
        help("two embedded units claim the same id; the producing library must be re-embedded")
    )]
    DuplicateUnit { id: String },
}

/// Builder for a [`Catalog`]. Two-phase: `add_*` then `finish()`.
#[derive(Default)]
pub struct CatalogBuilder {
    units: Vec<SourceUnit>,
    by_id: HashMap<InternedString, usize>,
    seen_libraries: HashSet<(String, String)>,
}

impl CatalogBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        CatalogBuilder {
            units: Vec::new(),
            by_id: HashMap::new(),
            seen_libraries: HashSet::new(),
        }
    }

    /// Fold one library's units into the catalog.
    ///
    /// Libraries are folded in reference order. A library already folded
    /// under the same name and content fingerprint is skipped silently:
    /// diamond-shaped reference graphs hand us the same build twice.
    pub fn add_library(&mut self, library: EmbeddedLibrary) -> Result<(), CatalogError> {
        let key = (
            library.library_name().to_string(),
            library.content_fingerprint(),
        );
        if !self.seen_libraries.insert(key) {
            tracing::debug!(
                "skipping already-folded library `{}`",
                library.library_name()
            );
            return Ok(());
        }

        for unit in library.into_units() {
            self.add_unit(unit)?;
        }

        Ok(())
    }

    /// Add a single unit. Duplicate ids are a hard error.
    pub fn add_unit(&mut self, unit: SourceUnit) -> Result<(), CatalogError> {
        if self.by_id.contains_key(&unit.id()) {
            return Err(CatalogError::DuplicateUnit {
                id: unit.id().to_string(),
            });
        }

        self.by_id.insert(unit.id(), self.units.len());
        self.units.push(unit);
        Ok(())
    }

    /// Freeze the builder into an immutable catalog.
    pub fn finish(self) -> Catalog {
        let mut by_type: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, unit) in self.units.iter().enumerate() {
            for type_id in unit.declared_types() {
                by_type.entry(type_id.clone()).or_default().push(index);
            }
        }

        Catalog {
            units: self.units,
            by_id: self.by_id,
            by_type,
        }
    }
}

/// The per-session unit index: all known units, addressable by id and by
/// declared type. Derived, in-memory only, never persisted.
#[derive(Debug)]
pub struct Catalog {
    units: Vec<SourceUnit>,
    by_id: HashMap<InternedString, usize>,
    by_type: HashMap<String, Vec<usize>>,
}

impl Catalog {
    /// Build a catalog from libraries in reference order.
    pub fn build(libraries: Vec<EmbeddedLibrary>) -> Result<Self, CatalogError> {
        let mut builder = CatalogBuilder::new();
        for library in libraries {
            builder.add_library(library)?;
        }
        Ok(builder.finish())
    }

    /// All units that declare the given type. More than one library may
    /// declare the same type; every declarer is a candidate.
    pub fn units_declaring<'a>(&'a self, type_id: &str) -> impl Iterator<Item = &'a SourceUnit> + 'a {
        self.by_type
            .get(type_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |&index| &self.units[index])
    }

    /// Look up a unit by id.
    pub fn unit_by_id(&self, id: &str) -> Option<&SourceUnit> {
        // Ids hash by pointer, so the probe must use the interned handle.
        let interned = InternedString::new(id);
        self.by_id.get(&interned).map(|&index| &self.units[index])
    }

    /// Iterate over all units.
    pub fn units(&self) -> impl Iterator<Item = &SourceUnit> {
        self.units.iter()
    }

    /// Number of units in the catalog.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::library::LanguageVersion;
    use std::collections::BTreeSet;

    fn unit(id: &str, declares: &[&str]) -> SourceUnit {
        SourceUnit::new(
            id,
            declares.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
            BTreeSet::new(),
            "class X {}",
        )
    }

    #[test]
    fn test_lookup_by_type_and_id() {
        let mut builder = CatalogBuilder::new();
        builder.add_unit(unit("Lib>A.cs", &["Lib.A"])).unwrap();
        builder.add_unit(unit("Lib>B.cs", &["Lib.B"])).unwrap();
        let catalog = builder.finish();

        assert_eq!(catalog.len(), 2);
        assert!(catalog.unit_by_id("Lib>A.cs").is_some());
        assert!(catalog.unit_by_id("Lib>Z.cs").is_none());

        let declarers: Vec<_> = catalog
            .units_declaring("Lib.A")
            .map(|u| u.id().as_str())
            .collect();
        assert_eq!(declarers, vec!["Lib>A.cs"]);
        assert_eq!(catalog.units_declaring("Lib.Nope").count(), 0);
    }

    #[test]
    fn test_duplicate_id_is_hard_error() {
        let mut builder = CatalogBuilder::new();
        builder.add_unit(unit("Lib>A.cs", &["Lib.A"])).unwrap();

        let err = builder.add_unit(unit("Lib>A.cs", &["Lib.A2"])).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateUnit { .. }));
    }

    #[test]
    fn test_same_type_declared_by_two_libraries() {
        let lib_a = EmbeddedLibrary::new(
            "LibA",
            LanguageVersion::new(8, 0),
            vec![unit("LibA>Shim.cs", &["Common.Shim"])],
        );
        let lib_b = EmbeddedLibrary::new(
            "LibB",
            LanguageVersion::new(8, 0),
            vec![unit("LibB>Shim.cs", &["Common.Shim"])],
        );

        let catalog = Catalog::build(vec![lib_a, lib_b]).unwrap();

        assert_eq!(catalog.units_declaring("Common.Shim").count(), 2);
    }

    #[test]
    fn test_duplicate_library_folded_once() {
        let make = || {
            EmbeddedLibrary::new(
                "LibA",
                LanguageVersion::new(8, 0),
                vec![unit("LibA>A.cs", &["LibA.A"])],
            )
        };

        // The same build arriving through two reference paths must not
        // trip the duplicate-id error.
        let catalog = Catalog::build(vec![make(), make()]).unwrap();
        assert_eq!(catalog.len(), 1);
    }
}
