//! Expansion pipeline - from stored metadata to minimal source output.
//!
//! A session owns one immutable catalog, the advisories collected while
//! loading it, and a cancellation token. Expanding many entry points is
//! embarrassingly parallel: every resolution reads the shared catalog
//! and writes only its own result.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::{Context, Result};

use crate::container;
use crate::core::catalog::Catalog;
use crate::core::library::EmbeddedLibrary;
use crate::core::source_unit::SourceUnit;
use crate::resolver::{closure, CancelToken, Interrupted, UnitGraph};
use crate::util::diagnostic::{suggestions, Diagnostic};
use crate::util::InternedString;

/// One expansion session over a fixed set of embedded libraries.
#[derive(Debug)]
pub struct ExpandSession {
    catalog: Catalog,
    warnings: Vec<Diagnostic>,
    cancel: CancelToken,
}

impl ExpandSession {
    /// Build a session from already-loaded libraries, in reference order.
    pub fn new(libraries: Vec<EmbeddedLibrary>) -> Result<Self> {
        let mut warnings = Vec::new();
        for library in &libraries {
            warnings.extend(library.compatibility_warning());
        }

        let catalog = Catalog::build(libraries).context("building unit catalog")?;

        Ok(ExpandSession {
            catalog,
            warnings,
            cancel: CancelToken::new(),
        })
    }

    /// Build a session from per-artifact metadata maps.
    ///
    /// An artifact without a payload is skipped silently; one whose
    /// payload fails to decode is skipped with a warning, and the rest
    /// of the session proceeds. Only structural inconsistency across
    /// the surviving libraries (a duplicate unit id) is fatal.
    pub fn from_metadata(tables: &[(String, BTreeMap<String, String>)]) -> Result<Self> {
        let mut libraries = Vec::new();
        let mut warnings = Vec::new();

        for (name, metadata) in tables {
            match container::from_metadata(name, metadata) {
                Ok(Some(loaded)) => {
                    warnings.extend(loaded.warnings);
                    libraries.push(loaded.library);
                }
                Ok(None) => {
                    tracing::debug!("no embedded payload in `{}`", name);
                }
                Err(err) => {
                    tracing::warn!("skipping library `{}`: {}", name, err);
                    warnings.push(
                        Diagnostic::warning(format!("skipping library `{}`: {}", name, err))
                            .for_library(name.as_str())
                            .with_suggestion(suggestions::UNDECODABLE_PAYLOAD),
                    );
                }
            }
        }

        let catalog = Catalog::build(libraries).context("building unit catalog")?;

        Ok(ExpandSession {
            catalog,
            warnings,
            cancel: CancelToken::new(),
        })
    }

    /// The session's catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Advisories collected so far, one per affected library.
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    /// Token callers may use to interrupt parallel expansion.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// The minimal unit set for one set of requested types.
    pub fn expand_types<S: AsRef<str>>(&self, requested: &[S]) -> Vec<&SourceUnit> {
        closure::resolve(requested, &self.catalog)
    }

    /// The minimal unit set for one requested file.
    pub fn expand_unit(&self, id: &str) -> Vec<&SourceUnit> {
        closure::resolve_unit(id, &self.catalog)
    }

    /// Expand many entry points on the rayon pool.
    pub fn expand_many(
        &self,
        entry_points: &[Vec<String>],
    ) -> Result<Vec<Vec<&SourceUnit>>, Interrupted> {
        closure::resolve_many(entry_points, &self.catalog, &self.cancel)
    }
}

/// Concatenate a resolved unit set into self-contained source text:
/// imports deduplicated across all units and sorted, then each body,
/// dependencies first.
pub fn render(units: &[&SourceUnit]) -> String {
    let mut imports: BTreeSet<&str> = BTreeSet::new();
    for unit in units {
        imports.extend(unit.imports().iter().map(String::as_str));
    }

    let by_id: HashMap<InternedString, &SourceUnit> =
        units.iter().map(|&u| (u.id(), u)).collect();
    let graph = UnitGraph::from_units(units);

    let mut out = String::new();
    for import in &imports {
        out.push_str(import);
        out.push('\n');
    }
    if !imports.is_empty() && !units.is_empty() {
        out.push('\n');
    }

    for id in graph.topological_order() {
        let unit = by_id[&id];
        out.push_str(unit.body());
        if !unit.body().ends_with('\n') {
            out.push('\n');
        }
    }

    out
}
