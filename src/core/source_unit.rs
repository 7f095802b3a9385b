//! Source unit identity and facts - WHAT one logical file contributes.
//!
//! A `SourceUnit` is one file's worth of program text plus its extracted
//! type facts, frozen at embed time. Units are immutable once built; a
//! catalog is reconstructed from scratch on every resolution session.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use crate::util::InternedString;

/// Per-file facts supplied by the upstream parsing/semantic step.
///
/// This is exactly the shape of a [`SourceUnit`] minus `dependencies`,
/// which stowage computes. The body arrives with its own import
/// directives already removed.
#[derive(Debug, Clone)]
pub struct ParsedSourceFile {
    /// Path of the file, `/`-separated, as the upstream step saw it.
    pub path: String,
    /// Fully-qualified type identifiers this file defines.
    pub declared_types: BTreeSet<String>,
    /// Fully-qualified type identifiers the body references.
    pub used_types: BTreeSet<String>,
    /// Import directives required by the body.
    pub usings: BTreeSet<String>,
    /// Program text with import directives stripped.
    pub body: String,
    /// Whether the body requires an unchecked-memory capability.
    pub unsafe_flag: bool,
}

/// One logical source file after embedding analysis.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    id: InternedString,
    declared_types: BTreeSet<String>,
    used_types: BTreeSet<String>,
    imports: BTreeSet<String>,
    dependencies: BTreeSet<InternedString>,
    body: String,
    unsafe_flag: bool,
}

impl SourceUnit {
    /// Create a unit with no dependency information yet.
    pub fn new(
        id: impl Into<InternedString>,
        declared_types: BTreeSet<String>,
        imports: BTreeSet<String>,
        body: impl Into<String>,
    ) -> Self {
        SourceUnit {
            id: id.into(),
            declared_types,
            used_types: BTreeSet::new(),
            imports,
            dependencies: BTreeSet::new(),
            body: body.into(),
            unsafe_flag: false,
        }
    }

    /// Attach the used-type set (resolution input, not persisted).
    pub fn with_used_types(mut self, used_types: BTreeSet<String>) -> Self {
        self.used_types = used_types;
        self
    }

    /// Attach the computed dependency set. A unit never depends on itself.
    pub fn with_dependencies(mut self, mut dependencies: BTreeSet<InternedString>) -> Self {
        dependencies.remove(&self.id);
        self.dependencies = dependencies;
        self
    }

    /// Mark whether the body requires an unchecked-memory capability.
    pub fn with_unsafe(mut self, unsafe_flag: bool) -> Self {
        self.unsafe_flag = unsafe_flag;
        self
    }

    /// The unit's stable, globally unique identifier.
    pub fn id(&self) -> InternedString {
        self.id
    }

    /// Type identifiers this unit defines.
    pub fn declared_types(&self) -> &BTreeSet<String> {
        &self.declared_types
    }

    /// Type identifiers the body references. Empty for units loaded from
    /// storage; the set is not persisted.
    pub fn used_types(&self) -> &BTreeSet<String> {
        &self.used_types
    }

    /// Import directives required by the body, deduplicated and sorted.
    pub fn imports(&self) -> &BTreeSet<String> {
        &self.imports
    }

    /// Ids of other units this unit requires.
    pub fn dependencies(&self) -> &BTreeSet<InternedString> {
        &self.dependencies
    }

    /// Normalized program text, imports stripped.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Whether the body requires an unchecked-memory capability.
    pub fn is_unsafe(&self) -> bool {
        self.unsafe_flag
    }

    /// Only units that declare at least one type can be asked for.
    pub fn is_resolvable(&self) -> bool {
        !self.declared_types.is_empty()
    }
}

impl fmt::Display for SourceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Fixed total order for serialized unit lists: case-insensitive ordinal
/// on the id, with the exact byte order as a tiebreaker so the comparison
/// stays total. Repeated runs over the same inputs stay byte-identical.
pub fn cmp_unit_ids(a: &str, b: &str) -> Ordering {
    let folded = a
        .bytes()
        .map(|byte| byte.to_ascii_lowercase())
        .cmp(b.bytes().map(|byte| byte.to_ascii_lowercase()));
    folded.then_with(|| a.cmp(b))
}

/// A unit known only from a previously stored embedding: its id and the
/// types it declares, nothing else.
#[derive(Debug, Clone)]
pub struct ExternalUnit {
    id: InternedString,
    declared_types: BTreeSet<String>,
}

impl ExternalUnit {
    /// Create an external unit record.
    pub fn new(id: impl Into<InternedString>, declared_types: BTreeSet<String>) -> Self {
        ExternalUnit {
            id: id.into(),
            declared_types,
        }
    }
}

static NO_TYPES: BTreeSet<String> = BTreeSet::new();

/// A unit as seen by the embed-time dependency analysis: either freshly
/// parsed (full facts) or loaded from a prior embedding (id and declared
/// types only). A tagged variant, deliberately not a trait hierarchy.
#[derive(Debug, Clone)]
pub enum UnitFacts {
    /// A unit parsed in this session, with full usage facts.
    Full(SourceUnit),
    /// A unit another library already embedded.
    External(ExternalUnit),
}

impl UnitFacts {
    /// The unit's identifier.
    pub fn id(&self) -> InternedString {
        match self {
            UnitFacts::Full(unit) => unit.id(),
            UnitFacts::External(unit) => unit.id,
        }
    }

    /// Type identifiers the unit defines.
    pub fn declared_types(&self) -> &BTreeSet<String> {
        match self {
            UnitFacts::Full(unit) => unit.declared_types(),
            UnitFacts::External(unit) => &unit.declared_types,
        }
    }

    /// Type identifiers the unit's body references. External units carry
    /// no usage facts; their edges were resolved when they were embedded.
    pub fn used_types(&self) -> &BTreeSet<String> {
        match self {
            UnitFacts::Full(unit) => unit.used_types(),
            UnitFacts::External(_) => &NO_TYPES,
        }
    }

    /// Whether this unit was parsed in the current session.
    pub fn is_full(&self) -> bool {
        matches!(self, UnitFacts::Full(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_unit_never_depends_on_itself() {
        let deps: BTreeSet<InternedString> = ["Lib>A.cs", "Lib>B.cs"]
            .iter()
            .map(|s| InternedString::new(s))
            .collect();

        let unit = SourceUnit::new("Lib>A.cs", types(&["Lib.A"]), BTreeSet::new(), "class A {}")
            .with_dependencies(deps);

        assert!(!unit.dependencies().contains("Lib>A.cs"));
        assert!(unit.dependencies().contains("Lib>B.cs"));
    }

    #[test]
    fn test_resolvable_requires_declared_types() {
        let with_types =
            SourceUnit::new("Lib>A.cs", types(&["Lib.A"]), BTreeSet::new(), "class A {}");
        let without_types =
            SourceUnit::new("Lib>G.cs", BTreeSet::new(), BTreeSet::new(), "// globals");

        assert!(with_types.is_resolvable());
        assert!(!without_types.is_resolvable());
    }

    #[test]
    fn test_cmp_unit_ids_ignores_case() {
        assert_eq!(cmp_unit_ids("lib>a.cs", "LIB>A.CS"), Ordering::Greater);
        assert_eq!(cmp_unit_ids("Lib>a.cs", "Lib>B.cs"), Ordering::Less);
        assert_eq!(cmp_unit_ids("Lib>B.cs", "Lib>a.cs"), Ordering::Greater);
    }

    #[test]
    fn test_cmp_unit_ids_total_on_case_variants() {
        // Case variants compare equal under folding; the ordinal tiebreak
        // keeps the order total and deterministic.
        let mut ids = vec!["Lib>B.cs", "lib>a.cs", "Lib>a.cs", "LIB>b.cs"];
        ids.sort_by(|a, b| cmp_unit_ids(a, b));
        assert_eq!(ids, vec!["Lib>a.cs", "lib>a.cs", "LIB>b.cs", "Lib>B.cs"]);
    }

    #[test]
    fn test_external_units_have_no_usage_facts() {
        let facts = UnitFacts::External(ExternalUnit::new("Other>X.cs", types(&["Other.X"])));

        assert!(!facts.is_full());
        assert!(facts.used_types().is_empty());
        assert!(facts.declared_types().contains("Other.X"));
    }
}
