//! Embedded library envelope - WHO produced a unit list, and with what.
//!
//! An `EmbeddedLibrary` wraps one library's source units together with the
//! identity of the tool and language level that produced them. Version skew
//! between producer and consumer is a warning, never a failure: an artifact
//! embedded by a newer tool still expands as well as this tool knows how.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::core::source_unit::{cmp_unit_ids, SourceUnit};
use crate::util::diagnostic::{version_skew, Diagnostic};
use crate::util::hash::Fingerprint;

/// The version of this tool, as stamped into produced envelopes.
pub fn tool_version() -> Version {
    Version::parse(env!("CARGO_PKG_VERSION")).expect("crate version is valid semver")
}

/// A host-language feature level such as `11.0`.
///
/// Feature levels have no patch component and no prerelease tags, so they
/// are a plain major.minor pair rather than a semver version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageVersion {
    major: u32,
    minor: u32,
}

impl LanguageVersion {
    /// Create a feature level from its components.
    pub fn new(major: u32, minor: u32) -> Self {
        LanguageVersion { major, minor }
    }

    /// The major component.
    pub fn major(&self) -> u32 {
        self.major
    }

    /// The minor component.
    pub fn minor(&self) -> u32 {
        self.minor
    }
}

impl FromStr for LanguageVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = match s.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (s, "0"),
        };

        let major = major
            .parse()
            .map_err(|_| format!("invalid language version: `{}`", s))?;
        let minor = minor
            .parse()
            .map_err(|_| format!("invalid language version: `{}`", s))?;

        Ok(LanguageVersion { major, minor })
    }
}

impl TryFrom<String> for LanguageVersion {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<LanguageVersion> for String {
    fn from(v: LanguageVersion) -> String {
        v.to_string()
    }
}

impl fmt::Display for LanguageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl PartialOrd for LanguageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LanguageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then_with(|| self.minor.cmp(&other.minor))
    }
}

/// Metadata envelope around one library's embedded source units.
#[derive(Debug, Clone)]
pub struct EmbeddedLibrary {
    library_name: String,
    tool_version: Version,
    language_version: LanguageVersion,
    requires_unsafe: bool,
    units: Vec<SourceUnit>,
}

impl EmbeddedLibrary {
    /// Assemble an envelope produced by this tool.
    ///
    /// Units are sorted by id (case-insensitive ordinal) so every
    /// serialized form of the library is byte-stable; the unsafe flag is
    /// the disjunction over all units.
    pub fn new(
        library_name: impl Into<String>,
        language_version: LanguageVersion,
        mut units: Vec<SourceUnit>,
    ) -> Self {
        units.sort_by(|a, b| cmp_unit_ids(&a.id(), &b.id()));
        let requires_unsafe = units.iter().any(|u| u.is_unsafe());

        EmbeddedLibrary {
            library_name: library_name.into(),
            tool_version: tool_version(),
            language_version,
            requires_unsafe,
            units,
        }
    }

    /// Reconstruct an envelope read back from stored metadata.
    pub fn from_stored(
        library_name: impl Into<String>,
        tool_version: Version,
        language_version: LanguageVersion,
        requires_unsafe: bool,
        mut units: Vec<SourceUnit>,
    ) -> Self {
        units.sort_by(|a, b| cmp_unit_ids(&a.id(), &b.id()));

        EmbeddedLibrary {
            library_name: library_name.into(),
            tool_version,
            language_version,
            requires_unsafe,
            units,
        }
    }

    /// The library's name, used as the unit id prefix.
    pub fn library_name(&self) -> &str {
        &self.library_name
    }

    /// Version of the tool that produced the envelope.
    pub fn tool_version(&self) -> &Version {
        &self.tool_version
    }

    /// Language feature level the embedded sources require.
    pub fn language_version(&self) -> LanguageVersion {
        self.language_version
    }

    /// Whether any embedded unit requires an unchecked-memory capability.
    pub fn requires_unsafe(&self) -> bool {
        self.requires_unsafe
    }

    /// The embedded units, sorted by id.
    pub fn units(&self) -> &[SourceUnit] {
        &self.units
    }

    /// Consume the envelope, keeping the unit list.
    pub fn into_units(self) -> Vec<SourceUnit> {
        self.units
    }

    /// Check this library against the running tool's version. Returns the
    /// advisory to report when the library was produced by a newer tool.
    pub fn compatibility_warning(&self) -> Option<Diagnostic> {
        let current = tool_version();
        if self.tool_version > current {
            Some(version_skew(&self.library_name, &self.tool_version, &current))
        } else {
            None
        }
    }

    /// Stable fingerprint of the library's embedded content.
    ///
    /// Two references to the same build of a library fingerprint
    /// identically, which lets catalog construction fold it once.
    pub fn content_fingerprint(&self) -> String {
        let mut fp = Fingerprint::new();
        fp.update_str(&self.library_name);
        for unit in &self.units {
            fp.update_str(&unit.id());
            fp.update_str(unit.body());
            fp.update_bool(unit.is_unsafe());
        }
        fp.finish_short()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn unit(id: &str, declares: &str) -> SourceUnit {
        SourceUnit::new(
            id,
            [declares.to_string()].into_iter().collect::<BTreeSet<_>>(),
            BTreeSet::new(),
            format!("class {} {{}}", declares),
        )
    }

    #[test]
    fn test_language_version_parse() {
        let v: LanguageVersion = "11.0".parse().unwrap();
        assert_eq!(v, LanguageVersion::new(11, 0));

        let bare: LanguageVersion = "8".parse().unwrap();
        assert_eq!(bare, LanguageVersion::new(8, 0));

        assert!("eleven".parse::<LanguageVersion>().is_err());
    }

    #[test]
    fn test_language_version_ordering() {
        assert!(LanguageVersion::new(7, 3) < LanguageVersion::new(8, 0));
        assert!(LanguageVersion::new(8, 0) < LanguageVersion::new(8, 1));
    }

    #[test]
    fn test_units_sorted_on_construction() {
        let lib = EmbeddedLibrary::new(
            "MyLib",
            LanguageVersion::new(8, 0),
            vec![unit("MyLib>b.cs", "MyLib.B"), unit("MyLib>A.cs", "MyLib.A")],
        );

        let ids: Vec<_> = lib.units().iter().map(|u| u.id().as_str()).collect();
        assert_eq!(ids, vec!["MyLib>A.cs", "MyLib>b.cs"]);
    }

    #[test]
    fn test_unsafe_propagates_from_units() {
        let lib = EmbeddedLibrary::new(
            "MyLib",
            LanguageVersion::new(8, 0),
            vec![
                unit("MyLib>A.cs", "MyLib.A"),
                unit("MyLib>B.cs", "MyLib.B").with_unsafe(true),
            ],
        );

        assert!(lib.requires_unsafe());
    }

    #[test]
    fn test_newer_tool_raises_warning() {
        let newer = Version::new(99, 0, 0);
        let lib = EmbeddedLibrary::from_stored(
            "MyLib",
            newer,
            LanguageVersion::new(8, 0),
            false,
            vec![],
        );

        let warning = lib.compatibility_warning().unwrap();
        assert!(warning.format().contains("99.0.0"));
    }

    #[test]
    fn test_same_tool_raises_no_warning() {
        let lib = EmbeddedLibrary::new("MyLib", LanguageVersion::new(8, 0), vec![]);
        assert!(lib.compatibility_warning().is_none());
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = EmbeddedLibrary::new(
            "MyLib",
            LanguageVersion::new(8, 0),
            vec![unit("MyLib>A.cs", "MyLib.A")],
        );
        let b = EmbeddedLibrary::new(
            "MyLib",
            LanguageVersion::new(8, 0),
            vec![unit("MyLib>A.cs", "MyLib.A")],
        );
        let c = EmbeddedLibrary::new(
            "MyLib",
            LanguageVersion::new(8, 0),
            vec![unit("MyLib>B.cs", "MyLib.B")],
        );

        assert_eq!(a.content_fingerprint(), b.content_fingerprint());
        assert_ne!(a.content_fingerprint(), c.content_fingerprint());
    }
}
