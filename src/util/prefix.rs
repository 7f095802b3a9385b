//! Longest-common-path-prefix computation for unit id assignment.
//!
//! Unit ids embed the file path with the library-wide common directory
//! stripped, so ids stay short and stable when the library relocates.
//! The computation runs once per embed session per path collection; the
//! cache is an explicit object owned by the session, not a global.

use std::collections::HashMap;

use crate::util::hash::Fingerprint;

/// Compute the longest common path prefix of a set of paths.
///
/// The prefix always ends at a `/` boundary (trailing separator included).
/// A single path yields its directory; an empty input yields the empty
/// string. Paths are expected with `/` separators, normalized upstream.
pub fn common_path_prefix<S: AsRef<str>>(paths: &[S]) -> String {
    let mut iter = paths.iter();
    let first = match iter.next() {
        Some(p) => p.as_ref(),
        None => return String::new(),
    };

    let mut common = first.len();
    for path in iter {
        let path = path.as_ref();
        let shared = first
            .bytes()
            .zip(path.bytes())
            .take(common)
            .take_while(|(a, b)| a == b)
            .count();
        common = shared;
    }

    // Cut back to the last separator so the prefix is a whole directory
    match first[..common].rfind('/') {
        Some(pos) => first[..=pos].to_string(),
        None => String::new(),
    }
}

/// A per-session memo for common-prefix computations.
///
/// Keyed by a fingerprint of the path collection; torn down with the
/// session that owns it.
#[derive(Default)]
pub struct PrefixCache {
    entries: HashMap<String, String>,
}

impl PrefixCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        PrefixCache {
            entries: HashMap::new(),
        }
    }

    /// The common prefix of `paths`, computed once per distinct collection.
    pub fn prefix_for<S: AsRef<str>>(&mut self, paths: &[S]) -> String {
        let mut fp = Fingerprint::new();
        for path in paths {
            fp.update_str(path.as_ref());
        }
        let key = fp.finish();

        self.entries
            .entry(key)
            .or_insert_with(|| common_path_prefix(paths))
            .clone()
    }
}
