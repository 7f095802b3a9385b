//! Content fingerprinting for embedded payloads.
//!
//! A fingerprint identifies one library's embedded content. It is recorded
//! in the metadata envelope and used during catalog construction to skip
//! re-folding a library that has already been seen.

use sha2::{Digest, Sha256};

/// Compute the SHA256 hash of a byte slice as lowercase hex.
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// A hasher for building fingerprints from multiple components.
///
/// Components are length-separated so that `("ab", "c")` and `("a", "bc")`
/// produce different fingerprints.
#[derive(Default)]
pub struct Fingerprint {
    hasher: Sha256,
}

impl Fingerprint {
    /// Create a new fingerprint builder.
    pub fn new() -> Self {
        Fingerprint {
            hasher: Sha256::new(),
        }
    }

    /// Add a string component to the fingerprint.
    pub fn update_str(&mut self, s: &str) -> &mut Self {
        self.hasher.update((s.len() as u64).to_le_bytes());
        self.hasher.update(s.as_bytes());
        self
    }

    /// Add a boolean component.
    pub fn update_bool(&mut self, b: bool) -> &mut Self {
        self.hasher.update([b as u8]);
        self
    }

    /// Finalize and return the fingerprint as a hex string.
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }

    /// Finalize and return a short fingerprint (first 16 chars).
    pub fn finish_short(self) -> String {
        self.finish()[..16].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_bytes() {
        let hash = sha256_bytes(b"hello");
        assert_eq!(
            hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let fp1 = {
            let mut fp = Fingerprint::new();
            fp.update_str("MyLib").update_str("body").update_bool(false);
            fp.finish()
        };

        let fp2 = {
            let mut fp = Fingerprint::new();
            fp.update_str("MyLib").update_str("body").update_bool(false);
            fp.finish()
        };

        assert_eq!(fp1, fp2);
    }

    #[test]
    fn test_fingerprint_component_boundaries() {
        let joined = {
            let mut fp = Fingerprint::new();
            fp.update_str("ab").update_str("c");
            fp.finish()
        };

        let split = {
            let mut fp = Fingerprint::new();
            fp.update_str("a").update_str("bc");
            fp.finish()
        };

        assert_ne!(joined, split);
    }

    #[test]
    fn test_finish_short_is_prefix() {
        let long = {
            let mut fp = Fingerprint::new();
            fp.update_str("MyLib");
            fp.finish()
        };

        let short = {
            let mut fp = Fingerprint::new();
            fp.update_str("MyLib");
            fp.finish_short()
        };

        assert_eq!(&long[..16], short);
    }
}
