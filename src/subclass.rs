//! Stable 64-bit subclass identities
//!
//! Issue identities are stored by downstream consumers and compared across
//! runs, so the hash must not depend on process, platform or library version.

use crate::capture::Captures;
use crate::template::MessageTemplate;
use sha2::{Digest, Sha256};

/// Hash an ordered sequence of strings to a signed 64-bit identity.
///
/// Each part is fed to SHA-256 as its byte length (u64, little-endian)
/// followed by its bytes. The first 8 bytes of the digest, big-endian, are the result.
pub fn stable_hash64<S: AsRef<str>>(parts: &[S]) -> i64 {
    let mut hasher = Sha256::new();
    for part in parts {
        let bytes = part.as_ref().as_bytes();
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    }
    let digest = hasher.finalize();

    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(head)
}

/// Subclass of a rule: a constant, or a hash of rendered captures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subclass {
    Fixed(i64),
    Hashed(MessageTemplate),
}

impl Default for Subclass {
    fn default() -> Self {
        Subclass::Fixed(0)
    }
}

impl Subclass {
    pub fn resolve(&self, captures: &Captures<'_>) -> i64 {
        match self {
            Subclass::Fixed(value) => *value,
            Subclass::Hashed(template) => stable_hash64(&[template.render(captures)]),
        }
    }

    /// Slots the subclass depends on
    pub fn slots(&self) -> Vec<usize> {
        match self {
            Subclass::Fixed(_) => Vec::new(),
            Subclass::Hashed(template) => template.slots().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(stable_hash64(&["a", "b"]), stable_hash64(&["a", "b"]));
    }

    #[test]
    fn test_hash_distinguishes_part_boundaries() {
        assert_ne!(stable_hash64(&["ab", "c"]), stable_hash64(&["a", "bc"]));
        assert_ne!(stable_hash64(&["", "abc"]), stable_hash64(&["abc"]));
    }

    #[test]
    fn test_hash_known_value() {
        // Pinned so that an accidental algorithm change fails loudly.
        assert_eq!(stable_hash64(&[""]), -5812615543772869766);
        assert_eq!(stable_hash64(&["bakery"]), 7334577456967022108);
        assert_eq!(stable_hash64(&["ab", "c"]), 4894961262789525962);
        assert_eq!(stable_hash64(&["a", "bc"]), -7310806050154299202);
        // SHA-256 of no input starts with e3b0c44298fc1c14
        assert_eq!(
            stable_hash64::<&str>(&[]),
            i64::from_be_bytes([0xe3, 0xb0, 0xc4, 0x42, 0x98, 0xfc, 0x1c, 0x14])
        );
    }

    #[test]
    fn test_subclass_resolve() {
        let mut captures = Captures::with_slots(1);
        captures.set(0, "name", "Elm");

        assert_eq!(Subclass::Fixed(1000).resolve(&captures), 1000);

        let hashed = Subclass::Hashed(MessageTemplate::parse("{0.value}").unwrap());
        assert_eq!(hashed.resolve(&captures), stable_hash64(&["Elm"]));
        assert_eq!(hashed.slots(), vec![0]);
    }
}
