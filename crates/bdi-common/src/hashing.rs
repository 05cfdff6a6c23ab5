//! Deterministic content hashing for records
//!
//! Entities without a natural unique key are "hashed" entities: their unique
//! key is derived from the record's property content. The hash must be stable
//! across runs, so callers are expected to pass properties in a deterministic
//! order (sorted by property name).

use sha2::{Digest, Sha256};

/// Compute a hex-encoded SHA-256 hash over (property, value) pairs.
///
/// Property names and values are fed into the hasher with separators so that
/// `("ab", "c")` and `("a", "bc")` hash differently.
pub fn hash_properties<'a, I>(properties: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut hasher = Sha256::new();

    for (name, value) in properties {
        hasher.update(name.as_bytes());
        hasher.update([0x1f]);
        hasher.update(value.as_bytes());
        hasher.update([0x1e]);
    }

    hex::encode(hasher.finalize())
}
