//! Deterministic user hashing for rollout buckets.
//!
//! MurmurHash3 (x86, 32-bit) with a fixed seed of 0 over the UTF-8 bytes of
//! the input. The values are exposed for debugging bucket assignment, so they
//! must match any other MurmurHash3 implementation byte for byte.

use murmur3::murmur3_32;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Seed used for every hash.
pub const SEED: u32 = 0;

/// Number of rollout buckets.
pub const BUCKETS: u32 = 100;

/// Hash a string to a stable 32-bit value.
pub fn hash(input: &str) -> u32 {
    // Reading from an in-memory cursor cannot fail.
    murmur3_32(&mut Cursor::new(input.as_bytes()), SEED).unwrap_or(0)
}

/// Rollout bucket in `[0, 99]` for the given input.
pub fn bucket(input: &str) -> u32 {
    hash(input) % BUCKETS
}

/// Hash and bucket for a user, for troubleshooting rollouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketInfo {
    /// The user identifier that was hashed
    pub user: String,
    /// Raw MurmurHash3 value
    pub hash: u32,
    /// Derived bucket in `[0, 99]`
    pub bucket: u32,
}

/// Compute the hash and bucket a user lands in.
pub fn bucket_info(user: &str) -> BucketInfo {
    let hash = hash(user);
    BucketInfo {
        user: user.to_string(),
        hash,
        bucket: hash % BUCKETS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_reference_vectors() {
        assert_eq!(hash(""), 0);
        assert_eq!(hash("hello"), 0x248b_fa47);
        assert_eq!(hash("The quick brown fox jumps over the lazy dog"), 0x2e4f_f723);
    }

    #[test]
    fn test_discrimination() {
        let hashes: HashSet<u32> = (0..1000).map(|i| hash(&format!("user-{}", i))).collect();
        assert_eq!(hashes.len(), 1000);
    }

    #[test]
    fn test_bucket_info() {
        let info = bucket_info("hello");
        assert_eq!(info.hash, 0x248b_fa47);
        assert_eq!(info.bucket, 0x248b_fa47 % 100);
        assert_eq!(info.bucket, bucket("hello"));
    }

    #[test]
    fn test_buckets_spread() {
        let buckets: HashSet<u32> = (0..500).map(|i| bucket(&format!("u{}", i))).collect();
        assert!(buckets.len() > 80);
    }

    proptest! {
        #[test]
        fn prop_hash_is_deterministic(s in ".*") {
            prop_assert_eq!(hash(&s), hash(&s));
        }

        #[test]
        fn prop_bucket_in_range(s in ".*") {
            prop_assert!(bucket(&s) < 100);
        }
    }
}
