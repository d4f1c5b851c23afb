//! Structural Hashing
//!
//! Deterministic hashing of sub render state configuration. Hash codes are
//! cache keys for compiled programs, so they must never depend on addresses,
//! allocation order or a randomly seeded hasher. Everything here streams
//! through XXH3 with a fixed seed.

use std::hash::Hasher;

use xxhash_rust::xxh3::{Xxh3, xxh3_64};

/// Streaming XXH3 hasher for configuration state.
///
/// Strings are length-prefixed so that `("ab", "c")` and `("a", "bc")`
/// produce different codes.
pub struct StateHasher {
    inner: Xxh3,
}

impl Default for StateHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl StateHasher {
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Xxh3::new() }
    }

    /// Starts a hasher pre-fed with a sub render state type name.
    #[must_use]
    pub fn for_type(type_name: &str) -> Self {
        let mut hasher = Self::new();
        hasher.write_str(type_name);
        hasher
    }

    pub fn write_str(&mut self, value: &str) -> &mut Self {
        self.write_u64(value.len() as u64);
        self.inner.update(value.as_bytes());
        self
    }

    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.inner.update(&[u8::from(value)]);
        self
    }

    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.inner.update(&value.to_le_bytes());
        self
    }

    pub fn write_i32(&mut self, value: i32) -> &mut Self {
        self.inner.update(&value.to_le_bytes());
        self
    }

    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.inner.update(&value.to_le_bytes());
        self
    }

    /// Hashes the bit pattern; `-0.0` and `0.0` are distinct.
    pub fn write_f32(&mut self, value: f32) -> &mut Self {
        self.inner.update(&value.to_bits().to_le_bytes());
        self
    }

    #[must_use]
    pub fn digest(&self) -> u64 {
        self.inner.digest()
    }
}

impl Hasher for StateHasher {
    fn finish(&self) -> u64 {
        self.digest()
    }

    fn write(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }
}

/// Default hash code of a stateless sub render state.
#[inline]
#[must_use]
pub fn hash_type_name(type_name: &str) -> u64 {
    StateHasher::for_type(type_name).digest()
}

/// Order-sensitive combination of sub render state hash codes.
#[must_use]
pub fn combine_hashes(codes: impl IntoIterator<Item = u64>) -> u64 {
    let mut hasher = StateHasher::new();
    let mut count = 0u64;
    for code in codes {
        hasher.write_u64(code);
        count += 1;
    }
    hasher.write_u64(count);
    hasher.digest()
}

/// One-shot hash of raw bytes, used for program names.
#[inline]
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    xxh3_64(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_hash_is_stable() {
        assert_eq!(hash_type_name("FFP_Lighting"), hash_type_name("FFP_Lighting"));
        assert_ne!(hash_type_name("FFP_Lighting"), hash_type_name("FFP_Fog"));
    }

    #[test]
    fn strings_are_length_prefixed() {
        let mut a = StateHasher::new();
        a.write_str("ab").write_str("c");
        let mut b = StateHasher::new();
        b.write_str("a").write_str("bc");
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn combine_is_order_sensitive() {
        assert_ne!(combine_hashes([1, 2]), combine_hashes([2, 1]));
        assert_eq!(combine_hashes([7, 9]), combine_hashes(vec![7, 9]));
        assert_ne!(combine_hashes([]), combine_hashes([0]));
    }
}
