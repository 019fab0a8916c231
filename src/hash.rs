//! Hash functions for use in [`Strategy::hash`] implementations.
//!
//! The byte and string hashes are [sdbm], which is cheap and spreads short
//! keys well enough for chained buckets. Output is truncated to 32 bits.
//!
//! [`Strategy::hash`]: crate::params::Strategy::hash
//! [sdbm]: http://www.cse.yorku.ca/~oz/hash.html

/// Folds one byte into a running sdbm hash.
#[inline]
pub const fn partial(byte: u8, hash: u32) -> u32 {
  (byte as u32)
    .wrapping_add(hash << 6)
    .wrapping_add(hash << 16)
    .wrapping_sub(hash)
}

/// Hashes a byte slice.
///
/// ```
/// use htab::hash;
///
/// assert_eq!(hash::bytes(b""), 0);
/// assert_eq!(hash::bytes(b"a"), 97);
/// ```
#[inline]
pub const fn bytes(bytes: &[u8]) -> u32 {
  let mut hash: u32 = 0;
  let mut index: usize = 0;

  while index < bytes.len() {
    hash = partial(bytes[index], hash);
    index += 1;
  }

  hash
}

/// Hashes the UTF-8 bytes of a string.
///
/// ```
/// use htab::hash;
///
/// assert_eq!(hash::string("foo"), hash::bytes(b"foo"));
/// ```
#[inline]
pub const fn string(string: &str) -> u32 {
  bytes(string.as_bytes())
}

/// Uses an integer key as its own hash.
#[inline]
pub const fn word(key: u32) -> u32 {
  key
}
