use core::any;
use core::fmt::Debug;
use core::fmt::Formatter;
use core::fmt::Result as FmtResult;
use core::marker::PhantomData;
use core::num::NonZeroUsize;

// -----------------------------------------------------------------------------
// Strategy
// -----------------------------------------------------------------------------

/// The key, hash, equality and free functions bound to an [`HTab`].
///
/// A strategy is a type-level binding: the table never holds an instance of
/// `S`, it only calls the associated functions. Every table built with the
/// same strategy type therefore behaves identically.
///
/// The key of an element lives inside the element itself and is reached
/// through [`key`](Self::key). `hash` only accepts an element under the key
/// it carries, so the key a linked element is compared against never
/// changes while it is hashed.
///
/// # Example
///
/// ```
/// use htab::{hash, Strategy};
///
/// struct Route {
///   prefix: String,
///   port: u16,
/// }
///
/// struct Routes;
///
/// impl Strategy for Routes {
///   type Value = Route;
///   type Key = str;
///
///   fn key(value: &Route) -> &str {
///     &value.prefix
///   }
///
///   fn hash(key: &str) -> u32 {
///     hash::string(key)
///   }
/// }
/// ```
///
/// # Contract
///
/// - `hash` must be deterministic: equal keys produce equal hashes.
/// - `equal(value, key)` must agree with `hash`: if it returns `true` then
///   `hash(key) == hash(Self::key(value))`.
/// - `key`, `hash` and `equal` may not call back into the table that invoked
///   them. They run while a bucket lock is held.
/// - `free` runs with no bucket lock held and may use the table freely.
///
/// [`HTab`]: crate::public::HTab
pub trait Strategy {
  /// The owner object embedded in each element.
  type Value;

  /// The lookup key, stored inside [`Value`](Self::Value).
  type Key: ?Sized + PartialEq;

  /// Returns the key stored in `value`.
  fn key(value: &Self::Value) -> &Self::Key;

  /// Maps a key to an unsigned hash; the bucket is `hash & (capacity - 1)`.
  fn hash(key: &Self::Key) -> u32;

  /// Returns `true` if `value` is stored under `key`.
  ///
  /// The default implementation compares the stored key with `key`, which
  /// for `str` and `[u8]` keys is a byte comparison.
  #[inline]
  fn equal(value: &Self::Value, key: &Self::Key) -> bool {
    Self::key(value) == key
  }

  /// Invoked exactly once, with no lock held, when the last reference to an
  /// element hashed by a table using this strategy is released.
  ///
  /// The default implementation drops the value.
  #[inline]
  fn free(value: Self::Value) {
    drop(value);
  }
}

/// A helper type for displaying the [`Strategy`] bound to a table.
#[derive(Clone, Copy)]
pub(crate) struct DebugStrategy<S>
where
  S: ?Sized,
{
  marker: PhantomData<fn(S)>,
}

impl<S> DebugStrategy<S>
where
  S: ?Sized,
{
  #[inline]
  pub(crate) const fn new() -> Self {
    Self {
      marker: PhantomData,
    }
  }
}

impl<S> Debug for DebugStrategy<S>
where
  S: Strategy + ?Sized,
{
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct(any::type_name::<S>())
      .field("value", &any::type_name::<S::Value>())
      .field("key", &any::type_name::<S::Key>())
      .finish()
  }
}

// -----------------------------------------------------------------------------
// Capacity
// -----------------------------------------------------------------------------

/// A validated bucket count.
///
/// Represents a power-of-two value in the range <code>[MIN]..=[MAX]</code>.
/// The table is never resized, so the capacity chosen at construction bounds
/// the expected chain length for its whole lifetime.
///
/// ```
/// use htab::Capacity;
///
/// // Exact power of two
/// assert_eq!(Capacity::new(256).as_usize(), 256);
///
/// // Rounded up
/// assert_eq!(Capacity::new(100).as_usize(), 128);
///
/// // Clamped to minimum
/// assert_eq!(Capacity::new(1), Capacity::MIN);
///
/// // Clamped to maximum
/// assert_eq!(Capacity::new(usize::MAX), Capacity::MAX);
/// ```
///
/// [MIN]: Self::MIN
/// [MAX]: Self::MAX
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Capacity(NonZeroUsize);

impl Capacity {
  /// The minimum supported capacity (2⁵ buckets).
  pub const MIN: Self = Self::from_log2(5);

  /// The maximum supported capacity (2²⁴ buckets).
  pub const MAX: Self = Self::from_log2(24);

  /// The default capacity (2¹⁰ buckets).
  pub const DEF: Self = Self::from_log2(10);

  /// Creates a new [`Capacity`] from an arbitrary value.
  ///
  /// Rounds up to the nearest power of two and clamps to
  /// <code>[MIN]..=[MAX]</code>.
  ///
  /// [MIN]: Self::MIN
  /// [MAX]: Self::MAX
  #[inline]
  pub const fn new(value: usize) -> Self {
    let Some(capacity) = value.checked_next_power_of_two() else {
      return Self::MAX;
    };

    if capacity < Self::MIN.as_usize() {
      Self::MIN
    } else if capacity > Self::MAX.as_usize() {
      Self::MAX
    } else {
      match NonZeroUsize::new(capacity) {
        Some(capacity) => Self(capacity),
        None => Self::MIN,
      }
    }
  }

  const fn from_log2(bits: u32) -> Self {
    match NonZeroUsize::new(1 << bits) {
      Some(value) => Self(value),
      None => panic!("invalid capacity: `1 << bits` must be non-zero"),
    }
  }

  /// Returns the capacity as a [`usize`].
  #[inline]
  pub const fn as_usize(self) -> usize {
    self.0.get()
  }

  /// Returns the capacity as a [`NonZeroUsize`].
  #[inline]
  pub const fn as_nonzero(self) -> NonZeroUsize {
    self.0
  }

  /// Returns the base-2 logarithm of the capacity.
  ///
  /// ```
  /// use htab::Capacity;
  ///
  /// assert_eq!(Capacity::new(1024).log2(), 10);
  /// ```
  #[inline]
  pub const fn log2(self) -> u32 {
    self.0.trailing_zeros()
  }

  /// Returns the bucket mask, `capacity - 1`.
  ///
  /// ```
  /// use htab::Capacity;
  ///
  /// assert_eq!(Capacity::MIN.mask(), 0b1_1111);
  /// ```
  #[inline]
  pub const fn mask(self) -> usize {
    self.0.get() - 1
  }
}

impl Debug for Capacity {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    write!(f, "{:?} (1 << {:?})", self.as_nonzero(), self.log2())
  }
}

impl Default for Capacity {
  #[inline]
  fn default() -> Self {
    Self::DEF
  }
}

impl From<Capacity> for NonZeroUsize {
  #[inline]
  fn from(other: Capacity) -> Self {
    other.as_nonzero()
  }
}

impl From<Capacity> for usize {
  #[inline]
  fn from(other: Capacity) -> Self {
    other.as_usize()
  }
}
