use core::fmt::Debug;
use core::fmt::Formatter;
use core::fmt::Result as FmtResult;

use crate::error::Result;
use crate::node::Ref;
use crate::params::Capacity;
use crate::params::Strategy;
use crate::table::Table;
use crate::visit::Visit;
use crate::visit::VisitMut;

/// A concurrent, fixed-capacity hash index over reference-counted elements.
///
/// `HTab` does not own its elements. It links [`Ref`]-managed elements into
/// per-bucket chains and holds one reference to each of them for as long as
/// they stay hashed. Keys are never copied: the table asks the [`Strategy`]
/// whether an element matches a key.
///
/// See the [crate-level documentation][crate] for an overview.
///
/// # Examples
///
/// ```
/// use htab::{hash, HTab, Ref, Strategy};
///
/// struct Session {
///   id: String,
///   user: u32,
/// }
///
/// struct Sessions;
///
/// impl Strategy for Sessions {
///   type Value = Session;
///   type Key = str;
///
///   fn key(value: &Session) -> &str {
///     &value.id
///   }
///
///   fn hash(key: &str) -> u32 {
///     hash::string(key)
///   }
/// }
///
/// let table: HTab<Sessions> = HTab::new(64).unwrap();
/// let session: Ref<Session> = Ref::new(Session { id: "a1".into(), user: 7 });
///
/// table.hash(&session, "a1").unwrap();
///
/// let found: Ref<Session> = table.lookup("a1").unwrap();
/// assert_eq!(found.user, 7);
/// assert!(Ref::ptr_eq(&found, &session));
/// ```
#[repr(transparent)]
pub struct HTab<S>
where
  S: Strategy,
{
  inner: Table<S>,
}

impl<S> HTab<S>
where
  S: Strategy,
{
  /// Creates a new, empty table with at least `size` buckets.
  ///
  /// `size` is rounded up to a power of two and clamped to
  /// <code>[Capacity::MIN]..=[Capacity::MAX]</code>.
  ///
  /// # Errors
  ///
  /// Returns [`Error::AllocationFailure`] if the bucket array cannot be
  /// allocated.
  ///
  /// # Examples
  ///
  /// ```
  /// # use htab::{hash, HTab, Strategy};
  /// # struct Words;
  /// # impl Strategy for Words {
  /// #   type Value = String;
  /// #   type Key = str;
  /// #   fn hash(key: &str) -> u32 { hash::string(key) }
  /// #   fn key(value: &String) -> &str { value }
  /// # }
  /// let table: HTab<Words> = HTab::new(100).unwrap();
  /// assert_eq!(table.capacity(), 128);
  /// assert!(table.is_empty());
  /// ```
  ///
  /// [Capacity::MIN]: crate::Capacity::MIN
  /// [Capacity::MAX]: crate::Capacity::MAX
  /// [`Error::AllocationFailure`]: crate::Error::AllocationFailure
  #[inline]
  pub fn new(size: usize) -> Result<Self> {
    Self::with_capacity(Capacity::new(size))
  }

  /// Creates a new, empty table with exactly `capacity` buckets.
  ///
  /// # Errors
  ///
  /// Returns [`Error::AllocationFailure`] if the bucket array cannot be
  /// allocated.
  ///
  /// [`Error::AllocationFailure`]: crate::Error::AllocationFailure
  #[inline]
  pub fn with_capacity(capacity: Capacity) -> Result<Self> {
    Ok(Self {
      inner: Table::new(capacity)?,
    })
  }

  /// Returns the number of buckets.
  ///
  /// The capacity never changes; it bounds how well elements spread, not how
  /// many can be hashed.
  #[inline]
  pub fn capacity(&self) -> usize {
    self.inner.cap()
  }

  /// Returns the number of hashed elements.
  ///
  /// This value may change immediately after reading due to concurrent
  /// operations in other threads.
  #[inline]
  pub fn count(&self) -> usize {
    self.inner.len()
  }

  /// Returns `true` if no element is hashed.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.inner.is_empty()
  }

  /// Links `element` into the table under `key`.
  ///
  /// On success the table holds its own reference to the element until it
  /// is unhashed or the table is dropped, and [`Strategy::free`] becomes the
  /// function that destroys it.
  ///
  /// `key` must be the key stored in the element, as decided by
  /// [`Strategy::equal`]. Duplicates are detected against the stored keys of
  /// the elements already linked into the bucket.
  ///
  /// # Errors
  ///
  /// - [`Error::KeyMismatch`] if `key` is not the element's key. Nothing
  ///   changes in that case.
  /// - [`Error::AlreadyHashed`] if the element is linked into this or any
  ///   other table, or another thread is hashing it right now.
  /// - [`Error::DuplicateKey`] if an element with an equal key is already
  ///   hashed. Nothing changes in that case.
  ///
  /// # Examples
  ///
  /// ```
  /// # use htab::{hash, HTab, Strategy};
  /// # struct Words;
  /// # impl Strategy for Words {
  /// #   type Value = String;
  /// #   type Key = str;
  /// #   fn hash(key: &str) -> u32 { hash::string(key) }
  /// #   fn key(value: &String) -> &str { value }
  /// # }
  /// use htab::{Error, Ref};
  ///
  /// let table: HTab<Words> = HTab::new(32).unwrap();
  ///
  /// let first: Ref<String> = Ref::new("apple".to_string());
  /// let again: Ref<String> = Ref::new("apple".to_string());
  ///
  /// assert_eq!(table.hash(&first, "apple"), Ok(()));
  /// assert_eq!(table.hash(&first, "apple"), Err(Error::AlreadyHashed));
  /// assert_eq!(table.hash(&again, "apple"), Err(Error::DuplicateKey));
  /// assert_eq!(table.count(), 1);
  /// ```
  ///
  /// [`Error::AlreadyHashed`]: crate::Error::AlreadyHashed
  /// [`Error::DuplicateKey`]: crate::Error::DuplicateKey
  /// [`Error::KeyMismatch`]: crate::Error::KeyMismatch
  #[inline]
  pub fn hash(&self, element: &Ref<S::Value>, key: &S::Key) -> Result<()> {
    self.inner.hash(element, key)
  }

  /// Unlinks `element` from the table and releases the table's reference.
  ///
  /// If that was the last reference, [`Strategy::free`] runs before this
  /// returns, with no lock held. Otherwise the element is destroyed when the
  /// last outstanding [`Ref`] is released.
  ///
  /// # Errors
  ///
  /// Returns [`Error::NotHashed`] if the element is not linked into this
  /// table.
  ///
  /// # Examples
  ///
  /// ```
  /// # use htab::{hash, HTab, Strategy};
  /// # struct Words;
  /// # impl Strategy for Words {
  /// #   type Value = String;
  /// #   type Key = str;
  /// #   fn hash(key: &str) -> u32 { hash::string(key) }
  /// #   fn key(value: &String) -> &str { value }
  /// # }
  /// use htab::{Error, Ref};
  ///
  /// let table: HTab<Words> = HTab::new(32).unwrap();
  /// let word: Ref<String> = Ref::new("pear".to_string());
  ///
  /// table.hash(&word, "pear").unwrap();
  /// assert_eq!(Ref::count(&word), 2);
  ///
  /// assert_eq!(table.unhash(&word), Ok(()));
  /// assert_eq!(Ref::count(&word), 1);
  /// assert_eq!(table.unhash(&word), Err(Error::NotHashed));
  /// ```
  ///
  /// [`Error::NotHashed`]: crate::Error::NotHashed
  #[inline]
  pub fn unhash(&self, element: &Ref<S::Value>) -> Result<()> {
    self.inner.unhash(element)
  }

  /// Finds the element hashed under `key` and returns a new reference to it.
  ///
  /// The reference is taken while the bucket is still locked, so the element
  /// cannot be destroyed between being found and being returned.
  ///
  /// # Errors
  ///
  /// Returns [`Error::NotFound`] if no element matches.
  ///
  /// # Examples
  ///
  /// ```
  /// # use htab::{hash, HTab, Strategy};
  /// # struct Words;
  /// # impl Strategy for Words {
  /// #   type Value = String;
  /// #   type Key = str;
  /// #   fn hash(key: &str) -> u32 { hash::string(key) }
  /// #   fn key(value: &String) -> &str { value }
  /// # }
  /// use htab::{Error, Ref};
  ///
  /// let table: HTab<Words> = HTab::new(32).unwrap();
  /// table.hash(&Ref::new("fig".to_string()), "fig").unwrap();
  ///
  /// assert_eq!(table.lookup("fig").as_deref().map(String::as_str), Ok("fig"));
  /// assert_eq!(table.lookup("kiwi").err(), Some(Error::NotFound));
  /// ```
  ///
  /// [`Error::NotFound`]: crate::Error::NotFound
  #[inline]
  pub fn lookup(&self, key: &S::Key) -> Result<Ref<S::Value>> {
    self.inner.lookup(key)
  }

  /// Calls `action` once for every hashed element, bucket by bucket.
  ///
  /// Each bucket is locked exclusively while its elements are visited. The
  /// action may remove the visited element with [`VisitMut::unhash`]; any
  /// frees this causes run after the bucket is unlocked.
  ///
  /// Returns the number of elements visited.
  ///
  /// The action must not call back into this table.
  ///
  /// # Examples
  ///
  /// ```
  /// # use htab::{hash, HTab, Strategy};
  /// # struct Words;
  /// # impl Strategy for Words {
  /// #   type Value = String;
  /// #   type Key = str;
  /// #   fn hash(key: &str) -> u32 { hash::string(key) }
  /// #   fn key(value: &String) -> &str { value }
  /// # }
  /// use htab::Ref;
  ///
  /// let table: HTab<Words> = HTab::new(32).unwrap();
  ///
  /// for word in ["ash", "beech", "cedar", "alder"] {
  ///   table.hash(&Ref::new(word.to_string()), word).unwrap();
  /// }
  ///
  /// let visited: usize = table.foreach(|word| {
  ///   if word.starts_with('a') {
  ///     word.unhash();
  ///   }
  /// });
  ///
  /// assert_eq!(visited, 4);
  /// assert_eq!(table.count(), 2);
  /// ```
  #[inline]
  pub fn foreach<F>(&self, action: F) -> usize
  where
    F: FnMut(VisitMut<'_, S::Value>),
  {
    self.inner.foreach(action)
  }

  /// Calls `action` once for every hashed element under shared bucket locks.
  ///
  /// Read-only traversals run in parallel with each other and with lookups,
  /// but exclude insertion and removal on the bucket being visited.
  ///
  /// Returns the number of elements visited.
  ///
  /// # Examples
  ///
  /// ```
  /// # use htab::{hash, HTab, Strategy};
  /// # struct Words;
  /// # impl Strategy for Words {
  /// #   type Value = String;
  /// #   type Key = str;
  /// #   fn hash(key: &str) -> u32 { hash::string(key) }
  /// #   fn key(value: &String) -> &str { value }
  /// # }
  /// use htab::Ref;
  ///
  /// let table: HTab<Words> = HTab::new(32).unwrap();
  ///
  /// for word in ["oak", "elm", "yew"] {
  ///   table.hash(&Ref::new(word.to_string()), word).unwrap();
  /// }
  ///
  /// let mut letters: usize = 0;
  /// assert_eq!(table.foreach_read(|word| letters += word.len()), 3);
  /// assert_eq!(letters, 9);
  /// ```
  #[inline]
  pub fn foreach_read<F>(&self, action: F) -> usize
  where
    F: FnMut(Visit<'_, S::Value>),
  {
    self.inner.foreach_read(action)
  }

  /// Returns the number of elements in each bucket, in bucket order.
  ///
  /// Buckets are read one at a time, so under concurrent modification the
  /// result need not match any single moment, nor sum to [`count`].
  ///
  /// [`count`]: Self::count
  #[inline]
  pub fn chain_lengths(&self) -> Vec<usize> {
    self.inner.chain_lengths()
  }
}

impl<S> Debug for HTab<S>
where
  S: Strategy,
{
  #[inline]
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    Debug::fmt(&self.inner, f)
  }
}
