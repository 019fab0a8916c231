//! Element handles passed to traversal callbacks.

use core::fmt::Debug;
use core::fmt::Formatter;
use core::fmt::Result as FmtResult;
use core::ops::Deref;
use core::ptr::NonNull;

use crate::bucket;
use crate::chain::Chain;
use crate::node::Node;
use crate::node::Ref;
use crate::sync::atomic::AtomicUsize;

// -----------------------------------------------------------------------------
// Read-only Visit
// -----------------------------------------------------------------------------

/// An element visited by [`HTab::foreach_read`].
///
/// The bucket holding the element is locked for shared access for as long as
/// the callback runs, so the element cannot be unhashed or destroyed while
/// this handle exists.
///
/// [`HTab::foreach_read`]: crate::public::HTab::foreach_read
pub struct Visit<'bucket, T> {
  node: &'bucket Node<T>,
}

impl<'bucket, T> Visit<'bucket, T> {
  #[inline]
  pub(crate) const fn new(node: &'bucket Node<T>) -> Self {
    Self { node }
  }

  /// Acquires a reference that outlives the traversal.
  #[inline]
  pub fn hold(&self) -> Ref<T> {
    self.node.hold();

    // SAFETY: We just acquired the reference we hand over.
    unsafe { Ref::from_node(NonNull::from(self.node)) }
  }

  /// Returns the cached hash of the element.
  #[inline]
  pub fn hash(&self) -> u32 {
    self.node.hash()
  }
}

impl<T> Deref for Visit<'_, T> {
  type Target = T;

  #[inline]
  fn deref(&self) -> &T {
    self.node.value()
  }
}

impl<T> Debug for Visit<'_, T>
where
  T: Debug,
{
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_tuple("Visit").field(self.node.value()).finish()
  }
}

// -----------------------------------------------------------------------------
// Mutating Visit
// -----------------------------------------------------------------------------

/// An element visited by [`HTab::foreach`].
///
/// The bucket holding the element is locked exclusively while the callback
/// runs. The handle carries the only way to remove an element without taking
/// that lock again: [`VisitMut::unhash`].
///
/// [`HTab::foreach`]: crate::public::HTab::foreach
pub struct VisitMut<'bucket, T> {
  node: NonNull<Node<T>>,
  chain: &'bucket mut Chain<T>,
  entries: &'bucket AtomicUsize,
  released: &'bucket mut Vec<NonNull<Node<T>>>,
}

impl<'bucket, T> VisitMut<'bucket, T> {
  /// # Safety
  ///
  /// `node` must be linked into `chain`, and `entries` must be the counter of
  /// the table owning `chain`.
  #[inline]
  pub(crate) const unsafe fn new(
    node: NonNull<Node<T>>,
    chain: &'bucket mut Chain<T>,
    entries: &'bucket AtomicUsize,
    released: &'bucket mut Vec<NonNull<Node<T>>>,
  ) -> Self {
    Self {
      node,
      chain,
      entries,
      released,
    }
  }

  #[inline]
  const fn node(&self) -> &Node<T> {
    // SAFETY: The node is linked into the locked chain, and linked nodes hold
    // the table's reference.
    unsafe { self.node.as_ref() }
  }

  /// Acquires a reference that outlives the traversal.
  #[inline]
  pub fn hold(&self) -> Ref<T> {
    self.node().hold();

    // SAFETY: We just acquired the reference we hand over.
    unsafe { Ref::from_node(self.node) }
  }

  /// Returns the cached hash of the element.
  #[inline]
  pub fn hash(&self) -> u32 {
    self.node().hash()
  }

  /// Removes the visited element from the table without re-locking its
  /// bucket.
  ///
  /// The table's reference is released after the traversal unlocks the
  /// bucket; if it is the last one, the table's free function runs then.
  #[inline]
  pub fn unhash(self) {
    // SAFETY: `node` is linked into `chain` and `entries` belongs to the same
    // table, as required by `new`.
    unsafe {
      bucket::detach(self.chain, self.node, self.entries);
    }

    self.released.push(self.node);
  }
}

impl<T> Deref for VisitMut<'_, T> {
  type Target = T;

  #[inline]
  fn deref(&self) -> &T {
    self.node().value()
  }
}

impl<T> Debug for VisitMut<'_, T>
where
  T: Debug,
{
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_tuple("VisitMut").field(self.node().value()).finish()
  }
}
