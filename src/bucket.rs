//! A single hash slot: one chain behind one reader-writer lock.

use core::ptr::NonNull;

use crate::chain::Chain;
use crate::node::Node;
use crate::sync::RwLock;
use crate::sync::RwLockReadGuard;
use crate::sync::RwLockWriteGuard;
use crate::sync::atomic::AtomicUsize;
use crate::sync::atomic::Ordering::AcqRel;

pub(crate) struct Bucket<T> {
  chain: RwLock<Chain<T>>,
}

impl<T> Bucket<T> {
  #[inline]
  pub(crate) fn new() -> Self {
    Self {
      chain: RwLock::new(Chain::new()),
    }
  }

  /// Locks the chain for lookups and read-only traversal.
  #[inline]
  pub(crate) fn read(&self) -> RwLockReadGuard<'_, Chain<T>> {
    self.chain.read()
  }

  /// Locks the chain for insertion, removal and mutating traversal.
  #[inline]
  pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Chain<T>> {
    self.chain.write()
  }

  /// Local element count; diagnostics only.
  #[inline]
  pub(crate) fn len(&self) -> usize {
    self.read().len()
  }
}

/// Unlinks a hashed node from `chain` and returns it to the unhashed state.
///
/// The table's reference is *not* released: the caller must pass it to
/// [`Node::put`] once the bucket lock has been dropped.
///
/// # Safety
///
/// `node` must be linked into `chain`, and `entries` must be the counter of
/// the table owning the chain.
pub(crate) unsafe fn detach<T>(
  chain: &mut Chain<T>,
  node: NonNull<Node<T>>,
  entries: &AtomicUsize,
) {
  // SAFETY: Caller guarantees `node` is linked into `chain`.
  unsafe {
    chain.unlink(node);
  }

  entries.fetch_sub(1, AcqRel);

  // SAFETY: The node stays live; the table's reference has not been put yet.
  unsafe { node.as_ref() }.abandon();
}
