//! Intrusive doubly-linked chain of nodes.
//!
//! The links live inside each [`Node`], so linking and unlinking never
//! allocate. A chain is always stored behind a bucket lock: `&Chain` means the
//! lock is held (shared or exclusive) and `&mut Chain` means it is held
//! exclusively. Node links are only accessed through those borrows.

use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::ptr::NonNull;

use crate::node::Link;
use crate::node::Node;

pub(crate) struct Chain<T> {
  head: Option<NonNull<Node<T>>>,
  len: usize,
}

impl<T> Chain<T> {
  #[inline]
  pub(crate) const fn new() -> Self {
    Self { head: None, len: 0 }
  }

  /// Number of linked nodes.
  #[inline]
  pub(crate) const fn len(&self) -> usize {
    self.len
  }

  #[inline]
  pub(crate) const fn head(&self) -> Option<NonNull<Node<T>>> {
    self.head
  }

  /// Links `node` at the front of the chain.
  ///
  /// # Safety
  ///
  /// `node` must be live, must not be linked into any chain, and must stay
  /// live until it is unlinked again.
  pub(crate) unsafe fn push_front(&mut self, node: NonNull<Node<T>>) {
    // SAFETY: The node is not linked anywhere, so nobody else reads its links.
    let link: &mut Link<T> = unsafe { &mut *node.as_ref().link_ptr() };

    debug_assert!(link.prev.is_none() && link.next.is_none());

    link.prev = None;
    link.next = self.head;

    if let Some(head) = self.head {
      // SAFETY: `head` is linked into this chain, which we hold exclusively.
      unsafe {
        (*head.as_ref().link_ptr()).prev = Some(node);
      }
    }

    self.head = Some(node);
    self.len += 1;
  }

  /// Unlinks `node` and clears its links.
  ///
  /// # Safety
  ///
  /// `node` must be linked into this chain.
  pub(crate) unsafe fn unlink(&mut self, node: NonNull<Node<T>>) {
    // SAFETY: The node is linked into this chain, which we hold exclusively.
    let link: &mut Link<T> = unsafe { &mut *node.as_ref().link_ptr() };
    let prev: Option<NonNull<Node<T>>> = link.prev.take();
    let next: Option<NonNull<Node<T>>> = link.next.take();

    match prev {
      // SAFETY: Neighbours are linked into this chain as well.
      Some(prev) => unsafe {
        (*prev.as_ref().link_ptr()).next = next;
      },
      None => {
        debug_assert!(self.head == Some(node), "unlinked a node from the wrong chain");
        self.head = next;
      }
    }

    if let Some(next) = next {
      // SAFETY: See above.
      unsafe {
        (*next.as_ref().link_ptr()).prev = prev;
      }
    }

    self.len -= 1;
  }

  /// Unlinks and returns the first node.
  #[inline]
  pub(crate) fn pop_front(&mut self) -> Option<NonNull<Node<T>>> {
    let head: NonNull<Node<T>> = self.head?;

    // SAFETY: `head` is linked into this chain.
    unsafe {
      self.unlink(head);
    }

    Some(head)
  }

  /// Returns the node linked after `node`.
  ///
  /// # Safety
  ///
  /// `node` must be linked into this chain.
  #[inline]
  pub(crate) unsafe fn next(&self, node: NonNull<Node<T>>) -> Option<NonNull<Node<T>>> {
    // SAFETY: Links of nodes in this chain are stable while we hold `&self`.
    unsafe { (*node.as_ref().link_ptr()).next }
  }

  #[inline]
  pub(crate) fn iter(&self) -> Iter<'_, T> {
    Iter {
      next: self.head,
      remaining: self.len,
      marker: PhantomData,
    }
  }
}

// SAFETY: A chain only refers to nodes it has been handed; moving it between
// threads is the same as moving the `Ref`s it stands in for.
unsafe impl<T> Send for Chain<T> where T: Send + Sync {}

// SAFETY: Shared access only reads links, see above.
unsafe impl<T> Sync for Chain<T> where T: Send + Sync {}

// -----------------------------------------------------------------------------
// Iterator
// -----------------------------------------------------------------------------

/// Iterates the nodes of a chain front to back.
pub(crate) struct Iter<'chain, T> {
  next: Option<NonNull<Node<T>>>,
  remaining: usize,
  marker: PhantomData<&'chain Chain<T>>,
}

impl<'chain, T> Iterator for Iter<'chain, T> {
  type Item = &'chain Node<T>;

  #[inline]
  fn next(&mut self) -> Option<Self::Item> {
    let node: NonNull<Node<T>> = self.next?;

    // SAFETY: The chain is borrowed for `'chain`, so the node stays linked
    // (and therefore live) and its links do not change.
    let node: &'chain Node<T> = unsafe { node.as_ref() };

    // SAFETY: See above.
    self.next = unsafe { (*node.link_ptr()).next };
    self.remaining -= 1;

    Some(node)
  }

  #[inline]
  fn size_hint(&self) -> (usize, Option<usize>) {
    (self.remaining, Some(self.remaining))
  }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> FusedIterator for Iter<'_, T> {}
