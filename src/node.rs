//! Element control block and the [`Ref`] handle.
//!
//! Every element is a single heap allocation holding the caller's value next
//! to the bookkeeping the table needs: chain links, the reference count, the
//! cached hash, the owning table and the release function.

use core::borrow::Borrow;
use core::cell::UnsafeCell;
use core::fmt::Debug;
use core::fmt::Formatter;
use core::fmt::Result as FmtResult;
use core::marker::PhantomData;
use core::mem::ManuallyDrop;
use core::ops::Deref;
use core::ptr;
use core::ptr::NonNull;

use crate::sync::atomic::AtomicPtr;
use crate::sync::atomic::AtomicU32;
use crate::sync::atomic::AtomicUsize;
use crate::sync::atomic::Ordering::Acquire;
use crate::sync::atomic::Ordering::Relaxed;
use crate::sync::atomic::Ordering::Release;
use crate::sync::atomic::fence;

/// Owner word of an element whose `hash` call is still in progress.
///
/// Table identities are bucket array addresses, which are cache-line aligned,
/// so they never collide with this value.
pub(crate) const CLAIMED: *mut () = ptr::dangling_mut();

/// Same soft limit as `Arc`: past this we assume references are being leaked.
const MAX_REFCOUNT: usize = isize::MAX as usize;

// -----------------------------------------------------------------------------
// Node
// -----------------------------------------------------------------------------

/// Chain links of a node. Only touched through [`Chain`] while holding the
/// lock of the bucket the node is linked into.
///
/// [`Chain`]: crate::chain::Chain
pub(crate) struct Link<T> {
  pub(crate) prev: Option<NonNull<Node<T>>>,
  pub(crate) next: Option<NonNull<Node<T>>>,
}

pub(crate) struct Node<T> {
  link: UnsafeCell<Link<T>>,
  /// Null when unhashed, [`CLAIMED`] while being hashed, otherwise the
  /// identity of the table the node is linked into.
  owner: AtomicPtr<()>,
  /// Valid while `owner` holds a table identity.
  hash: AtomicU32,
  refcount: AtomicUsize,
  /// Written only by the thread that claimed the node; read only by the
  /// thread that drops the final reference.
  release: UnsafeCell<fn(T)>,
  value: T,
}

impl<T> Node<T> {
  /// Allocates a new unhashed node holding one reference.
  pub(crate) fn alloc(value: T) -> NonNull<Self> {
    let node: Box<Self> = Box::new(Self {
      link: UnsafeCell::new(Link {
        prev: None,
        next: None,
      }),
      owner: AtomicPtr::new(ptr::null_mut()),
      hash: AtomicU32::new(0),
      refcount: AtomicUsize::new(1),
      release: UnsafeCell::new(drop::<T> as fn(T)),
      value,
    });

    NonNull::from(Box::leak(node))
  }

  #[inline]
  pub(crate) const fn value(&self) -> &T {
    &self.value
  }

  #[inline]
  pub(crate) const fn link_ptr(&self) -> *mut Link<T> {
    self.link.get()
  }

  #[inline]
  pub(crate) fn hash(&self) -> u32 {
    self.hash.load(Relaxed)
  }

  #[inline]
  pub(crate) fn owner(&self) -> *mut () {
    self.owner.load(Acquire)
  }

  #[inline]
  pub(crate) fn refcount(&self) -> usize {
    self.refcount.load(Acquire)
  }

  /// Returns `true` if the node is linked into some table.
  #[inline]
  pub(crate) fn is_hashed(&self) -> bool {
    let owner: *mut () = self.owner();
    !owner.is_null() && owner != CLAIMED
  }

  /// Marks the node as being hashed. Fails if it is hashed, or being hashed,
  /// anywhere else.
  #[inline]
  pub(crate) fn try_claim(&self) -> bool {
    self
      .owner
      .compare_exchange(ptr::null_mut(), CLAIMED, Acquire, Relaxed)
      .is_ok()
  }

  /// Records the hash of a claimed node.
  #[inline]
  pub(crate) fn set_hash(&self, hash: u32) {
    debug_assert_eq!(self.owner.load(Relaxed), CLAIMED);
    self.hash.store(hash, Relaxed);
  }

  /// Installs the function run when the last reference is released.
  ///
  /// # Safety
  ///
  /// The caller must have claimed the node with [`try_claim`] and not yet
  /// published or abandoned it.
  ///
  /// [`try_claim`]: Self::try_claim
  #[inline]
  pub(crate) unsafe fn set_release(&self, release: fn(T)) {
    debug_assert_eq!(self.owner.load(Relaxed), CLAIMED);

    // SAFETY: The claim excludes every other writer, and no reader exists
    // while the caller still holds a reference.
    unsafe {
      *self.release.get() = release;
    }
  }

  /// Publishes the owning table of a claimed, linked node.
  #[inline]
  pub(crate) fn publish(&self, table: *mut ()) {
    debug_assert_eq!(self.owner.load(Relaxed), CLAIMED);
    self.owner.store(table, Release);
  }

  /// Returns the node to the unhashed state.
  #[inline]
  pub(crate) fn abandon(&self) {
    self.owner.store(ptr::null_mut(), Release);
  }

  /// Acquires one reference.
  #[inline]
  pub(crate) fn hold(&self) {
    let prev: usize = self.refcount.fetch_add(1, Relaxed);

    if prev > MAX_REFCOUNT {
      std::process::abort();
    }
  }

  /// Releases one reference, running the release function if it was the
  /// last one. Returns `true` in that case.
  ///
  /// # Safety
  ///
  /// `this` must point to a live node and the caller must own one of its
  /// references, which is consumed.
  pub(crate) unsafe fn put(this: NonNull<Self>) -> bool {
    // SAFETY: The caller's reference keeps the node alive until the decrement.
    let prev: usize = unsafe { this.as_ref() }.refcount.fetch_sub(1, Release);

    debug_assert!(prev != 0, "element reference count underflow");

    if prev != 1 {
      return false;
    }

    fence(Acquire);

    // SAFETY: The count reached zero, so no other reference exists and the
    // allocation came from `Box` in `alloc`.
    let node: Box<Self> = unsafe { Box::from_raw(this.as_ptr()) };

    debug_assert!(
      node.owner.load(Relaxed).is_null(),
      "released an element that is still hashed",
    );

    let Self { release, value, .. } = *node;

    (release.into_inner())(value);

    true
  }
}

// -----------------------------------------------------------------------------
// Ref
// -----------------------------------------------------------------------------

/// A strong reference to a hash element.
///
/// An element is created with [`Ref::new`], which wraps the caller's value
/// and returns the owner's reference. The table takes one more reference for
/// as long as the element is hashed, and every successful lookup returns
/// another. The element is destroyed when the last reference is released,
/// either explicitly through [`Ref::put`] or by dropping the handle. If the
/// element was ever hashed, destruction runs the table's
/// [`Strategy::free`]. Otherwise the value is simply dropped.
///
/// Like [`Arc`], all operations are associated functions so they never
/// shadow methods of `T`, which is reachable through [`Deref`].
///
/// ```
/// use htab::Ref;
///
/// let a: Ref<u32> = Ref::new(7);
/// let b: Ref<u32> = Ref::hold(&a);
///
/// assert_eq!(Ref::count(&a), 2);
/// assert!(Ref::ptr_eq(&a, &b));
/// assert!(!Ref::put(b));
/// assert!(Ref::put(a));
/// ```
///
/// [`Arc`]: std::sync::Arc
/// [`Strategy::free`]: crate::params::Strategy::free
pub struct Ref<T> {
  node: NonNull<Node<T>>,
  marker: PhantomData<Node<T>>,
}

impl<T> Ref<T> {
  /// Creates a new unhashed element holding `value`, with a reference count
  /// of one.
  #[inline]
  pub fn new(value: T) -> Self {
    Self {
      node: Node::alloc(value),
      marker: PhantomData,
    }
  }

  /// Adopts a reference that has already been counted.
  ///
  /// # Safety
  ///
  /// `node` must be live and the caller must transfer one of its references.
  #[inline]
  pub(crate) const unsafe fn from_node(node: NonNull<Node<T>>) -> Self {
    Self {
      node,
      marker: PhantomData,
    }
  }

  #[inline]
  pub(crate) const fn node(this: &Self) -> &Node<T> {
    // SAFETY: The reference held by `this` keeps the node alive.
    unsafe { this.node.as_ref() }
  }

  #[inline]
  pub(crate) const fn as_non_null(this: &Self) -> NonNull<Node<T>> {
    this.node
  }

  /// Acquires another reference to the same element.
  ///
  /// Equivalent to [`Clone::clone`].
  #[inline]
  pub fn hold(this: &Self) -> Self {
    Self::node(this).hold();

    // SAFETY: We just acquired the reference we hand over.
    unsafe { Self::from_node(this.node) }
  }

  /// Releases this reference.
  ///
  /// Returns `true` if it was the last one, in which case the element has
  /// been destroyed.
  #[inline]
  pub fn put(this: Self) -> bool {
    let this: ManuallyDrop<Self> = ManuallyDrop::new(this);

    // SAFETY: `this` owns one reference and is never used again.
    unsafe { Node::put(this.node) }
  }

  /// Returns the current number of references.
  ///
  /// The value may change immediately due to concurrent operations.
  #[inline]
  pub fn count(this: &Self) -> usize {
    Self::node(this).refcount()
  }

  /// Returns `true` if the element is currently linked into a table.
  #[inline]
  pub fn is_hashed(this: &Self) -> bool {
    Self::node(this).is_hashed()
  }

  /// Returns `true` if both references point to the same element.
  #[inline]
  pub fn ptr_eq(this: &Self, other: &Self) -> bool {
    this.node == other.node
  }
}

impl<T> Clone for Ref<T> {
  #[inline]
  fn clone(&self) -> Self {
    Self::hold(self)
  }
}

impl<T> Drop for Ref<T> {
  #[inline]
  fn drop(&mut self) {
    // SAFETY: `self` owns one reference and is being destroyed.
    unsafe {
      Node::put(self.node);
    }
  }
}

impl<T> Deref for Ref<T> {
  type Target = T;

  #[inline]
  fn deref(&self) -> &T {
    Self::node(self).value()
  }
}

impl<T> AsRef<T> for Ref<T> {
  #[inline]
  fn as_ref(&self) -> &T {
    self
  }
}

impl<T> Borrow<T> for Ref<T> {
  #[inline]
  fn borrow(&self) -> &T {
    self
  }
}

impl<T> Debug for Ref<T>
where
  T: Debug,
{
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct("Ref")
      .field("value", Self::node(self).value())
      .field("count", &Self::count(self))
      .field("hashed", &Self::is_hashed(self))
      .finish()
  }
}

// SAFETY: Same reasoning as `Arc<T>`: the value may be dropped (through the
// release function) on any thread, and shared across threads by `Deref`.
unsafe impl<T> Send for Ref<T> where T: Send + Sync {}

// SAFETY: See above.
unsafe impl<T> Sync for Ref<T> where T: Send + Sync {}
