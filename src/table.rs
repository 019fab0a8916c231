//! Core table implementation.
//!
//! Every bucket is an intrusive chain behind its own reader-writer lock.
//! Insertion, removal and mutating traversal lock one bucket exclusively;
//! lookup and read-only traversal lock it for shared access. Element frees
//! never run while a bucket lock is held.

use core::fmt::Debug;
use core::fmt::Formatter;
use core::fmt::Result as FmtResult;
use core::marker::PhantomData;
use core::ptr::NonNull;

use crossbeam_utils::CachePadded;
use log::debug;
use log::trace;

use crate::array::Array;
use crate::bucket;
use crate::bucket::Bucket;
use crate::chain::Chain;
use crate::error::Error;
use crate::error::Result;
use crate::node::Node;
use crate::node::Ref;
use crate::params::Capacity;
use crate::params::DebugStrategy;
use crate::params::Strategy;
use crate::sync::RwLockReadGuard;
use crate::sync::RwLockWriteGuard;
use crate::sync::atomic::AtomicUsize;
use crate::sync::atomic::Ordering::AcqRel;
use crate::sync::atomic::Ordering::Acquire;
use crate::visit::Visit;
use crate::visit::VisitMut;

/// Releases the table's reference of every node in `released`.
///
/// # Safety
///
/// Every node must be unlinked and abandoned, and the caller must own the
/// table's reference to each of them.
#[inline]
unsafe fn release_all<T>(released: &mut Vec<NonNull<Node<T>>>) {
  for node in released.drain(..) {
    // SAFETY: Caller transfers the table's reference.
    unsafe {
      Node::put(node);
    }
  }
}

// -----------------------------------------------------------------------------
// Table State
// -----------------------------------------------------------------------------

#[repr(C)]
pub(crate) struct Table<S>
where
  S: Strategy,
{
  volatile: CachePadded<Volatile>,
  readonly: CachePadded<ReadOnly<S::Value>>,
  marker: PhantomData<fn(S)>,
}

impl<S> Table<S>
where
  S: Strategy,
{
  pub(crate) fn new(capacity: Capacity) -> Result<Self> {
    let this: Self = Self {
      volatile: CachePadded::new(Volatile::new()),
      readonly: CachePadded::new(ReadOnly::new(capacity)?),
      marker: PhantomData,
    };

    debug!("allocated table: {} buckets", capacity.as_usize());

    Ok(this)
  }

  #[inline]
  pub(crate) fn cap(&self) -> usize {
    self.readonly.buckets.len()
  }

  #[inline]
  pub(crate) fn len(&self) -> usize {
    self.volatile.entries.load(Acquire)
  }

  #[inline]
  pub(crate) fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// The value published into the owner word of every node linked into this
  /// table. The bucket array never moves, so neither does the identity.
  #[inline]
  fn identity(&self) -> *mut () {
    self.readonly.buckets.as_ptr().cast::<()>().cast_mut()
  }

  #[inline]
  fn index(&self, hash: u32) -> usize {
    hash as usize & (self.cap() - 1)
  }

  #[inline]
  fn bucket(&self, hash: u32) -> &Bucket<S::Value> {
    trace!(
      "hash: {:#010x} mask: {:#x} bucket: {}",
      hash,
      self.cap() - 1,
      self.index(hash),
    );

    self.readonly.buckets.get_masked(hash as usize)
  }

  pub(crate) fn hash(&self, element: &Ref<S::Value>, key: &S::Key) -> Result<()> {
    let node: &Node<S::Value> = Ref::node(element);

    if !S::equal(node.value(), key) {
      return Err(Error::KeyMismatch);
    }

    let hash: u32 = S::hash(key);

    if !node.try_claim() {
      return Err(Error::AlreadyHashed);
    }

    node.set_hash(hash);

    let mut chain: RwLockWriteGuard<'_, Chain<S::Value>> = self.bucket(hash).write();

    let duplicate: bool = chain
      .iter()
      .any(|other| other.hash() == hash && S::equal(other.value(), key));

    if duplicate {
      node.abandon();
      return Err(Error::DuplicateKey);
    }

    // SAFETY: We claimed the node above and have not published it yet.
    unsafe {
      node.set_release(S::free);
    }

    node.hold();

    // SAFETY: A claimed node is not linked anywhere, and the reference taken
    // above keeps it live until `unhash`, `foreach` or `drop` unlinks it.
    unsafe {
      chain.push_front(Ref::as_non_null(element));
    }

    self.volatile.entries.fetch_add(1, AcqRel);

    node.publish(self.identity());

    Ok(())
  }

  pub(crate) fn unhash(&self, element: &Ref<S::Value>) -> Result<()> {
    let node: &Node<S::Value> = Ref::node(element);
    let identity: *mut () = self.identity();

    loop {
      if node.owner() != identity {
        return Err(Error::NotHashed);
      }

      let hash: u32 = node.hash();
      let mut chain: RwLockWriteGuard<'_, Chain<S::Value>> = self.bucket(hash).write();

      // Another thread may have unhashed the node and hashed it again, into
      // this table, before we got the lock.
      if node.owner() != identity {
        return Err(Error::NotHashed);
      }

      if self.index(node.hash()) != self.index(hash) {
        continue;
      }

      // SAFETY: The node is owned by this table and its hash maps to the
      // bucket we hold, so it is linked into `chain`.
      unsafe {
        bucket::detach(&mut *chain, Ref::as_non_null(element), &self.volatile.entries);
      }

      drop(chain);

      // SAFETY: Detaching transferred the table's reference to us.
      unsafe {
        Node::put(Ref::as_non_null(element));
      }

      return Ok(());
    }
  }

  pub(crate) fn lookup(&self, key: &S::Key) -> Result<Ref<S::Value>> {
    let hash: u32 = S::hash(key);
    let chain: RwLockReadGuard<'_, Chain<S::Value>> = self.bucket(hash).read();

    let Some(node) = chain
      .iter()
      .find(|node| node.hash() == hash && S::equal(node.value(), key))
    else {
      return Err(Error::NotFound);
    };

    node.hold();

    // SAFETY: We just acquired the reference we hand over.
    Ok(unsafe { Ref::from_node(NonNull::from(node)) })
  }

  pub(crate) fn foreach<F>(&self, mut action: F) -> usize
  where
    F: FnMut(VisitMut<'_, S::Value>),
  {
    let mut visited: usize = 0;
    let mut released: Vec<NonNull<Node<S::Value>>> = Vec::new();

    for bucket in self.readonly.buckets.as_slice() {
      let mut chain: RwLockWriteGuard<'_, Chain<S::Value>> = bucket.write();
      let mut cursor: Option<NonNull<Node<S::Value>>> = chain.head();

      while let Some(node) = cursor {
        // SAFETY: `node` is still linked; the action has not run yet.
        cursor = unsafe { chain.next(node) };

        // SAFETY: `node` is linked into the chain we hold exclusively, and
        // `entries` is the counter of this table.
        let visit: VisitMut<'_, S::Value> = unsafe {
          VisitMut::new(node, &mut *chain, &self.volatile.entries, &mut released)
        };

        action(visit);
        visited += 1;
      }

      drop(chain);

      // SAFETY: `VisitMut::unhash` detached these nodes and handed us the
      // table's reference.
      unsafe {
        release_all(&mut released);
      }
    }

    visited
  }

  pub(crate) fn foreach_read<F>(&self, mut action: F) -> usize
  where
    F: FnMut(Visit<'_, S::Value>),
  {
    let mut visited: usize = 0;

    for bucket in self.readonly.buckets.as_slice() {
      let chain: RwLockReadGuard<'_, Chain<S::Value>> = bucket.read();

      for node in chain.iter() {
        action(Visit::new(node));
        visited += 1;
      }
    }

    visited
  }

  pub(crate) fn chain_lengths(&self) -> Vec<usize> {
    self
      .readonly
      .buckets
      .as_slice()
      .iter()
      .map(|bucket| bucket.len())
      .collect()
  }
}

impl<S> Drop for Table<S>
where
  S: Strategy,
{
  fn drop(&mut self) {
    let mut drained: usize = 0;
    let mut released: Vec<NonNull<Node<S::Value>>> = Vec::new();

    for bucket in self.readonly.buckets.as_slice() {
      let mut chain: RwLockWriteGuard<'_, Chain<S::Value>> = bucket.write();

      while let Some(node) = chain.pop_front() {
        // SAFETY: The node was linked, so the table's reference keeps it live.
        unsafe { node.as_ref() }.abandon();
        self.volatile.entries.fetch_sub(1, AcqRel);
        released.push(node);
      }

      drop(chain);

      drained += released.len();

      // SAFETY: Popped and abandoned above; we own the table's references.
      unsafe {
        release_all(&mut released);
      }
    }

    debug!("dropped table: {drained} elements drained");
  }
}

impl<S> Debug for Table<S>
where
  S: Strategy,
{
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct("HTab")
      .field("capacity", &self.cap())
      .field("count", &self.len())
      .field("strategy", &DebugStrategy::<S>::new())
      .finish()
  }
}

// -----------------------------------------------------------------------------
// Volatile State
// -----------------------------------------------------------------------------

/// Table state modified by every insertion and removal.
///
/// Isolated from [`ReadOnly`] via cache padding to avoid false sharing.
#[repr(C)]
struct Volatile {
  /// Number of hashed elements across all buckets.
  entries: AtomicUsize,
}

impl Volatile {
  #[inline]
  fn new() -> Self {
    Self {
      entries: AtomicUsize::new(0),
    }
  }
}

// -----------------------------------------------------------------------------
// Read-only State
// -----------------------------------------------------------------------------

/// Table state initialized once at construction.
///
/// Buckets are locked individually, but the array itself never resizes.
#[repr(C)]
struct ReadOnly<T> {
  buckets: Array<CachePadded<Bucket<T>>>,
}

impl<T> ReadOnly<T> {
  #[inline]
  fn new(capacity: Capacity) -> Result<Self> {
    Ok(Self {
      buckets: Array::try_new(capacity, |_| CachePadded::new(Bucket::new()))?,
    })
  }
}
