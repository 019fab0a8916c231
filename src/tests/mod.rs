use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::SeqCst;

use crate::hash;
use crate::node::Ref;
use crate::params::Strategy;



// -----------------------------------------------------------------------------
// Test Strategies
// -----------------------------------------------------------------------------

/// Counts how elements are destroyed.
#[derive(Debug, Default)]
pub(crate) struct Tracker {
  freed: AtomicUsize,
  dropped: AtomicUsize,
}

impl Tracker {
  pub(crate) fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub(crate) fn item(self: &Arc<Self>, name: &str) -> Ref<Item> {
    Ref::new(Item {
      name: name.to_owned(),
      tracker: Arc::clone(self),
    })
  }

  /// Number of values passed to `Strategy::free`.
  pub(crate) fn freed(&self) -> usize {
    self.freed.load(SeqCst)
  }

  /// Number of values dropped, by any path.
  pub(crate) fn dropped(&self) -> usize {
    self.dropped.load(SeqCst)
  }
}

#[derive(Debug)]
pub(crate) struct Item {
  pub(crate) name: String,
  tracker: Arc<Tracker>,
}

impl Drop for Item {
  fn drop(&mut self) {
    self.tracker.dropped.fetch_add(1, SeqCst);
  }
}

/// Items keyed by name.
pub(crate) struct Items;

impl Strategy for Items {
  type Value = Item;
  type Key = str;

  fn key(value: &Item) -> &str {
    &value.name
  }

  fn hash(key: &str) -> u32 {
    hash::string(key)
  }

  fn free(value: Item) {
    value.tracker.freed.fetch_add(1, SeqCst);
  }
}

/// Items keyed by name, all in bucket zero.
pub(crate) struct Colliding;

impl Strategy for Colliding {
  type Value = Item;
  type Key = str;

  fn key(value: &Item) -> &str {
    &value.name
  }

  fn hash(_key: &str) -> u32 {
    0
  }

  fn free(value: Item) {
    value.tracker.freed.fetch_add(1, SeqCst);
  }
}
