#![cfg(loom)]

use loom::sync::Arc;
use loom::sync::atomic::AtomicUsize;
use loom::sync::atomic::Ordering::SeqCst;
use loom::thread;
use loom::thread::JoinHandle;
use std::ops::Deref;

use htab::Capacity;
use htab::Error;
use htab::HTab;
use htab::Ref;
use htab::Strategy;
use htab::hash;

type Hash = JoinHandle<Result<(), Error>>;
type Unhash = JoinHandle<Result<(), Error>>;
type Lookup = JoinHandle<Option<usize>>;
type Reader = JoinHandle<usize>;

type ArcTable = Arc<HTab<Entries>>;

struct Entry {
  key: usize,
  frees: Arc<AtomicUsize>,
}

struct Entries;

impl Strategy for Entries {
  type Value = Entry;
  type Key = usize;

  fn hash(key: &usize) -> u32 {
    hash::word(*key as u32)
  }

  fn key(value: &Entry) -> &usize {
    &value.key
  }

  fn free(value: Entry) {
    value.frees.fetch_add(1, SeqCst);
  }
}

struct LoomTable {
  inner: ArcTable,
  frees: Arc<AtomicUsize>,
}

impl LoomTable {
  fn new() -> Self {
    Self {
      inner: Arc::new(HTab::with_capacity(Capacity::MIN).unwrap()),
      frees: Arc::new(AtomicUsize::new(0)),
    }
  }

  fn entry(&self, key: usize) -> Ref<Entry> {
    Ref::new(Entry {
      key,
      frees: Arc::clone(&self.frees),
    })
  }

  fn frees(&self) -> usize {
    self.frees.load(SeqCst)
  }

  fn spawn_hash(&self, element: &Ref<Entry>) -> Hash {
    let table: ArcTable = ArcTable::clone(&self.inner);
    let element: Ref<Entry> = Ref::hold(element);
    thread::spawn(move || table.hash(&element, &element.key))
  }

  fn spawn_unhash(&self, element: &Ref<Entry>) -> Unhash {
    let table: ArcTable = ArcTable::clone(&self.inner);
    let element: Ref<Entry> = Ref::hold(element);
    thread::spawn(move || table.unhash(&element))
  }

  fn spawn_lookup(&self, key: usize) -> Lookup {
    let table: ArcTable = ArcTable::clone(&self.inner);
    thread::spawn(move || table.lookup(&key).ok().map(|found| found.key))
  }

  fn spawn_remove(&self, key: usize) -> Unhash {
    let table: ArcTable = ArcTable::clone(&self.inner);
    thread::spawn(move || {
      let found: Ref<Entry> = table.lookup(&key)?;
      table.unhash(&found)
    })
  }

  fn spawn_reader(&self) -> Reader {
    let table: ArcTable = ArcTable::clone(&self.inner);
    thread::spawn(move || table.foreach_read(|_| {}))
  }
}

impl Deref for LoomTable {
  type Target = ArcTable;

  #[inline]
  fn deref(&self) -> &Self::Target {
    &self.inner
  }
}

#[test]
fn test_hash_distinct() {
  loom::model(|| {
    let table: LoomTable = LoomTable::new();
    let entry_a: Ref<Entry> = table.entry(1);
    let entry_b: Ref<Entry> = table.entry(2);

    let thread_a: Hash = table.spawn_hash(&entry_a);
    let thread_b: Hash = table.spawn_hash(&entry_b);

    assert_eq!(thread_a.join().unwrap(), Ok(()));
    assert_eq!(thread_b.join().unwrap(), Ok(()));

    assert_eq!(table.count(), 2);
    assert!(Ref::ptr_eq(&table.lookup(&1).unwrap(), &entry_a));
    assert!(Ref::ptr_eq(&table.lookup(&2).unwrap(), &entry_b));
  });
}

#[test]
fn test_hash_same_bucket() {
  loom::model(|| {
    let table: LoomTable = LoomTable::new();
    let capacity: usize = table.capacity();
    let entry_a: Ref<Entry> = table.entry(3);
    let entry_b: Ref<Entry> = table.entry(3 + capacity);

    let thread_a: Hash = table.spawn_hash(&entry_a);
    let thread_b: Hash = table.spawn_hash(&entry_b);

    assert_eq!(thread_a.join().unwrap(), Ok(()));
    assert_eq!(thread_b.join().unwrap(), Ok(()));

    assert_eq!(table.count(), 2);
    assert_eq!(table.chain_lengths()[3], 2);
  });
}

#[test]
fn test_hash_duplicate_race() {
  loom::model(|| {
    let table: LoomTable = LoomTable::new();
    let entry_a: Ref<Entry> = table.entry(5);
    let entry_b: Ref<Entry> = table.entry(5);

    let thread_a: Hash = table.spawn_hash(&entry_a);
    let thread_b: Hash = table.spawn_hash(&entry_b);

    let result_a: Result<(), Error> = thread_a.join().unwrap();
    let result_b: Result<(), Error> = thread_b.join().unwrap();

    match (result_a, result_b) {
      (Ok(()), Err(Error::DuplicateKey)) => assert!(Ref::is_hashed(&entry_a)),
      (Err(Error::DuplicateKey), Ok(())) => assert!(Ref::is_hashed(&entry_b)),
      other => panic!("unexpected results: {other:?}"),
    }

    assert_eq!(table.count(), 1);
  });
}

#[test]
fn test_hash_one_element_two_tables() {
  loom::model(|| {
    let table_a: LoomTable = LoomTable::new();
    let table_b: LoomTable = LoomTable::new();
    let entry: Ref<Entry> = table_a.entry(1);

    let thread_a: Hash = table_a.spawn_hash(&entry);
    let thread_b: Hash = table_b.spawn_hash(&entry);

    let result_a: Result<(), Error> = thread_a.join().unwrap();
    let result_b: Result<(), Error> = thread_b.join().unwrap();

    match (result_a, result_b) {
      (Ok(()), Err(Error::AlreadyHashed)) | (Err(Error::AlreadyHashed), Ok(())) => {}
      other => panic!("unexpected results: {other:?}"),
    }

    assert_eq!(table_a.count() + table_b.count(), 1);
    assert_eq!(Ref::count(&entry), 2);
  });
}

#[test]
fn test_unhash_race() {
  loom::model(|| {
    let table: LoomTable = LoomTable::new();
    let entry: Ref<Entry> = table.entry(1);

    table.hash(&entry, &1).unwrap();

    let thread_a: Unhash = table.spawn_unhash(&entry);
    let thread_b: Unhash = table.spawn_unhash(&entry);

    let result_a: Result<(), Error> = thread_a.join().unwrap();
    let result_b: Result<(), Error> = thread_b.join().unwrap();

    match (result_a, result_b) {
      (Ok(()), Err(Error::NotHashed)) | (Err(Error::NotHashed), Ok(())) => {}
      other => panic!("unexpected results: {other:?}"),
    }

    assert!(table.is_empty());
    assert_eq!(Ref::count(&entry), 1);
    assert_eq!(table.frees(), 0);

    drop(entry);

    assert_eq!(table.frees(), 1);
  });
}

#[test]
fn test_lookup_during_remove() {
  loom::model(|| {
    let table: LoomTable = LoomTable::new();

    table.hash(&table.entry(7), &7).unwrap();

    let lookup: Lookup = table.spawn_lookup(7);
    let remove: Unhash = table.spawn_remove(7);

    assert_eq!(remove.join().unwrap(), Ok(()));

    if let Some(key) = lookup.join().unwrap() {
      assert_eq!(key, 7);
    }

    assert!(table.is_empty());
    assert_eq!(table.frees(), 1);
  });
}

#[test]
fn test_hash_during_remove() {
  loom::model(|| {
    let table: LoomTable = LoomTable::new();

    table.hash(&table.entry(1), &1).unwrap();

    let entry: Ref<Entry> = table.entry(1 + table.capacity());

    let insert: Hash = table.spawn_hash(&entry);
    let remove: Unhash = table.spawn_remove(1);

    assert_eq!(insert.join().unwrap(), Ok(()));
    assert_eq!(remove.join().unwrap(), Ok(()));

    assert_eq!(table.count(), 1);
    assert_eq!(table.frees(), 1);
    assert!(Ref::ptr_eq(&table.lookup(&(1 + table.capacity())).unwrap(), &entry));
  });
}

#[test]
fn test_readers_parallel() {
  let mut builder: loom::model::Builder = loom::model::Builder::new();

  builder.preemption_bound = Some(2);

  builder.check(|| {
    let table: LoomTable = LoomTable::new();

    table.hash(&table.entry(1), &1).unwrap();
    table.hash(&table.entry(2), &2).unwrap();

    let reader_a: Reader = table.spawn_reader();
    let reader_b: Reader = table.spawn_reader();

    assert_eq!(reader_a.join().unwrap(), 2);
    assert_eq!(reader_b.join().unwrap(), 2);
  });
}
