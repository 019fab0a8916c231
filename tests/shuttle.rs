#![cfg(shuttle)]

use shuttle::sync::Arc;
use shuttle::sync::atomic::AtomicUsize;
use shuttle::sync::atomic::Ordering::SeqCst;
use shuttle::thread;
use shuttle::thread::JoinHandle;

use htab::Error;
use htab::HTab;
use htab::Ref;
use htab::Strategy;
use htab::hash;

const ITERATIONS: usize = 1000;
const THREADS: usize = 4;
const KEYS: usize = 6;

struct Entry {
  key: usize,
  frees: Arc<AtomicUsize>,
}

struct Entries;

impl Strategy for Entries {
  type Value = Entry;
  type Key = usize;

  fn hash(key: &usize) -> u32 {
    // Everything lands in two buckets so chains stay contended.
    hash::word((*key % 2) as u32)
  }

  fn key(value: &Entry) -> &usize {
    &value.key
  }

  fn free(value: Entry) {
    value.frees.fetch_add(1, SeqCst);
  }
}

fn entry(key: usize, frees: &Arc<AtomicUsize>) -> Ref<Entry> {
  Ref::new(Entry {
    key,
    frees: Arc::clone(frees),
  })
}

#[test]
fn test_churn() {
  shuttle::check_random(
    || {
      let table: Arc<HTab<Entries>> = Arc::new(HTab::new(32).unwrap());
      let frees: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));

      let handles: Vec<JoinHandle<usize>> = (0..THREADS)
        .map(|worker| {
          let table: Arc<HTab<Entries>> = Arc::clone(&table);
          let frees: Arc<AtomicUsize> = Arc::clone(&frees);

          thread::spawn(move || {
            let mut hashed: usize = 0;

            for round in 0..KEYS {
              let key: usize = (worker + round) % KEYS;
              let element: Ref<Entry> = entry(key, &frees);

              match table.hash(&element, &key) {
                Ok(()) => hashed += 1,
                Err(Error::DuplicateKey) => {}
                Err(error) => panic!("unexpected error: {error}"),
              }

              if let Ok(found) = table.lookup(&key) {
                assert_eq!(found.key, key);

                match table.unhash(&found) {
                  Ok(()) | Err(Error::NotHashed) => {}
                  Err(error) => panic!("unexpected error: {error}"),
                }
              }
            }

            hashed
          })
        })
        .collect();

      let hashed: usize = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .sum();

      let remaining: usize = table.count();

      assert_eq!(table.chain_lengths().iter().sum::<usize>(), remaining);
      assert_eq!(frees.load(SeqCst), hashed - remaining);

      drop(table);

      assert_eq!(frees.load(SeqCst), hashed);
    },
    ITERATIONS,
  );
}

#[test]
fn test_foreach_against_writers() {
  shuttle::check_random(
    || {
      let table: Arc<HTab<Entries>> = Arc::new(HTab::new(32).unwrap());
      let frees: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));

      for key in 0..KEYS {
        table.hash(&entry(key, &frees), &key).unwrap();
      }

      let sweeper: JoinHandle<usize> = {
        let table: Arc<HTab<Entries>> = Arc::clone(&table);

        thread::spawn(move || {
          let mut removed: usize = 0;

          table.foreach(|element| {
            if element.key % 3 == 0 {
              element.unhash();
              removed += 1;
            }
          });

          removed
        })
      };

      let reader: JoinHandle<usize> = {
        let table: Arc<HTab<Entries>> = Arc::clone(&table);
        thread::spawn(move || table.foreach_read(|_| {}))
      };

      let writer: JoinHandle<()> = {
        let table: Arc<HTab<Entries>> = Arc::clone(&table);
        let frees: Arc<AtomicUsize> = Arc::clone(&frees);

        thread::spawn(move || {
          let key: usize = KEYS + 1;
          table.hash(&entry(key, &frees), &key).unwrap();
        })
      };

      let removed: usize = sweeper.join().unwrap();
      let visible: usize = reader.join().unwrap();

      writer.join().unwrap();

      assert_eq!(removed, 2);
      assert!(visible <= KEYS + 1, "visible {visible}");
      assert_eq!(table.count(), KEYS + 1 - removed);
      assert_eq!(frees.load(SeqCst), removed);
    },
    ITERATIONS,
  );
}
