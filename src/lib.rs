//! A concurrent, reference-counted, intrusive hash index.
//!
//! `htab` provides [`HTab`], a fixed-capacity table that links shared
//! elements into hash buckets without owning or copying them. Elements are
//! created as [`Ref`] handles; the table holds one reference to each element
//! it indexes, and every successful lookup hands out another.
//!
//! # Overview
//!
//! How keys are hashed and compared, and how elements are destroyed, is
//! described once per table type by a [`Strategy`]:
//!
//! ```
//! use htab::{hash, HTab, Ref, Strategy};
//!
//! struct Host {
//!   name: String,
//!   port: u16,
//! }
//!
//! struct Hosts;
//!
//! impl Strategy for Hosts {
//!   type Value = Host;
//!   type Key = str;
//!
//!   fn key(value: &Host) -> &str {
//!     &value.name
//!   }
//!
//!   fn hash(key: &str) -> u32 {
//!     hash::string(key)
//!   }
//! }
//!
//! let table: HTab<Hosts> = HTab::new(256).unwrap();
//!
//! // Create an element and index it under its name
//! let host: Ref<Host> = Ref::new(Host { name: "db".into(), port: 5432 });
//! table.hash(&host, "db").unwrap();
//!
//! // The caller may drop its own reference; the table keeps the element alive
//! drop(host);
//!
//! // Look it up again
//! let found: Ref<Host> = table.lookup("db").unwrap();
//! assert_eq!(found.port, 5432);
//!
//! // Remove it; `found` is now the only reference
//! table.unhash(&found).unwrap();
//! assert_eq!(Ref::count(&found), 1);
//! ```
//!
//! # Element Lifetime
//!
//! An element is destroyed exactly once, when its last reference is
//! released. If it was ever hashed, destruction calls the table's
//! [`Strategy::free`] with the owned value; otherwise the value is dropped.
//! Destruction never runs while a bucket lock is held.
//!
//! An element can be hashed into at most one table at a time. Hashing it
//! again, anywhere, fails with [`Error::AlreadyHashed`] until it is
//! unhashed.
//!
//! # Concurrency
//!
//! Every bucket has its own reader-writer lock. [`HTab::hash`],
//! [`HTab::unhash`] and [`HTab::foreach`] take one bucket lock exclusively at
//! a time; [`HTab::lookup`] and [`HTab::foreach_read`] take it shared. The
//! element count is a single atomic counter.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::thread;
//!
//! use htab::{hash, HTab, Ref, Strategy};
//!
//! struct Ids;
//!
//! impl Strategy for Ids {
//!   type Value = u32;
//!   type Key = u32;
//!
//!   fn key(value: &u32) -> &u32 {
//!     value
//!   }
//!
//!   fn hash(key: &u32) -> u32 {
//!     hash::word(*key)
//!   }
//! }
//!
//! let table: Arc<HTab<Ids>> = Arc::new(HTab::new(1024).unwrap());
//!
//! let handles: Vec<_> = (0..4)
//!   .map(|thread_id| {
//!     let table = Arc::clone(&table);
//!     thread::spawn(move || {
//!       for i in 0..100 {
//!         let id: u32 = thread_id * 1000 + i;
//!         let element: Ref<u32> = Ref::new(id);
//!
//!         table.hash(&element, &id).unwrap();
//!         table.unhash(&element).unwrap();
//!       }
//!     })
//!   })
//!   .collect();
//!
//! for handle in handles {
//!   handle.join().unwrap();
//! }
//! ```
//!
//! # Capacity
//!
//! The bucket count is fixed at construction, rounded up to a power of two
//! and clamped to <code>[Capacity::MIN]..=[Capacity::MAX]</code>. The table
//! never resizes; the number of elements it can hold is unbounded.
//!
//! [Capacity::MAX]: crate::Capacity::MAX
//! [Capacity::MIN]: crate::Capacity::MIN
//! [`Error::AlreadyHashed`]: crate::Error::AlreadyHashed
//! [`Strategy::free`]: crate::Strategy::free

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod array;
mod bucket;
mod chain;
mod error;
mod node;
mod params;
mod public;
mod table;
mod utils;
mod visit;

pub mod hash;

#[cfg(all(test, not(loom), not(shuttle)))]
mod tests;

pub(crate) use crate::utils::alloc;
pub(crate) use crate::utils::sync;

pub use self::error::Error;
pub use self::error::Result;
pub use self::node::Ref;
pub use self::params::Capacity;
pub use self::params::Strategy;
pub use self::public::HTab;
pub use self::visit::Visit;
pub use self::visit::VisitMut;
