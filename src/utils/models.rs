#[cfg(all(loom, shuttle))]
compile_error!("cannot use loom and shuttle at once");

#[cfg(loom)]
pub(crate) mod alloc {
  pub(crate) use ::loom::alloc::Layout;
  pub(crate) use ::loom::alloc::alloc;
  pub(crate) use ::loom::alloc::dealloc;
}

#[cfg(not(loom))]
pub(crate) mod alloc {
  pub(crate) use ::std::alloc::Layout;
  pub(crate) use ::std::alloc::alloc;
  pub(crate) use ::std::alloc::dealloc;
}

#[cfg(not(any(loom, shuttle)))]
pub(crate) mod sync {
  pub(crate) mod atomic {
    pub(crate) use ::core::sync::atomic::AtomicPtr;
    pub(crate) use ::core::sync::atomic::AtomicU32;
    pub(crate) use ::core::sync::atomic::AtomicUsize;
    pub(crate) use ::core::sync::atomic::Ordering;
    pub(crate) use ::core::sync::atomic::fence;
  }

  pub(crate) use ::parking_lot::RwLock;
  pub(crate) use ::parking_lot::RwLockReadGuard;
  pub(crate) use ::parking_lot::RwLockWriteGuard;
}

/// Wraps a model-checker `RwLock` so it matches the `parking_lot` signature.
///
/// Poisoning is ignored: a panic inside a traversal callback must not turn
/// every later operation on that bucket into a second panic.
#[cfg(any(loom, shuttle))]
macro_rules! model_rwlock {
  ($krate:ident) => {
    pub(crate) use ::$krate::sync::RwLockReadGuard;
    pub(crate) use ::$krate::sync::RwLockWriteGuard;

    #[repr(transparent)]
    pub(crate) struct RwLock<T> {
      inner: ::$krate::sync::RwLock<T>,
    }

    impl<T> RwLock<T> {
      #[inline]
      pub(crate) fn new(value: T) -> Self {
        Self {
          inner: ::$krate::sync::RwLock::new(value),
        }
      }

      #[inline]
      pub(crate) fn read(&self) -> RwLockReadGuard<'_, T> {
        self
          .inner
          .read()
          .unwrap_or_else(::std::sync::PoisonError::into_inner)
      }

      #[inline]
      pub(crate) fn write(&self) -> RwLockWriteGuard<'_, T> {
        self
          .inner
          .write()
          .unwrap_or_else(::std::sync::PoisonError::into_inner)
      }
    }
  };
}

#[cfg(loom)]
pub(crate) mod sync {
  pub(crate) mod atomic {
    pub(crate) use ::loom::sync::atomic::AtomicPtr;
    pub(crate) use ::loom::sync::atomic::AtomicU32;
    pub(crate) use ::loom::sync::atomic::AtomicUsize;
    pub(crate) use ::loom::sync::atomic::Ordering;
    pub(crate) use ::loom::sync::atomic::fence;
  }

  model_rwlock!(loom);
}

#[cfg(shuttle)]
pub(crate) mod sync {
  pub(crate) mod atomic {
    pub(crate) use ::shuttle::sync::atomic::AtomicPtr;
    pub(crate) use ::shuttle::sync::atomic::AtomicU32;
    pub(crate) use ::shuttle::sync::atomic::AtomicUsize;
    pub(crate) use ::shuttle::sync::atomic::Ordering;
    pub(crate) use ::shuttle::sync::atomic::fence;
  }

  model_rwlock!(shuttle);
}
