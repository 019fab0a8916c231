//! Cache-aligned, fixed-length array allocation.
//!
//! Provides [`Array`], the backing storage for table buckets. Unlike `Box<[T]>`
//! allocation failure is reported to the caller instead of aborting.

use core::ptr;
use core::ptr::NonNull;
use core::slice;

use crate::alloc::Layout;
use crate::alloc::alloc;
use crate::alloc::dealloc;
use crate::error::Error;
use crate::error::Result;
use crate::params::Capacity;

/// A fixed-size array sized by a [`Capacity`].
pub(crate) struct Array<T> {
  nonnull: NonNull<T>,
  length: Capacity,
}

impl<T> Array<T> {
  /// Allocates an array of `length` elements, initializing each with `init`.
  ///
  /// Fails with [`Error::AllocationFailure`] if the layout is not
  /// representable or the allocator returns null.
  pub(crate) fn try_new<F>(length: Capacity, mut init: F) -> Result<Self>
  where
    F: FnMut(usize) -> T,
  {
    const { assert!(size_of::<T>() != 0, "invalid array: zero-sized elements") };

    let layout: Layout = Self::layout(length)?;

    // SAFETY: `layout` has non-zero size: `T` is not zero-sized and `length`
    // is at least `Capacity::MIN`.
    let raw: *mut u8 = unsafe { alloc(layout) };

    let Some(nonnull) = NonNull::new(raw.cast::<T>()) else {
      return Err(Error::AllocationFailure);
    };

    for index in 0..length.as_usize() {
      // SAFETY: `index < length` and the allocation holds `length` elements.
      unsafe {
        nonnull.add(index).write(init(index));
      }
    }

    Ok(Self { nonnull, length })
  }

  #[inline]
  fn layout(length: Capacity) -> Result<Layout> {
    Layout::array::<T>(length.as_usize()).map_err(|_| Error::AllocationFailure)
  }

  #[inline]
  pub(crate) const fn len(&self) -> usize {
    self.length.as_usize()
  }

  /// Returns a raw pointer to the array.
  #[inline]
  pub(crate) const fn as_ptr(&self) -> *const T {
    self.nonnull.as_ptr()
  }

  #[inline]
  pub(crate) const fn as_slice(&self) -> &[T] {
    // SAFETY: Contiguous allocation of `length` initialized elements.
    unsafe { slice::from_raw_parts(self.as_ptr(), self.len()) }
  }

  /// Returns a reference to the element at `index & (len - 1)`.
  #[inline]
  pub(crate) const fn get_masked(&self, index: usize) -> &T {
    // SAFETY: Masking with `len - 1` keeps the index in bounds because the
    // length is a power of two.
    unsafe { self.get_unchecked(index & self.length.mask()) }
  }

  /// Returns a reference to the element at `index` without bounds checking.
  ///
  /// # Safety
  ///
  /// `index` must be less than [`len()`](Self::len).
  #[inline]
  pub(crate) const unsafe fn get_unchecked(&self, index: usize) -> &T {
    debug_assert!(
      index < self.len(),
      "Array::get_unchecked requires that the index is in bounds",
    );

    // SAFETY: Caller guarantees `index < len`.
    unsafe { self.nonnull.add(index).as_ref() }
  }
}

impl<T> Drop for Array<T> {
  fn drop(&mut self) {
    let elements: *mut [T] = ptr::slice_from_raw_parts_mut(self.nonnull.as_ptr(), self.len());

    // SAFETY: Every element was initialized in `try_new` and is dropped once.
    unsafe {
      ptr::drop_in_place(elements);
    }

    // SAFETY: Allocated with this exact layout in `try_new`; the layout was
    // valid then, so it is valid now.
    unsafe {
      dealloc(
        self.nonnull.as_ptr().cast(),
        Layout::array::<T>(self.len()).unwrap_unchecked(),
      );
    }
  }
}

// SAFETY: `Array<T>` uniquely owns its elements, like `Box<[T]>`.
unsafe impl<T> Send for Array<T> where T: Send {}

// SAFETY: Shared access only hands out `&T`, like `Box<[T]>`.
unsafe impl<T> Sync for Array<T> where T: Sync {}
