use std::ptr::{self, NonNull};

use crate::error::PoolError;

/// Accounting snapshot of a pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
  pub capacity: usize,
  pub available: usize,
  pub used: usize,
  pub hwm: usize,
}

/// A fixed-capacity allocator over one preallocated memory bulk.
///
/// Instances carry no internal synchronization. Pointers returned by
/// [`Pool::alloc`] stay valid until they are handed back through
/// [`Pool::free`], [`Pool::dealloc`] or [`Pool::realloc`], or until the pool is
/// dropped.
pub trait Pool: Sized {
  /// Alignment of every pointer the pool returns.
  const ALIGN: usize;

  /// Builds a pool for a requested `size`, promoted or clamped to what the
  /// allocator supports. The resulting [`Pool::capacity`] may differ from `size`.
  fn with_capacity(size: usize) -> Result<Self, PoolError>;

  /// Bytes of the memory bulk.
  fn capacity(&self) -> usize;

  /// Largest allocation that would currently succeed.
  fn available(&self) -> usize;

  /// Bytes currently accounted as in use.
  fn used(&self) -> usize;

  /// Peak of [`Pool::used`] since creation or the last [`Pool::reset`].
  fn hwm(&self) -> usize;

  /// Returns the high-water mark and rebases it.
  fn reset(&mut self) -> usize;

  /// Allocates `size` bytes aligned to [`Pool::ALIGN`], or `None` when the pool
  /// cannot satisfy the request.
  fn alloc(
    &mut self,
    size: usize,
  ) -> Option<NonNull<u8>>;

  /// Releases `ptr`, using `size` as a hint of the original request.
  ///
  /// # Safety
  ///
  /// `ptr` must be a live allocation of this pool. Releasing it twice, or
  /// releasing a foreign pointer, is undefined behaviour in release builds.
  unsafe fn dealloc(
    &mut self,
    ptr: NonNull<u8>,
    size: usize,
  );

  /// Releases `ptr`.
  ///
  /// # Safety
  ///
  /// Same contract as [`Pool::dealloc`].
  unsafe fn free(
    &mut self,
    ptr: NonNull<u8>,
  );

  /// Resizes an allocation. A `None` pointer allocates, a zero `size` frees and
  /// returns `None`. On failure the original allocation is left untouched.
  ///
  /// # Safety
  ///
  /// `ptr`, when given, must be a live allocation of this pool. After a
  /// successful call only the returned pointer may be used.
  unsafe fn realloc(
    &mut self,
    ptr: Option<NonNull<u8>>,
    size: usize,
  ) -> Option<NonNull<u8>>;

  /// Allocates `num * size` zeroed bytes.
  fn calloc(
    &mut self,
    num: usize,
    size: usize,
  ) -> Option<NonNull<u8>> {
    let total = num.checked_mul(size)?;
    let block = self.alloc(total)?;

    unsafe { ptr::write_bytes(block.as_ptr(), 0, total) };

    Some(block)
  }

  fn stats(&self) -> PoolStats {
    PoolStats {
      capacity: self.capacity(),
      available: self.available(),
      used: self.used(),
      hwm: self.hwm(),
    }
  }
}
