use std::{io, ptr, ptr::NonNull, slice};

use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE, c_void, mmap, munmap};

use crate::error::PoolError;

/// The single contiguous region a pool carves its allocations from.
///
/// ```text
///   base                                                    base + len
///   ┌────────────────────────────────────────────────────────────────┐
///   │                     anonymous private mapping                  │
///   └────────────────────────────────────────────────────────────────┘
///   ▲
///   └── page aligned, zero filled, committed lazily by the kernel
/// ```
///
/// The mapping is acquired once and released when the bulk is dropped. Pools
/// address it by byte offset; raw pointers only exist at the API boundary.
pub struct MemoryBulk {
  base: NonNull<u8>,
  len: usize,
}

// The mapping is exclusively owned; nothing else aliases it.
unsafe impl Send for MemoryBulk {}

impl MemoryBulk {
  pub fn map(len: usize) -> Result<Self, PoolError> {
    debug_assert!(len > 0, "empty bulk");

    let address = unsafe {
      mmap(
        ptr::null_mut(),
        len,
        PROT_READ | PROT_WRITE,
        MAP_PRIVATE | MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if address == MAP_FAILED {
      let source = io::Error::last_os_error();
      tracing::warn!(size = len, error = %source, "memory bulk mapping failed");
      return Err(PoolError::BulkMap { size: len, source });
    }

    let base = NonNull::new(address as *mut u8).ok_or_else(|| PoolError::BulkMap {
      size: len,
      source: io::Error::other("mmap returned a null mapping"),
    })?;

    Ok(Self { base, len })
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.len
  }

  #[inline]
  pub fn bytes(&self) -> &[u8] {
    unsafe { slice::from_raw_parts(self.base.as_ptr(), self.len) }
  }

  #[inline]
  pub fn bytes_mut(&mut self) -> &mut [u8] {
    unsafe { slice::from_raw_parts_mut(self.base.as_ptr(), self.len) }
  }

  /// Pointer handed to callers for the byte at `offset`.
  #[inline]
  pub fn ptr_at(
    &self,
    offset: usize,
  ) -> NonNull<u8> {
    debug_assert!(offset < self.len, "offset {offset} outside of bulk");
    unsafe { self.base.add(offset) }
  }

  /// Offset of a pointer previously produced by [`MemoryBulk::ptr_at`].
  #[inline]
  pub fn offset_of(
    &self,
    ptr: NonNull<u8>,
  ) -> usize {
    let offset = (ptr.as_ptr() as usize).wrapping_sub(self.base.as_ptr() as usize);
    debug_assert!(offset < self.len, "pointer {ptr:?} is not managed by this bulk");
    offset
  }

  #[inline]
  pub fn contains(
    &self,
    ptr: NonNull<u8>,
  ) -> bool {
    (ptr.as_ptr() as usize).wrapping_sub(self.base.as_ptr() as usize) < self.len
  }

  #[inline]
  pub fn read_u32(
    &self,
    offset: usize,
  ) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&self.bytes()[offset..offset + 4]);
    u32::from_ne_bytes(word)
  }

  #[inline]
  pub fn write_u32(
    &mut self,
    offset: usize,
    value: u32,
  ) {
    self.bytes_mut()[offset..offset + 4].copy_from_slice(&value.to_ne_bytes());
  }
}

impl Drop for MemoryBulk {
  fn drop(&mut self) {
    let result = unsafe { munmap(self.base.as_ptr() as *mut c_void, self.len) };
    if result != 0 {
      tracing::warn!(
        size = self.len,
        error = %io::Error::last_os_error(),
        "memory bulk unmapping failed"
      );
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_map_is_zeroed_and_writable() {
    let mut bulk = MemoryBulk::map(4096).unwrap();

    assert_eq!(4096, bulk.len());
    assert!(bulk.bytes().iter().all(|byte| *byte == 0));

    bulk.write_u32(128, 0xDEAD_BEEF);
    assert_eq!(0xDEAD_BEEF, bulk.read_u32(128));
  }

  #[test]
  fn test_offset_roundtrip() {
    let bulk = MemoryBulk::map(256).unwrap();

    let ptr = bulk.ptr_at(48);
    assert_eq!(48, bulk.offset_of(ptr));
    assert!(bulk.contains(ptr));
    assert!(crate::is_aligned!(bulk.ptr_at(0).as_ptr() as usize, 16));
  }

  #[test]
  fn test_foreign_pointer_not_contained() {
    let bulk = MemoryBulk::map(256).unwrap();
    let mut outside = 0u8;

    assert!(!bulk.contains(NonNull::from(&mut outside)));
  }
}
