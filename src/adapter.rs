use std::{
  alloc::{GlobalAlloc, Layout},
  ptr::{self, NonNull},
};

use parking_lot::Mutex;

use crate::pool::Pool;

/// Exposes a pool through [`GlobalAlloc`].
///
/// Only [`Pool::alloc`], [`Pool::dealloc`] and [`Pool::capacity`] are used. The
/// pool sits behind a mutex, so one adapter may be shared between threads even
/// though pools themselves are unsynchronized.
pub struct PoolAlloc<P> {
  pool: Mutex<P>,
}

impl<P: Pool> PoolAlloc<P> {
  pub fn new(pool: P) -> Self {
    Self { pool: Mutex::new(pool) }
  }

  pub fn capacity(&self) -> usize {
    self.pool.lock().capacity()
  }

  pub fn into_inner(self) -> P {
    self.pool.into_inner()
  }
}

unsafe impl<P: Pool> GlobalAlloc for PoolAlloc<P> {
  unsafe fn alloc(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() > P::ALIGN {
      return ptr::null_mut();
    }

    self
      .pool
      .lock()
      .alloc(layout.size())
      .map_or(ptr::null_mut(), NonNull::as_ptr)
  }

  unsafe fn dealloc(
    &self,
    ptr: *mut u8,
    layout: Layout,
  ) {
    if let Some(ptr) = NonNull::new(ptr) {
      unsafe { self.pool.lock().dealloc(ptr, layout.size()) }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::{sync::Arc, thread};

  use super::*;
  use crate::{buddy::BuddyPool, linear::LinearPool};

  #[test]
  fn test_forwards_to_pool() {
    let adapter = PoolAlloc::new(BuddyPool::new(4096).unwrap());
    assert_eq!(4096, adapter.capacity());

    unsafe {
      let layout = Layout::new::<[u64; 8]>();
      let ptr = adapter.alloc(layout);
      assert!(!ptr.is_null());
      assert_eq!(64, adapter.pool.lock().used());

      adapter.dealloc(ptr, layout);
    }

    assert_eq!(0, adapter.into_inner().used());
  }

  #[test]
  fn test_rejects_overaligned_layouts() {
    let adapter = PoolAlloc::new(LinearPool::new(4096).unwrap());

    unsafe {
      let layout = Layout::from_size_align(32, 16).unwrap();
      assert!(adapter.alloc(layout).is_null());

      let layout = Layout::from_size_align(32, 8).unwrap();
      let ptr = adapter.alloc(layout);
      assert!(!ptr.is_null());
      adapter.dealloc(ptr, layout);
    }
  }

  #[test]
  fn test_default_realloc_goes_through_pool() {
    let adapter = PoolAlloc::new(BuddyPool::new(4096).unwrap());

    unsafe {
      let layout = Layout::from_size_align(16, 16).unwrap();
      let ptr = adapter.alloc(layout);
      ptr.write(0x42);

      let grown = adapter.realloc(ptr, layout, 1024);
      assert!(!grown.is_null());
      assert_eq!(0x42, grown.read());
      assert_eq!(1024, adapter.pool.lock().used());

      adapter.dealloc(grown, Layout::from_size_align(1024, 16).unwrap());
    }
  }

  #[test]
  fn test_shared_between_threads() {
    let adapter = Arc::new(PoolAlloc::new(BuddyPool::new(1 << 20).unwrap()));

    let workers: Vec<_> = (0..4)
      .map(|_| {
        let adapter = Arc::clone(&adapter);
        thread::spawn(move || {
          let layout = Layout::from_size_align(256, 16).unwrap();
          for _ in 0..100 {
            unsafe {
              let ptr = adapter.alloc(layout);
              assert!(!ptr.is_null());
              ptr.write_bytes(0xAB, 256);
              adapter.dealloc(ptr, layout);
            }
          }
        })
      })
      .collect();

    for worker in workers {
      worker.join().unwrap();
    }

    assert_eq!(0, adapter.pool.lock().used());
  }
}
