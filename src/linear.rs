use std::ptr::NonNull;

use crate::{align_up, bulk::MemoryBulk, error::PoolError, is_aligned, pool::Pool};

pub const MIN_LINEAR_SIZE: usize = 16;
pub const MAX_LINEAR_SIZE: usize = 1 << 31;

const HEADER_SIZE: usize = 8;
const CELL_ALIGN: usize = 8;
const FREED: u32 = 1 << 31;
const OFFSET_MASK: u32 = !FREED;
const CHECKSUM_MAGIC: u32 = 0x5EED_CE11;

/// Decoded cell header.
///
/// ```text
///   ┌──────┬───────────────────────┬───────────────────────────┐
///   │ bit  │ 31        prev  0..30 │ checksum = prev ^ MAGIC   │
///   │      │ freed                 │                           │
///   └──────┴───────────────────────┴───────────────────────────┘
///          word 0                   word 1
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CellHeader {
  prev: u32,
  freed: bool,
}

impl CellHeader {
  fn words(self) -> (u32, u32) {
    let flag = if self.freed { FREED } else { 0 };
    (self.prev | flag, self.prev ^ CHECKSUM_MAGIC)
  }

  fn from_words(
    tagged: u32,
    checksum: u32,
  ) -> Option<Self> {
    let prev = tagged & OFFSET_MASK;
    (prev ^ CHECKSUM_MAGIC == checksum).then_some(Self { prev, freed: tagged & FREED != 0 })
  }
}

/// Stack-style allocator: bump allocation with deferred out-of-order free.
///
/// ```text
///   0                                   previous          current      capacity
///   ┌──────┬─────────┬──────┬─────────┬──────┬─────────┬──────────────────────┐
///   │ hdr  │  cell A │ hdr  │  cell B │ hdr  │  cell C │        free          │
///   └──────┴─────────┴──────┴─────────┴──────┴─────────┴──────────────────────┘
///     ▲                │ ▲                │
///     └── prev ────────┘ └── prev ────────┘
/// ```
///
/// Freeing a cell below the top only flags its header. Freeing the top cell
/// moves `current` back over it and over every flagged cell directly beneath.
pub struct LinearPool {
  bulk: MemoryBulk,
  current: usize,
  previous: usize,
  hwm: usize,
}

impl LinearPool {
  /// Creates a pool of `size` bytes, clamped into `[16, 2^31]` and rounded up to 8.
  pub fn new(size: usize) -> Result<Self, PoolError> {
    let capacity = align_up!(size.clamp(MIN_LINEAR_SIZE, MAX_LINEAR_SIZE), CELL_ALIGN);
    let bulk = MemoryBulk::map(capacity)?;

    tracing::debug!(requested = size, capacity, "linear pool created");

    Ok(Self {
      bulk,
      current: 0,
      previous: 0,
      hwm: 0,
    })
  }

  /// Offset of the next free byte.
  pub fn current(&self) -> usize {
    self.current
  }

  /// Offset of the header of the most recent live cell.
  pub fn previous(&self) -> usize {
    self.previous
  }

  fn header(
    &self,
    cell: usize,
  ) -> Option<CellHeader> {
    CellHeader::from_words(self.bulk.read_u32(cell), self.bulk.read_u32(cell + 4))
  }

  fn write_header(
    &mut self,
    cell: usize,
    header: CellHeader,
  ) {
    let (tagged, checksum) = header.words();
    self.bulk.write_u32(cell, tagged);
    self.bulk.write_u32(cell + 4, checksum);
  }

  /// Header offset of a pointer handed out by this pool.
  fn cell_of(
    &self,
    ptr: NonNull<u8>,
  ) -> Option<usize> {
    if !self.bulk.contains(ptr) {
      return None;
    }
    let offset = self.bulk.offset_of(ptr);
    if offset >= self.current || !is_aligned!(offset, CELL_ALIGN) {
      return None;
    }
    offset.checked_sub(HEADER_SIZE)
  }

  fn roll_back(
    &mut self,
    mut cell: usize,
    mut header: CellHeader,
  ) {
    loop {
      self.current = cell;

      if cell == 0 {
        self.previous = 0;
        return;
      }

      self.previous = header.prev as usize;

      let Some(below) = self.header(self.previous) else {
        debug_assert!(false, "corrupted cell header at offset {}", self.previous);
        return;
      };

      if !below.freed {
        return;
      }

      cell = self.previous;
      header = below;
    }
  }
}

impl Pool for LinearPool {
  const ALIGN: usize = CELL_ALIGN;

  fn with_capacity(size: usize) -> Result<Self, PoolError> {
    Self::new(size)
  }

  fn capacity(&self) -> usize {
    self.bulk.len()
  }

  fn available(&self) -> usize {
    self.bulk.len().saturating_sub(self.current + HEADER_SIZE)
  }

  fn used(&self) -> usize {
    self.current
  }

  fn hwm(&self) -> usize {
    self.hwm
  }

  /// Drops every cell at once. Outstanding pointers become dangling.
  fn reset(&mut self) -> usize {
    self.current = 0;
    self.previous = 0;
    std::mem::take(&mut self.hwm)
  }

  fn alloc(
    &mut self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    if size == 0 {
      return None;
    }

    let needed = size.checked_add(HEADER_SIZE + CELL_ALIGN - 1)? & !(CELL_ALIGN - 1);
    if needed > self.bulk.len() - self.current {
      return None;
    }

    let cell = self.current;
    self.write_header(
      cell,
      CellHeader {
        prev: self.previous as u32,
        freed: false,
      },
    );

    self.previous = cell;
    self.current += needed;
    self.hwm = self.hwm.max(self.current);

    Some(self.bulk.ptr_at(cell + HEADER_SIZE))
  }

  /// Same as [`Pool::free`]; cells remember their own extent.
  unsafe fn dealloc(
    &mut self,
    ptr: NonNull<u8>,
    _size: usize,
  ) {
    unsafe { self.free(ptr) }
  }

  unsafe fn free(
    &mut self,
    ptr: NonNull<u8>,
  ) {
    let Some(cell) = self.cell_of(ptr) else {
      debug_assert!(false, "free of {ptr:?}, which is not a live cell");
      return;
    };

    let Some(header) = self.header(cell) else {
      debug_assert!(false, "checksum mismatch in cell header at offset {cell}");
      return;
    };
    debug_assert!(!header.freed, "double free of cell at offset {cell}");

    let header = CellHeader { freed: true, ..header };
    self.write_header(cell, header);

    if cell == self.previous {
      self.roll_back(cell, header);
    }
  }

  /// Always moves the data into a fresh cell. The old size is unknown, so only
  /// the first `size` bytes are guaranteed to carry over.
  unsafe fn realloc(
    &mut self,
    ptr: Option<NonNull<u8>>,
    size: usize,
  ) -> Option<NonNull<u8>> {
    let Some(ptr) = ptr else {
      return self.alloc(size);
    };

    if size == 0 {
      unsafe { self.free(ptr) };
      return None;
    }

    let source = self.bulk.offset_of(ptr);
    let extent = self.current.saturating_sub(source);

    let fresh = self.alloc(size)?;
    let target = self.bulk.offset_of(fresh);
    let len = size.min(extent);
    self.bulk.bytes_mut().copy_within(source..source + len, target);

    unsafe { self.free(ptr) };

    Some(fresh)
  }
}
