use std::ptr::NonNull;

use crate::{
  align::promote_pow2,
  bitmap::TierBitmap,
  block::{BlockRef, Geometry, MIN_BLOCK_SHIFT, MIN_BLOCK_SIZE},
  bulk::MemoryBulk,
  error::PoolError,
  pool::Pool,
};

/// Largest bulk a buddy pool manages: 2 GiB.
pub const MAX_BUDDY_SHIFT: u32 = 31;

/// Free-list terminator.
const NIL: u32 = u32::MAX;

/// Free-list node size, stored in the last bytes of every free block.
const NODE_SIZE: usize = 8;

/// Buddy-system allocator over one power-of-two bulk.
///
/// ```text
///   alloc(3000) on a fresh 16 KiB pool:
///
///   tier 0  [               16K (split)              ]
///   tier 1  [      8K (split)     ][    8K  free     ]
///   tier 2  [ 4K used ][ 4K free  ]
///                ▲
///                └── returned, 16-byte aligned
///
///   Free blocks are chained per tier through a node written into their last
///   eight bytes:
///
///   ┌──────────────────────────────┬──────────┬──────────┐
///   │          free bytes          │ prev: u32│ next: u32│
///   └──────────────────────────────┴──────────┴──────────┘
/// ```
///
/// Freeing a block merges it with its buddy for as long as the buddy is free too,
/// so both split and merge walk at most one block per tier.
pub struct BuddyPool {
  bulk: MemoryBulk,
  geometry: Geometry,
  in_use: TierBitmap,
  heads: Box<[u32]>,
  used: usize,
  hwm: usize,
}

impl BuddyPool {
  /// Creates a pool of the smallest power of two in `[16, 2^31]` holding `size` bytes.
  pub fn new(size: usize) -> Result<Self, PoolError> {
    let capacity = promote_pow2(size, MIN_BLOCK_SHIFT, MAX_BUDDY_SHIFT);
    let geometry = Geometry::new(capacity);
    let bulk = MemoryBulk::map(capacity)?;

    let mut pool = Self {
      bulk,
      geometry,
      in_use: TierBitmap::new(geometry.tier_count),
      heads: vec![NIL; geometry.tier_count as usize].into_boxed_slice(),
      used: 0,
      hwm: 0,
    };

    pool.in_use.set(BlockRef::ROOT);
    pool.recycle(BlockRef::ROOT);

    tracing::debug!(
      requested = size,
      capacity,
      tiers = geometry.tier_count,
      bitmap_bytes = pool.in_use.footprint(),
      "buddy pool created"
    );

    Ok(pool)
  }

  pub fn tier_count(&self) -> u32 {
    self.geometry.tier_count
  }

  /// Size of the block backing `ptr`, or 0 if `ptr` is not a live block of this pool.
  pub fn usable_size(
    &self,
    ptr: NonNull<u8>,
  ) -> usize {
    if !self.bulk.contains(ptr) {
      return 0;
    }
    self
      .locate(self.bulk.offset_of(ptr))
      .map_or(0, |block| self.geometry.block_size(block.tier))
  }

  fn node_offset(
    &self,
    block: BlockRef,
  ) -> usize {
    self.geometry.offset_of(block) + self.geometry.block_size(block.tier) - NODE_SIZE
  }

  fn links(
    &self,
    block: BlockRef,
  ) -> (u32, u32) {
    let node = self.node_offset(block);
    (self.bulk.read_u32(node), self.bulk.read_u32(node + 4))
  }

  fn set_prev(
    &mut self,
    block: BlockRef,
    prev: u32,
  ) {
    let node = self.node_offset(block);
    self.bulk.write_u32(node, prev);
  }

  fn set_next(
    &mut self,
    block: BlockRef,
    next: u32,
  ) {
    let node = self.node_offset(block);
    self.bulk.write_u32(node + 4, next);
  }

  fn push(
    &mut self,
    block: BlockRef,
  ) {
    let tier = block.tier as usize;
    let head = self.heads[tier];

    self.set_prev(block, NIL);
    self.set_next(block, head);

    if head != NIL {
      self.set_prev(BlockRef::new(block.tier, head), block.id);
    }

    self.heads[tier] = block.id;
  }

  fn unlink(
    &mut self,
    block: BlockRef,
  ) {
    let (prev, next) = self.links(block);

    if prev == NIL {
      debug_assert_eq!(self.heads[block.tier as usize], block.id, "free list head corrupted");
      self.heads[block.tier as usize] = next;
    } else {
      self.set_next(BlockRef::new(block.tier, prev), next);
    }

    if next != NIL {
      self.set_prev(BlockRef::new(block.tier, next), prev);
    }
  }

  fn pop(
    &mut self,
    tier: u32,
  ) -> Option<BlockRef> {
    let head = self.heads[tier as usize];
    if head == NIL {
      return None;
    }

    let block = BlockRef::new(tier, head);
    self.unlink(block);
    Some(block)
  }

  /// Hands out a block of `tier`, splitting larger blocks when the tier is empty.
  fn obtain(
    &mut self,
    tier: u32,
  ) -> Option<BlockRef> {
    if let Some(block) = self.pop(tier) {
      self.in_use.set(block);
      return Some(block);
    }

    if tier == 0 {
      return None;
    }

    let parent = self.obtain(tier - 1)?;
    let first = parent.left_child();
    let second = first.buddy();

    self.in_use.set(first);
    self.in_use.set(second);
    self.recycle(second);

    Some(first)
  }

  /// Returns a block to its tier, merging with the buddy while the buddy is free.
  fn recycle(
    &mut self,
    block: BlockRef,
  ) {
    self.in_use.clear(block);

    if block.tier == 0 || self.in_use.is_set(block.buddy()) {
      self.push(block);
      return;
    }

    self.unlink(block.buddy());
    self.recycle(block.parent());
  }

  /// A block handed out to a caller: in use, and not split.
  fn is_live(
    &self,
    block: BlockRef,
  ) -> bool {
    if !self.in_use.is_set(block) {
      return false;
    }
    if block.tier == self.geometry.deepest_tier() {
      return true;
    }
    let left = block.left_child();
    !self.in_use.is_set(left) && !self.in_use.is_set(left.buddy())
  }

  /// Finds the live block starting at `offset`, probing from the smallest tier up.
  fn locate(
    &self,
    offset: usize,
  ) -> Option<BlockRef> {
    for tier in (0..self.geometry.tier_count).rev() {
      // Misaligned for this tier means misaligned for every larger one.
      let block = self.geometry.block_at(tier, offset)?;
      if self.in_use.is_set(block) {
        return self.is_live(block).then_some(block);
      }
    }
    None
  }

  fn release(
    &mut self,
    block: BlockRef,
  ) {
    self.used -= self.geometry.block_size(block.tier);
    self.recycle(block);
  }

  fn relocate(
    &mut self,
    from: BlockRef,
    to: NonNull<u8>,
    len: usize,
  ) {
    let source = self.geometry.offset_of(from);
    let target = self.bulk.offset_of(to);
    self.bulk.bytes_mut().copy_within(source..source + len, target);
    self.release(from);
  }
}

impl Pool for BuddyPool {
  const ALIGN: usize = MIN_BLOCK_SIZE;

  fn with_capacity(size: usize) -> Result<Self, PoolError> {
    Self::new(size)
  }

  fn capacity(&self) -> usize {
    self.geometry.capacity
  }

  fn available(&self) -> usize {
    self
      .heads
      .iter()
      .position(|head| *head != NIL)
      .map_or(0, |tier| self.geometry.block_size(tier as u32))
  }

  fn used(&self) -> usize {
    self.used
  }

  fn hwm(&self) -> usize {
    self.hwm
  }

  fn reset(&mut self) -> usize {
    std::mem::take(&mut self.hwm)
  }

  fn alloc(
    &mut self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    let tier = self.geometry.tier_for(size)?;
    let block = self.obtain(tier)?;

    self.used += self.geometry.block_size(tier);
    self.hwm = self.hwm.max(self.used);

    Some(self.bulk.ptr_at(self.geometry.offset_of(block)))
  }

  unsafe fn dealloc(
    &mut self,
    ptr: NonNull<u8>,
    size: usize,
  ) {
    let offset = self.bulk.offset_of(ptr);

    let hinted = self
      .geometry
      .tier_for(size)
      .and_then(|tier| self.geometry.block_at(tier, offset))
      .filter(|block| self.is_live(*block));

    match hinted.or_else(|| self.locate(offset)) {
      Some(block) => self.release(block),
      None => debug_assert!(false, "dealloc of {ptr:?}, which is not a live block"),
    }
  }

  unsafe fn free(
    &mut self,
    ptr: NonNull<u8>,
  ) {
    match self.locate(self.bulk.offset_of(ptr)) {
      Some(block) => self.release(block),
      None => debug_assert!(false, "free of {ptr:?}, which is not a live block"),
    }
  }

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

    let Some(block) = self.locate(self.bulk.offset_of(ptr)) else {
      debug_assert!(false, "realloc of {ptr:?}, which is not a live block");
      return None;
    };
    let block_size = self.geometry.block_size(block.tier);

    if size > block_size {
      let grown = self.alloc(size)?;
      self.relocate(block, grown, block_size);
      return Some(grown);
    }

    // Shrinking only pays off once the request fits a smaller tier; the
    // (half, full] band keeps its block.
    if size <= block_size / 2 && block_size > MIN_BLOCK_SIZE {
      let Some(shrunk) = self.alloc(size) else {
        return Some(ptr);
      };
      self.relocate(block, shrunk, size);
      return Some(shrunk);
    }

    Some(ptr)
  }
}
