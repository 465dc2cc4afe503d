/// Smallest block the buddy pool hands out, in bytes.
pub const MIN_BLOCK_SIZE: usize = 16;

pub(crate) const MIN_BLOCK_SHIFT: u32 = 4;

/// A buddy block, named by its tier and its index within that tier.
///
/// ```text
///   tier 0  ┌───────────────────────────────────────────────┐
///           │                      0                        │
///   tier 1  ├───────────────────────┬───────────────────────┤
///           │           0           │           1           │
///   tier 2  ├───────────┬───────────┼───────────┬───────────┤
///           │     0     │     1     │     2     │     3     │
///           └───────────┴───────────┴───────────┴───────────┘
///
///   buddy(2, 1) = (2, 0)      parent(2, 3) = (1, 1)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockRef {
  pub tier: u32,
  pub id: u32,
}

impl BlockRef {
  pub const ROOT: Self = Self { tier: 0, id: 0 };

  pub fn new(
    tier: u32,
    id: u32,
  ) -> Self {
    debug_assert!(tier < 32 && u64::from(id) < (1u64 << tier), "block ({tier}, {id}) does not exist");
    Self { tier, id }
  }

  #[inline]
  pub fn buddy(self) -> Self {
    Self { tier: self.tier, id: self.id ^ 1 }
  }

  #[inline]
  pub fn parent(self) -> Self {
    debug_assert!(self.tier > 0, "the root block has no parent");
    Self { tier: self.tier - 1, id: self.id >> 1 }
  }

  /// First half of this block once split.
  #[inline]
  pub fn left_child(self) -> Self {
    Self { tier: self.tier + 1, id: self.id << 1 }
  }

  /// Position of this block's bit in the tier bitmap.
  #[inline]
  pub fn bit_index(self) -> usize {
    (1usize << self.tier) + self.id as usize
  }
}

/// Block geometry for a bulk of `capacity` bytes split into `tier_count` tiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
  pub capacity: usize,
  pub tier_count: u32,
}

impl Geometry {
  /// `capacity` must be a power of two no smaller than [`MIN_BLOCK_SIZE`].
  pub fn new(capacity: usize) -> Self {
    debug_assert!(capacity.is_power_of_two() && capacity >= MIN_BLOCK_SIZE);
    let tier_count = crate::align::log2(capacity) - MIN_BLOCK_SHIFT + 1;
    Self { capacity, tier_count }
  }

  #[inline]
  pub fn block_size(
    &self,
    tier: u32,
  ) -> usize {
    MIN_BLOCK_SIZE << (self.tier_count - 1 - tier)
  }

  #[inline]
  pub fn deepest_tier(&self) -> u32 {
    self.tier_count - 1
  }

  /// Deepest tier whose blocks still hold `size` bytes.
  pub fn tier_for(
    &self,
    size: usize,
  ) -> Option<u32> {
    if size == 0 || size > self.capacity {
      return None;
    }
    let class = size.max(MIN_BLOCK_SIZE).next_power_of_two();
    Some(crate::align::log2(self.capacity) - crate::align::log2(class))
  }

  #[inline]
  pub fn offset_of(
    &self,
    block: BlockRef,
  ) -> usize {
    block.id as usize * self.block_size(block.tier)
  }

  /// The block of `tier` starting exactly at `offset`, if `offset` is aligned to that tier.
  #[inline]
  pub fn block_at(
    &self,
    tier: u32,
    offset: usize,
  ) -> Option<BlockRef> {
    let size = self.block_size(tier);
    if !crate::is_aligned!(offset, size) || offset >= self.capacity {
      return None;
    }
    Some(BlockRef { tier, id: (offset / size) as u32 })
  }
}
