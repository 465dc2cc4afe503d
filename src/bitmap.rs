use crate::block::BlockRef;

/// One in-use bit per buddy block, across every tier.
///
/// A set bit means the block is handed out or has been split; free blocks are clear.
pub struct TierBitmap {
  words: Box<[u64]>,
}

impl TierBitmap {
  pub fn new(tier_count: u32) -> Self {
    // Indices run up to (1 << tier_count) - 1; slot 0 is never used.
    let bits = 1usize << tier_count;
    let words = bits.div_ceil(64);
    Self { words: vec![0u64; words].into_boxed_slice() }
  }

  #[inline]
  pub fn is_set(
    &self,
    block: BlockRef,
  ) -> bool {
    let index = block.bit_index();
    self.words[index >> 6] & (1 << (index & 63)) != 0
  }

  #[inline]
  pub fn set(
    &mut self,
    block: BlockRef,
  ) {
    let index = block.bit_index();
    self.words[index >> 6] |= 1 << (index & 63);
  }

  #[inline]
  pub fn clear(
    &mut self,
    block: BlockRef,
  ) {
    let index = block.bit_index();
    self.words[index >> 6] &= !(1 << (index & 63));
  }

  /// Heap bytes held by the bitmap.
  pub fn footprint(&self) -> usize {
    self.words.len() * 8
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_set_and_clear() {
    let mut bitmap = TierBitmap::new(8);
    let block = BlockRef::new(7, 100);

    assert!(!bitmap.is_set(block));
    bitmap.set(block);
    assert!(bitmap.is_set(block));
    assert!(!bitmap.is_set(block.buddy()));
    bitmap.clear(block);
    assert!(!bitmap.is_set(block));
  }

  #[test]
  fn test_footprint_tracks_capacity() {
    // 64 KiB bulk: 13 tiers, capacity / 64 bytes of bits.
    assert_eq!(65536 / 64, TierBitmap::new(13).footprint());
    assert_eq!(8, TierBitmap::new(1).footprint());
  }
}
