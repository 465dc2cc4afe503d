/// Rounds `value` up to the next multiple of `align`, which must be a power of two.
///
/// # Examples
///
/// ```rust
/// use bulkpool::align_up;
///
/// assert_eq!(align_up!(13usize, 8), 16);
/// assert_eq!(align_up!(16usize, 8), 16);
/// assert_eq!(align_up!(17usize, 16), 32);
/// ```
#[macro_export]
macro_rules! align_up {
  ($value:expr, $align:expr) => {
    (($value) + ($align) - 1) & !(($align) - 1)
  };
}

/// Checks whether `value` is a multiple of `align`, which must be a power of two.
///
/// ```rust
/// use bulkpool::is_aligned;
///
/// assert!(is_aligned!(48usize, 16));
/// assert!(!is_aligned!(40usize, 16));
/// ```
#[macro_export]
macro_rules! is_aligned {
  ($value:expr, $align:expr) => {
    (($value) & (($align) - 1)) == 0
  };
}

/// Smallest power of two `>= size`, clamped into `[1 << min_shift, 1 << max_shift]`.
pub(crate) fn promote_pow2(
  size: usize,
  min_shift: u32,
  max_shift: u32,
) -> usize {
  let max = 1usize << max_shift;
  if size >= max {
    return max;
  }
  size.max(1 << min_shift).next_power_of_two()
}

/// `log2` of a power of two.
#[inline]
pub(crate) const fn log2(value: usize) -> u32 {
  value.trailing_zeros()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_align_up() {
    let word = 8usize;

    let mut alignments = Vec::new();

    for i in 0..10 {
      let sizes = (word * i + 1)..=(word * (i + 1));

      let expected_alignment = word * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align_up!(size, word));
      }
    }

    assert_eq!(0, align_up!(0usize, word));
  }

  #[test]
  fn test_is_aligned() {
    for value in (0..1024usize).step_by(16) {
      assert!(is_aligned!(value, 16));
      assert!(!is_aligned!(value + 8, 16));
    }
  }

  #[test]
  fn test_promote_pow2() {
    assert_eq!(16, promote_pow2(0, 4, 31));
    assert_eq!(16, promote_pow2(1, 4, 31));
    assert_eq!(16, promote_pow2(16, 4, 31));
    assert_eq!(32, promote_pow2(17, 4, 31));
    assert_eq!(1024, promote_pow2(1000, 4, 31));
    assert_eq!(1 << 31, promote_pow2((1 << 31) - 1, 4, 31));
    assert_eq!(1 << 31, promote_pow2(usize::MAX, 4, 31));
  }

  #[test]
  fn test_log2() {
    assert_eq!(4, log2(16));
    assert_eq!(16, log2(65536));
  }
}
