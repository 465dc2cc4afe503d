use crate::{config::RegistryConfig, error::PoolError, pool::Pool};

/// Number of slots a registry holds.
pub const SLOT_COUNT: usize = 256;

/// A table of pool instances addressed by a small slot id.
///
/// Each slot holds at most one pool; an occupied slot is never resized.
///
/// ```rust
/// use bulkpool::{BuddyPool, Pool, PoolRegistry};
///
/// let mut registry = PoolRegistry::<BuddyPool>::new();
///
/// assert_eq!(1024, registry.create(1000, 0));
/// assert!(registry.instance_mut(0).and_then(|pool| pool.alloc(64)).is_some());
///
/// registry.destroy(0);
/// assert!(registry.instance(0).is_none());
/// ```
pub struct PoolRegistry<P> {
  slots: Box<[Option<P>]>,
}

impl<P: Pool> PoolRegistry<P> {
  pub fn new() -> Self {
    Self { slots: (0..SLOT_COUNT).map(|_| None).collect() }
  }

  /// Builds a registry with every slot named in `config` created.
  pub fn from_config(config: &RegistryConfig) -> Result<Self, PoolError> {
    let mut registry = Self::new();
    for slot in &config.slots {
      registry.try_create(slot.size, slot.id)?;
    }
    Ok(registry)
  }

  /// Creates the pool of `slot` and returns its actual capacity, or 0 when the
  /// slot id is out of range or the memory bulk cannot be acquired.
  pub fn create(
    &mut self,
    size: usize,
    slot: usize,
  ) -> u32 {
    self
      .try_create(size, slot)
      .map_or(0, |capacity| u32::try_from(capacity).unwrap_or(0))
  }

  /// Like [`PoolRegistry::create`], reporting why creation failed.
  pub fn try_create(
    &mut self,
    size: usize,
    slot: usize,
  ) -> Result<usize, PoolError> {
    let entry = self.slots.get_mut(slot).ok_or(PoolError::InvalidSlot(slot))?;

    if let Some(pool) = entry {
      tracing::warn!(slot, requested = size, capacity = pool.capacity(), "slot already holds a pool");
      return Ok(pool.capacity());
    }

    let pool = P::with_capacity(size)?;
    let capacity = pool.capacity();
    *entry = Some(pool);

    tracing::info!(slot, requested = size, capacity, "pool created");

    Ok(capacity)
  }

  /// Drops the pool of `slot`, if any.
  pub fn destroy(
    &mut self,
    slot: usize,
  ) {
    if let Some(pool) = self.slots.get_mut(slot).and_then(Option::take) {
      tracing::info!(slot, capacity = pool.capacity(), hwm = pool.hwm(), "pool destroyed");
    }
  }

  pub fn instance(
    &self,
    slot: usize,
  ) -> Option<&P> {
    self.slots.get(slot)?.as_ref()
  }

  pub fn instance_mut(
    &mut self,
    slot: usize,
  ) -> Option<&mut P> {
    self.slots.get_mut(slot)?.as_mut()
  }

  /// Ids of the occupied slots, in ascending order.
  pub fn occupied(&self) -> impl Iterator<Item = usize> + '_ {
    self
      .slots
      .iter()
      .enumerate()
      .filter_map(|(slot, pool)| pool.as_ref().map(|_| slot))
  }
}

impl<P: Pool> Default for PoolRegistry<P> {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{buddy::BuddyPool, config::SlotConfig, linear::LinearPool};

  #[test]
  fn test_create_promotes_buddy_capacity() {
    let mut registry = PoolRegistry::<BuddyPool>::new();

    let capacity = registry.create(1000, 0);
    assert!(capacity.is_power_of_two());
    assert!((1000..=2000).contains(&capacity));
    assert_eq!(capacity as usize, registry.instance(0).unwrap().capacity());
  }

  #[test]
  fn test_invalid_slot() {
    let mut registry = PoolRegistry::<LinearPool>::new();

    assert_eq!(0, registry.create(1024, SLOT_COUNT));
    assert!(matches!(registry.try_create(1024, 999), Err(PoolError::InvalidSlot(999))));
    assert!(registry.instance(SLOT_COUNT).is_none());

    registry.destroy(SLOT_COUNT);
  }

  #[test]
  fn test_occupied_slot_is_not_resized() {
    let mut registry = PoolRegistry::<LinearPool>::new();

    assert_eq!(1000, registry.create(1000, 7));
    assert_eq!(1000, registry.create(4096, 7));
    assert_eq!(vec![7], registry.occupied().collect::<Vec<_>>());
  }

  #[test]
  fn test_destroy_then_recreate() {
    let mut registry = PoolRegistry::<BuddyPool>::new();

    registry.create(4096, 255);
    let pool = registry.instance_mut(255).unwrap();
    let _ = pool.alloc(100).unwrap();
    assert_eq!(128, pool.used());

    registry.destroy(255);
    registry.destroy(255);
    assert!(registry.instance(255).is_none());

    assert_eq!(8192, registry.create(8192, 255));
    assert_eq!(0, registry.instance(255).unwrap().used());
  }

  #[test]
  fn test_from_config() {
    let config = RegistryConfig {
      slots: vec![SlotConfig { id: 1, size: 100 }, SlotConfig { id: 3, size: 5000 }],
    };

    let registry = PoolRegistry::<BuddyPool>::from_config(&config).unwrap();

    assert_eq!(vec![1, 3], registry.occupied().collect::<Vec<_>>());
    assert_eq!(128, registry.instance(1).unwrap().capacity());
    assert_eq!(8192, registry.instance(3).unwrap().capacity());
  }

  #[test]
  fn test_from_config_rejects_bad_slot() {
    let config = RegistryConfig {
      slots: vec![SlotConfig { id: 300, size: 100 }],
    };

    assert!(matches!(
      PoolRegistry::<LinearPool>::from_config(&config),
      Err(PoolError::InvalidSlot(300))
    ));
  }
}
