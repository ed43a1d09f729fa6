//! Pool of tree prototype models awaiting placement.

use std::sync::Arc;

use rand::Rng;

use crate::assets::ModelAsset;

/// A pre-loaded tree model. Owned by value, so it is either in the pool or
/// inside exactly one placed tree.
#[derive(Debug)]
pub struct TreePrototype {
    pub model: Arc<ModelAsset>,
}

#[derive(Debug, Default)]
pub struct TreePool {
    available: Vec<TreePrototype>,
    capacity: usize,
}

impl TreePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a full pool, one prototype per model.
    pub fn from_models(models: impl IntoIterator<Item = Arc<ModelAsset>>) -> Self {
        let available: Vec<_> = models.into_iter().map(|model| TreePrototype { model }).collect();
        Self {
            capacity: available.len(),
            available,
        }
    }

    /// Remove a uniformly random prototype. `None` when exhausted.
    pub fn take_random<R: Rng>(&mut self, rng: &mut R) -> Option<TreePrototype> {
        if self.available.is_empty() {
            return None;
        }
        let idx = rng.gen_range(0..self.available.len());
        Some(self.available.swap_remove(idx))
    }

    /// Return a prototype detached from an unloaded tree.
    pub fn give_back(&mut self, prototype: TreePrototype) {
        debug_assert!(self.available.len() < self.capacity, "pool over capacity");
        self.available.push(prototype);
    }

    pub fn available(&self) -> usize {
        self.available.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::FileAsset;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pool(n: usize) -> TreePool {
        TreePool::from_models((0..n).map(|_| Arc::new(ModelAsset::placeholder("tree"))))
    }

    #[test]
    fn take_and_give_back_conserve_count() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut pool = pool(4);
        let a = pool.take_random(&mut rng).unwrap();
        let b = pool.take_random(&mut rng).unwrap();
        assert!(!Arc::ptr_eq(&a.model, &b.model));
        assert_eq!(pool.available() + 2, pool.capacity());
        pool.give_back(a);
        pool.give_back(b);
        assert_eq!(pool.available(), 4);
    }

    #[test]
    fn exhausted_pool_yields_none() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut pool = pool(1);
        assert!(pool.take_random(&mut rng).is_some());
        assert!(pool.take_random(&mut rng).is_none());
        assert_eq!(pool.available(), 0);
    }
}
