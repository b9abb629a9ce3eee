use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand::SeedableRng;

/// Seeded random number generator for reproducible games and determinizations
#[derive(Debug, Clone)]
pub struct GameRng {
    rng: ChaCha8Rng,
    seed: u64,
}

impl GameRng {
    /// Create a new GameRng with an optional seed
    /// If seed is None, generates a random seed
    pub fn new(seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(|| {
            use rand::thread_rng;
            thread_rng().gen()
        });

        let rng = ChaCha8Rng::seed_from_u64(seed);
        GameRng { rng, seed }
    }

    /// Get the seed used for this RNG
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generate a random integer in range [0, max)
    pub fn random_range(&mut self, max: usize) -> usize {
        self.rng.gen_range(0..max)
    }

    /// Fisher-Yates shuffle for a mutable slice
    pub fn shuffle<T>(&mut self, array: &mut [T]) {
        for i in (1..array.len()).rev() {
            let j = self.random_range(i + 1);
            array.swap(i, j);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_produces_same_sequence() {
        let mut rng1 = GameRng::new(Some(12345));
        let mut rng2 = GameRng::new(Some(12345));

        for _ in 0..100 {
            assert_eq!(rng1.random_range(1000), rng2.random_range(1000), "Same seed should produce same random sequence");
        }
    }

    #[test]
    fn test_shuffle_reproducibility() {
        let mut arr1: Vec<u8> = (0..52).collect();
        let mut arr2: Vec<u8> = (0..52).collect();

        GameRng::new(Some(42)).shuffle(&mut arr1);
        GameRng::new(Some(42)).shuffle(&mut arr2);

        assert_eq!(arr1, arr2, "Same seed should produce same shuffle");
    }

    #[test]
    fn test_shuffle_keeps_elements() {
        let mut arr: Vec<u8> = (0..52).collect();
        GameRng::new(Some(7)).shuffle(&mut arr);
        arr.sort_unstable();
        assert_eq!(arr, (0..52).collect::<Vec<u8>>());
    }

    #[test]
    fn test_random_range() {
        let mut rng = GameRng::new(Some(123));
        for _ in 0..1000 {
            assert!(rng.random_range(10) < 10, "random_range should be in [0, max)");
        }
    }
}
