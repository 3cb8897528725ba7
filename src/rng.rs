use rand::{rngs::SmallRng, SeedableRng};
use serde::{Deserialize, Deserializer, Serialize};

/// Seedable random source. A `Some` seed makes every draw reproducible;
/// `None` seeds from the OS for exploratory runs.
#[derive(Clone, Debug, Serialize)]
pub struct MaybeSeededRng {
    pub seed: Option<u64>,
    #[serde(skip)]
    rng: SmallRng,
}

impl MaybeSeededRng {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = if let Some(seed) = seed {
            SmallRng::seed_from_u64(seed)
        } else {
            SmallRng::from_os_rng()
        };

        Self { seed, rng }
    }

    pub fn get_rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }
}

impl<'de> Deserialize<'de> for MaybeSeededRng {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seed = Deserialize::deserialize(deserializer)?;
        Ok(Self::new(seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn seeded_draws_are_reproducible() {
        let mut a = MaybeSeededRng::new(Some(42));
        let mut b = MaybeSeededRng::new(Some(42));

        let xs: Vec<f64> = (0..10).map(|_| a.get_rng().random()).collect();
        let ys: Vec<f64> = (0..10).map(|_| b.get_rng().random()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = MaybeSeededRng::new(Some(1));
        let mut b = MaybeSeededRng::new(Some(2));
        let x: f64 = a.get_rng().random();
        let y: f64 = b.get_rng().random();
        assert_ne!(x, y);
    }
}
