//! Distribution sampling.
//!
//! A single dispatch function over the `Distribution` variants. Sampling is
//! pure with respect to the distribution parameters and deterministic under
//! a seeded RNG; there is no shared sampler state.

use crate::models::spec::Distribution;
use rand::Rng;
use rand_distr::{Exp1, StandardNormal, Triangular};

/// Draw one value from `dist` using `rng`.
///
/// Parameter domains were validated when the `Distribution` was constructed,
/// so every variant is sampleable here.
pub fn sample<R: Rng + ?Sized>(dist: &Distribution, rng: &mut R) -> f64 {
    match *dist {
        Distribution::Normal { mean, stddev } => {
            let z: f64 = rng.sample(StandardNormal);
            mean + stddev * z
        }
        Distribution::Uniform { min, max } => {
            if min == max {
                min
            } else {
                rng.gen_range(min..=max)
            }
        }
        // `lambda` is the scale (mean), matching numpy.random.exponential.
        Distribution::Exponential { lambda } => {
            let e: f64 = rng.sample(Exp1);
            lambda * e
        }
        Distribution::Triangular { left, mode, right } => {
            match Triangular::new(left, right, mode) {
                Ok(tri) => rng.sample(tri),
                // left == right: the distribution collapses to a point.
                Err(_) => mode,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const DRAWS: usize = 10_000;

    fn draws(dist: &Distribution, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..DRAWS).map(|_| sample(dist, &mut rng)).collect()
    }

    #[test]
    fn seeded_sampling_is_deterministic() {
        let dist = Distribution::normal(3.0, 2.0).unwrap();
        assert_eq!(draws(&dist, 42), draws(&dist, 42));
        assert_ne!(draws(&dist, 42), draws(&dist, 43));
    }

    #[test]
    fn uniform_respects_support() {
        let dist = Distribution::uniform(5.0, 15.0).unwrap();
        for v in draws(&dist, 1) {
            assert!((5.0..=15.0).contains(&v), "out of support: {v}");
        }
    }

    #[test]
    fn degenerate_uniform_is_a_point_mass() {
        let dist = Distribution::uniform(5.0, 5.0).unwrap();
        assert!(draws(&dist, 2).iter().all(|&v| v == 5.0));
    }

    #[test]
    fn exponential_is_nonnegative_with_scale_mean() {
        let dist = Distribution::exponential(2.0).unwrap();
        let values = draws(&dist, 3);
        assert!(values.iter().all(|&v| v >= 0.0));
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        assert!((mean - 2.0).abs() < 0.15, "sample mean {mean} far from 2.0");
    }

    #[test]
    fn triangular_respects_support() {
        let dist = Distribution::triangular(1.0, 2.0, 4.0).unwrap();
        for v in draws(&dist, 4) {
            assert!((1.0..=4.0).contains(&v), "out of support: {v}");
        }
    }

    #[test]
    fn normal_sample_moments() {
        let dist = Distribution::normal(0.0, 1.0).unwrap();
        let values = draws(&dist, 5);
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        assert!(mean.abs() < 0.05, "sample mean {mean} far from 0.0");
    }
}
