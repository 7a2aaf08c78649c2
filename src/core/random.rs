/// The single random source threaded through generation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Uniform integer draws in `0..upper`.
///
/// Every random decision in the generator (situation pick, OR branch,
/// primary role, names, search tie-breaks) goes through this trait so
/// tests can script the choices.
pub trait RandomSource {
    /// Draw an integer in `0..upper`. `upper` must be non-zero.
    fn range(&mut self, upper: usize) -> usize;

    /// Uniform float in `0.0..1.0`.
    fn unit(&mut self) -> f64 {
        const STEPS: usize = 1 << 24;
        self.range(STEPS) as f64 / STEPS as f64
    }

    /// Pick an element uniformly, or `None` for an empty slice.
    fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T>
    where
        Self: Sized,
    {
        if items.is_empty() {
            None
        } else {
            Some(&items[self.range(items.len())])
        }
    }
}

/// Seeded `StdRng`-backed random source.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn range(&mut self, upper: usize) -> usize {
        self.rng.gen_range(0..upper)
    }

    fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Replays a fixed script of draws, each reduced modulo the requested
/// bound. Once the script runs out every draw returns 0.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    script: VecDeque<usize>,
}

impl ScriptedRandom {
    pub fn new(script: &[usize]) -> Self {
        Self {
            script: script.iter().copied().collect(),
        }
    }

    /// A source that always draws 0.
    pub fn zeros() -> Self {
        Self::default()
    }
}

impl RandomSource for ScriptedRandom {
    fn range(&mut self, upper: usize) -> usize {
        self.script.pop_front().map(|v| v % upper).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_is_deterministic() {
        let mut a = SeededRandom::new(7);
        let mut b = SeededRandom::new(7);
        let xs: Vec<usize> = (0..20).map(|_| a.range(100)).collect();
        let ys: Vec<usize> = (0..20).map(|_| b.range(100)).collect();
        assert_eq!(xs, ys);
        assert!(xs.iter().all(|x| *x < 100));
    }

    #[test]
    fn scripted_replays_then_zeroes() {
        let mut r = ScriptedRandom::new(&[3, 7, 1]);
        assert_eq!(r.range(5), 3);
        assert_eq!(r.range(5), 2);
        assert_eq!(r.range(5), 1);
        assert_eq!(r.range(5), 0);
    }

    #[test]
    fn pick_from_slices() {
        let mut r = ScriptedRandom::new(&[1]);
        assert_eq!(r.pick(&["a", "b", "c"]), Some(&"b"));
        let empty: [u8; 0] = [];
        assert_eq!(r.pick(&empty), None);
    }

    #[test]
    fn unit_stays_in_range() {
        let mut r = SeededRandom::new(1);
        for _ in 0..100 {
            let x = r.unit();
            assert!((0.0..1.0).contains(&x));
        }
        assert_eq!(ScriptedRandom::zeros().unit(), 0.0);
    }
}
