// Seeded random stream for the counterpoint generator.
//
// xoshiro256++ (Blackman & Vigna, 2019), its 256-bit state expanded from a
// single u64 seed with SplitMix64. The generator draws everything from a
// `SeededRng`: attempt parameters, candidate order, which voice goes first
// when two are open at once, and the nested cantus firmus and theme runs. A
// seed therefore reproduces a whole run.
//
// Nested engines get their own stream from `fork()`, seeded from one output
// of the parent. The parent advances by exactly one step however much the
// child is used.
//
// Output must be bit-identical across platforms. The core step and the
// integer samplers stay in integer arithmetic; only `unit_f64` and
// `random_bool` touch floats.

use serde::{Deserialize, Serialize};

/// xoshiro256++ state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeededRng {
    state: [u64; 4],
}

impl SeededRng {
    /// Equal seeds give equal streams.
    pub fn new(seed: u64) -> Self {
        let mut mix = SplitMix64(seed);
        SeededRng {
            state: std::array::from_fn(|_| mix.step()),
        }
    }

    /// A child stream seeded from this stream's next output.
    pub fn fork(&mut self) -> SeededRng {
        SeededRng::new(self.next_u64())
    }

    pub fn next_u64(&mut self) -> u64 {
        let [s0, s1, s2, s3] = self.state;
        let out = s0.wrapping_add(s3).rotate_left(23).wrapping_add(s0);

        let s2 = s2 ^ s0;
        let s3 = s3 ^ s1;
        self.state = [
            s0 ^ s3,
            s1 ^ s2,
            s2 ^ (s1 << 17),
            s3.rotate_left(45),
        ];
        out
    }

    /// Uniform in [0, 1), from the top 53 bits.
    pub fn unit_f64(&mut self) -> f64 {
        const SCALE: f64 = 1.0 / (1u64 << 53) as f64;
        (self.next_u64() >> 11) as f64 * SCALE
    }

    /// Uniform in `low..high`, unbiased by threshold rejection.
    /// Panics on an empty range.
    pub fn below(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "empty range {low}..{high}");
        let width = high - low;
        if width.is_power_of_two() {
            return low + (self.next_u64() & (width - 1));
        }
        // 2^64 mod width
        let reject_under = width.wrapping_neg() % width;
        let draw = std::iter::repeat_with(|| self.next_u64())
            .find(|&r| r >= reject_under)
            .unwrap_or_default();
        low + draw % width
    }

    /// Uniform in `low..high`.
    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.below(low as u64, high as u64) as usize
    }

    /// Uniform in `low..=high`.
    pub fn range_usize_inclusive(&mut self, low: usize, high: usize) -> usize {
        assert!(low <= high, "empty range {low}..={high}");
        self.below(low as u64, high as u64 + 1) as usize
    }

    /// Uniform in `low..=high`. Most attempt parameters are signed interval
    /// draws ("a third below the final"), so this is the common sampler.
    pub fn range_i64_inclusive(&mut self, low: i64, high: i64) -> i64 {
        assert!(low <= high, "empty range {low}..={high}");
        let offset = self.below(0, high.abs_diff(low) + 1);
        low.wrapping_add(offset as i64)
    }

    /// `true` with probability `p`: never for `p <= 0`, always for `p >= 1`.
    pub fn random_bool(&mut self, p: f64) -> bool {
        self.unit_f64() < p
    }

    /// Fisher-Yates, back to front.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for last in (1..items.len()).rev() {
            let other = self.range_usize_inclusive(0, last);
            items.swap(last, other);
        }
    }

    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            let index = self.range_usize(0, items.len());
            items.get(index)
        }
    }
}

/// Seed expander; never used as a stream of its own.
struct SplitMix64(u64);

impl SplitMix64 {
    fn step(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_vector() {
        // xoshiro256++ from the all-(1, 2, 3, 4) state.
        let mut rng = SeededRng { state: [1, 2, 3, 4] };
        assert_eq!(rng.next_u64(), 41_943_041);
        assert_eq!(rng.next_u64(), 58_720_359);
    }

    #[test]
    fn test_equal_seeds_equal_streams() {
        let mut a = SeededRng::new(7);
        let mut b = SeededRng::new(7);
        assert!((0..500).all(|_| a.next_u64() == b.next_u64()));
        assert_ne!(SeededRng::new(7), SeededRng::new(8));
    }

    #[test]
    fn test_unit_f64_stays_below_one() {
        let mut rng = SeededRng::new(3);
        for _ in 0..5_000 {
            let v = rng.unit_f64();
            assert!((0.0..1.0).contains(&v), "{v}");
        }
    }

    #[test]
    fn test_below_covers_odd_widths() {
        let mut rng = SeededRng::new(11);
        let mut hits = [0u32; 5];
        for _ in 0..5_000 {
            let v = rng.below(20, 25);
            assert!((20..25).contains(&v), "{v}");
            hits[(v - 20) as usize] += 1;
        }
        assert!(hits.iter().all(|&h| h > 800), "{hits:?}");
    }

    #[test]
    fn test_signed_inclusive_range() {
        let mut rng = SeededRng::new(31);
        let mut seen = [false; 7];
        for _ in 0..5_000 {
            let v = rng.range_i64_inclusive(-3, 3);
            assert!((-3..=3).contains(&v), "{v}");
            seen[(v + 3) as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
        assert_eq!(rng.range_i64_inclusive(4, 4), 4);
    }

    #[test]
    fn test_usize_inclusive_reaches_the_top() {
        let mut rng = SeededRng::new(66);
        assert!((0..1_000).any(|_| rng.range_usize_inclusive(5, 8) == 8));
    }

    #[test]
    fn test_random_bool_at_the_extremes() {
        let mut rng = SeededRng::new(42);
        assert!((0..100).all(|_| !rng.random_bool(0.0)));
        assert!((0..100).all(|_| rng.random_bool(1.0)));
    }

    #[test]
    fn test_shuffle_permutes() {
        let mut rng = SeededRng::new(8);
        let mut items: Vec<u32> = (0..40).collect();
        rng.shuffle(&mut items);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..40).collect::<Vec<_>>());
        assert_ne!(items, sorted);
    }

    #[test]
    fn test_choose() {
        let mut rng = SeededRng::new(1);
        assert!(rng.choose::<u8>(&[]).is_none());
        assert_eq!(rng.choose(&[9]), Some(&9));
    }

    #[test]
    fn test_fork_advances_parent_once() {
        let mut parent = SeededRng::new(100);
        let mut twin = SeededRng::new(100);
        let mut child = parent.fork();
        twin.next_u64();
        for _ in 0..10 {
            child.next_u64();
        }
        assert_eq!(parent, twin);
    }

    #[test]
    fn test_state_survives_json() {
        let mut rng = SeededRng::new(42);
        rng.next_u64();
        let json = serde_json::to_string(&rng).unwrap();
        let mut restored: SeededRng = serde_json::from_str(&json).unwrap();
        assert!((0..50).all(|_| rng.next_u64() == restored.next_u64()));
    }
}
