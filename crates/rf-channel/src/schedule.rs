//! Random Re-trigger Schedule
//!
//! Spreads `count` re-triggers across an interval window with jitter so
//! repeats don't sound mechanical. The schedule is built once per
//! configuration and consumed cyclically by [`RandomCursor`].
//!
//! ```text
//!  draws (sorted):      0 ── d0 ──── d1 ─────── d2 ──── I+d0
//!  gaps:                 g0    g1       g2        g3
//!                        │     └────── cyclic repeat ──────┘
//!                  initial delay
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// RANDOM SCHEDULE
// ═══════════════════════════════════════════════════════════════════════════════

/// Generated sequence of re-trigger delays (ms)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomSchedule {
    /// Smallest drawn value, wrapped into the next cycle
    pub first_draw: u64,
    /// Delay before the first trigger
    pub initial_delay: u64,
    /// Repeat gaps, consumed cyclically
    pub gaps: Vec<u64>,
}

impl RandomSchedule {
    /// Generate a fresh schedule
    ///
    /// Draws `count` uniform values in `[0, interval_ms)`, closes the window
    /// with `interval_ms + first_draw` and opens it with `0`. The `count + 1`
    /// consecutive gaps sum to `interval_ms + first_draw`; the first one is the
    /// initial delay.
    pub fn generate<R: Rng + ?Sized>(count: u32, interval_ms: u64, rng: &mut R) -> Self {
        let count = count.max(1) as usize;
        let interval_ms = interval_ms.max(1);

        let mut draws: Vec<u64> = (0..count)
            .map(|_| rng.random_range(0..interval_ms))
            .collect();
        draws.sort_unstable();

        Self::from_sorted_draws(&draws, interval_ms)
    }

    /// Build a schedule from already sorted draws
    fn from_sorted_draws(draws: &[u64], interval_ms: u64) -> Self {
        let first_draw = draws.first().copied().unwrap_or(0);

        let mut bounds = Vec::with_capacity(draws.len() + 2);
        bounds.push(0);
        bounds.extend_from_slice(draws);
        bounds.push(interval_ms.saturating_add(first_draw));

        let mut gaps: Vec<u64> = bounds.windows(2).map(|w| w[1] - w[0]).collect();
        let initial_delay = gaps.remove(0);

        Self {
            first_draw,
            initial_delay,
            gaps,
        }
    }

    /// Number of repeat gaps (equals the configured count)
    #[inline]
    pub fn len(&self) -> usize {
        self.gaps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.gaps.is_empty()
    }

    /// Repeat gap at `index`, wrapping modulo the schedule length
    pub fn gap(&self, index: usize) -> u64 {
        if self.gaps.is_empty() {
            return self.initial_delay;
        }
        self.gaps[index % self.gaps.len()]
    }

    /// Initial delay plus all repeat gaps (saturating)
    pub fn total_ms(&self) -> u64 {
        self.gaps
            .iter()
            .fold(self.initial_delay, |total, gap| total.saturating_add(*gap))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RANDOM CURSOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Position in a [`RandomSchedule`]
///
/// Unarmed until the first delay is taken; afterwards `index` points at the
/// gap that the next call returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RandomCursor {
    index: Option<usize>,
}

impl RandomCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next delay and advance
    pub fn next_delay(&mut self, schedule: &RandomSchedule) -> u64 {
        match self.index {
            None => {
                self.index = Some(0);
                schedule.initial_delay
            }
            Some(index) => {
                let len = schedule.len().max(1);
                let index = index % len;
                self.index = Some((index + 1) % len);
                schedule.gap(index)
            }
        }
    }

    /// Index of the gap the next call returns (`None` before the first delay)
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn reset(&mut self) {
        self.index = None;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_schedule_sum_and_length() {
        let mut rng = StdRng::seed_from_u64(7);
        for count in 1..=8u32 {
            let schedule = RandomSchedule::generate(count, 30_000, &mut rng);
            assert_eq!(schedule.len(), count as usize);
            assert_eq!(schedule.total_ms(), 30_000 + schedule.first_draw);
            assert!(schedule.first_draw < 30_000);
            // Initial delay is the first draw itself
            assert_eq!(schedule.initial_delay, schedule.first_draw);
        }
    }

    #[test]
    fn test_from_sorted_draws() {
        let schedule = RandomSchedule::from_sorted_draws(&[5, 12, 20], 30);
        assert_eq!(schedule.first_draw, 5);
        assert_eq!(schedule.initial_delay, 5);
        assert_eq!(schedule.gaps, vec![7, 8, 15]);
        assert_eq!(schedule.total_ms(), 35);
    }

    #[test]
    fn test_zero_inputs_are_raised() {
        let mut rng = StdRng::seed_from_u64(1);
        let schedule = RandomSchedule::generate(0, 0, &mut rng);
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule.first_draw, 0);
        assert_eq!(schedule.gaps, vec![1]);
    }

    #[test]
    fn test_cursor_wraps() {
        let schedule = RandomSchedule::from_sorted_draws(&[5, 12, 20], 30);
        let mut cursor = RandomCursor::new();

        assert_eq!(cursor.next_delay(&schedule), 5);
        assert_eq!(cursor.next_delay(&schedule), 7);
        assert_eq!(cursor.next_delay(&schedule), 8);
        assert_eq!(cursor.next_delay(&schedule), 15);
        // Wraps back to the first repeat gap
        assert_eq!(cursor.next_delay(&schedule), 7);
        assert_eq!(cursor.index(), Some(1));

        cursor.reset();
        assert_eq!(cursor.next_delay(&schedule), 5);
    }

    #[test]
    fn test_seeded_generation_is_deterministic() {
        let a = RandomSchedule::generate(4, 10_000, &mut StdRng::seed_from_u64(42));
        let b = RandomSchedule::generate(4, 10_000, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_huge_interval_saturates() {
        let mut rng = StdRng::seed_from_u64(1);
        let schedule = RandomSchedule::generate(2, u64::MAX, &mut rng);

        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule.total_ms(), u64::MAX);

        let schedule = RandomSchedule::from_sorted_draws(&[u64::MAX - 1], u64::MAX);
        assert_eq!(schedule.initial_delay, u64::MAX - 1);
        assert_eq!(schedule.gaps, vec![1]);
    }
}
