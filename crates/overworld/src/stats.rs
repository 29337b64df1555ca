//! # Tick Statistics
//!
//! Per-tick counters returned by [`crate::Simulation::tick`] and a running
//! accumulator for averages and worst cases.

/// Counters for a single simulation tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Tick number (starts at 1).
    pub tick: u64,
    /// Movable entities processed.
    pub movers: usize,
    /// Whether planning ran on the worker pool.
    pub parallel: bool,
    /// Moves committed.
    pub moves_started: u32,
    /// Arrivals.
    pub moves_completed: u32,
    /// Refused move attempts.
    pub moves_blocked: u32,
    /// Moves vetoed by a handler.
    pub moves_cancelled: u32,
    /// Path requests answered with a route.
    pub paths_solved: u32,
    /// Path requests that found nothing.
    pub paths_failed: u32,
    /// Wall-clock duration of the tick in microseconds.
    pub elapsed_us: u64,
}

/// Running totals over many ticks.
#[derive(Clone, Debug)]
pub struct TickStatsAccumulator {
    /// Ticks recorded.
    pub ticks_recorded: u64,
    /// Sum of tick durations.
    pub total_us_sum: u64,
    /// Fastest tick.
    pub min_tick_us: u64,
    /// Slowest tick.
    pub max_tick_us: u64,
    /// Ticks slower than the warning budget.
    pub ticks_over_budget: u64,
    /// Total moves committed.
    pub moves_started: u64,
    /// Total arrivals.
    pub moves_completed: u64,
    /// Total refused attempts.
    pub moves_blocked: u64,
    /// Total path requests answered.
    pub paths_solved: u64,
    /// Total path requests that failed.
    pub paths_failed: u64,
    budget_us: u64,
}

impl TickStatsAccumulator {
    /// Creates an accumulator counting ticks slower than `budget_us`.
    #[must_use]
    pub fn new(budget_us: u64) -> Self {
        Self {
            ticks_recorded: 0,
            total_us_sum: 0,
            min_tick_us: u64::MAX,
            max_tick_us: 0,
            ticks_over_budget: 0,
            moves_started: 0,
            moves_completed: 0,
            moves_blocked: 0,
            paths_solved: 0,
            paths_failed: 0,
            budget_us,
        }
    }

    /// Records one tick.
    pub fn record(&mut self, stats: &TickStats) {
        self.ticks_recorded += 1;
        self.total_us_sum += stats.elapsed_us;
        self.min_tick_us = self.min_tick_us.min(stats.elapsed_us);
        self.max_tick_us = self.max_tick_us.max(stats.elapsed_us);
        if stats.elapsed_us > self.budget_us {
            self.ticks_over_budget += 1;
        }
        self.moves_started += u64::from(stats.moves_started);
        self.moves_completed += u64::from(stats.moves_completed);
        self.moves_blocked += u64::from(stats.moves_blocked);
        self.paths_solved += u64::from(stats.paths_solved);
        self.paths_failed += u64::from(stats.paths_failed);
    }

    /// Average tick duration in milliseconds.
    #[must_use]
    pub fn avg_tick_ms(&self) -> f64 {
        if self.ticks_recorded == 0 {
            return 0.0;
        }
        (self.total_us_sum as f64 / self.ticks_recorded as f64) / 1000.0
    }

    /// Fraction of ticks over budget.
    #[must_use]
    pub fn over_budget_ratio(&self) -> f64 {
        if self.ticks_recorded == 0 {
            return 0.0;
        }
        self.ticks_over_budget as f64 / self.ticks_recorded as f64
    }
}

impl Default for TickStatsAccumulator {
    fn default() -> Self {
        Self::new(4_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_accumulator() {
        let acc = TickStatsAccumulator::default();
        assert!(acc.avg_tick_ms().abs() < f64::EPSILON);
        assert!(acc.over_budget_ratio().abs() < f64::EPSILON);
    }

    #[test]
    fn test_record() {
        let mut acc = TickStatsAccumulator::new(1_000);
        acc.record(&TickStats {
            elapsed_us: 500,
            moves_started: 3,
            ..TickStats::default()
        });
        acc.record(&TickStats {
            elapsed_us: 1_500,
            moves_completed: 2,
            ..TickStats::default()
        });

        assert_eq!(acc.ticks_recorded, 2);
        assert_eq!(acc.min_tick_us, 500);
        assert_eq!(acc.max_tick_us, 1_500);
        assert_eq!(acc.ticks_over_budget, 1);
        assert_eq!(acc.moves_started, 3);
        assert_eq!(acc.moves_completed, 2);
        assert!((acc.avg_tick_ms() - 1.0).abs() < 1e-9);
        assert!((acc.over_budget_ratio() - 0.5).abs() < 1e-9);
    }
}
