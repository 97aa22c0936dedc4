use std::collections::VecDeque;
use std::time::Duration;

use worldsim_common::GameTime;

/// Tick cadence configuration for a simulation driver.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Simulated time covered by one tick.
    pub tick_interval: Duration,
    /// Maximum ticks produced by a single [`FixedStepClock::advance`] call.
    /// Backlog beyond this is dropped rather than replayed.
    pub max_catch_up_ticks: u32,
    /// Number of tick durations kept by [`TickTimer`].
    pub timing_window: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_nanos(16_666_667),
            max_catch_up_ticks: 5,
            timing_window: 120,
        }
    }
}

/// Converts wall-clock deltas into whole fixed-length ticks.
#[derive(Debug)]
pub struct FixedStepClock {
    interval: Duration,
    max_catch_up: u32,
    accumulator: Duration,
    total: Duration,
    ticks: u64,
}

impl FixedStepClock {
    /// A zero `tick_interval` is raised to one nanosecond.
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            interval: config.tick_interval.max(Duration::from_nanos(1)),
            max_catch_up: config.max_catch_up_ticks.max(1),
            accumulator: Duration::ZERO,
            total: Duration::ZERO,
            ticks: 0,
        }
    }

    /// Produce one tick unconditionally.
    pub fn tick(&mut self) -> GameTime {
        let time = GameTime::new(self.total, self.interval);
        self.total += self.interval;
        self.ticks += 1;
        time
    }

    /// Add `real_elapsed` to the accumulator and return the ticks now due.
    pub fn advance(&mut self, real_elapsed: Duration) -> Vec<GameTime> {
        self.accumulator += real_elapsed;
        let mut due = Vec::new();
        while self.accumulator >= self.interval && due.len() < self.max_catch_up as usize {
            self.accumulator -= self.interval;
            due.push(self.tick());
        }
        if self.accumulator >= self.interval {
            let dropped = self.accumulator.as_nanos() / self.interval.as_nanos();
            tracing::debug!(dropped, "simulation fell behind, dropping ticks");
            self.accumulator = Duration::from_nanos(
                (self.accumulator.as_nanos() % self.interval.as_nanos()) as u64,
            );
        }
        due
    }

    /// Simulated time elapsed so far.
    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Wall-clock cost of recent ticks, measured against the tick interval.
///
/// Keeps the last `timing_window` samples. A tick that took longer than
/// `tick_interval` counts as over budget.
#[derive(Debug)]
pub struct TickTimer {
    samples: VecDeque<Duration>,
    window: usize,
    budget: Duration,
    over_budget: usize,
}

impl TickTimer {
    pub fn new(config: &SimulationConfig) -> Self {
        let window = config.timing_window.max(1);
        Self {
            samples: VecDeque::with_capacity(window),
            window,
            budget: config.tick_interval,
            over_budget: 0,
        }
    }

    pub fn record(&mut self, cost: Duration) {
        if self.samples.len() == self.window {
            if let Some(evicted) = self.samples.pop_front() {
                if evicted > self.budget {
                    self.over_budget -= 1;
                }
            }
        }
        if cost > self.budget {
            self.over_budget += 1;
            tracing::trace!(?cost, budget = ?self.budget, "tick over budget");
        }
        self.samples.push_back(cost);
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Samples in the window that exceeded the budget.
    pub fn over_budget(&self) -> usize {
        self.over_budget
    }

    /// Mean cost as a fraction of the budget. Above 1.0 the driver cannot keep up.
    pub fn load(&self) -> f64 {
        if self.budget.is_zero() {
            return 0.0;
        }
        self.average().as_secs_f64() / self.budget.as_secs_f64()
    }

    pub fn average(&self) -> Duration {
        match self.samples.len() {
            0 => Duration::ZERO,
            n => self.samples.iter().sum::<Duration>() / n as u32,
        }
    }

    pub fn max(&self) -> Duration {
        self.samples.iter().copied().max().unwrap_or_default()
    }

    pub fn min(&self) -> Duration {
        self.samples.iter().copied().min().unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(ms: u64, catch_up: u32) -> FixedStepClock {
        FixedStepClock::new(&SimulationConfig {
            tick_interval: Duration::from_millis(ms),
            max_catch_up_ticks: catch_up,
            ..SimulationConfig::default()
        })
    }

    #[test]
    fn config_defaults() {
        let config = SimulationConfig::default();
        assert_eq!(config.max_catch_up_ticks, 5);
        assert_eq!(config.timing_window, 120);
        assert!(config.tick_interval < Duration::from_millis(17));
    }

    #[test]
    fn tick_advances_total() {
        let mut c = clock(10, 5);
        let first = c.tick();
        let second = c.tick();
        assert_eq!(first.total, Duration::ZERO);
        assert_eq!(second.total, Duration::from_millis(10));
        assert_eq!(second.elapsed, Duration::from_millis(10));
        assert_eq!(c.ticks(), 2);
    }

    #[test]
    fn advance_accumulates_partial_steps() {
        let mut c = clock(10, 5);
        assert!(c.advance(Duration::from_millis(6)).is_empty());
        assert_eq!(c.advance(Duration::from_millis(6)).len(), 1);
        assert_eq!(c.advance(Duration::from_millis(25)).len(), 2);
        assert_eq!(c.total(), Duration::from_millis(30));
    }

    #[test]
    fn advance_caps_catch_up() {
        let mut c = clock(10, 3);
        assert_eq!(c.advance(Duration::from_millis(100)).len(), 3);
        // the backlog is dropped, only the remainder carries over
        assert!(c.advance(Duration::ZERO).is_empty());
    }

    fn timer(budget_ms: u64, window: usize) -> TickTimer {
        TickTimer::new(&SimulationConfig {
            tick_interval: Duration::from_millis(budget_ms),
            timing_window: window,
            ..SimulationConfig::default()
        })
    }

    #[test]
    fn timer_reports_cost_against_budget() {
        let mut t = timer(20, 8);
        t.record(Duration::from_millis(10));
        t.record(Duration::from_millis(20));
        t.record(Duration::from_millis(30));

        assert_eq!(t.budget(), Duration::from_millis(20));
        assert_eq!(t.count(), 3);
        assert_eq!(t.average(), Duration::from_millis(20));
        assert_eq!((t.min(), t.max()), (Duration::from_millis(10), Duration::from_millis(30)));
        // exactly on budget is not an overrun
        assert_eq!(t.over_budget(), 1);
        assert!((t.load() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn overruns_leave_the_window_with_their_samples() {
        let mut t = timer(10, 2);
        t.record(Duration::from_millis(50));
        t.record(Duration::from_millis(5));
        assert_eq!(t.over_budget(), 1);
        t.record(Duration::from_millis(5));
        assert_eq!(t.count(), 2);
        assert_eq!(t.over_budget(), 0);
        assert!(t.load() < 1.0);
    }

    #[test]
    fn idle_timer_reports_zero() {
        let t = timer(10, 4);
        assert_eq!(t.average(), Duration::ZERO);
        assert_eq!(t.max(), Duration::ZERO);
        assert_eq!(t.load(), 0.0);
        assert_eq!(t.over_budget(), 0);
    }
}
