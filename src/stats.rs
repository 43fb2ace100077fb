//! Runtime health statistics for the frame pump

use std::fmt;
use std::time::{Duration, Instant};

/// Margin over the running mean past which an offset counts as slow
const SLOW_MARGIN: Duration = Duration::from_micros(100);

/// Offsets above this are counted separately as large in [`Status`]
const LARGE_OFFSET: Duration = Duration::from_millis(1);

/// Online mean/variance of a duration signal, using Welford's algorithm so
/// the variance stays numerically stable over long runs.
#[derive(Debug, Default, Clone)]
pub struct DurationStatistics {
    count: u64,
    mean_ns: f64,
    m2: f64,
    min_max: MinMaxDuration,
}

impl DurationStatistics {
    pub fn update(&mut self, d: Duration) {
        self.count += 1;
        let x = d.as_nanos() as f64;
        let delta = x - self.mean_ns;
        self.mean_ns += delta / self.count as f64;
        let delta2 = x - self.mean_ns;
        self.m2 += delta * delta2;
        self.min_max.update(d);
    }

    pub fn mean(&self) -> Duration {
        Duration::from_nanos(self.mean_ns as u64)
    }

    /// Sample variance in ns², zero until two values have been seen
    pub fn variance(&self) -> f64 {
        if self.count > 1 {
            self.m2 / (self.count - 1) as f64
        } else {
            0.0
        }
    }

    pub fn std_dev(&self) -> Duration {
        Duration::from_nanos(self.variance().sqrt() as u64)
    }

    /// Whether `d` exceeds the running mean by more than 100 µs
    pub fn slow(&self, d: Duration) -> bool {
        d > self.mean() + SLOW_MARGIN
    }

    pub fn min(&self) -> Duration {
        self.min_max.min()
    }

    pub fn max(&self) -> Duration {
        self.min_max.max()
    }
}

impl fmt::Display for DurationStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(min/mean/stddev/max): {:?}/{:?}/{:?}/{:?}",
            self.min_max.min(),
            self.mean(),
            self.std_dev(),
            self.min_max.max()
        )
    }
}

/// Min/max/current tracker for a duration signal
#[derive(Debug, Default, Clone, Copy)]
pub struct MinMaxDuration {
    min: Duration,
    max: Duration,
    current: Duration,
}

impl MinMaxDuration {
    pub fn update(&mut self, d: Duration) {
        if d < self.min || self.min == Duration::ZERO {
            self.min = d;
        } else if d > self.max {
            self.max = d;
        }
        self.current = d;
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn current(&self) -> Duration {
        self.current
    }
}

/// Fixed-capacity ring of wall-clock marks, used to compute the average
/// frame rate over the most recent window.
#[derive(Debug, Clone)]
pub struct TimeRing {
    slots: Vec<Instant>,
    head: usize,
    marked: usize,
}

impl TimeRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: vec![Instant::now(); capacity],
            head: 0,
            marked: 0,
        }
    }

    /// Advance to the next slot and record "now"
    pub fn mark(&mut self) {
        self.head = (self.head + 1) % self.slots.len();
        self.slots[self.head] = Instant::now();
        self.marked = (self.marked + 1).min(self.slots.len());
    }

    /// Most recent mark
    pub fn latest(&self) -> Instant {
        self.slots[self.head]
    }

    /// Oldest mark still held in the ring
    pub fn first(&self) -> Instant {
        let len = self.slots.len();
        self.slots[(self.head + len - self.marked.saturating_sub(1)) % len]
    }

    pub fn marked(&self) -> usize {
        self.marked
    }

    /// Marks per second over the held window. With a single mark the
    /// interval is zero and the rate is +∞.
    pub fn avg_rate(&self) -> f64 {
        if self.marked == 0 {
            return 0.0;
        }
        self.marked as f64 / self.latest().duration_since(self.first()).as_secs_f64()
    }
}

/// Aggregate pump health: frame counters plus intra-frame offset statistics.
///
/// The skew counters are signed: a backward wall-clock jump (an NTP step,
/// say) shows up as a negative frame delta and simply decrements the drop
/// count rather than wrapping.
#[derive(Debug, Clone)]
pub struct Status {
    sent: u64,
    dropped: i64,
    duplicate: i64,
    large_offset: i64,
    times: TimeRing,
    offset: DurationStatistics,
}

impl Status {
    /// `rate_window` is the number of recent frames the FPS estimate spans
    pub fn new(rate_window: usize) -> Self {
        Self {
            sent: 0,
            dropped: 0,
            duplicate: 0,
            large_offset: 0,
            times: TimeRing::new(rate_window),
            offset: DurationStatistics::default(),
        }
    }

    pub fn sent(&mut self, offset: Duration) {
        self.times.mark();
        self.sent += 1;
        self.offset.update(offset);
        if offset > LARGE_OFFSET {
            self.large_offset += 1;
        }
    }

    pub fn dropped(&mut self, count: i64) {
        self.dropped += count;
    }

    pub fn duplicate(&mut self) {
        self.duplicate += 1;
    }

    pub fn frames_sent(&self) -> u64 {
        self.sent
    }

    pub fn fps(&self) -> f64 {
        self.times.avg_rate()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let imperfect = self.dropped + self.duplicate + self.large_offset;
        let pct = if self.sent == 0 {
            0.0
        } else {
            100.0 * (1.0 - imperfect as f64 / self.sent as f64)
        };
        write!(
            f,
            "{} frames sent - {:.2}% perfect {}/{}/{} drop/dup/slow - frame start offset {}",
            self.sent, pct, self.dropped, self.duplicate, self.large_offset, self.offset
        )
    }
}
