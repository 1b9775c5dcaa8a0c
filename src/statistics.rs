use serde::{Deserialize, Serialize};

/// Access counters for a single cache
///
/// Every access is classified exactly once as a hit or a miss, so `hits + misses` always equals
/// `reads + writes`. Write hits count towards `hits` and write misses towards `misses`; read
/// counts are recovered by subtraction
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatistics {
    pub hits: u64,
    pub misses: u64,
    pub reads: u64,
    pub writes: u64,
    pub write_hits: u64,
    pub write_misses: u64,
}

/// A serialisable report of the counters together with their derived rates, for presentation
/// shells
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSummary {
    pub hits: u64,
    pub misses: u64,
    pub reads: u64,
    pub writes: u64,
    pub write_hits: u64,
    pub write_misses: u64,
    pub total_accesses: u64,
    /// Percentages in [0, 100]; 0 when the denominator is empty
    pub hit_rate: f64,
    pub miss_rate: f64,
    pub read_hit_rate: f64,
    pub write_hit_rate: f64,
}

impl CacheStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn record_read(&mut self) {
        self.reads += 1;
    }

    pub fn record_write(&mut self) {
        self.writes += 1;
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_write_hit(&mut self) {
        self.write_hits += 1;
        self.hits += 1;
    }

    pub fn record_write_miss(&mut self) {
        self.write_misses += 1;
        self.misses += 1;
    }

    pub fn total_accesses(&self) -> u64 {
        self.hits + self.misses
    }

    /// Hit rate as a percentage; 0 before any access
    pub fn hit_rate(&self) -> f64 {
        percentage(self.hits, self.total_accesses())
    }

    pub fn miss_rate(&self) -> f64 {
        percentage(self.misses, self.total_accesses())
    }

    pub fn read_hit_rate(&self) -> f64 {
        let read_hits = self.hits - self.write_hits;
        let read_misses = self.misses - self.write_misses;
        percentage(read_hits, read_hits + read_misses)
    }

    pub fn write_hit_rate(&self) -> f64 {
        percentage(self.write_hits, self.write_hits + self.write_misses)
    }

    pub fn summary(&self) -> StatisticsSummary {
        StatisticsSummary {
            hits: self.hits,
            misses: self.misses,
            reads: self.reads,
            writes: self.writes,
            write_hits: self.write_hits,
            write_misses: self.write_misses,
            total_accesses: self.total_accesses(),
            hit_rate: self.hit_rate(),
            miss_rate: self.miss_rate(),
            read_hit_rate: self.read_hit_rate(),
            write_hit_rate: self.write_hit_rate(),
        }
    }
}

fn percentage(part: u64, total: u64) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::CacheStatistics;

    #[test]
    fn rates_are_zero_before_any_access() {
        let statistics = CacheStatistics::new();
        assert_eq!(statistics.hit_rate(), 0.0);
        assert_eq!(statistics.miss_rate(), 0.0);
        assert_eq!(statistics.read_hit_rate(), 0.0);
        assert_eq!(statistics.write_hit_rate(), 0.0);
    }

    #[test]
    fn write_hits_count_towards_hits() {
        let mut statistics = CacheStatistics::new();
        statistics.record_write();
        statistics.record_write_hit();
        statistics.record_read();
        statistics.record_miss();
        assert_eq!(statistics.hits, 1);
        assert_eq!(statistics.misses, 1);
        assert_eq!(statistics.hits + statistics.misses, statistics.reads + statistics.writes);
    }

    #[test]
    fn derived_rates() {
        let mut statistics = CacheStatistics::new();
        // 3 reads: 1 hit, 2 misses. 1 write: 1 write hit.
        for _ in 0..3 {
            statistics.record_read();
        }
        statistics.record_hit();
        statistics.record_miss();
        statistics.record_miss();
        statistics.record_write();
        statistics.record_write_hit();
        assert_eq!(statistics.total_accesses(), 4);
        assert_eq!(statistics.hit_rate(), 50.0);
        assert_eq!(statistics.miss_rate(), 50.0);
        assert!((statistics.read_hit_rate() - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(statistics.write_hit_rate(), 100.0);
    }

    #[test]
    fn reset_clears_everything() {
        let mut statistics = CacheStatistics::new();
        statistics.record_read();
        statistics.record_hit();
        statistics.reset();
        assert_eq!(statistics, CacheStatistics::default());
    }
}
