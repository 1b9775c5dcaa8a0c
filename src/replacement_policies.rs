use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// A generic trait for implementing new replacement policies. Can be used to parameterise a
/// [`SetAssociativeCache`](crate::cache::SetAssociativeCache).
///
/// Policies never hold references into the cache storage; they keep only their own auxiliary
/// metadata addressed by (set, way) and are handed a validity mask on each victim selection
pub trait ReplacementPolicy {
    /// Selects the way to evict from a full set
    ///
    /// Only called once every way in the set holds a valid block; callers must use an invalid way
    /// first when one exists
    ///
    /// # Arguments
    ///
    /// * `set_index`: The set needing an eviction
    /// * `valid`: One entry per way, true if the way holds a valid block
    ///
    /// returns: usize
    fn select_victim(&mut self, set_index: usize, valid: &[bool]) -> usize;

    /// Updates the policy when a way is accessed
    ///
    /// Called with `hit == true` on a cache hit and `hit == false` when a block is filled.
    /// Not applicable for some policies, a default which does nothing is provided
    fn on_access(&mut self, _set_index: usize, _way: usize, _hit: bool) {}

    /// Resets the policy state, together with a cache clear
    fn reset(&mut self) {}
}

/// Least Recently Used replacement policy
///
/// Keeps a logical timestamp per (set, way), stamped on every access, hit or fill. Tracking a
/// single free-running counter per cache instance keeps stamps strictly increasing, so the victim
/// is simply the valid way with the smallest stamp
pub struct Lru {
    last_used_times: Vec<u64>,
    ways: usize,
    time: u64,
}

impl Lru {
    pub fn new(num_sets: u64, ways: u64) -> Self {
        Self {
            last_used_times: vec![0; (num_sets * ways) as usize],
            ways: ways as usize,
            time: 0,
        }
    }
}

impl ReplacementPolicy for Lru {
    fn select_victim(&mut self, set_index: usize, valid: &[bool]) -> usize {
        let base = set_index * self.ways;
        let mut victim = usize::MAX;
        let mut oldest = u64::MAX;
        for way in 0..self.ways {
            // Strict comparison gives the lowest-index way on ties
            if valid[way] && self.last_used_times[base + way] < oldest {
                oldest = self.last_used_times[base + way];
                victim = way;
            }
        }
        victim
    }

    fn on_access(&mut self, set_index: usize, way: usize, _hit: bool) {
        self.time += 1;
        self.last_used_times[set_index * self.ways + way] = self.time;
    }

    fn reset(&mut self) {
        self.time = 0;
        self.last_used_times.fill(0);
    }
}

/// First In First Out replacement policy
///
/// Like [`Lru`] but stamps a way only when it is filled, so hits never refresh a block's position
/// in the eviction order
pub struct Fifo {
    insertion_times: Vec<u64>,
    ways: usize,
    time: u64,
}

impl Fifo {
    pub fn new(num_sets: u64, ways: u64) -> Self {
        Self {
            insertion_times: vec![0; (num_sets * ways) as usize],
            ways: ways as usize,
            time: 0,
        }
    }
}

impl ReplacementPolicy for Fifo {
    fn select_victim(&mut self, set_index: usize, valid: &[bool]) -> usize {
        let base = set_index * self.ways;
        let mut victim = usize::MAX;
        let mut first_in = u64::MAX;
        for way in 0..self.ways {
            if valid[way] && self.insertion_times[base + way] < first_in {
                first_in = self.insertion_times[base + way];
                victim = way;
            }
        }
        victim
    }

    fn on_access(&mut self, set_index: usize, way: usize, hit: bool) {
        if !hit {
            self.time += 1;
            self.insertion_times[set_index * self.ways + way] = self.time;
        }
    }
}

/// Random replacement policy. Holds no per-way metadata; victims are drawn uniformly from the
/// valid ways by rejection sampling
pub struct Random {
    rng: SmallRng,
}

impl Random {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }
}

impl Default for Random {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplacementPolicy for Random {
    fn select_victim(&mut self, _set_index: usize, valid: &[bool]) -> usize {
        loop {
            let way = self.rng.gen_range(0..valid.len());
            if valid[way] {
                return way;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lru_selects_least_recently_used() {
        let mut lru = Lru::new(1, 4);
        for way in 0..4 {
            lru.on_access(0, way, false);
        }
        // Touch way 0 again, way 1 becomes the oldest
        lru.on_access(0, 0, true);
        assert_eq!(lru.select_victim(0, &[true; 4]), 1);
    }

    #[test]
    fn lru_ties_break_to_lowest_way() {
        let mut lru = Lru::new(1, 4);
        // No accesses recorded at all: every stamp is 0
        assert_eq!(lru.select_victim(0, &[true; 4]), 0);
    }

    #[test]
    fn lru_skips_invalid_ways() {
        let mut lru = Lru::new(1, 4);
        for way in 0..4 {
            lru.on_access(0, way, false);
        }
        assert_eq!(lru.select_victim(0, &[false, true, true, true]), 1);
    }

    #[test]
    fn lru_sets_are_independent() {
        let mut lru = Lru::new(2, 2);
        lru.on_access(0, 0, false);
        lru.on_access(1, 1, false);
        lru.on_access(0, 1, false);
        lru.on_access(1, 0, false);
        assert_eq!(lru.select_victim(0, &[true, true]), 0);
        assert_eq!(lru.select_victim(1, &[true, true]), 1);
    }

    #[test]
    fn fifo_ignores_hits() {
        let mut fifo = Fifo::new(1, 2);
        fifo.on_access(0, 0, false);
        fifo.on_access(0, 1, false);
        // A hit on way 0 must not move it to the back of the queue
        fifo.on_access(0, 0, true);
        assert_eq!(fifo.select_victim(0, &[true, true]), 0);
    }

    #[test]
    fn reset_restores_initial_order() {
        let mut lru = Lru::new(1, 2);
        lru.on_access(0, 0, false);
        lru.on_access(0, 1, false);
        lru.reset();
        assert_eq!(lru.select_victim(0, &[true, true]), 0);
    }

    #[test]
    fn random_only_selects_valid_ways() {
        let mut random = Random::new();
        for _ in 0..100 {
            let way = random.select_victim(0, &[false, false, true, false]);
            assert_eq!(way, 2);
        }
    }
}
