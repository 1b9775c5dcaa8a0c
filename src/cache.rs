use std::fmt;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::address::AddressDecoder;
use crate::config::{CacheConfig, ConfigError, ReplacementPolicyConfig, WriteMissPolicy, WritePolicy};
use crate::replacement_policies::{Fifo, Lru, Random, ReplacementPolicy};
use crate::statistics::CacheStatistics;

/// The type of a memory access
///
/// Shells parse their textual forms (`R`/`READ`/`W`/`WRITE`, see
/// [`parse_operation`](crate::simulator::parse_operation)); the core only ever sees this closed
/// enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Read,
    Write,
}

/// The classification of a single cache access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessResult {
    Hit,
    Miss,
    WriteHit,
    WriteMiss,
}

impl fmt::Display for AccessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessResult::Hit => write!(f, "HIT"),
            AccessResult::Miss => write!(f, "MISS"),
            AccessResult::WriteHit => write!(f, "WRITE HIT"),
            AccessResult::WriteMiss => write!(f, "WRITE MISS"),
        }
    }
}

/// A single cache block (line). No data bytes are stored; the simulation only tracks identity and
/// state
#[derive(Debug, Clone, Copy, Default)]
struct CacheBlock {
    valid: bool,
    dirty: bool,
    tag: u64,
}

/// A read-only snapshot of one block, for visualisation consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSnapshot {
    pub valid: bool,
    pub dirty: bool,
    pub tag: u64,
}

/// A generic trait for caches
///
/// Technically not required as we're using static dispatch to speed things up instead of dyn
/// Cache, but this gives flexibility for the future with no overhead
pub trait Cache {
    /// Performs one read or write access, returning its classification
    ///
    /// Once construction succeeds there are no error conditions here; the full 64-bit address
    /// space is legal input. The call fully completes, including any eviction and simulated
    /// write-back, before returning
    ///
    /// # Arguments
    ///
    /// * `address`: The memory address being accessed
    /// * `operation`: Whether the access is a read or a write
    ///
    /// returns: AccessResult
    fn access(&mut self, address: u64, operation: Operation) -> AccessResult;

    /// Returns a copy of the current counters, never a live reference
    fn statistics(&self) -> CacheStatistics;

    /// Resets the counters only; cache contents are untouched
    fn reset_statistics(&mut self);

    /// Invalidates every block and resets replacement policy state and statistics. Used for
    /// in-place reconfiguration without reconstruction
    fn clear(&mut self);

    /// Snapshots every block, outer index set, inner index way. Visualisation only
    fn contents(&self) -> Vec<Vec<BlockSnapshot>>;

    /// Whether the block at (set, way) holds valid contents
    fn is_valid(&self, set_index: usize, way: usize) -> bool;

    /// Whether the block at (set, way) has been written but not yet written back
    fn is_dirty(&self, set_index: usize, way: usize) -> bool;

    /// The tag stored at (set, way); meaningful only while the block is valid
    fn tag_of(&self, set_index: usize, way: usize) -> u64;
}

/// A set-associative cache, parameterised by a replacement policy
///
/// The general approach here is to have one solid implementation covering direct-mapped through
/// fully associative shapes, relying on monomorphisation and inlining of the policy functions
/// rather than separate specialised implementations
///
/// Blocks are stored set-major in a single flat allocation; the block for (set, way) lives at
/// `set * ways + way`
pub struct SetAssociativeCache<R: ReplacementPolicy> {
    decoder: AddressDecoder,
    blocks: Vec<CacheBlock>,
    num_sets: usize,
    ways: usize,
    write_policy: WritePolicy,
    write_miss_policy: WriteMissPolicy,
    replacement_policy: R,
    statistics: CacheStatistics,
}

impl<R: ReplacementPolicy> SetAssociativeCache<R> {
    /// Validates the configuration and builds the cache
    ///
    /// The supplied policy must have been sized for the same geometry
    /// (see [`GenericCache::from_config`] which handles both together)
    pub fn new(config: &CacheConfig, replacement_policy: R) -> Result<Self, ConfigError> {
        let geometry = config.geometry()?;
        Ok(Self {
            decoder: AddressDecoder::new(config.block_size, geometry.num_sets),
            blocks: vec![CacheBlock::default(); geometry.num_blocks as usize],
            num_sets: geometry.num_sets as usize,
            ways: geometry.ways as usize,
            write_policy: config.write_policy,
            write_miss_policy: config.write_miss_policy,
            replacement_policy,
            statistics: CacheStatistics::new(),
        })
    }

    pub fn num_sets(&self) -> usize {
        self.num_sets
    }

    pub fn ways(&self) -> usize {
        self.ways
    }

    pub fn decoder(&self) -> AddressDecoder {
        self.decoder
    }

    fn block(&self, set_index: usize, way: usize) -> &CacheBlock {
        &self.blocks[set_index * self.ways + way]
    }

    fn block_mut(&mut self, set_index: usize, way: usize) -> &mut CacheBlock {
        &mut self.blocks[set_index * self.ways + way]
    }

    /// Linear scan of the target set for a valid block with a matching tag; O(ways)
    fn find_block(&self, set_index: usize, tag: u64) -> Option<usize> {
        (0..self.ways).find(|&way| {
            let block = self.block(set_index, way);
            block.valid && block.tag == tag
        })
    }

    fn find_empty_way(&self, set_index: usize) -> Option<usize> {
        (0..self.ways).find(|&way| !self.block(set_index, way).valid)
    }

    fn handle_hit(&mut self, set_index: usize, way: usize, operation: Operation) -> AccessResult {
        self.replacement_policy.on_access(set_index, way, true);
        match operation {
            Operation::Read => {
                self.statistics.record_hit();
                AccessResult::Hit
            }
            Operation::Write => {
                self.statistics.record_write_hit();
                match self.write_policy {
                    WritePolicy::WriteBack => {
                        // Deferred to eviction
                        self.block_mut(set_index, way).dirty = true;
                    }
                    WritePolicy::WriteThrough => {
                        let tag = self.block(set_index, way).tag;
                        self.write_to_memory(self.decoder.block_address(tag, set_index));
                    }
                }
                AccessResult::WriteHit
            }
        }
    }

    fn handle_miss(
        &mut self,
        address: u64,
        set_index: usize,
        tag: u64,
        operation: Operation,
    ) -> AccessResult {
        match operation {
            Operation::Read => {
                self.statistics.record_miss();
                // Read misses always allocate, independent of the write miss policy
                self.allocate(set_index, tag, operation);
                AccessResult::Miss
            }
            Operation::Write => {
                self.statistics.record_write_miss();
                match self.write_miss_policy {
                    WriteMissPolicy::WriteAllocate => {
                        self.allocate(set_index, tag, operation);
                    }
                    WriteMissPolicy::NoWriteAllocate => {
                        // Bypass the cache entirely
                        self.write_to_memory(address);
                    }
                }
                AccessResult::WriteMiss
            }
        }
    }

    /// Places a block for (set, tag), preferring an empty way and evicting via the replacement
    /// policy otherwise. Dirty victims are written back before being overwritten
    fn allocate(&mut self, set_index: usize, tag: u64, operation: Operation) {
        let way = match self.find_empty_way(set_index) {
            Some(way) => way,
            None => {
                let valid: Vec<bool> = (0..self.ways)
                    .map(|way| self.block(set_index, way).valid)
                    .collect();
                let victim = self.replacement_policy.select_victim(set_index, &valid);
                let block = self.block(set_index, victim);
                trace!(
                    "evicting set {set_index} way {victim} (tag {:#x}, dirty: {})",
                    block.tag,
                    block.dirty
                );
                if block.dirty {
                    self.write_to_memory(self.decoder.block_address(block.tag, set_index));
                }
                victim
            }
        };
        *self.block_mut(set_index, way) = CacheBlock {
            valid: true,
            tag,
            dirty: operation == Operation::Write && self.write_policy == WritePolicy::WriteBack,
        };
        self.read_from_memory(self.decoder.block_address(tag, set_index));
        self.replacement_policy.on_access(set_index, way, false);
    }

    // Memory traffic is simulated; nothing is transferred, we only note that it happened
    fn write_to_memory(&self, address: u64) {
        trace!("memory write at {address:#x}");
    }

    fn read_from_memory(&self, address: u64) {
        trace!("memory read at {address:#x}");
    }
}

impl<R: ReplacementPolicy> Cache for SetAssociativeCache<R> {
    fn access(&mut self, address: u64, operation: Operation) -> AccessResult {
        let set_index = self.decoder.set_index(address);
        let tag = self.decoder.tag(address);
        match operation {
            Operation::Read => self.statistics.record_read(),
            Operation::Write => self.statistics.record_write(),
        }
        match self.find_block(set_index, tag) {
            Some(way) => self.handle_hit(set_index, way, operation),
            None => self.handle_miss(address, set_index, tag, operation),
        }
    }

    fn statistics(&self) -> CacheStatistics {
        self.statistics
    }

    fn reset_statistics(&mut self) {
        self.statistics.reset();
    }

    fn clear(&mut self) {
        self.blocks.fill(CacheBlock::default());
        self.replacement_policy.reset();
        self.statistics.reset();
    }

    fn contents(&self) -> Vec<Vec<BlockSnapshot>> {
        (0..self.num_sets)
            .map(|set_index| {
                (0..self.ways)
                    .map(|way| {
                        let block = self.block(set_index, way);
                        BlockSnapshot {
                            valid: block.valid,
                            dirty: block.dirty,
                            tag: block.tag,
                        }
                    })
                    .collect()
            })
            .collect()
    }

    fn is_valid(&self, set_index: usize, way: usize) -> bool {
        self.block(set_index, way).valid
    }

    fn is_dirty(&self, set_index: usize, way: usize) -> bool {
        self.block(set_index, way).dirty
    }

    fn tag_of(&self, set_index: usize, way: usize) -> u64 {
        self.block(set_index, way).tag
    }
}

/// Enum for the three cache types provided by the library, one per replacement policy
///
/// Using trait objects in Rust reduces boilerplate, but it is completely opaque to the compiler;
/// explicitly branching on the concrete types lets the policy functions inline into the access
/// loop. The policy set is closed and selected by configuration, so no open extension point is
/// needed
pub enum GenericCache {
    Lru(SetAssociativeCache<Lru>),
    Fifo(SetAssociativeCache<Fifo>),
    Random(SetAssociativeCache<Random>),
}

impl GenericCache {
    /// Builds a cache from a validated configuration, sizing the replacement policy state to the
    /// derived geometry
    ///
    /// # Arguments
    ///
    /// * `config`: A cache configuration, usually resulting from parsing JSON
    ///
    /// returns: Result<GenericCache, ConfigError>
    pub fn from_config(config: &CacheConfig) -> Result<Self, ConfigError> {
        let geometry = config.geometry()?;
        Ok(match config.replacement_policy {
            ReplacementPolicyConfig::Lru => {
                GenericCache::from(SetAssociativeCache::new(config, Lru::new(geometry.num_sets, geometry.ways))?)
            }
            ReplacementPolicyConfig::Fifo => {
                GenericCache::from(SetAssociativeCache::new(config, Fifo::new(geometry.num_sets, geometry.ways))?)
            }
            ReplacementPolicyConfig::Random => {
                GenericCache::from(SetAssociativeCache::new(config, Random::new())?)
            }
        })
    }

    pub fn num_sets(&self) -> usize {
        match self {
            GenericCache::Lru(c) => c.num_sets(),
            GenericCache::Fifo(c) => c.num_sets(),
            GenericCache::Random(c) => c.num_sets(),
        }
    }

    pub fn ways(&self) -> usize {
        match self {
            GenericCache::Lru(c) => c.ways(),
            GenericCache::Fifo(c) => c.ways(),
            GenericCache::Random(c) => c.ways(),
        }
    }

    pub fn decoder(&self) -> AddressDecoder {
        match self {
            GenericCache::Lru(c) => c.decoder(),
            GenericCache::Fifo(c) => c.decoder(),
            GenericCache::Random(c) => c.decoder(),
        }
    }
}

impl From<SetAssociativeCache<Lru>> for GenericCache {
    fn from(value: SetAssociativeCache<Lru>) -> Self {
        Self::Lru(value)
    }
}

impl From<SetAssociativeCache<Fifo>> for GenericCache {
    fn from(value: SetAssociativeCache<Fifo>) -> Self {
        Self::Fifo(value)
    }
}

impl From<SetAssociativeCache<Random>> for GenericCache {
    fn from(value: SetAssociativeCache<Random>) -> Self {
        Self::Random(value)
    }
}

impl Cache for GenericCache {
    fn access(&mut self, address: u64, operation: Operation) -> AccessResult {
        match self {
            GenericCache::Lru(c) => c.access(address, operation),
            GenericCache::Fifo(c) => c.access(address, operation),
            GenericCache::Random(c) => c.access(address, operation),
        }
    }

    fn statistics(&self) -> CacheStatistics {
        match self {
            GenericCache::Lru(c) => c.statistics(),
            GenericCache::Fifo(c) => c.statistics(),
            GenericCache::Random(c) => c.statistics(),
        }
    }

    fn reset_statistics(&mut self) {
        match self {
            GenericCache::Lru(c) => c.reset_statistics(),
            GenericCache::Fifo(c) => c.reset_statistics(),
            GenericCache::Random(c) => c.reset_statistics(),
        }
    }

    fn clear(&mut self) {
        match self {
            GenericCache::Lru(c) => c.clear(),
            GenericCache::Fifo(c) => c.clear(),
            GenericCache::Random(c) => c.clear(),
        }
    }

    fn contents(&self) -> Vec<Vec<BlockSnapshot>> {
        match self {
            GenericCache::Lru(c) => c.contents(),
            GenericCache::Fifo(c) => c.contents(),
            GenericCache::Random(c) => c.contents(),
        }
    }

    fn is_valid(&self, set_index: usize, way: usize) -> bool {
        match self {
            GenericCache::Lru(c) => c.is_valid(set_index, way),
            GenericCache::Fifo(c) => c.is_valid(set_index, way),
            GenericCache::Random(c) => c.is_valid(set_index, way),
        }
    }

    fn is_dirty(&self, set_index: usize, way: usize) -> bool {
        match self {
            GenericCache::Lru(c) => c.is_dirty(set_index, way),
            GenericCache::Fifo(c) => c.is_dirty(set_index, way),
            GenericCache::Random(c) => c.is_dirty(set_index, way),
        }
    }

    fn tag_of(&self, set_index: usize, way: usize) -> u64 {
        match self {
            GenericCache::Lru(c) => c.tag_of(set_index, way),
            GenericCache::Fifo(c) => c.tag_of(set_index, way),
            GenericCache::Random(c) => c.tag_of(set_index, way),
        }
    }
}
