use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A configuration for a single cache
///
/// Immutable once validated; all derived geometry lives in [`CacheGeometry`]
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Total cache size in bytes
    pub cache_size: u64,
    /// Block (line) size in bytes
    pub block_size: u64,
    /// 0 for fully associative, 1 for direct mapped, N for N-way set associative
    pub associativity: u64,
    #[serde(default)]
    pub replacement_policy: ReplacementPolicyConfig,
    #[serde(default)]
    pub write_policy: WritePolicy,
    #[serde(default)]
    pub write_miss_policy: WriteMissPolicy,
}

/// The replacement policy - LRU, FIFO, or random. Defaults to LRU.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplacementPolicyConfig {
    #[serde(alias = "lru", alias = "LRU")]
    Lru,
    #[serde(alias = "fifo", alias = "FIFO")]
    Fifo,
    #[serde(alias = "random", alias = "RANDOM")]
    Random,
}

impl Default for ReplacementPolicyConfig {
    fn default() -> Self {
        ReplacementPolicyConfig::Lru
    }
}

impl FromStr for ReplacementPolicyConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LRU" => Ok(ReplacementPolicyConfig::Lru),
            "FIFO" => Ok(ReplacementPolicyConfig::Fifo),
            "RANDOM" => Ok(ReplacementPolicyConfig::Random),
            _ => Err(ConfigError::UnknownReplacementPolicy(s.to_string())),
        }
    }
}

/// Whether a write hit is propagated to backing storage immediately (through) or deferred until
/// eviction of the dirty block (back). Defaults to write-through.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WritePolicy {
    #[serde(alias = "write_through", alias = "WRITE_THROUGH")]
    WriteThrough,
    #[serde(alias = "write_back", alias = "WRITE_BACK")]
    WriteBack,
}

impl Default for WritePolicy {
    fn default() -> Self {
        WritePolicy::WriteThrough
    }
}

impl FromStr for WritePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "WRITE_THROUGH" => Ok(WritePolicy::WriteThrough),
            "WRITE_BACK" => Ok(WritePolicy::WriteBack),
            _ => Err(ConfigError::UnknownWritePolicy(s.to_string())),
        }
    }
}

/// Whether a write miss loads the block into the cache (allocate) or bypasses the cache entirely.
/// Defaults to write-allocate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteMissPolicy {
    #[serde(alias = "write_allocate", alias = "WRITE_ALLOCATE")]
    WriteAllocate,
    #[serde(alias = "no_write_allocate", alias = "NO_WRITE_ALLOCATE")]
    NoWriteAllocate,
}

impl Default for WriteMissPolicy {
    fn default() -> Self {
        WriteMissPolicy::WriteAllocate
    }
}

impl FromStr for WriteMissPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "WRITE_ALLOCATE" => Ok(WriteMissPolicy::WriteAllocate),
            "NO_WRITE_ALLOCATE" => Ok(WriteMissPolicy::NoWriteAllocate),
            _ => Err(ConfigError::UnknownWriteMissPolicy(s.to_string())),
        }
    }
}

/// Raised only at construction; recoverable by retrying with corrected parameters
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("cache size and block size must be greater than 0")]
    ZeroSize,
    #[error("cache size {cache_size} must be a multiple of block size {block_size}")]
    SizeNotMultipleOfBlock { cache_size: u64, block_size: u64 },
    #[error("{name} ({value}) must be a power of two")]
    NotPowerOfTwo { name: &'static str, value: u64 },
    #[error("number of blocks ({num_blocks}) must be divisible by associativity ({associativity})")]
    BlocksNotDivisibleByAssociativity { num_blocks: u64, associativity: u64 },
    #[error("unknown replacement policy: {0}")]
    UnknownReplacementPolicy(String),
    #[error("unknown write policy: {0}")]
    UnknownWritePolicy(String),
    #[error("unknown write miss policy: {0}")]
    UnknownWriteMissPolicy(String),
}

/// The derived shape of a cache, computed and validated from a [`CacheConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheGeometry {
    pub num_blocks: u64,
    pub num_sets: u64,
    /// The effective associativity; equal to `num_blocks` for fully associative configurations
    pub ways: u64,
}

impl CacheConfig {
    /// Validates the configuration and computes the cache geometry
    ///
    /// The bit-mask address decoding in [`AddressDecoder`](crate::address::AddressDecoder)
    /// requires the block size and the number of sets to be powers of two, so non-conforming
    /// configurations are rejected here rather than producing undefined decodes later
    ///
    /// # Arguments
    ///
    /// returns: Result<CacheGeometry, ConfigError>
    pub fn geometry(&self) -> Result<CacheGeometry, ConfigError> {
        if self.cache_size == 0 || self.block_size == 0 {
            return Err(ConfigError::ZeroSize);
        }
        if !self.block_size.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                name: "block size",
                value: self.block_size,
            });
        }
        if self.cache_size % self.block_size != 0 {
            return Err(ConfigError::SizeNotMultipleOfBlock {
                cache_size: self.cache_size,
                block_size: self.block_size,
            });
        }
        let num_blocks = self.cache_size / self.block_size;
        let (num_sets, ways) = if self.associativity == 0 {
            (1, num_blocks)
        } else {
            if num_blocks % self.associativity != 0 {
                return Err(ConfigError::BlocksNotDivisibleByAssociativity {
                    num_blocks,
                    associativity: self.associativity,
                });
            }
            (num_blocks / self.associativity, self.associativity)
        };
        if !num_sets.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                name: "number of sets",
                value: num_sets,
            });
        }
        Ok(CacheGeometry {
            num_blocks,
            num_sets,
            ways,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(cache_size: u64, block_size: u64, associativity: u64) -> CacheConfig {
        CacheConfig {
            cache_size,
            block_size,
            associativity,
            replacement_policy: ReplacementPolicyConfig::default(),
            write_policy: WritePolicy::default(),
            write_miss_policy: WriteMissPolicy::default(),
        }
    }

    #[test]
    fn direct_mapped_geometry() {
        let geometry = config(512, 32, 1).geometry().unwrap();
        assert_eq!(geometry.num_blocks, 16);
        assert_eq!(geometry.num_sets, 16);
        assert_eq!(geometry.ways, 1);
    }

    #[test]
    fn fully_associative_geometry() {
        let geometry = config(512, 32, 0).geometry().unwrap();
        assert_eq!(geometry.num_sets, 1);
        assert_eq!(geometry.ways, 16);
    }

    #[test]
    fn rejects_size_not_multiple_of_block() {
        assert_eq!(
            config(100, 32, 1).geometry(),
            Err(ConfigError::SizeNotMultipleOfBlock {
                cache_size: 100,
                block_size: 32
            })
        );
    }

    #[test]
    fn rejects_non_power_of_two_block_size() {
        assert!(matches!(
            config(480, 48, 1).geometry(),
            Err(ConfigError::NotPowerOfTwo { name: "block size", .. })
        ));
    }

    #[test]
    fn rejects_non_power_of_two_set_count() {
        // 384 / 32 = 12 blocks, 2-way => 6 sets
        assert!(matches!(
            config(384, 32, 2).geometry(),
            Err(ConfigError::NotPowerOfTwo { name: "number of sets", .. })
        ));
    }

    #[test]
    fn rejects_indivisible_associativity() {
        // 16 blocks, 3-way
        assert_eq!(
            config(512, 32, 3).geometry(),
            Err(ConfigError::BlocksNotDivisibleByAssociativity {
                num_blocks: 16,
                associativity: 3
            })
        );
    }

    #[test]
    fn rejects_zero_sizes() {
        assert_eq!(config(0, 32, 1).geometry(), Err(ConfigError::ZeroSize));
        assert_eq!(config(512, 0, 1).geometry(), Err(ConfigError::ZeroSize));
    }

    #[test]
    fn policy_names_parse_case_insensitively() {
        assert_eq!("lru".parse(), Ok(ReplacementPolicyConfig::Lru));
        assert_eq!("FIFO".parse(), Ok(ReplacementPolicyConfig::Fifo));
        assert_eq!("Random".parse(), Ok(ReplacementPolicyConfig::Random));
        assert_eq!("write_back".parse(), Ok(WritePolicy::WriteBack));
        assert_eq!("NO_WRITE_ALLOCATE".parse(), Ok(WriteMissPolicy::NoWriteAllocate));
    }

    #[test]
    fn unknown_policy_names_fail() {
        assert_eq!(
            "plru".parse::<ReplacementPolicyConfig>(),
            Err(ConfigError::UnknownReplacementPolicy("plru".to_string()))
        );
        assert_eq!(
            "write_around".parse::<WritePolicy>(),
            Err(ConfigError::UnknownWritePolicy("write_around".to_string()))
        );
    }

    #[test]
    fn deserialises_with_aliases_and_defaults() {
        let json = r#"{
            "cache_size": 1024,
            "block_size": 32,
            "associativity": 4,
            "replacement_policy": "fifo",
            "write_policy": "write_back"
        }"#;
        let config: CacheConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.replacement_policy, ReplacementPolicyConfig::Fifo);
        assert_eq!(config.write_policy, WritePolicy::WriteBack);
        // Omitted, takes the default
        assert_eq!(config.write_miss_policy, WriteMissPolicy::WriteAllocate);
    }
}
