use std::num::ParseIntError;
use std::time::{Duration, Instant};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::{AccessResult, Cache, GenericCache, Operation};
use crate::config::{CacheConfig, ConfigError};
use crate::statistics::StatisticsSummary;

lazy_static! {
    static ref TRACE_LINE: Regex =
        Regex::new(r"^\s*(?P<op>[A-Za-z]+)\s+(?P<addr>\S+)\s*$").unwrap();
}

/// Raised while parsing a memory trace. Carries the 1-based line number so shells can point the
/// user at the offending input
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraceError {
    #[error("line {line}: invalid trace line {content:?}, expected `<operation> <address>`")]
    InvalidLine { line: usize, content: String },
    #[error("line {line}: unknown operation {operation:?}, expected READ/R or WRITE/W")]
    UnknownOperation { line: usize, operation: String },
    #[error("line {line}: invalid address {address:?}")]
    InvalidAddress { line: usize, address: String },
    #[error("trace contains no memory accesses")]
    Empty,
}

/// Parses an address in the textual form accepted by the shells: hexadecimal with a `0x` prefix,
/// or bare decimal
///
/// # Examples
///
/// ```
/// use simcache::simulator::parse_address;
/// assert_eq!(parse_address("0x1A").unwrap(), 26);
/// assert_eq!(parse_address("26").unwrap(), 26);
/// assert!(parse_address("26s").is_err());
/// ```
pub fn parse_address(input: &str) -> Result<u64, ParseIntError> {
    match input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => input.parse(),
    }
}

/// Parses the case-insensitive textual operation forms `R`/`READ`/`W`/`WRITE`
///
/// # Examples
///
/// ```
/// use simcache::cache::Operation;
/// use simcache::simulator::parse_operation;
/// assert_eq!(parse_operation("r"), Some(Operation::Read));
/// assert_eq!(parse_operation("WRITE"), Some(Operation::Write));
/// assert_eq!(parse_operation("fetch"), None);
/// ```
pub fn parse_operation(input: &str) -> Option<Operation> {
    match input.to_ascii_uppercase().as_str() {
        "R" | "READ" => Some(Operation::Read),
        "W" | "WRITE" => Some(Operation::Write),
        _ => None,
    }
}

/// Parses a whole trace: one `<operation> <address>` pair per line, with blank lines and `#`
/// comments skipped. Malformed lines are errors rather than warnings; a library has no console to
/// warn on
pub fn parse_trace(trace: &str) -> Result<Vec<(Operation, u64)>, TraceError> {
    let mut accesses = Vec::new();
    for (index, content) in trace.lines().enumerate() {
        let line = index + 1;
        let trimmed = content.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let captures = TRACE_LINE.captures(content).ok_or_else(|| TraceError::InvalidLine {
            line,
            content: content.to_string(),
        })?;
        let op_text = &captures["op"];
        let operation = parse_operation(op_text).ok_or_else(|| TraceError::UnknownOperation {
            line,
            operation: op_text.to_string(),
        })?;
        let addr_text = &captures["addr"];
        let address = parse_address(addr_text).map_err(|_| TraceError::InvalidAddress {
            line,
            address: addr_text.to_string(),
        })?;
        accesses.push((operation, address));
    }
    if accesses.is_empty() {
        return Err(TraceError::Empty);
    }
    Ok(accesses)
}

/// The result of running a trace. Can be serialised for the presentation shells
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SimulationResult {
    /// One classification per access, in trace order
    pub results: Vec<AccessResult>,
    pub statistics: StatisticsSummary,
}

/// Drives one cache with parsed memory traces and collects results
///
/// Supports running multiple traces against the same cache; statistics and the simulation time
/// accumulate across runs until [`Simulator::clear`] is called
pub struct Simulator {
    cache: GenericCache,
    simulation_time: Duration,
}

impl Simulator {
    /// Creates a new simulator for a given configuration
    ///
    /// # Arguments
    ///
    /// * `config`: A cache configuration, usually resulting from parsing JSON
    ///
    /// returns: Result<Simulator, ConfigError>
    pub fn new(config: &CacheConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            cache: GenericCache::from_config(config)?,
            simulation_time: Duration::new(0, 0),
        })
    }

    /// Parses and runs a textual trace, returning the per-access results and a statistics
    /// snapshot taken after the run
    pub fn run_trace(&mut self, trace: &str) -> Result<SimulationResult, TraceError> {
        let accesses = parse_trace(trace)?;
        Ok(self.run(&accesses))
    }

    /// Runs pre-parsed accesses. Infallible; every u64 address is legal once the cache exists
    pub fn run(&mut self, accesses: &[(Operation, u64)]) -> SimulationResult {
        let start = Instant::now();
        let results = accesses
            .iter()
            .map(|&(operation, address)| self.cache.access(address, operation))
            .collect();
        self.simulation_time += start.elapsed();
        SimulationResult {
            results,
            statistics: self.cache.statistics().summary(),
        }
    }

    /// Clears the cache, its statistics, and the accumulated simulation time
    pub fn clear(&mut self) {
        self.cache.clear();
        self.simulation_time = Duration::new(0, 0);
    }

    /// Gets the wall-clock execution time spent inside access loops
    pub fn get_execution_time(&self) -> &Duration {
        &self.simulation_time
    }

    pub fn cache(&self) -> &GenericCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut GenericCache {
        &mut self.cache
    }
}
