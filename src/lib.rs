//! # SimCache
//!
//! Simcache is a library for simulating set-associative hardware caches
//!
//! It provides a generic cache implementation which can be parameterised by a replacement policy,
//! configurable write and write-miss policies, and a simulator for running textual memory traces
//! against a configured cache
//!
//! The library is the core of a larger tool; presentation shells (command line, HTTP, GUI) are
//! expected to live in separate crates and consume the structured results exposed here

/// Contains address decomposition into tag, set index, and block offset
pub mod address;

/// Contains the implementation of the cache, and a utility enum for the existing cache types
pub mod cache;

/// Contains definitions for the cache configuration, with validation of the cache geometry
pub mod config;

/// Contains the provided replacement policies, with a trait for implementing custom replacement
/// policies
pub mod replacement_policies;

/// Contains the simulator used to run a memory trace against a configured cache
pub mod simulator;

/// Contains hit/miss counters and their derived rates
pub mod statistics;
