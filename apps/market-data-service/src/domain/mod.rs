//! Domain Layer - Core market data types and business logic.
//!
//! This layer contains the core domain types for tick generation and
//! fan-out with no external I/O dependencies. All types here are pure
//! Rust with serialization support.

/// Market data types (symbols, ticks, last-known-value board).
pub mod market;

/// Per-topic subscriber registry for broadcast fan-out.
pub mod registry;
