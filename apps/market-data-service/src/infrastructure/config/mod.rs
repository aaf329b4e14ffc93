//! Configuration Module
//!
//! Configuration loading for the market data service.

mod settings;

pub use settings::{GeneratorSettings, ServerSettings, ServiceConfig, StreamSettings};
