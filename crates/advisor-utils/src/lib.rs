//! Shared utilities for the investment advisor
//!
//! This crate provides common functionality used across the workspace:
//! tracing setup and environment lookups.

pub mod env;
pub mod logging;

pub use env::{EnvLookup, ProcessEnv, load_dotenv};
pub use logging::{DEFAULT_FILTER, init_tracing, init_tracing_with};
