//! Environment helpers
//!
//! Configuration code never calls `std::env::var` directly; it goes through
//! [`EnvLookup`] so tests can supply a fixed map instead of mutating the
//! process environment.

use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

/// Source of environment variables
pub trait EnvLookup {
    /// Look up a variable; empty values are treated as unset
    fn var(&self, key: &str) -> Option<String>;

    /// Return the first variable in `keys` that is set
    fn first_of(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| self.var(key))
    }
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

impl EnvLookup for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.trim().is_empty()).cloned()
    }
}

impl EnvLookup for HashMap<&str, &str> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key)
            .filter(|v| !v.trim().is_empty())
            .map(|v| (*v).to_string())
    }
}

/// Load a `.env` file from the working directory or its parents, if any
///
/// Returns the path that was loaded. A missing file is not an error.
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => {
            debug!("Loaded environment from {}", path.display());
            Some(path)
        }
        Err(e) => {
            debug!("No .env file loaded: {e}");
            None
        }
    }
}
