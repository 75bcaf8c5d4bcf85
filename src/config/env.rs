//! Environment variable access
//!
//! Configuration is read through an [`EnvSource`] so it can be built from a
//! fixed map in tests instead of the process environment.

use std::collections::HashMap;
use std::env;

/// Source of environment variables
pub trait EnvSource {
    /// Raw value of `name`, if set
    fn var(&self, name: &str) -> Option<String>;
}

/// The process environment
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Get a non-empty environment variable
pub fn get_env(source: &impl EnvSource, name: &str) -> Option<String> {
    source.var(name).filter(|v| !v.trim().is_empty())
}

/// Get a non-empty environment variable with fallback
pub fn get_env_or(source: &impl EnvSource, name: &str, default: &str) -> String {
    get_env(source, name).unwrap_or_else(|| default.to_string())
}

/// Builder for a fixed set of variables
#[derive(Clone, Debug, Default)]
pub struct EnvBuilder {
    vars: HashMap<String, String>,
}

impl EnvBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> HashMap<String, String> {
        self.vars
    }
}
