use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Sizing and collection knobs for a [`State`](crate::State).
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// max_stack = 4096
/// initial_gc_threshold_kb = 256
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Slots allocated up front for the value stack.
    pub initial_stack: usize,
    /// Hard bound the stack may grow to.
    pub max_stack: usize,
    /// Free slots guaranteed to the host frame and to every native call.
    pub min_stack: usize,
    /// Nesting limit for native calls.
    pub max_native_depth: usize,
    /// Maximum number of reference slots.
    pub max_refs: usize,
    /// Collection threshold before the first cycle, in kilobytes.
    pub initial_gc_threshold_kb: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            initial_stack: 1024,
            max_stack: 1_000_000,
            min_stack: 20,
            max_native_depth: 200,
            max_refs: i32::MAX as usize,
            initial_gc_threshold_kb: 64,
        }
    }
}

impl StateConfig {
    pub fn from_toml_str(src: &str) -> Result<Self> {
        let config: StateConfig = toml::from_str(src).context("invalid state configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_stack == 0 {
            bail!("min_stack must be at least 1");
        }
        if self.initial_stack < self.min_stack {
            bail!(
                "initial_stack ({}) must hold at least min_stack ({}) slots",
                self.initial_stack,
                self.min_stack
            );
        }
        if self.max_stack < self.initial_stack {
            bail!(
                "max_stack ({}) is smaller than initial_stack ({})",
                self.max_stack,
                self.initial_stack
            );
        }
        if self.max_native_depth == 0 {
            bail!("max_native_depth must be at least 1");
        }
        if self.max_refs > i32::MAX as usize {
            bail!("max_refs cannot exceed {}", i32::MAX);
        }
        Ok(())
    }
}
