//! Configuration Module - Heap Tuning Parameters
//!
//! Collects the knobs that affect allocator and collector behavior. The
//! environment flags mirror the ones the interpreter has always honored:
//! `SHI_ALWAYS_GC` shakes out stale references by collecting on every
//! allocation, `SHI_DEBUG_GC` reports copied byte counts per cycle.

/// Default semispace budget: 64 MiB
pub const DEFAULT_MEMORY_SIZE: usize = 64 * 1024 * 1024;

/// Heap configuration
#[derive(Debug, Clone)]
pub struct HeapConfig {
    /// Semispace budget in bytes. An allocation that cannot fit after a
    /// collection is fatal.
    pub memory_size: usize,

    /// Report copied/total byte counts on stderr after each collection
    pub debug_gc: bool,

    /// Force a collection at every allocation
    pub always_gc: bool,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            memory_size: DEFAULT_MEMORY_SIZE,
            debug_gc: false,
            always_gc: false,
        }
    }
}

impl HeapConfig {
    /// Build a configuration from the process environment
    /// (`SHI_DEBUG_GC`, `SHI_ALWAYS_GC`; any non-empty value enables)
    pub fn from_env() -> Self {
        Self {
            memory_size: DEFAULT_MEMORY_SIZE,
            debug_gc: env_flag("SHI_DEBUG_GC"),
            always_gc: env_flag("SHI_ALWAYS_GC"),
        }
    }
}

/// True if the variable is set to a non-empty value
fn env_flag(name: &str) -> bool {
    std::env::var(name).map(|v| !v.is_empty()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budget() {
        let config = HeapConfig::default();
        assert_eq!(config.memory_size, 64 * 1024 * 1024);
        assert!(!config.debug_gc);
        assert!(!config.always_gc);
    }
}
