//! Memory footprint sampling

use crate::veil::ast::{estimate_footprint, Chunk};

/// Samples the footprint checked against `MemoryLimitBytes` before each step.
pub trait MemoryGauge {
    fn sample(&self, chunk: &Chunk) -> u64;
}

const PAGE_SIZE: u64 = 4096;

/// Resident set size from `/proc/self/statm`, or the tree estimate where that is unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessMemory;

impl ProcessMemory {
    fn resident_bytes() -> Option<u64> {
        let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
        let pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
        Some(pages * PAGE_SIZE)
    }
}

impl MemoryGauge for ProcessMemory {
    fn sample(&self, chunk: &Chunk) -> u64 {
        Self::resident_bytes().unwrap_or_else(|| estimate_footprint(chunk) as u64)
    }
}

/// The tree estimate alone. Deterministic across platforms.
#[derive(Debug, Clone, Copy, Default)]
pub struct AstFootprint;

impl MemoryGauge for AstFootprint {
    fn sample(&self, chunk: &Chunk) -> u64 {
        estimate_footprint(chunk) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::veil::dialect::Dialect;
    use crate::veil::parsing::parse_source;

    #[test]
    fn test_footprint_grows_with_source() {
        let small = parse_source("local a = 1", Dialect::Lua51).unwrap();
        let large = parse_source(&"local a = 1\n".repeat(50), Dialect::Lua51).unwrap();
        assert!(AstFootprint.sample(&large) > AstFootprint.sample(&small));
    }

    #[test]
    fn test_process_memory_is_nonzero() {
        let chunk = parse_source("local a = 1", Dialect::Lua51).unwrap();
        assert!(ProcessMemory.sample(&chunk) > 0);
    }
}
