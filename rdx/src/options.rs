//! Typed, `Default`-pinned tunables for the brick writer and brix view
//! (spec §6.4), grounded on `fuel-vm`'s own `*Config`/`*Options` structs
//! (e.g. `fuel-vm::interpreter::InterpreterParams`): small plain structs
//! with a `Default` impl that names every production constant once.

/// Tunables for a single brick writer (spec §4.9, §6.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrickWriterOptions {
    /// Target page size, in bytes. A page is flushed once appending the
    /// next record would exceed this.
    pub page_size_target: usize,
    /// Compressed pages are kept only if `compressed_len * 3 <= raw_len * 2`
    /// (i.e. compressed is at most 2/3 of raw); otherwise the page is
    /// stored uncompressed.
    pub compression_threshold_numerator: u64,
    pub compression_threshold_denominator: u64,
    /// Hard cap on container nesting depth (spec §3.3, §4.1).
    pub max_nesting: usize,
}

impl Default for BrickWriterOptions {
    fn default() -> Self {
        BrickWriterOptions {
            page_size_target: 4096,
            compression_threshold_numerator: 2,
            compression_threshold_denominator: 3,
            max_nesting: 255,
        }
    }
}

impl BrickWriterOptions {
    /// Whether `compressed_len` bytes are worth keeping over `raw_len`
    /// bytes under this writer's compression threshold.
    pub fn worth_compressing(&self, raw_len: usize, compressed_len: usize) -> bool {
        (compressed_len as u64) * self.compression_threshold_denominator
            <= (raw_len as u64) * self.compression_threshold_numerator
    }
}

/// Tunables for a brix view spanning a chain of bricks (spec §4.11, §6.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrixOptions {
    /// Max number of bricks in one view's base-hash chain, and the max
    /// k-way merge fan-in a scan or `join()` will open at once.
    pub max_chain_len: usize,
}

impl Default for BrixOptions {
    fn default() -> Self {
        BrixOptions { max_chain_len: 255 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let w = BrickWriterOptions::default();
        assert_eq!(w.page_size_target, 4096);
        assert_eq!(w.max_nesting, 255);
        assert!(w.worth_compressing(3000, 2000));
        assert!(!w.worth_compressing(3000, 2001));

        assert_eq!(BrixOptions::default().max_chain_len, 255);
    }
}
