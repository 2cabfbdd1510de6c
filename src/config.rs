/// Settings of an [`OdeTransitionSystem`][crate::transition::OdeTransitionSystem].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Config {
    /// Add a loop edge to states where some parameter valuation has no outgoing flow.
    pub create_self_loops: bool,
    /// Initial capacity of the memo tables, as a power of two.
    pub cache_bits: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_self_loops: true,
            cache_bits: 10,
        }
    }
}

impl Config {
    pub fn with_self_loops(mut self, create_self_loops: bool) -> Self {
        self.create_self_loops = create_self_loops;
        self
    }

    pub fn with_cache_bits(mut self, cache_bits: usize) -> Self {
        assert!(cache_bits <= 31, "Cache bits should be in the range 0..=31");
        self.cache_bits = cache_bits;
        self
    }
}
